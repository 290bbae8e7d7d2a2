// ==========================================
// 商品上传API
// ==========================================
// 职责: 上传边界校验 + 调用导入编排器 + 组装响应
// 响应: 成功 / 校验失败 / 其它失败，三种形态之一
// ==========================================

use crate::api::error::ApiError;
use crate::config::{ImportConfigReader, DEFAULT_MAX_UPLOAD_BYTES};
use crate::importer::{ImportError, ImportFailure, ProductImporter, REQUIRED_COLUMNS};
use crate::repository::DatasetStore;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// xlsx 的标准 MIME 类型
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const CSV_CONTENT_TYPE: &str = "text/csv";

const NOTHING_SAVED: &str = "No data was saved.";

// ==========================================
// 请求/响应结构
// ==========================================

/// 上传请求
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// 原始文件名
    pub filename: String,
    /// 客户端声明的 MIME 类型
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// 上传成功摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub filename: String,
    pub total_rows: usize,
    pub inserted_rows: usize,
    pub upload_id: i64,
}

/// 上传响应
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UploadResponse {
    Success {
        success: bool,
        message: String,
        data: UploadSummary,
        #[serde(skip)]
        status: u16,
    },
    ValidationFailed {
        success: bool,
        message: String,
        errors: Vec<String>,
        #[serde(skip)]
        status: u16,
    },
    Failed {
        success: bool,
        message: String,
        error: String,
        /// 表头缺列时返回期望的列
        #[serde(skip_serializing_if = "Option::is_none")]
        expected: Option<Vec<String>>,
        #[serde(skip)]
        status: u16,
    },
}

impl UploadResponse {
    fn failed(status: u16, message: impl Into<String>, error: impl Into<String>) -> Self {
        UploadResponse::Failed {
            success: false,
            message: message.into(),
            error: error.into(),
            expected: None,
            status,
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            UploadResponse::Success { status, .. }
            | UploadResponse::ValidationFailed { status, .. }
            | UploadResponse::Failed { status, .. } => *status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResponse::Success { .. })
    }
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi<S, C>
where
    S: DatasetStore,
    C: ImportConfigReader,
{
    store: Arc<S>,
    config: Arc<C>,
}

impl<S, C> ImportApi<S, C>
where
    S: DatasetStore,
    C: ImportConfigReader,
{
    pub fn new(store: Arc<S>, config: Arc<C>) -> Self {
        Self { store, config }
    }

    /// 上传商品文件并导入为新数据集
    ///
    /// # 返回
    /// - 总是返回响应；失败信息在响应体内，状态码见 status_code()
    #[instrument(skip(self, request), fields(filename = %request.filename, size = request.bytes.len()))]
    pub async fn upload_products(&self, request: UploadRequest) -> UploadResponse {
        if let Err(e) = self.check_boundary(&request).await {
            warn!(error = %e, "上传被边界拒绝");
            return UploadResponse::failed(e.status_code(), e.to_string(), NOTHING_SAVED);
        }

        let sheet_name = match self.config.get_sheet_name().await {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "读取工作表配置失败，使用第一个工作表");
                None
            }
        };

        let importer = ProductImporter::with_defaults(Arc::clone(&self.store), sheet_name);

        match importer.import(&request.filename, &request.bytes).await {
            Ok(report) => {
                info!(upload_id = report.dataset_id, inserted = report.inserted_rows, "上传成功");
                UploadResponse::Success {
                    success: true,
                    message: format!(
                        "Successfully uploaded {} products. Saved to new table: {}",
                        report.inserted_rows, report.table_ref
                    ),
                    data: UploadSummary {
                        filename: report.filename,
                        total_rows: report.total_rows,
                        inserted_rows: report.inserted_rows,
                        upload_id: report.dataset_id,
                    },
                    status: 201,
                }
            }
            Err(failure) => failure_response(failure),
        }
    }

    /// 边界校验: 非空、大小上限、文件类型
    async fn check_boundary(&self, request: &UploadRequest) -> Result<(), ApiError> {
        if request.bytes.is_empty() {
            return Err(ApiError::InvalidInput("no file was uploaded".to_string()));
        }

        let max_bytes = self.config.get_max_upload_bytes().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取上传上限失败，使用默认值");
            DEFAULT_MAX_UPLOAD_BYTES
        });
        if request.bytes.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge { max_bytes });
        }

        let accept_csv = self.config.get_accept_csv().await.unwrap_or_else(|e| {
            warn!(error = %e, "读取 CSV 开关失败，使用默认值");
            true
        });

        let content_type = request
            .content_type
            .as_deref()
            .map(|c| c.split(';').next().unwrap_or(c).trim().to_lowercase());
        let ext = Path::new(&request.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        // 解析器按扩展名选择格式，扩展名优先于声明的 MIME
        let accepted = match ext.as_deref() {
            Some("xlsx") => true,
            Some("csv") => accept_csv,
            _ => match content_type.as_deref() {
                Some(XLSX_CONTENT_TYPE) => true,
                Some(CSV_CONTENT_TYPE) => accept_csv,
                _ => false,
            },
        };

        if accepted {
            Ok(())
        } else {
            Err(ApiError::UnsupportedMediaType(request.filename.clone()))
        }
    }
}

/// 导入失败 → 响应
fn failure_response(failure: ImportFailure) -> UploadResponse {
    if !failure.cleanup_errors.is_empty() {
        warn!(
            import_id = %failure.import_id,
            cleanup_errors = ?failure.cleanup_errors,
            "补偿清理存在错误，需要人工对账"
        );
    }

    match failure.error {
        ImportError::Validation(errors) => UploadResponse::ValidationFailed {
            success: false,
            message: "Validation failed. No data was saved.".to_string(),
            errors: errors.iter().map(ToString::to_string).collect(),
            status: 400,
        },
        ImportError::Schema { missing } => UploadResponse::Failed {
            success: false,
            message: format!("Required columns not found: {}", missing.join(", ")),
            error: NOTHING_SAVED.to_string(),
            expected: Some(REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect()),
            status: 400,
        },
        ImportError::EmptySheet => UploadResponse::failed(
            400,
            "Excel file is empty or has no data",
            NOTHING_SAVED,
        ),
        ImportError::UnsupportedFormat(ext) => UploadResponse::failed(
            400,
            "Only Excel (.xlsx) files are allowed",
            format!("unsupported format: {}", ext),
        ),
        ImportError::Parse(msg) => {
            UploadResponse::failed(400, "Failed to process the uploaded file", msg)
        }
        ImportError::DuplicateKey { code } => UploadResponse::failed(
            409,
            format!("Upload cancelled. Product code '{}' is duplicated.", code),
            NOTHING_SAVED,
        ),
        ImportError::Store(e) => UploadResponse::failed(
            500,
            "Upload cancelled. An error occurred while saving data.",
            e.to_string(),
        ),
    }
}
