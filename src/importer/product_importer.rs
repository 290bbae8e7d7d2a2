// ==========================================
// 库存批量导入 - 商品导入编排器
// ==========================================
// 流程: 解析 → 校验 → 登记目录 → 建表 → 批量插入
// 状态: Received → Parsed → Validated → CatalogRegistered → TableCreated → Committed
// 失败: 写库前失败 → Rejected（无副作用）
//       写库后失败 → 补偿清理（删表 + 删目录行）→ Aborted
// 红线: 补偿失败只记录日志，不覆盖原始错误
// ==========================================

use crate::domain::{ImportReport, ImportState, TableRef};
use crate::importer::error::ImportError;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{RowParser, RowValidator};
use crate::importer::row_validator::ProductRowValidator;
use crate::repository::DatasetStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

const DEFAULT_DISPLAY_NAME: &str = "Untitled upload";

// ==========================================
// ImportFailure - 导入失败结果
// ==========================================
#[derive(Debug, Error)]
#[error("导入失败 [{terminal}，失败于 {reached}]: {error}")]
pub struct ImportFailure {
    pub import_id: String,
    /// 失败发生时所处的状态
    pub reached: ImportState,
    /// 终止态（Rejected / Aborted）
    pub terminal: ImportState,
    #[source]
    pub error: ImportError,
    /// 补偿清理中出现的错误（仅供诊断）
    pub cleanup_errors: Vec<String>,
}

impl ImportFailure {
    pub fn is_client_error(&self) -> bool {
        self.error.is_client_error()
    }
}

// ==========================================
// CompensationPlan - 需要撤销的持久副作用
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompensationPlan {
    /// 已创建（或可能已创建）的物理表
    pub table: Option<TableRef>,
    /// 已创建的目录行
    pub dataset_id: Option<i64>,
}

impl CompensationPlan {
    pub fn is_empty(&self) -> bool {
        self.table.is_none() && self.dataset_id.is_none()
    }
}

// ==========================================
// ProductImporter - 导入编排器
// ==========================================
pub struct ProductImporter<S>
where
    S: DatasetStore,
{
    // 数据访问层
    store: Arc<S>,

    // 导入组件
    parser: Box<dyn RowParser>,
    validator: Box<dyn RowValidator>,
}

impl<S> ProductImporter<S>
where
    S: DatasetStore,
{
    /// 创建导入编排器
    ///
    /// # 参数
    /// - store: 数据集仓储
    /// - parser: 行解析器
    /// - validator: 行校验器
    pub fn new(store: Arc<S>, parser: Box<dyn RowParser>, validator: Box<dyn RowValidator>) -> Self {
        Self {
            store,
            parser,
            validator,
        }
    }

    /// 使用默认解析器/校验器
    ///
    /// # 参数
    /// - sheet_name: 读取的工作表，None 表示第一个
    pub fn with_defaults(store: Arc<S>, sheet_name: Option<String>) -> Self {
        Self::new(
            store,
            Box::new(UniversalFileParser::with_sheet_name(sheet_name)),
            Box::new(ProductRowValidator::new()),
        )
    }

    /// 执行一次导入
    ///
    /// # 参数
    /// - filename: 原始文件名（含扩展名）
    /// - bytes: 文件内容
    ///
    /// # 返回
    /// - Ok(ImportReport): 已提交
    /// - Err(ImportFailure): 已终止（Rejected / Aborted），持久状态与导入前一致
    #[instrument(skip(self, bytes), fields(import_id, size = bytes.len()))]
    pub async fn import(&self, filename: &str, bytes: &[u8]) -> Result<ImportReport, ImportFailure> {
        let start_time = Instant::now();
        let import_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("import_id", import_id.as_str());

        info!(filename, "开始导入商品数据");
        let mut state = ImportState::Received;

        // === 步骤 1: 解析文件 ===
        let rows = match self.parser.parse(filename, bytes) {
            Ok(rows) => rows,
            Err(e) => return Err(self.reject(&import_id, state, e)),
        };
        advance(&mut state, ImportState::Parsed);
        debug!(rows = rows.len(), "文件解析完成");

        // === 步骤 2: 整批校验 ===
        let products = match self.validator.validate(&rows) {
            Ok(products) => products,
            Err(errors) => {
                return Err(self.reject(&import_id, state, ImportError::Validation(errors)));
            }
        };
        advance(&mut state, ImportState::Validated);

        let total_rows = rows.len();
        let display_name = display_name_for(filename);
        let mut plan = CompensationPlan::default();

        // === 步骤 3: 登记目录（立即持久化）===
        let dataset = match self.store.create_dataset(&display_name, total_rows).await {
            Ok(dataset) => dataset,
            Err(e) => return Err(self.abort(&import_id, state, e.into(), &plan).await),
        };
        plan.dataset_id = Some(dataset.id);
        advance(&mut state, ImportState::CatalogRegistered);
        debug!(dataset_id = dataset.id, "目录行已登记");

        // === 步骤 4: 建表（独立提交）===
        let table = match self.store.create_backing_table(dataset.id).await {
            Ok(table) => table,
            Err(e) => {
                // 建表可能已生效但回写失败，按派生名一并清理
                plan.table = Some(TableRef::for_dataset(dataset.id));
                return Err(self.abort(&import_id, state, e.into(), &plan).await);
            }
        };
        plan.table = Some(table.clone());
        advance(&mut state, ImportState::TableCreated);

        // === 步骤 5: 批量插入（单一事务）===
        let inserted_rows = match self.store.insert_rows(&table, &products).await {
            Ok(count) => count,
            Err(e) => return Err(self.abort(&import_id, state, e.into(), &plan).await),
        };
        advance(&mut state, ImportState::Committed);

        let elapsed_ms = start_time.elapsed().as_millis();
        info!(
            dataset_id = dataset.id,
            table = %table,
            inserted_rows,
            elapsed_ms = elapsed_ms as u64,
            "导入完成"
        );

        Ok(ImportReport {
            import_id,
            dataset_id: dataset.id,
            display_name,
            filename: filename.to_string(),
            total_rows,
            inserted_rows,
            table_ref: table,
            state,
            elapsed_ms,
        })
    }

    /// 执行补偿清理（幂等）
    ///
    /// # 说明
    /// - 先删表，再删目录行；前一步失败不影响后一步
    /// - 返回清理过程中的错误描述，调用方只用于诊断
    pub async fn compensate(&self, plan: &CompensationPlan) -> Vec<String> {
        let mut cleanup_errors = Vec::new();

        if let Some(table) = &plan.table {
            if let Err(e) = self.store.drop_backing_table(table).await {
                error!(table = %table, error = %e, "补偿失败: 删除物理表");
                cleanup_errors.push(format!("drop table {}: {}", table, e));
            }
        }

        if let Some(dataset_id) = plan.dataset_id {
            if let Err(e) = self.store.remove_catalog_entry(dataset_id).await {
                error!(dataset_id, error = %e, "补偿失败: 删除目录行");
                cleanup_errors.push(format!("remove catalog entry {}: {}", dataset_id, e));
            }
        }

        cleanup_errors
    }

    fn reject(&self, import_id: &str, reached: ImportState, error: ImportError) -> ImportFailure {
        warn!(state = %reached, error = %error, "导入被拒绝（未写库）");

        ImportFailure {
            import_id: import_id.to_string(),
            reached,
            terminal: ImportState::Rejected,
            error,
            cleanup_errors: Vec::new(),
        }
    }

    async fn abort(
        &self,
        import_id: &str,
        reached: ImportState,
        error: ImportError,
        plan: &CompensationPlan,
    ) -> ImportFailure {
        error!(state = %reached, error = %error, "导入中止，执行补偿清理");

        let cleanup_errors = if reached.has_durable_effects() {
            let cleanup_errors = self.compensate(plan).await;
            if cleanup_errors.is_empty() {
                debug!("补偿清理完成");
            }
            cleanup_errors
        } else {
            debug!("尚未产生持久化副作用，跳过补偿");
            Vec::new()
        };

        ImportFailure {
            import_id: import_id.to_string(),
            reached,
            terminal: ImportState::Aborted,
            error,
            cleanup_errors,
        }
    }
}

/// 状态推进（仅允许转换表内的边）
fn advance(state: &mut ImportState, next: ImportState) {
    debug_assert!(
        state.can_transition_to(next),
        "非法状态转换: {} -> {}",
        state,
        next
    );
    debug!(from = %state, to = %next, "状态推进");
    *state = next;
}

/// 显示名：文件名去扩展名；没有主干时使用原文件名，仍为空白时使用默认名
fn display_name_for(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(filename.trim()).filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_DISPLAY_NAME)
        .to_string()
}
