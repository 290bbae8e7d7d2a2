// ==========================================
// 库存批量导入 - API 层
// ==========================================
// 职责: 上传边界与数据集管理接口，供 CLI / HTTP 层调用
// ==========================================

pub mod dataset_api;
pub mod error;
pub mod import_api;

// 重导出核心类型
pub use dataset_api::{ApiResponse, DatasetApi, DeleteOutcome, NewProductRequest, SweepOutcome};
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, UploadRequest, UploadResponse, UploadSummary, XLSX_CONTENT_TYPE};
