// ==========================================
// 库存批量导入 - 导入层
// ==========================================
// 职责: 上传文件 → 数据集（目录行 + 物理表）
// 支持: Excel (.xlsx), CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod error;
pub mod file_parser;
pub mod importer_trait;
pub mod product_importer;
pub mod row_validator;

// 重导出核心类型
pub use data_cleaner::{DataCleaner as DataCleanerImpl, WholeNumber};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser, REQUIRED_COLUMNS};
pub use product_importer::{CompensationPlan, ImportFailure, ProductImporter};
pub use row_validator::ProductRowValidator;

// 重导出 Trait 接口
pub use importer_trait::{DataCleaner, FileParser, NumericCell, RowParser, RowValidator};
