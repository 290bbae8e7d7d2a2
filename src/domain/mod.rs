// ==========================================
// 库存批量导入 - 领域模型层
// ==========================================
// 职责: 定义数据集、商品行、导入状态机
// 红线: 不含数据访问逻辑
// ==========================================

pub mod dataset;
pub mod import;
pub mod product;

// 重导出核心类型
pub use dataset::{Dataset, TableRef, TABLE_PREFIX};
pub use import::{ImportReport, ImportState};
pub use product::{NewProduct, ProductPatch, ProductRow, RawRow, ValidationError};
