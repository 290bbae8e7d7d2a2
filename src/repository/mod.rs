// ==========================================
// 库存批量导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 值一律参数化；表名只允许 TableRef
// ==========================================

pub mod dataset_repo;
pub mod dataset_repo_impl;
pub mod error;

// 重导出核心仓储
pub use dataset_repo::DatasetStore;
pub use dataset_repo_impl::SqliteDatasetStore;
pub use error::{RepositoryError, RepositoryResult};
