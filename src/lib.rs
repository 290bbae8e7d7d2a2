// ==========================================
// 库存批量导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 商品表格批量导入，一次导入 = 一个独立数据集
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/基础 schema）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域实体
pub use domain::{
    Dataset, ImportReport, ImportState, NewProduct, ProductPatch, ProductRow, RawRow, TableRef,
    ValidationError,
};

// 仓储
pub use repository::{DatasetStore, RepositoryError, SqliteDatasetStore};

// 导入
pub use importer::{ImportError, ImportFailure, ProductImporter};

// API
pub use api::{DatasetApi, ImportApi, UploadRequest, UploadResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "库存批量导入";
