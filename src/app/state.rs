// ==========================================
// 库存批量导入 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use crate::api::{DatasetApi, ImportApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version};
use crate::repository::SqliteDatasetStore;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 应用状态
///
/// 所有组件共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 打开时读取到的 schema 版本
    pub schema_version: Option<i64>,

    /// 数据集仓储
    pub store: Arc<SqliteDatasetStore>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 上传API
    pub import_api: Arc<ImportApi<SqliteDatasetStore, ConfigManager>>,

    /// 数据集管理API
    pub dataset_api: Arc<DatasetApi<SqliteDatasetStore>>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;
        let schema_version = read_schema_version(&conn)
            .map_err(|e| format!("无法读取 schema 版本: {}", e))?;
        tracing::info!(schema_version = ?schema_version, "数据库 schema 就绪");
        let conn = Arc::new(Mutex::new(conn));

        let store = Arc::new(
            SqliteDatasetStore::from_connection(conn.clone())
                .map_err(|e| format!("无法创建SqliteDatasetStore: {}", e))?,
        );
        let config = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let import_api = Arc::new(ImportApi::new(store.clone(), config.clone()));
        let dataset_api = Arc::new(DatasetApi::new(store.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            schema_version,
            store,
            config,
            import_api,
            dataset_api,
        })
    }
}

/// 获取默认数据库路径
///
/// # 顺序
/// 1. 环境变量 INVENTORY_IMPORT_DB_PATH
/// 2. 用户数据目录下的 inventory-import/inventory_import.db
/// 3. ./inventory_import.db
pub fn get_default_db_path() -> String {
    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("INVENTORY_IMPORT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./inventory_import.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("inventory-import");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("inventory_import.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CURRENT_SCHEMA_VERSION;
    use tempfile::TempDir;

    #[test]
    fn test_app_state_shares_one_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert_eq!(state.schema_version, Some(CURRENT_SCHEMA_VERSION));

        // 重复打开同一文件（schema 初始化幂等）
        assert!(AppState::new(db_path).is_ok());
    }
}
