// ==========================================
// 库存批量导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::{configure_sqlite_connection, init_schema};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 配置键
pub mod config_keys {
    pub const MAX_UPLOAD_BYTES: &str = "import.max_upload_bytes";
    pub const ACCEPT_CSV: &str = "import.accept_csv";
    pub const SHEET_NAME: &str = "import.sheet_name";
}

/// 默认上传上限: 5 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
            init_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?)
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_upload_bytes(&self) -> ConfigResult<usize> {
        let value = self.get_config_or_default(
            config_keys::MAX_UPLOAD_BYTES,
            &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
        )?;

        match value.trim().parse::<usize>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                warn!(
                    config_key = config_keys::MAX_UPLOAD_BYTES,
                    raw_value = %value,
                    "上传上限配置格式错误，使用默认值"
                );
                Ok(DEFAULT_MAX_UPLOAD_BYTES)
            }
        }
    }

    async fn get_accept_csv(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::ACCEPT_CSV, "true")?;
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Ok(true), // 默认接受
        }
    }

    async fn get_sheet_name(&self) -> ConfigResult<Option<String>> {
        Ok(self
            .get_config_value(config_keys::SHEET_NAME)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults() {
        let manager = setup_manager();

        assert_eq!(manager.get_max_upload_bytes().await.unwrap(), 5_242_880);
        assert!(manager.get_accept_csv().await.unwrap());
        assert_eq!(manager.get_sheet_name().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_config_value_overrides() {
        let manager = setup_manager();

        manager
            .set_config_value(config_keys::MAX_UPLOAD_BYTES, "1024")
            .unwrap();
        manager.set_config_value(config_keys::ACCEPT_CSV, "false").unwrap();
        manager
            .set_config_value(config_keys::SHEET_NAME, " Products ")
            .unwrap();
        // 再次写入覆盖
        manager
            .set_config_value(config_keys::MAX_UPLOAD_BYTES, "2048")
            .unwrap();

        assert_eq!(manager.get_max_upload_bytes().await.unwrap(), 2048);
        assert!(!manager.get_accept_csv().await.unwrap());
        assert_eq!(
            manager.get_sheet_name().await.unwrap(),
            Some("Products".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_limit_falls_back_to_default() {
        let manager = setup_manager();
        manager
            .set_config_value(config_keys::MAX_UPLOAD_BYTES, "lots")
            .unwrap();

        assert_eq!(
            manager.get_max_upload_bytes().await.unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
    }
}
