// ==========================================
// 库存批量导入 - 数据集 Repository 实现
// ==========================================
// 职责: 实现数据集目录与物理表的数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 并发: 所有操作共享一个 Mutex<Connection>，目录的
//       create/rename/delete 因此按连接串行，同一 id 的删除与重命名不会交错
// ==========================================

mod sql;

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::{Dataset, NewProduct, ProductPatch, ProductRow, TableRef, TABLE_PREFIX};
use crate::repository::dataset_repo::DatasetStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

// ==========================================
// SqliteDatasetStore
// ==========================================
pub struct SqliteDatasetStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatasetStore {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与 ConfigManager 等共享连接）
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA 并初始化 schema（均幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中批量插入商品
    ///
    /// 唯一约束冲突映射为 DuplicateKey（带出冲突的编码）
    fn insert_rows_tx(
        tx: &Transaction,
        table: &TableRef,
        products: &[NewProduct],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(&sql::insert_product_sql(table))?;
        let now = Utc::now();

        let mut count = 0;
        for product in products {
            stmt.execute(params![
                product.code,
                product.name,
                product.category,
                product.price,
                product.stock,
                now,
                now,
            ])
            .map_err(|e| map_unique_violation(e, &product.code))?;
            count += 1;
        }

        Ok(count)
    }

    fn query_row_by_id(
        conn: &Connection,
        table: &TableRef,
        row_id: i64,
    ) -> RepositoryResult<Option<ProductRow>> {
        let query = format!("{} WHERE id = ?1", sql::select_products_sql(table));
        let row = conn
            .query_row(&query, [row_id], sql::map_product_row)
            .optional()?;
        Ok(row)
    }

    fn query_dataset_by_id(conn: &Connection, dataset_id: i64) -> RepositoryResult<Option<Dataset>> {
        let query = format!("{} WHERE id = ?1", sql::SELECT_DATASET);
        let dataset = conn
            .query_row(&query, [dataset_id], sql::map_dataset)
            .optional()?;
        Ok(dataset)
    }
}

/// 唯一约束冲突 → DuplicateKey，其它错误走通用转换
fn map_unique_violation(err: rusqlite::Error, code: &str) -> RepositoryError {
    match RepositoryError::from(err) {
        RepositoryError::UniqueConstraintViolation(_) => RepositoryError::DuplicateKey {
            code: code.to_string(),
        },
        other => other,
    }
}

fn require_non_blank(field: &str, value: &str) -> RepositoryResult<()> {
    if value.trim().is_empty() {
        return Err(RepositoryError::ValidationError(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(())
}

#[async_trait]
impl DatasetStore for SqliteDatasetStore {
    async fn create_dataset(
        &self,
        display_name: &str,
        total_rows: usize,
    ) -> RepositoryResult<Dataset> {
        require_non_blank("display name", display_name)?;

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO uploads (filename, total_rows, created_at) VALUES (?1, ?2, ?3)",
            params![display_name, total_rows as i64, Utc::now()],
        )?;
        let dataset_id = conn.last_insert_rowid();

        let dataset = Self::query_dataset_by_id(&conn, dataset_id)?
            .ok_or_else(|| RepositoryError::not_found("Dataset", dataset_id))?;

        debug!(dataset_id, display_name, "目录行已创建");
        Ok(dataset)
    }

    async fn create_backing_table(&self, dataset_id: i64) -> RepositoryResult<TableRef> {
        let conn = self.get_conn()?;

        let existing: Option<Option<String>> = conn
            .query_row(
                "SELECT table_name FROM uploads WHERE id = ?1",
                [dataset_id],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => return Err(RepositoryError::not_found("Dataset", dataset_id)),
            Some(Some(_)) => return Err(RepositoryError::TableRefAlreadySet { dataset_id }),
            Some(None) => {}
        }

        let table = TableRef::for_dataset(dataset_id);

        // 建表与回写 table_name 一起提交；提交后即为持久副作用
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(&sql::create_product_table_sql(&table))?;
        tx.execute(
            "UPDATE uploads SET table_name = ?1 WHERE id = ?2",
            params![table.as_str(), dataset_id],
        )?;
        tx.commit()?;

        debug!(dataset_id, table = %table, "物理表已创建");
        Ok(table)
    }

    async fn insert_rows(
        &self,
        table: &TableRef,
        products: &[NewProduct],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // 出错时 tx 被 drop，自动回滚
        let count = Self::insert_rows_tx(&tx, table, products)?;

        tx.commit()?;
        debug!(table = %table, count, "批量插入已提交");
        Ok(count)
    }

    async fn rename_dataset(&self, dataset_id: i64, new_name: &str) -> RepositoryResult<Dataset> {
        require_non_blank("display name", new_name)?;

        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE uploads SET filename = ?1 WHERE id = ?2",
            params![new_name.trim(), dataset_id],
        )?;

        if affected == 0 {
            return Err(RepositoryError::not_found("Dataset", dataset_id));
        }

        Self::query_dataset_by_id(&conn, dataset_id)?
            .ok_or_else(|| RepositoryError::not_found("Dataset", dataset_id))
    }

    async fn delete_dataset(&self, dataset_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let existing: Option<Option<String>> = tx
            .query_row(
                "SELECT table_name FROM uploads WHERE id = ?1",
                [dataset_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(table_name) = existing else {
            debug!(dataset_id, "数据集不存在，删除视为已完成");
            return Ok(false);
        };

        if let Some(name) = table_name {
            let table = TableRef::parse(&name).ok_or(RepositoryError::InvalidTableRef(name))?;
            tx.execute_batch(&sql::drop_product_table_sql(&table))?;
        }

        tx.execute("DELETE FROM uploads WHERE id = ?1", [dataset_id])?;
        tx.commit()?;

        info!(dataset_id, "数据集已删除");
        Ok(true)
    }

    async fn list_datasets(&self) -> RepositoryResult<Vec<Dataset>> {
        let conn = self.get_conn()?;
        let query = format!("{} ORDER BY created_at DESC, id DESC", sql::SELECT_DATASET);
        let mut stmt = conn.prepare(&query)?;

        let datasets = stmt
            .query_map([], sql::map_dataset)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(datasets)
    }

    async fn get_dataset(&self, dataset_id: i64) -> RepositoryResult<Option<Dataset>> {
        let conn = self.get_conn()?;
        Self::query_dataset_by_id(&conn, dataset_id)
    }

    async fn drop_backing_table(&self, table: &TableRef) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(&sql::drop_product_table_sql(table))?;
        debug!(table = %table, "物理表已删除（IF EXISTS）");
        Ok(())
    }

    async fn remove_catalog_entry(&self, dataset_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM uploads WHERE id = ?1", [dataset_id])?;
        Ok(affected > 0)
    }

    async fn list_rows(&self, table: &TableRef) -> RepositoryResult<Vec<ProductRow>> {
        let conn = self.get_conn()?;
        let query = format!("{} ORDER BY id DESC", sql::select_products_sql(table));
        let mut stmt = conn.prepare(&query)?;

        let rows = stmt
            .query_map([], sql::map_product_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn get_row(&self, table: &TableRef, row_id: i64) -> RepositoryResult<Option<ProductRow>> {
        let conn = self.get_conn()?;
        Self::query_row_by_id(&conn, table, row_id)
    }

    async fn insert_row(
        &self,
        table: &TableRef,
        product: &NewProduct,
    ) -> RepositoryResult<ProductRow> {
        require_non_blank("product_code", &product.code)?;
        require_non_blank("product_name", &product.name)?;

        let conn = self.get_conn()?;
        let now = Utc::now();
        conn.execute(
            &sql::insert_product_sql(table),
            params![
                product.code,
                product.name,
                product.category,
                product.price,
                product.stock,
                now,
                now,
            ],
        )
        .map_err(|e| map_unique_violation(e, &product.code))?;

        let row_id = conn.last_insert_rowid();
        Self::query_row_by_id(&conn, table, row_id)?
            .ok_or_else(|| RepositoryError::not_found("Product", row_id))
    }

    async fn update_row(
        &self,
        table: &TableRef,
        row_id: i64,
        patch: &ProductPatch,
    ) -> RepositoryResult<ProductRow> {
        if patch.is_empty() {
            return Err(RepositoryError::ValidationError(
                "no fields to update".to_string(),
            ));
        }

        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(code) = &patch.code {
            require_non_blank("product_code", code)?;
            assignments.push("product_code = ?");
            values.push(Value::Text(code.trim().to_string()));
        }
        if let Some(name) = &patch.name {
            require_non_blank("product_name", name)?;
            assignments.push("product_name = ?");
            values.push(Value::Text(name.trim().to_string()));
        }
        if let Some(category) = &patch.category {
            assignments.push("category = ?");
            values.push(match category {
                Some(c) if !c.trim().is_empty() => Value::Text(c.trim().to_string()),
                _ => Value::Null,
            });
        }
        if let Some(price) = patch.price {
            if !price.is_finite() || price < 0.0 {
                return Err(RepositoryError::ValidationError(
                    "price must be a non-negative number".to_string(),
                ));
            }
            assignments.push("price = ?");
            values.push(Value::Real(price));
        }
        if let Some(stock) = patch.stock {
            if stock < 0 {
                return Err(RepositoryError::ValidationError(
                    "stock must not be negative".to_string(),
                ));
            }
            assignments.push("stock = ?");
            values.push(Value::Integer(stock));
        }

        assignments.push("updated_at = ?");
        values.push(Value::Text(Utc::now().to_rfc3339()));
        values.push(Value::Integer(row_id));

        let conn = self.get_conn()?;
        if Self::query_row_by_id(&conn, table, row_id)?.is_none() {
            return Err(RepositoryError::not_found("Product", row_id));
        }

        let update = format!(
            "UPDATE {} SET {} WHERE id = ?",
            table,
            assignments.join(", ")
        );
        conn.execute(&update, params_from_iter(values.iter()))
            .map_err(|e| map_unique_violation(e, patch.code.as_deref().unwrap_or_default()))?;

        Self::query_row_by_id(&conn, table, row_id)?
            .ok_or_else(|| RepositoryError::not_found("Product", row_id))
    }

    async fn delete_row(&self, table: &TableRef, row_id: i64) -> RepositoryResult<ProductRow> {
        let conn = self.get_conn()?;
        let existing = Self::query_row_by_id(&conn, table, row_id)?
            .ok_or_else(|| RepositoryError::not_found("Product", row_id))?;

        conn.execute(&format!("DELETE FROM {} WHERE id = ?1", table), [row_id])?;
        Ok(existing)
    }

    async fn count_rows(&self, table: &TableRef) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn table_exists(&self, table: &TableRef) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table.as_str()],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    async fn find_orphan_tables(&self) -> RepositoryResult<Vec<TableRef>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
              AND substr(name, 1, ?1) = ?2
              AND name NOT IN (SELECT table_name FROM uploads WHERE table_name IS NOT NULL)
            ORDER BY name
            "#,
        )?;

        let names = stmt
            .query_map(params![TABLE_PREFIX.len() as i64, TABLE_PREFIX], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // 前缀相同但格式不合法的表不属于本系统，跳过
        Ok(names.iter().filter_map(|n| TableRef::parse(n)).collect())
    }

    async fn sweep_orphan_tables(&self) -> RepositoryResult<Vec<TableRef>> {
        let orphans = self.find_orphan_tables().await?;

        for table in &orphans {
            warn!(table = %table, "删除孤儿物理表");
            self.drop_backing_table(table).await?;
        }

        Ok(orphans)
    }
}
