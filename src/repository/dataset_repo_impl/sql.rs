// ==========================================
// 数据集仓储 - SQL 语句与行映射
// ==========================================
// 红线: 所有拼接进 SQL 的表名都必须是 TableRef
// ==========================================

use crate::domain::{Dataset, ProductRow, TableRef};
use rusqlite::types::Type;
use rusqlite::Row;

pub(super) const SELECT_DATASET: &str =
    "SELECT id, filename, table_name, total_rows, created_at FROM uploads";

/// 物理商品表 DDL
pub(super) fn create_product_table_sql(table: &TableRef) -> String {
    format!(
        r#"
        CREATE TABLE {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_code TEXT NOT NULL,
            product_name TEXT NOT NULL,
            category TEXT,
            price REAL NOT NULL DEFAULT 0 CHECK (price >= 0),
            stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CONSTRAINT uq_{table}_product_code UNIQUE (product_code)
        )
        "#,
        table = table
    )
}

pub(super) fn drop_product_table_sql(table: &TableRef) -> String {
    format!("DROP TABLE IF EXISTS {}", table)
}

pub(super) fn insert_product_sql(table: &TableRef) -> String {
    format!(
        "INSERT INTO {} (product_code, product_name, category, price, stock, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        table
    )
}

pub(super) fn select_products_sql(table: &TableRef) -> String {
    format!(
        "SELECT id, product_code, product_name, category, price, stock, created_at, updated_at FROM {}",
        table
    )
}

/// uploads 行 → Dataset
///
/// table_name 读出后再次按白名单校验，不信任目录数据
pub(super) fn map_dataset(row: &Row) -> rusqlite::Result<Dataset> {
    let table_name: Option<String> = row.get(2)?;
    let table_ref = match table_name {
        Some(name) => Some(TableRef::parse(&name).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("invalid table name in catalog: {}", name).into(),
            )
        })?),
        None => None,
    };

    Ok(Dataset {
        id: row.get(0)?,
        display_name: row.get(1)?,
        table_ref,
        total_rows: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(super) fn map_product_row(row: &Row) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        price: row.get(4)?,
        stock: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
