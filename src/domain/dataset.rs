// ==========================================
// 库存批量导入 - 数据集领域模型
// ==========================================
// 用途: 一次成功导入 = 一个数据集（目录行 + 独立物理表）
// 红线: 物理表名只能由 TableRef 派生/校验后才允许拼入 DDL
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 物理表名前缀
pub const TABLE_PREFIX: &str = "products_upload_";

// ==========================================
// TableRef - 数据集物理表引用
// ==========================================
// 允许的格式: ^products_upload_[0-9]+$
// 目录里读出来的表名同样要经过 parse，不把目录数据当作可信输入
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableRef(String);

impl TableRef {
    /// 由数据集 ID 派生表名（仅 DatasetStore 内部使用）
    pub(crate) fn for_dataset(dataset_id: i64) -> Self {
        Self(format!("{}{}", TABLE_PREFIX, dataset_id))
    }

    /// 校验外部来源的表名
    pub fn parse(raw: &str) -> Option<Self> {
        let suffix = raw.strip_prefix(TABLE_PREFIX)?;
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TableRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TableRef::parse(&value).ok_or_else(|| format!("invalid table name: {}", value))
    }
}

impl From<TableRef> for String {
    fn from(value: TableRef) -> Self {
        value.0
    }
}

// ==========================================
// Dataset - 数据集目录行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    /// 显示名（默认为源文件名去扩展名，可重命名）
    pub display_name: String,
    /// 物理表引用；导入第一阶段完成前为空，设置后不可变
    pub table_ref: Option<TableRef>,
    /// 创建时的行数
    pub total_rows: i64,
    pub created_at: DateTime<Utc>,
}
