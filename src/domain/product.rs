// ==========================================
// 库存批量导入 - 商品领域模型
// ==========================================
// 用途: 导入管道中间产物 + 数据集商品表的行模型
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// RawRow - 导入中间结构体
// ==========================================
// 生命周期: 仅在导入流程内，不落库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// 原始表格行号（1 起算，表头为第 1 行）
    pub row_number: usize,
    /// 列名 → 单元格文本（空单元格不出现）
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            fields: HashMap::new(),
        }
    }

    /// 读取字段原值（未 TRIM）
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// 构造辅助（测试与 CSV 解析使用）
    pub fn with_field(mut self, field: &str, value: &str) -> Self {
        self.fields.insert(field.to_string(), value.to_string());
        self
    }
}

// ==========================================
// NewProduct - 已通过校验、待写入的商品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,             // 商品编码（表内唯一，自然键）
    pub name: String,             // 商品名称
    pub category: Option<String>, // 分类（可空）
    pub price: f64,               // 单价（>= 0）
    pub stock: i64,               // 库存（>= 0）
}

// ==========================================
// ProductRow - 数据集商品表中的一行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: i64, // 表内自增 ID
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub price: f64,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// ProductPatch - 行级部分更新
// ==========================================
// category 使用 Option<Option<_>>：外层 None 表示不修改，Some(None) 表示清空
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
}

/// 字段出现即为 Some，显式 null 为 Some(None)；缺省由 serde(default) 给出 None
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.stock.is_none()
    }
}

// ==========================================
// ValidationError - 行级校验错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row: usize,
    pub message: String,
}

impl ValidationError {
    pub fn new(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row, self.message)
    }
}
