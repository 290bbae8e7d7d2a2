// ==========================================
// 库存批量导入 - 导入管道 Trait 定义
// ==========================================
// 职责: 定义解析/清洗/校验的接口
// 红线: 解析与校验均为纯函数，不触碰存储
// ==========================================

use crate::domain::{NewProduct, RawRow, ValidationError};
use crate::importer::error::ImportResult;

// ==========================================
// RowParser Trait
// ==========================================
// 用途: 文件字节 → 原始行（含表头校验）
// 实现者: UniversalFileParser
pub trait RowParser: Send + Sync {
    /// 解析上传文件
    ///
    /// # 参数
    /// - filename: 原始文件名（用于判断格式）
    /// - bytes: 文件内容
    ///
    /// # 返回
    /// - Ok(Vec<RawRow>): 非空的数据行，行号为表格中的真实行号
    /// - Err(Schema / EmptySheet / Parse / UnsupportedFormat)
    fn parse(&self, filename: &str, bytes: &[u8]) -> ImportResult<Vec<RawRow>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 单一格式的字节解析
// 实现者: ExcelParser, CsvParser
pub trait FileParser: Send + Sync {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Vec<RawRow>>;
}

// ==========================================
// RowValidator Trait
// ==========================================
// 用途: 整批校验，要么全部通过，要么返回全部错误
// 实现者: ProductRowValidator
pub trait RowValidator: Send + Sync {
    fn validate(&self, rows: &[RawRow]) -> Result<Vec<NewProduct>, Vec<ValidationError>>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格文本清洗与数值解析
// 实现者: DataCleaner
pub trait DataCleaner: Send + Sync {
    /// TRIM 文本
    fn clean_text(&self, value: &str) -> String;

    /// 空串/纯空白 → None
    fn normalize_null(&self, value: Option<&str>) -> Option<String>;

    /// 解析数值单元格
    fn parse_number(&self, value: Option<&str>) -> NumericCell;
}

/// 数值单元格解析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericCell {
    /// 缺失或空白
    Blank,
    /// 有限数值
    Number(f64),
    /// 存在但不是数字
    Invalid,
}
