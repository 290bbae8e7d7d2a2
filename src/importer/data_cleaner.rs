// ==========================================
// 库存批量导入 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 数值解析
// ==========================================

use crate::importer::importer_trait::{DataCleaner as DataCleanerTrait, NumericCell};

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    fn normalize_null(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn parse_number(&self, value: Option<&str>) -> NumericCell {
        let Some(text) = self.normalize_null(value) else {
            return NumericCell::Blank;
        };

        // inf / NaN 不是合法数值
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => NumericCell::Number(v),
            _ => NumericCell::Invalid,
        }
    }
}

/// 整数转换结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WholeNumber {
    Value(i64),
    Fractional,
    OutOfRange,
}

impl DataCleaner {
    /// 数值转整数（库存）
    ///
    /// i64::MAX as f64 恰为 2^63，已不可表示，故用 >= 判断越界
    pub fn to_whole_number(&self, value: f64) -> WholeNumber {
        if value.fract() != 0.0 {
            WholeNumber::Fractional
        } else if value.abs() >= i64::MAX as f64 {
            WholeNumber::OutOfRange
        } else {
            WholeNumber::Value(value as i64)
        }
    }
}
