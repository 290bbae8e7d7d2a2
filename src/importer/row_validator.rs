// ==========================================
// 库存批量导入 - 行校验器
// ==========================================
// 职责: 原始行 → 待写入商品；整批穷举校验
// 红线: 结果要么是全部商品，要么是全部错误，不混合
// 顺序: 按行号，行内按 Code → Name → Price → Stock
// ==========================================

use crate::domain::{NewProduct, RawRow, ValidationError};
use crate::importer::data_cleaner::{DataCleaner, WholeNumber};
use crate::importer::file_parser::columns;
use crate::importer::importer_trait::{
    DataCleaner as DataCleanerTrait, NumericCell, RowValidator,
};
use tracing::debug;

pub struct ProductRowValidator {
    cleaner: DataCleaner,
}

impl ProductRowValidator {
    pub fn new() -> Self {
        Self {
            cleaner: DataCleaner,
        }
    }

    /// 必填文本：TRIM 后非空
    fn required_text(
        &self,
        row: &RawRow,
        field: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<String> {
        let value = self.cleaner.normalize_null(row.get(field));
        if value.is_none() {
            errors.push(ValidationError::new(
                row.row_number,
                format!("{} must not be empty", field),
            ));
        }
        value
    }

    /// 非负数值，缺失视为 0
    fn non_negative(
        &self,
        row: &RawRow,
        field: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<f64> {
        match self.cleaner.parse_number(row.get(field)) {
            NumericCell::Blank => Some(0.0),
            NumericCell::Number(v) if v < 0.0 => {
                errors.push(ValidationError::new(
                    row.row_number,
                    format!("{} must not be negative", field),
                ));
                None
            }
            NumericCell::Number(v) => Some(v),
            NumericCell::Invalid => {
                errors.push(ValidationError::new(
                    row.row_number,
                    format!("{} must be numeric", field),
                ));
                None
            }
        }
    }

    fn validate_row(&self, row: &RawRow, errors: &mut Vec<ValidationError>) -> Option<NewProduct> {
        let code = self.required_text(row, columns::CODE, errors);
        let name = self.required_text(row, columns::NAME, errors);
        let price = self.non_negative(row, columns::PRICE, errors);

        let stock = self
            .non_negative(row, columns::STOCK, errors)
            .and_then(|v| {
                let message = match self.cleaner.to_whole_number(v) {
                    WholeNumber::Value(n) => return Some(n),
                    WholeNumber::Fractional => format!("{} must be a whole number", columns::STOCK),
                    WholeNumber::OutOfRange => format!("{} is too large", columns::STOCK),
                };
                errors.push(ValidationError::new(row.row_number, message));
                None
            });

        let category = self.cleaner.normalize_null(row.get(columns::CATEGORY));

        Some(NewProduct {
            code: code?,
            name: name?,
            category,
            price: price?,
            stock: stock?,
        })
    }
}

impl Default for ProductRowValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RowValidator for ProductRowValidator {
    fn validate(&self, rows: &[RawRow]) -> Result<Vec<NewProduct>, Vec<ValidationError>> {
        let mut products = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();

        for row in rows {
            if let Some(product) = self.validate_row(row, &mut errors) {
                products.push(product);
            }
        }

        if errors.is_empty() {
            debug!(count = products.len(), "整批校验通过");
            Ok(products)
        } else {
            debug!(error_count = errors.len(), "整批校验失败");
            Err(errors)
        }
    }
}
