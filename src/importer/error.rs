// ==========================================
// 库存批量导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 写入前错误（格式/解析/表头/空表/校验）无需清理；
//       写入后错误（重复编码/存储）需要补偿
// ==========================================

use crate::domain::ValidationError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件格式不支持: {0}（仅支持 .xlsx/.csv）")]
    UnsupportedFormat(String),

    #[error("文件解析失败: {0}")]
    Parse(String),

    #[error("缺少必需列: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("文件为空或没有数据行")]
    EmptySheet,

    // ===== 数据质量错误 =====
    #[error("数据校验失败: {} 条错误", .0.len())]
    Validation(Vec<ValidationError>),

    // ===== 写入阶段错误 =====
    #[error("商品编码重复: {code}")]
    DuplicateKey { code: String },

    #[error("存储失败: {0}")]
    Store(RepositoryError),
}

impl ImportError {
    /// 是否为写入前即可判定的客户端错误（无持久副作用）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImportError::UnsupportedFormat(_)
                | ImportError::Parse(_)
                | ImportError::Schema { .. }
                | ImportError::EmptySheet
                | ImportError::Validation(_)
        )
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateKey { code } => ImportError::DuplicateKey { code },
            other => ImportError::Store(other),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Parse(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Parse(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::Parse(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::Parse(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_duplicate_becomes_import_duplicate() {
        let err: ImportError = RepositoryError::DuplicateKey {
            code: "A1".to_string(),
        }
        .into();
        assert!(matches!(err, ImportError::DuplicateKey { ref code } if code == "A1"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_client_error_classes() {
        assert!(ImportError::EmptySheet.is_client_error());
        assert!(ImportError::Schema {
            missing: vec!["Price".to_string()]
        }
        .is_client_error());
        assert!(!ImportError::Store(RepositoryError::LockError("x".to_string())).is_client_error());
    }

    #[test]
    fn test_schema_display_lists_missing() {
        let err = ImportError::Schema {
            missing: vec!["Category".to_string(), "Stock".to_string()],
        };
        assert_eq!(err.to_string(), "缺少必需列: Category, Stock");
    }
}
