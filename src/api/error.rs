// ==========================================
// 库存批量导入 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户可读的错误消息
// 约定: 错误消息面向调用方，使用英文
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    /// 商品编码冲突
    #[error("Product code '{0}' already exists in this dataset")]
    DuplicateCode(String),

    #[error("File is too large. Maximum {max_bytes} bytes.")]
    PayloadTooLarge { max_bytes: usize },

    #[error("Only Excel (.xlsx) files are allowed: {0}")]
    UnsupportedMediaType(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database unavailable: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_)
            | ApiError::PayloadTooLarge { .. }
            | ApiError::UnsupportedMediaType(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::DuplicateCode(_) => 409,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::InternalError(_) => 500,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} with id {} not found", entity, id))
            }
            RepositoryError::DuplicateKey { code } => ApiError::DuplicateCode(code),
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),

            // 数据库错误
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("lock poisoned: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::UniqueConstraintViolation(msg) => ApiError::DatabaseError(msg),

            // 目录数据异常
            RepositoryError::InvalidTableRef(name) => {
                ApiError::InternalError(format!("invalid table name in catalog: {}", name))
            }
            RepositoryError::TableRefAlreadySet { dataset_id } => ApiError::InternalError(format!(
                "dataset {} already has a backing table",
                dataset_id
            )),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
