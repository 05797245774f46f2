//! Application Error Types
//!
//! Infrastructure-facing error type returned by message repositories.

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_message() {
        assert_eq!(
            AppError::Internal("Duplicate message id 7".into()).to_string(),
            "Internal error: Duplicate message id 7"
        );
    }

    #[test]
    fn test_sqlx_error_converts() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Database(_)));
    }
}
