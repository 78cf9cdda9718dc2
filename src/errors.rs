use sea_orm::error::DbErr;
use sea_orm::TransactionError;
use uuid::Uuid;

/// Unified error type returned by every service operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment error: {0}")]
    PaymentError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        }
    }
}

impl ServiceError {
    /// True for failures callers should surface as bad input rather than
    /// infrastructure trouble.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::ValidationError(_)
                | Self::InsufficientStock(_)
                | Self::InvalidOperation(_)
                | Self::Forbidden(_)
                | Self::Conflict(_)
                | Self::PaymentError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_flagged() {
        assert!(ServiceError::NotFound("order".into()).is_client_error());
        assert!(ServiceError::InsufficientStock("p1".into()).is_client_error());
        assert!(!ServiceError::InternalError("boom".into()).is_client_error());
    }

    #[test]
    fn transaction_errors_unwrap_to_inner_service_error() {
        let err: ServiceError =
            TransactionError::Transaction(ServiceError::ValidationError("bad".into())).into();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
