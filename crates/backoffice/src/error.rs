//! Service error types.

use std::fmt::Display;

use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors returned by the application services.
///
/// Any error aborts the surrounding transaction; nothing is committed.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A one-per-order record already exists.
    #[error("{entity} already exists for order {order_id}")]
    AlreadyExists {
        entity: &'static str,
        order_id: String,
    },

    /// The store failed or rejected a write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A document could not be rendered.
    #[error("render error: {0}")]
    Render(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Domain(err) => err.code(),
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::AlreadyExists { .. } => "already_exists",
            ServiceError::Store(err) => err.code(),
            ServiceError::Render(_) => "render_error",
        }
    }

    /// Offending input field, for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            ServiceError::Domain(err) => err.field(),
            _ => None,
        }
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_come_from_the_source_error() {
        let err = ServiceError::from(DomainError::AlreadyPaid);
        assert_eq!(err.code(), "already_paid");

        let err = ServiceError::not_found("order", "42");
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_string(), "order 42 not found");

        let err = ServiceError::from(StoreError::unique("articles_reference_key"));
        assert_eq!(err.code(), "duplicate");
    }

    #[test]
    fn field_is_exposed_for_validation_errors() {
        let err = ServiceError::from(DomainError::validation("reference", "required"));
        assert_eq!(err.field(), Some("reference"));
        assert_eq!(ServiceError::not_found("article", "x").field(), None);
    }
}
