//! Domain error types.

use thiserror::Error;

use crate::delivery::DeliveryStatus;
use crate::order::OrderStatus;

/// Errors raised by the business rules.
///
/// Every variant maps to a stable machine code through [`DomainError::code`].
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or missing input on a named field.
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("cannot pay a cancelled order")]
    OrderCancelled,

    #[error("order already paid")]
    AlreadyPaid,

    #[error("cannot cancel a completed payment")]
    PaymentCompleted,

    #[error("payment already cancelled")]
    PaymentCancelled,

    /// The delivery is LIVREE or ANNULEE.
    #[error("delivery already finalized ({status})")]
    DeliveryFinalized { status: DeliveryStatus },

    #[error("illegal delivery transition from {from} to {to}")]
    IllegalTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    /// The order is LIVREE or ANNULEE.
    #[error("order already finalized ({status})")]
    OrderFinalized { status: OrderStatus },

    /// An amount does not fit the whole-unit range.
    #[error("amount {amount} is out of range")]
    AmountOutOfRange { amount: rust_decimal::Decimal },

    /// Event metadata could not be converted to JSON.
    #[error("metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable reason.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "validation_error",
            DomainError::OrderCancelled => "order_cancelled",
            DomainError::AlreadyPaid => "already_paid",
            DomainError::PaymentCompleted => "payment_completed",
            DomainError::PaymentCancelled => "payment_cancelled",
            DomainError::DeliveryFinalized { .. } => "delivery_finalized",
            DomainError::IllegalTransition { .. } => "illegal_transition",
            DomainError::OrderFinalized { .. } => "order_finalized",
            DomainError::AmountOutOfRange { .. } => "amount_out_of_range",
            DomainError::Metadata(_) => "metadata_error",
        }
    }

    /// Field the error refers to, for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            DomainError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// True for errors caused by the input rather than the current state.
    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_exposes_field() {
        let err = DomainError::validation("reference", "required for mobile money");
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.field(), Some("reference"));
        assert_eq!(err.to_string(), "reference: required for mobile money");
    }

    #[test]
    fn conflict_errors_have_no_field() {
        let err = DomainError::DeliveryFinalized {
            status: DeliveryStatus::Delivered,
        };
        assert_eq!(err.code(), "delivery_finalized");
        assert_eq!(err.field(), None);
        assert!(err.to_string().contains("finalized"));
    }
}
