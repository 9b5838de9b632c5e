//! API error types with HTTP response mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use backoffice::ServiceError;
use domain::DomainError;
use reporting::ReportError;
use serde::Serialize;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// A back-office service rejected the request.
    Service(ServiceError),
    /// A report could not be computed.
    Report(ReportError),
    /// The request itself could not be read.
    BadRequest {
        code: &'static str,
        message: String,
        field: Option<String>,
    },
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub field: Option<String>,
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code: "validation_error",
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(err) => service_status(err),
            ApiError::Report(ReportError::InvalidRange { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Report(ReportError::Store(err)) => store_status(err),
            ApiError::Report(ReportError::Amount(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Service(err) => err.code(),
            ApiError::Report(err) => err.code(),
            ApiError::BadRequest { code, .. } => *code,
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, field) = match self {
            ApiError::Service(err) => (err.to_string(), err.field().map(str::to_string)),
            ApiError::Report(err) => (err.to_string(), err.field().map(str::to_string)),
            ApiError::BadRequest { message, field, .. } => (message.clone(), field.clone()),
        };
        ErrorBody {
            error: message,
            code: self.code(),
            field,
        }
    }
}

fn service_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Domain(err) => domain_status(err),
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::AlreadyExists { .. } => StatusCode::CONFLICT,
        ServiceError::Store(err) => store_status(err),
        ServiceError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
        DomainError::OrderCancelled
        | DomainError::AlreadyPaid
        | DomainError::PaymentCompleted
        | DomainError::PaymentCancelled
        | DomainError::DeliveryFinalized { .. }
        | DomainError::IllegalTransition { .. }
        | DomainError::OrderFinalized { .. } => StatusCode::CONFLICT,
        DomainError::AmountOutOfRange { .. } => StatusCode::BAD_REQUEST,
        DomainError::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::UniqueViolation { .. } | StoreError::Referenced { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            tracing::error!(error = %body.error, code = body.code, "internal server error");
        } else {
            tracing::debug!(error = %body.error, code = body.code, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::Report(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request("invalid_body", rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request("invalid_path", rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request("invalid_query", rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use domain::DeliveryStatus;

    use super::*;

    #[test]
    fn validation_errors_are_bad_requests_with_a_field() {
        let err = ApiError::from(DomainError::validation("reference", "required"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = err.body();
        assert_eq!(body.code, "validation_error");
        assert_eq!(body.field.as_deref(), Some("reference"));
    }

    #[test]
    fn illegal_state_changes_are_conflicts() {
        let err = ApiError::from(DomainError::DeliveryFinalized {
            status: DeliveryStatus::Delivered,
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "delivery_finalized");
        assert_eq!(ApiError::from(DomainError::AlreadyPaid).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_records_are_not_found() {
        let err = ApiError::from(ServiceError::not_found("order", "42"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body().error, "order 42 not found");
    }

    #[test]
    fn store_constraints_are_conflicts() {
        let duplicate = ApiError::from(ServiceError::from(StoreError::unique("articles_reference_key")));
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
        let referenced = ApiError::from(ServiceError::from(StoreError::Referenced {
            entity: "article",
            id: "x".to_string(),
        }));
        assert_eq!(referenced.status(), StatusCode::CONFLICT);
        assert_eq!(referenced.code(), "referenced");
    }

    #[test]
    fn storage_failures_are_internal() {
        let err = ApiError::from(ServiceError::from(StoreError::Corrupt("bad row".to_string())));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
