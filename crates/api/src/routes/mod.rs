//! HTTP handlers, one module per resource.

pub mod catalog;
pub mod deliveries;
pub mod expenses;
pub mod health;
pub mod invoices;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod purchases;
pub mod reports;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::state::AppState;

/// Handler state extractor.
pub type AppStateRef<S> = State<Arc<AppState<S>>>;

/// Free-text search parameter.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// Parses a body that may be omitted entirely.
pub(crate) fn optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request("invalid_body", e.to_string()))
}

#[cfg(test)]
mod tests {
    use domain::TransitionRequest;

    use super::*;

    #[test]
    fn empty_body_is_the_default() {
        let request: TransitionRequest = optional_body(&Bytes::new()).unwrap();
        assert_eq!(request, TransitionRequest::default());
    }

    #[test]
    fn body_uses_the_request_aliases() {
        let body = Bytes::from_static(br#"{"raison": "client absent"}"#);
        let request: TransitionRequest = optional_body(&body).unwrap();
        assert_eq!(request.reason.as_deref(), Some("client absent"));
    }

    #[test]
    fn malformed_body_is_rejected() {
        let err = optional_body::<TransitionRequest>(&Bytes::from_static(b"{")).unwrap_err();
        assert_eq!(err.code(), "invalid_body");
    }
}
