//! Invoice endpoints.

use axum::Json;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use backoffice::InvoiceDocument;
use common::OrderId;
use serde::Deserialize;
use store::Store;

use super::AppStateRef;
use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery};

#[derive(Debug, Default, Deserialize)]
pub struct RenderQuery {
    #[serde(default)]
    pub download: Option<String>,
}

impl RenderQuery {
    fn as_attachment(&self) -> bool {
        matches!(self.download.as_deref(), Some("1" | "true"))
    }
}

/// GET /invoices/{order_id}: the rendered document; `?download=1` for an attachment.
#[tracing::instrument(skip_all, fields(order_id = %order_id))]
pub async fn render<S: Store>(
    state: AppStateRef<S>,
    ApiPath(order_id): ApiPath<OrderId>,
    ApiQuery(query): ApiQuery<RenderQuery>,
) -> Result<Response, ApiError> {
    let rendered = state
        .backoffice
        .render_invoice(order_id, state.renderer.as_ref())
        .await?;
    let disposition = format!(
        "{}; filename=\"{}\"",
        if query.as_attachment() { "attachment" } else { "inline" },
        rendered.filename
    );
    Ok((
        [
            (header::CONTENT_TYPE, rendered.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        rendered.bytes,
    )
        .into_response())
}

/// GET /invoices/{order_id}/details
pub async fn details<S: Store>(
    state: AppStateRef<S>,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Json<InvoiceDocument>, ApiError> {
    Ok(Json(state.backoffice.invoice_details(order_id).await?))
}
