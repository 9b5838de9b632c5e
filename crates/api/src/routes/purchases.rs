//! Purchase ledger endpoints.

use axum::Json;
use axum::http::StatusCode;
use backoffice::{NewPurchase, PurchaseView, UpdatePurchase};
use common::PurchaseId;
use store::Store;

use super::AppStateRef;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, CurrentActor};

/// GET /purchases
pub async fn list<S: Store>(state: AppStateRef<S>) -> Result<Json<Vec<PurchaseView>>, ApiError> {
    Ok(Json(state.backoffice.list_purchases().await?))
}

/// POST /purchases: credits stock for every line.
#[tracing::instrument(skip_all)]
pub async fn create<S: Store>(
    state: AppStateRef<S>,
    CurrentActor(actor): CurrentActor,
    ApiJson(input): ApiJson<NewPurchase>,
) -> Result<(StatusCode, Json<PurchaseView>), ApiError> {
    let purchase = state.backoffice.create_purchase(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// GET /purchases/{id}
pub async fn get<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<PurchaseId>,
) -> Result<Json<PurchaseView>, ApiError> {
    Ok(Json(state.backoffice.get_purchase(id).await?))
}

/// PUT or PATCH /purchases/{id}: a new line set replaces the old one.
#[tracing::instrument(skip_all, fields(purchase_id = %id))]
pub async fn update<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<PurchaseId>,
    ApiJson(input): ApiJson<UpdatePurchase>,
) -> Result<Json<PurchaseView>, ApiError> {
    Ok(Json(state.backoffice.update_purchase(id, input).await?))
}

/// DELETE /purchases/{id}: stock credited by the lines is taken back.
#[tracing::instrument(skip_all, fields(purchase_id = %id))]
pub async fn delete<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<PurchaseId>,
) -> Result<StatusCode, ApiError> {
    state.backoffice.delete_purchase(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
