//! Expense categories and expenses.

use axum::Json;
use axum::http::StatusCode;
use backoffice::{ChargeQuery, ChargeStats, NewCharge, NewChargeCategory, UpdateCharge};
use common::ChargeId;
use domain::{Charge, ChargeCategory};
use serde::Deserialize;
use store::Store;

use super::AppStateRef;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentActor};

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    #[serde(default)]
    pub actif: Option<bool>,
}

/// GET /charge-categories?actif=true
pub async fn list_categories<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> Result<Json<Vec<ChargeCategory>>, ApiError> {
    let active_only = query.actif.unwrap_or(false);
    Ok(Json(state.backoffice.list_charge_categories(active_only).await?))
}

/// POST /charge-categories
pub async fn create_category<S: Store>(
    state: AppStateRef<S>,
    ApiJson(input): ApiJson<NewChargeCategory>,
) -> Result<(StatusCode, Json<ChargeCategory>), ApiError> {
    let category = state.backoffice.create_charge_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /charges?date_from=&date_to=&categorie=&statut=&q=
pub async fn list<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ChargeQuery>,
) -> Result<Json<Vec<Charge>>, ApiError> {
    Ok(Json(state.backoffice.list_charges(&query).await?))
}

/// GET /charges/stats: same filters as the list.
pub async fn stats<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ChargeQuery>,
) -> Result<Json<ChargeStats>, ApiError> {
    Ok(Json(state.backoffice.charge_stats(&query).await?))
}

/// POST /charges
#[tracing::instrument(skip_all)]
pub async fn create<S: Store>(
    state: AppStateRef<S>,
    CurrentActor(actor): CurrentActor,
    ApiJson(input): ApiJson<NewCharge>,
) -> Result<(StatusCode, Json<Charge>), ApiError> {
    let charge = state.backoffice.create_charge(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(charge)))
}

/// GET /charges/{id}
pub async fn get<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<ChargeId>,
) -> Result<Json<Charge>, ApiError> {
    Ok(Json(state.backoffice.get_charge(id).await?))
}

/// PUT or PATCH /charges/{id}
pub async fn update<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<ChargeId>,
    ApiJson(input): ApiJson<UpdateCharge>,
) -> Result<Json<Charge>, ApiError> {
    Ok(Json(state.backoffice.update_charge(id, input).await?))
}

/// DELETE /charges/{id}
pub async fn delete<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<ChargeId>,
) -> Result<StatusCode, ApiError> {
    state.backoffice.delete_charge(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
