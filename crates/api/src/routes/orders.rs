//! Order endpoints.

use axum::Json;
use axum::http::StatusCode;
use backoffice::{CreateOrder, LastLocation, OrderDetail, OrderQuery, Paginated, UpdateOrder};
use common::{ClientId, OrderId};
use serde::Deserialize;
use store::Store;

use super::AppStateRef;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentActor};

#[derive(Debug, Deserialize)]
pub struct LastLocationQuery {
    pub client_id: ClientId,
}

/// POST /orders: create an order with its lines, invoice and stock debits.
#[tracing::instrument(skip_all)]
pub async fn create<S: Store>(
    state: AppStateRef<S>,
    CurrentActor(actor): CurrentActor,
    ApiJson(input): ApiJson<CreateOrder>,
) -> Result<(StatusCode, Json<OrderDetail>), ApiError> {
    let order = state.backoffice.create_order(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: filtered, paginated order list.
pub async fn list<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Json<Paginated<OrderDetail>>, ApiError> {
    Ok(Json(state.backoffice.list_orders(&query).await?))
}

/// GET /orders/{id}
pub async fn get<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<OrderDetail>, ApiError> {
    Ok(Json(state.backoffice.get_order(id).await?))
}

/// PUT or PATCH /orders/{id}: partial update; a sent `statut` is ignored.
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn update<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(input): ApiJson<UpdateOrder>,
) -> Result<Json<OrderDetail>, ApiError> {
    Ok(Json(state.backoffice.update_order(id, input).await?))
}

/// DELETE /orders/{id}: stock of every line is returned.
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn delete<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<StatusCode, ApiError> {
    state.backoffice.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /orders/client-last-location?client_id=
pub async fn last_location<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<LastLocationQuery>,
) -> Result<Json<Option<LastLocation>>, ApiError> {
    Ok(Json(state.backoffice.last_location(query.client_id).await?))
}
