//! Delivery tracker endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::http::StatusCode;
use backoffice::{
    CreateDelivery, DeliveryQuery, DeliveryView, ScheduleOutcome, ScheduleQuery, ScheduleRequest,
    StatusChange, ToScheduleItem,
};
use common::{Actor, DeliveryId};
use domain::{DeliveryStatus, TransitionRequest};
use serde::Serialize;
use store::Store;

use super::{AppStateRef, optional_body};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentActor};

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub created: u64,
}

/// GET /deliveries: runs the reconcile sweep, then lists trackers.
pub async fn list<S: Store>(
    state: AppStateRef<S>,
    CurrentActor(actor): CurrentActor,
    ApiQuery(query): ApiQuery<DeliveryQuery>,
) -> Result<Json<Vec<DeliveryView>>, ApiError> {
    Ok(Json(state.backoffice.list_deliveries(&query, &actor).await?))
}

/// POST /deliveries: opens a tracker for an order that has none.
#[tracing::instrument(skip_all, fields(order_id = %request.order_id))]
pub async fn create<S: Store>(
    state: AppStateRef<S>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<CreateDelivery>,
) -> Result<(StatusCode, Json<DeliveryView>), ApiError> {
    let view = state.backoffice.create_delivery(&request, &actor).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /deliveries/schedule
pub async fn schedule<S: Store>(
    state: AppStateRef<S>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> Result<Json<ScheduleOutcome>, ApiError> {
    Ok(Json(state.backoffice.schedule_order(&request, &actor).await?))
}

/// POST /deliveries/sync: opens trackers for open orders that lack one.
pub async fn sync<S: Store>(
    state: AppStateRef<S>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<SyncResponse>, ApiError> {
    let created = state.backoffice.reconcile_deliveries(&actor).await?;
    Ok(Json(SyncResponse { created }))
}

/// GET /deliveries/to-schedule
pub async fn to_schedule<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> Result<Json<Vec<ToScheduleItem>>, ApiError> {
    Ok(Json(state.backoffice.orders_to_schedule(&query).await?))
}

/// GET /deliveries/{id}/history
pub async fn history<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<DeliveryId>,
) -> Result<Json<DeliveryView>, ApiError> {
    Ok(Json(state.backoffice.delivery_history(id).await?))
}

/// POST /deliveries/{id}/status: `{statut, raison?, commentaire?, date_prevue?}`.
pub async fn status<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<DeliveryId>,
    CurrentActor(actor): CurrentActor,
    ApiJson(change): ApiJson<StatusChange>,
) -> Result<Json<DeliveryView>, ApiError> {
    Ok(Json(
        state
            .backoffice
            .change_delivery_status(id, &change, &actor)
            .await?,
    ))
}

async fn transition<S: Store>(
    state: AppStateRef<S>,
    id: DeliveryId,
    to: DeliveryStatus,
    actor: Actor,
    body: Bytes,
) -> Result<Json<DeliveryView>, ApiError> {
    let request: TransitionRequest = optional_body(&body)?;
    Ok(Json(
        state
            .backoffice
            .transition_delivery(id, to, &request, &actor)
            .await?,
    ))
}

/// POST /deliveries/{id}/en-livraison
pub async fn out_for_delivery<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<DeliveryId>,
    CurrentActor(actor): CurrentActor,
    body: Bytes,
) -> Result<Json<DeliveryView>, ApiError> {
    transition(state, id, DeliveryStatus::OutForDelivery, actor, body).await
}

/// POST /deliveries/{id}/livrer
pub async fn deliver<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<DeliveryId>,
    CurrentActor(actor): CurrentActor,
    body: Bytes,
) -> Result<Json<DeliveryView>, ApiError> {
    transition(state, id, DeliveryStatus::Delivered, actor, body).await
}

/// POST /deliveries/{id}/annuler
pub async fn cancel<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<DeliveryId>,
    CurrentActor(actor): CurrentActor,
    body: Bytes,
) -> Result<Json<DeliveryView>, ApiError> {
    transition(state, id, DeliveryStatus::Cancelled, actor, body).await
}

/// POST /deliveries/{id}/reporter
pub async fn postpone<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<DeliveryId>,
    CurrentActor(actor): CurrentActor,
    body: Bytes,
) -> Result<Json<DeliveryView>, ApiError> {
    transition(state, id, DeliveryStatus::Postponed, actor, body).await
}
