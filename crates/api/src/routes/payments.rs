//! Payment endpoints.

use axum::Json;
use axum::body::Bytes;
use backoffice::{
    CancelPaymentRequest, Paginated, PayRequest, PaymentListItem, PaymentOutcome, PaymentQuery,
};
use common::OrderId;
use domain::Payment;
use store::Store;

use super::{AppStateRef, optional_body};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentActor};

/// GET /payments: orders with their payment state.
pub async fn list<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<PaymentQuery>,
) -> Result<Json<Paginated<PaymentListItem>>, ApiError> {
    Ok(Json(state.backoffice.list_payments(&query).await?))
}

/// GET /payments/{order_id}: the payment record, `null` when none exists.
pub async fn get<S: Store>(
    state: AppStateRef<S>,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Json<Option<Payment>>, ApiError> {
    Ok(Json(state.backoffice.payment_for_order(order_id).await?))
}

/// POST /payments/{order_id}/pay
#[tracing::instrument(skip_all, fields(order_id = %order_id, mode = %request.mode))]
pub async fn pay<S: Store>(
    state: AppStateRef<S>,
    ApiPath(order_id): ApiPath<OrderId>,
    CurrentActor(actor): CurrentActor,
    ApiJson(request): ApiJson<PayRequest>,
) -> Result<Json<PaymentOutcome>, ApiError> {
    Ok(Json(state.backoffice.pay(order_id, &request, &actor).await?))
}

/// POST /payments/{order_id}/cancel: the body is optional.
#[tracing::instrument(skip_all, fields(order_id = %order_id))]
pub async fn cancel<S: Store>(
    state: AppStateRef<S>,
    ApiPath(order_id): ApiPath<OrderId>,
    CurrentActor(actor): CurrentActor,
    body: Bytes,
) -> Result<Json<PaymentOutcome>, ApiError> {
    let request: CancelPaymentRequest = optional_body(&body)?;
    Ok(Json(
        state
            .backoffice
            .cancel_payment(order_id, &request, &actor)
            .await?,
    ))
}
