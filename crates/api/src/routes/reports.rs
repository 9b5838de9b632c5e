//! Dashboard endpoints. Every report takes `date_from`, `date_to` and `channel`.

use axum::Json;
use reporting::{
    OrdersByStatus, Overview, PaymentMix, ReportQuery, RevenueByDay, SalesByChannel, TopArticles,
};
use store::Store;

use super::AppStateRef;
use crate::error::ApiError;
use crate::extract::ApiQuery;

/// GET /reports/overview
pub async fn overview<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<Overview>, ApiError> {
    Ok(Json(state.reporter.overview(&query).await?))
}

/// GET /reports/revenue-by-day
pub async fn revenue_by_day<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<RevenueByDay>, ApiError> {
    Ok(Json(state.reporter.revenue_by_day(&query).await?))
}

/// GET /reports/orders-by-status
pub async fn orders_by_status<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<OrdersByStatus>, ApiError> {
    Ok(Json(state.reporter.orders_by_status(&query).await?))
}

/// GET /reports/top-articles: `limit` defaults to 10.
pub async fn top_articles<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<TopArticles>, ApiError> {
    Ok(Json(state.reporter.top_articles(&query).await?))
}

/// GET /reports/payment-mix
pub async fn payment_mix<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<PaymentMix>, ApiError> {
    Ok(Json(state.reporter.payment_mix(&query).await?))
}

/// GET /reports/sales-by-channel
pub async fn sales_by_channel<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> Result<Json<SalesByChannel>, ApiError> {
    Ok(Json(state.reporter.sales_by_channel(&query).await?))
}
