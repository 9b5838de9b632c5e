//! HTTP API server with observability for the back-office.
//!
//! Exposes orders, payments, deliveries, invoices, purchases, expenses and
//! the dashboard as JSON endpoints, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use state::AppState;

use routes::{catalog, deliveries, expenses, health, invoices, metrics, orders, payments, purchases, reports};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(health::check))
        // Orders
        .route("/orders", post(orders::create::<S>).get(orders::list::<S>))
        .route("/orders/client-last-location", get(orders::last_location::<S>))
        .route(
            "/orders/{id}",
            get(orders::get::<S>)
                .put(orders::update::<S>)
                .patch(orders::update::<S>)
                .delete(orders::delete::<S>),
        )
        // Payments
        .route("/payments", get(payments::list::<S>))
        .route("/payments/{order_id}", get(payments::get::<S>))
        .route("/payments/{order_id}/pay", post(payments::pay::<S>))
        .route("/payments/{order_id}/cancel", post(payments::cancel::<S>))
        // Deliveries
        .route("/deliveries", get(deliveries::list::<S>).post(deliveries::create::<S>))
        .route("/deliveries/schedule", post(deliveries::schedule::<S>))
        .route("/deliveries/sync", post(deliveries::sync::<S>))
        .route("/deliveries/to-schedule", get(deliveries::to_schedule::<S>))
        .route("/deliveries/{id}/history", get(deliveries::history::<S>))
        .route("/deliveries/{id}/status", post(deliveries::status::<S>))
        .route("/deliveries/{id}/en-livraison", post(deliveries::out_for_delivery::<S>))
        .route("/deliveries/{id}/livrer", post(deliveries::deliver::<S>))
        .route("/deliveries/{id}/annuler", post(deliveries::cancel::<S>))
        .route("/deliveries/{id}/reporter", post(deliveries::postpone::<S>))
        // Invoices
        .route("/invoices/{order_id}", get(invoices::render::<S>))
        .route("/invoices/{order_id}/details", get(invoices::details::<S>))
        // Reports
        .route("/reports/overview", get(reports::overview::<S>))
        .route("/reports/revenue-by-day", get(reports::revenue_by_day::<S>))
        .route("/reports/orders-by-status", get(reports::orders_by_status::<S>))
        .route("/reports/top-articles", get(reports::top_articles::<S>))
        .route("/reports/payment-mix", get(reports::payment_mix::<S>))
        .route("/reports/sales-by-channel", get(reports::sales_by_channel::<S>))
        // Catalog
        .route("/articles", get(catalog::list_articles::<S>).post(catalog::create_article::<S>))
        .route(
            "/articles/{id}",
            get(catalog::get_article::<S>).delete(catalog::delete_article::<S>),
        )
        .route("/clients", get(catalog::list_clients::<S>).post(catalog::create_client::<S>))
        .route(
            "/locations",
            get(catalog::list_locations::<S>).post(catalog::create_location::<S>),
        )
        .route("/locations/{id}/fee", get(catalog::location_fee::<S>))
        .route("/fees/preview", post(catalog::preview_fee::<S>))
        .route("/pages", get(catalog::list_pages::<S>).post(catalog::create_page::<S>))
        // Purchases
        .route("/purchases", get(purchases::list::<S>).post(purchases::create::<S>))
        .route(
            "/purchases/{id}",
            get(purchases::get::<S>)
                .put(purchases::update::<S>)
                .patch(purchases::update::<S>)
                .delete(purchases::delete::<S>),
        )
        // Expenses
        .route(
            "/charge-categories",
            get(expenses::list_categories::<S>).post(expenses::create_category::<S>),
        )
        .route("/charges", get(expenses::list::<S>).post(expenses::create::<S>))
        .route("/charges/stats", get(expenses::stats::<S>))
        .route(
            "/charges/{id}",
            get(expenses::get::<S>)
                .put(expenses::update::<S>)
                .patch(expenses::update::<S>)
                .delete(expenses::delete::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
