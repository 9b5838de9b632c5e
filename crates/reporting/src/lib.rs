//! Read-only dashboard reports.
//!
//! Every report loads a [`SalesSnapshot`] of the requested date range
//! (optionally one sales channel) in a single read transaction and
//! aggregates it in memory.

pub mod dashboard;
pub mod error;
pub mod range;
pub mod snapshot;

pub use dashboard::{
    ChannelSales, DayPoint, ModeTotal, OrdersByStatus, Overview, PaymentMix, Reporter,
    RevenueByDay, SalesByChannel, StatusCount, TopArticle, TopArticles,
};
pub use error::{ReportError, Result};
pub use range::{DEFAULT_TOP_LIMIT, DateRange, ReportQuery};
pub use snapshot::SalesSnapshot;
