//! Shared types for the back-office crates.

pub mod actor;
pub mod clock;
pub mod serde_helpers;
pub mod types;

pub use actor::Actor;
pub use clock::{Clock, FixedClock, SharedClock, SystemClock, business_offset};
pub use types::{
    ArticleId, ChargeCategoryId, ChargeId, ClientId, ConfigurationId, DeliveryEventId,
    DeliveryId, FeeId, InvoiceId, LocationId, OrderId, OrderLineId, PageId, PaymentId,
    PurchaseId, PurchaseLineId, UserId,
};
