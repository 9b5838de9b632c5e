//! Business rules of the back-office.
//!
//! Everything here is pure: no I/O, no clock reads. Callers pass the current
//! instant and actor in, and persist the returned records.

pub mod catalog;
pub mod delivery;
pub mod error;
pub mod expense;
pub mod fees;
pub mod invoice;
pub mod money;
pub mod order;
pub mod payment;
pub mod purchase;

pub use catalog::{
    Article, ChannelConfig, ChannelConfiguration, Client, ClientSnapshot, Location, Page,
    StockChange, required_text,
};
pub use delivery::{Delivery, DeliveryEvent, DeliveryStatus, TransitionRequest};
pub use error::DomainError;
pub use expense::{Charge, ChargeCategory, ChargeStatus};
pub use fees::{FeeQuote, FeeSnapshot, LocationCategory, compute_fee, final_fee};
pub use invoice::{Invoice, InvoiceKind};
pub use money::Money;
pub use order::{LineRequest, Order, OrderLine, OrderStatus, OrderTotals, validate_lines};
pub use payment::{Payment, PaymentMode, PaymentStatus};
pub use purchase::{Purchase, PurchaseLine, PurchaseLineRequest, purchase_total};
