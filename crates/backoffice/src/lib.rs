//! Application services of the back-office.
//!
//! [`Backoffice`] runs every mutation in one store transaction and keeps the
//! cross-entity rules together: stock follows order and purchase lines,
//! orders follow their delivery, and every order has exactly one invoice.

pub mod catalog;
pub mod deliveries;
pub mod error;
pub mod expenses;
pub mod inventory;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod purchases;
pub mod service;
pub mod views;

pub use catalog::{
    ClientInput, FeePreview, LocationFee, LocationInput, NewArticle, NewClient, NewLocation,
    NewPage,
};
pub use deliveries::{
    CreateDelivery, DeliveryQuery, DeliveryView, ScheduleOutcome, ScheduleQuery,
    ScheduleRequest, StatusChange, ToScheduleItem,
};
pub use error::{Result, ServiceError};
pub use expenses::{
    ChargeQuery, ChargeStats, NewCharge, NewChargeCategory, UpdateCharge,
};
pub use invoices::{InvoiceDocument, InvoiceRenderer, RenderedInvoice, TextInvoiceRenderer};
pub use orders::{CreateOrder, LastLocation, OrderQuery, UpdateOrder};
pub use payments::{CancelPaymentRequest, PayRequest, PaymentListItem, PaymentOutcome, PaymentQuery};
pub use purchases::{NewPurchase, PurchaseView, UpdatePurchase};
pub use service::{Backoffice, DEFAULT_RECONCILE_BATCH};
pub use views::{OrderDetail, PageRequest, Paginated};
