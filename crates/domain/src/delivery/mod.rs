//! Delivery tracker rules.

pub mod metadata;
mod model;
mod state;

pub use model::{Delivery, DeliveryEvent, TransitionRequest};
pub use state::DeliveryStatus;
