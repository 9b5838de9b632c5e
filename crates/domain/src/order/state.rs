//! Order status.

use serde::{Deserialize, Serialize};

use crate::DomainError;
use crate::delivery::DeliveryStatus;

/// The status of an order in its lifecycle.
///
/// Only the delivery tracker moves an order out of `EN_ATTENTE`:
/// ```text
/// EN_ATTENTE ──► EN_LIVRAISON ──► LIVREE
///     │   ▲           │
///     │   └─(report)──┤
///     └───────────────┴──► ANNULEE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Awaiting delivery.
    #[default]
    #[serde(rename = "EN_ATTENTE")]
    Pending,

    #[serde(rename = "EN_LIVRAISON")]
    InDelivery,

    /// Delivered (terminal state).
    #[serde(rename = "LIVREE")]
    Delivered,

    /// Cancelled (terminal state).
    #[serde(rename = "ANNULEE")]
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::InDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns true if this is a terminal state.
    pub fn is_finalized(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Returns true if a payment can be recorded in this state.
    pub fn can_be_paid(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }

    /// Status the order takes after its delivery moves to `delivery`.
    ///
    /// `None` means the order keeps its current status.
    pub fn after_delivery(&self, delivery: DeliveryStatus) -> Option<OrderStatus> {
        match delivery {
            DeliveryStatus::OutForDelivery => Some(OrderStatus::InDelivery),
            DeliveryStatus::Delivered => Some(OrderStatus::Delivered),
            DeliveryStatus::Cancelled => Some(OrderStatus::Cancelled),
            DeliveryStatus::Postponed if *self == OrderStatus::InDelivery => {
                Some(OrderStatus::Pending)
            }
            DeliveryStatus::Postponed | DeliveryStatus::ToPrepare => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "EN_ATTENTE",
            OrderStatus::InDelivery => "EN_LIVRAISON",
            OrderStatus::Delivered => "LIVREE",
            OrderStatus::Cancelled => "ANNULEE",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation("statut", format!("unknown order status '{s}'")))
    }
}
