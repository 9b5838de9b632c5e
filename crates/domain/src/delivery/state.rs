//! Delivery status and its transition table.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// The status of a delivery tracking record.
///
/// ```text
/// A_PREPARER ──► EN_LIVRAISON ──► LIVREE
///     │  │            │  ▲
///     │  └──► REPORTEE ◄┘ │
///     │          │  └─────┘
///     └──────────┴──────────► ANNULEE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeliveryStatus {
    #[default]
    #[serde(rename = "A_PREPARER")]
    ToPrepare,

    #[serde(rename = "EN_LIVRAISON")]
    OutForDelivery,

    /// Delivered (terminal state).
    #[serde(rename = "LIVREE")]
    Delivered,

    /// Cancelled (terminal state).
    #[serde(rename = "ANNULEE")]
    Cancelled,

    /// Postponed, can be sent out again.
    #[serde(rename = "REPORTEE")]
    Postponed,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 5] = [
        DeliveryStatus::ToPrepare,
        DeliveryStatus::OutForDelivery,
        DeliveryStatus::Delivered,
        DeliveryStatus::Cancelled,
        DeliveryStatus::Postponed,
    ];

    /// Returns true if this is a terminal state.
    pub fn is_finalized(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// States reachable from this one.
    pub fn allowed_targets(&self) -> &'static [DeliveryStatus] {
        use DeliveryStatus::*;
        match self {
            ToPrepare => &[OutForDelivery, Cancelled, Postponed],
            OutForDelivery => &[Delivered, Cancelled, Postponed],
            Postponed => &[OutForDelivery, Cancelled, Postponed],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, to: DeliveryStatus) -> bool {
        self.allowed_targets().contains(&to)
    }

    /// Checks a transition, reporting finalized records before table misses.
    pub fn check_transition(&self, to: DeliveryStatus) -> Result<(), DomainError> {
        if self.is_finalized() {
            return Err(DomainError::DeliveryFinalized { status: *self });
        }
        if !self.can_transition_to(to) {
            return Err(DomainError::IllegalTransition { from: *self, to });
        }
        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::ToPrepare => "A_PREPARER",
            DeliveryStatus::OutForDelivery => "EN_LIVRAISON",
            DeliveryStatus::Delivered => "LIVREE",
            DeliveryStatus::Cancelled => "ANNULEE",
            DeliveryStatus::Postponed => "REPORTEE",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::validation("statut", format!("unknown delivery status '{s}'"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_allow_nothing() {
        for to in DeliveryStatus::ALL {
            assert!(!DeliveryStatus::Delivered.can_transition_to(to));
            assert!(!DeliveryStatus::Cancelled.can_transition_to(to));
        }
    }

    #[test]
    fn test_finalized_is_reported_first() {
        let err = DeliveryStatus::Delivered
            .check_transition(DeliveryStatus::Postponed)
            .unwrap_err();
        assert_eq!(err.code(), "delivery_finalized");
    }

    #[test]
    fn test_cannot_skip_dispatch() {
        let err = DeliveryStatus::ToPrepare
            .check_transition(DeliveryStatus::Delivered)
            .unwrap_err();
        assert_eq!(err.code(), "illegal_transition");
    }

    #[test]
    fn test_postponed_can_go_out_again() {
        assert!(DeliveryStatus::Postponed.can_transition_to(DeliveryStatus::OutForDelivery));
        assert!(DeliveryStatus::Postponed.can_transition_to(DeliveryStatus::Postponed));
        assert!(!DeliveryStatus::Postponed.can_transition_to(DeliveryStatus::ToPrepare));
    }

    #[test]
    fn test_every_open_state_can_be_cancelled_or_postponed() {
        for from in DeliveryStatus::ALL.into_iter().filter(|s| !s.is_finalized()) {
            assert!(from.can_transition_to(DeliveryStatus::Cancelled));
            assert!(from.can_transition_to(DeliveryStatus::Postponed));
        }
    }

    #[test]
    fn test_parse_codes() {
        assert_eq!(
            "reportee".parse::<DeliveryStatus>().unwrap(),
            DeliveryStatus::Postponed
        );
        let err = "PERDUE".parse::<DeliveryStatus>().unwrap_err();
        assert_eq!(err.field(), Some("statut"));
    }
}
