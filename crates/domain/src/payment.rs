//! Payment ledger rules.

use chrono::{DateTime, Utc};
use common::{Actor, OrderId, PaymentId, UserId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, OrderStatus};

/// Status of the payment record of an order.
///
/// ```text
/// EN_ATTENTE ──► PAYEE
///     └────────► ANNULEE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "EN_ATTENTE")]
    Pending,

    #[serde(rename = "PAYEE")]
    Paid,

    #[serde(rename = "ANNULEE")]
    Cancelled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [
        PaymentStatus::Pending,
        PaymentStatus::Paid,
        PaymentStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "EN_ATTENTE",
            PaymentStatus::Paid => "PAYEE",
            PaymentStatus::Cancelled => "ANNULEE",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::validation("paiement_statut", format!("unknown payment status '{s}'"))
            })
    }
}

/// How the money was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMode {
    #[serde(rename = "CASH", alias = "ESPECE")]
    Cash,
    #[serde(rename = "MVOLA")]
    Mvola,
    #[serde(rename = "ORANGE_MONEY")]
    OrangeMoney,
    #[serde(rename = "CARD", alias = "VISA")]
    Card,
    #[serde(rename = "AUTRE")]
    Other,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 5] = [
        PaymentMode::Cash,
        PaymentMode::Mvola,
        PaymentMode::OrangeMoney,
        PaymentMode::Card,
        PaymentMode::Other,
    ];

    /// Mobile-money payments must carry a transaction reference.
    pub fn requires_reference(&self) -> bool {
        matches!(self, PaymentMode::Mvola | PaymentMode::OrangeMoney)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "CASH",
            PaymentMode::Mvola => "MVOLA",
            PaymentMode::OrangeMoney => "ORANGE_MONEY",
            PaymentMode::Card => "CARD",
            PaymentMode::Other => "AUTRE",
        }
    }
}

impl std::fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        match code.as_str() {
            "ESPECE" => Ok(PaymentMode::Cash),
            "VISA" => Ok(PaymentMode::Card),
            _ => PaymentMode::ALL
                .into_iter()
                .find(|mode| mode.as_str() == code)
                .ok_or_else(|| DomainError::validation("mode", format!("unknown payment mode '{s}'"))),
        }
    }
}

/// Returns the trimmed reference, rejecting a blank one for mobile money.
pub fn validate_reference(mode: PaymentMode, reference: Option<&str>) -> Result<String, DomainError> {
    let reference = reference.map(str::trim).unwrap_or_default();
    if mode.requires_reference() && reference.is_empty() {
        return Err(DomainError::validation(
            "reference",
            format!("a transaction reference is required for {mode}"),
        ));
    }
    Ok(reference.to_string())
}

/// Payment record of an order, created on the first payment action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    #[serde(rename = "commande")]
    pub order_id: OrderId,
    #[serde(rename = "statut")]
    pub status: PaymentStatus,
    pub mode: Option<PaymentMode>,
    pub reference: String,
    #[serde(rename = "encaisse_par")]
    pub collected_by: Option<UserId>,
    #[serde(rename = "encaisse_le")]
    pub collected_at: Option<DateTime<Utc>>,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(order_id: OrderId, now: DateTime<Utc>) -> Self {
        Self {
            id: PaymentId::new(),
            order_id,
            status: PaymentStatus::Pending,
            mode: None,
            reference: String::new(),
            collected_by: None,
            collected_at: None,
            note: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Records the collection of the order amount.
    pub fn pay(
        &mut self,
        order_status: OrderStatus,
        mode: PaymentMode,
        reference: Option<&str>,
        note: Option<&str>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let reference = validate_reference(mode, reference)?;
        if !order_status.can_be_paid() {
            return Err(DomainError::OrderCancelled);
        }
        match self.status {
            PaymentStatus::Paid => return Err(DomainError::AlreadyPaid),
            PaymentStatus::Cancelled => return Err(DomainError::PaymentCancelled),
            PaymentStatus::Pending => {}
        }

        self.status = PaymentStatus::Paid;
        self.mode = Some(mode);
        self.reference = reference;
        if let Some(note) = note {
            self.note = note.trim().to_string();
        }
        self.collected_by = actor.recorded();
        self.collected_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Cancels a pending payment.
    pub fn cancel(
        &mut self,
        note: Option<&str>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        match self.status {
            PaymentStatus::Paid => return Err(DomainError::PaymentCompleted),
            PaymentStatus::Cancelled => return Err(DomainError::PaymentCancelled),
            PaymentStatus::Pending => {}
        }

        self.status = PaymentStatus::Cancelled;
        if let Some(note) = note {
            self.note = note.trim().to_string();
        }
        self.collected_by = actor.recorded();
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cashier() -> Actor {
        Actor::user(UserId::new(3))
    }

    #[test]
    fn pay_pending_payment() {
        let now = Utc::now();
        let mut payment = Payment::pending(OrderId::new(), now);
        payment
            .pay(OrderStatus::Pending, PaymentMode::Cash, None, Some("comptant"), &cashier(), now)
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.mode, Some(PaymentMode::Cash));
        assert_eq!(payment.collected_by, Some(UserId::new(3)));
        assert_eq!(payment.collected_at, Some(now));
        assert_eq!(payment.note, "comptant");
    }

    #[test]
    fn second_payment_is_rejected_and_keeps_first() {
        let first = Utc::now();
        let mut payment = Payment::pending(OrderId::new(), first);
        payment
            .pay(OrderStatus::Pending, PaymentMode::Mvola, Some("MV-1"), None, &cashier(), first)
            .unwrap();

        let err = payment
            .pay(
                OrderStatus::Pending,
                PaymentMode::Card,
                Some("X"),
                None,
                &cashier(),
                first + chrono::Duration::minutes(5),
            )
            .unwrap_err();

        assert_eq!(err.code(), "already_paid");
        assert_eq!(payment.mode, Some(PaymentMode::Mvola));
        assert_eq!(payment.reference, "MV-1");
        assert_eq!(payment.collected_at, Some(first));
    }

    #[test]
    fn cancelled_order_cannot_be_paid() {
        let mut payment = Payment::pending(OrderId::new(), Utc::now());
        let err = payment
            .pay(OrderStatus::Cancelled, PaymentMode::Cash, None, None, &cashier(), Utc::now())
            .unwrap_err();
        assert_eq!(err.code(), "order_cancelled");
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[test]
    fn mobile_money_requires_reference() {
        let mut payment = Payment::pending(OrderId::new(), Utc::now());
        let err = payment
            .pay(
                OrderStatus::Pending,
                PaymentMode::OrangeMoney,
                Some("  "),
                None,
                &cashier(),
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.field(), Some("reference"));
        assert!(validate_reference(PaymentMode::Cash, None).is_ok());
    }

    #[test]
    fn completed_payment_cannot_be_cancelled() {
        let now = Utc::now();
        let mut payment = Payment::pending(OrderId::new(), now);
        payment
            .pay(OrderStatus::Pending, PaymentMode::Cash, None, None, &cashier(), now)
            .unwrap();
        assert_eq!(
            payment.cancel(None, &cashier(), now).unwrap_err().code(),
            "payment_completed"
        );
        assert_eq!(payment.status, PaymentStatus::Paid);
    }

    #[test]
    fn cancel_is_terminal() {
        let now = Utc::now();
        let mut payment = Payment::pending(OrderId::new(), now);
        payment.cancel(Some("client absent"), &Actor::anonymous(), now).unwrap();
        assert_eq!(payment.status, PaymentStatus::Cancelled);
        assert_eq!(payment.collected_by, None);
        assert_eq!(payment.note, "client absent");

        let err = payment
            .pay(OrderStatus::Pending, PaymentMode::Cash, None, None, &cashier(), now)
            .unwrap_err();
        assert_eq!(err.code(), "payment_cancelled");
    }

    #[test]
    fn mode_aliases() {
        let mode: PaymentMode = serde_json::from_str("\"ESPECE\"").unwrap();
        assert_eq!(mode, PaymentMode::Cash);
        assert_eq!("visa".parse::<PaymentMode>().unwrap(), PaymentMode::Card);
        assert_eq!(serde_json::to_string(&PaymentMode::OrangeMoney).unwrap(), "\"ORANGE_MONEY\"");
    }
}
