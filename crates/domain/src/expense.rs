//! Expense ledger records.

use chrono::{DateTime, NaiveDate, Utc};
use common::{ChargeCategoryId, ChargeId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, Money, PaymentMode};

/// Expense category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeCategory {
    pub id: ChargeCategoryId,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "actif")]
    pub active: bool,
    #[serde(rename = "ordre")]
    pub position: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChargeStatus {
    #[serde(rename = "BROUILLON")]
    Draft,
    #[default]
    #[serde(rename = "PAYEE")]
    Paid,
    #[serde(rename = "ANNULEE")]
    Cancelled,
}

impl ChargeStatus {
    pub const ALL: [ChargeStatus; 3] = [ChargeStatus::Draft, ChargeStatus::Paid, ChargeStatus::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Draft => "BROUILLON",
            ChargeStatus::Paid => "PAYEE",
            ChargeStatus::Cancelled => "ANNULEE",
        }
    }
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChargeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChargeStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation("statut", format!("unknown charge status '{s}'")))
    }
}

/// A business expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    pub date_charge: NaiveDate,
    #[serde(rename = "categorie")]
    pub category_id: ChargeCategoryId,
    #[serde(rename = "libelle")]
    pub label: String,
    pub description: String,
    #[serde(rename = "montant")]
    pub amount: Money,
    #[serde(rename = "statut")]
    pub status: ChargeStatus,
    #[serde(rename = "mode_paiement")]
    pub payment_mode: PaymentMode,
    #[serde(rename = "commande")]
    pub order_id: Option<OrderId>,
    #[serde(rename = "cree_par")]
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Charge {
    pub fn validate_amount(amount: Money) -> Result<Money, DomainError> {
        if amount.is_negative() {
            Err(DomainError::validation("montant", "amount must not be negative"))
        } else {
            Ok(amount)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_paid() {
        assert_eq!(ChargeStatus::default(), ChargeStatus::Paid);
        assert_eq!("brouillon".parse::<ChargeStatus>().unwrap(), ChargeStatus::Draft);
    }

    #[test]
    fn negative_amount_is_rejected() {
        assert!(Charge::validate_amount(Money::from_units(-1)).is_err());
        assert!(Charge::validate_amount(Money::zero()).is_ok());
    }
}
