//! Delivery-fee calculation.

use chrono::{DateTime, Utc};
use common::{FeeId, LocationId};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Category of a delivery location, driving its default fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationCategory {
    Ville,
    Peripherie,
    PlusPeripherie,
    Province,
    #[default]
    Autre,
}

impl LocationCategory {
    pub const ALL: [LocationCategory; 5] = [
        LocationCategory::Ville,
        LocationCategory::Peripherie,
        LocationCategory::PlusPeripherie,
        LocationCategory::Province,
        LocationCategory::Autre,
    ];

    /// Base fee for the category, in whole currency units.
    pub fn base_fee(&self) -> i64 {
        match self {
            LocationCategory::Ville => 3000,
            LocationCategory::Peripherie => 4000,
            LocationCategory::PlusPeripherie => 5000,
            LocationCategory::Province => 3000,
            LocationCategory::Autre => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationCategory::Ville => "VILLE",
            LocationCategory::Peripherie => "PERIPHERIE",
            LocationCategory::PlusPeripherie => "PLUS_PERIPHERIE",
            LocationCategory::Province => "PROVINCE",
            LocationCategory::Autre => "AUTRE",
        }
    }
}

impl std::fmt::Display for LocationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LocationCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LocationCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation("categorie", format!("unknown category '{s}'")))
    }
}

/// Fee for a category.
pub fn compute_fee(category: LocationCategory) -> i64 {
    category.base_fee()
}

/// The override when present, otherwise the category fee.
pub fn final_fee(category: LocationCategory, override_amount: Option<i64>) -> i64 {
    override_amount.unwrap_or_else(|| compute_fee(category))
}

/// Rejects negative manual fees.
pub fn validate_override(override_amount: Option<i64>) -> Result<Option<i64>, DomainError> {
    match override_amount {
        Some(amount) if amount < 0 => Err(DomainError::validation(
            "frais_override",
            "fee override must not be negative",
        )),
        other => Ok(other),
    }
}

/// Immutable delivery-fee record captured when a location is assigned to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSnapshot {
    pub id: FeeId,
    #[serde(rename = "lieu")]
    pub location_id: LocationId,
    #[serde(rename = "frais_calcule")]
    pub computed: i64,
    #[serde(rename = "frais_override")]
    pub override_amount: Option<i64>,
    #[serde(rename = "frais_final")]
    pub final_amount: i64,
    pub created_at: DateTime<Utc>,
}

impl FeeSnapshot {
    pub fn capture(
        location_id: LocationId,
        category: LocationCategory,
        override_amount: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: FeeId::new(),
            location_id,
            computed: compute_fee(category),
            override_amount,
            final_amount: final_fee(category, override_amount),
            created_at: now,
        }
    }
}

/// Fee figures returned by the preview endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeeQuote {
    pub frais_calcule: i64,
    pub frais_override: Option<i64>,
    pub frais_final: i64,
}

impl FeeQuote {
    pub fn new(category: LocationCategory, override_amount: Option<i64>) -> Self {
        Self {
            frais_calcule: compute_fee(category),
            frais_override: override_amount,
            frais_final: final_fee(category, override_amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_table() {
        assert_eq!(compute_fee(LocationCategory::Ville), 3000);
        assert_eq!(compute_fee(LocationCategory::Peripherie), 4000);
        assert_eq!(compute_fee(LocationCategory::PlusPeripherie), 5000);
        assert_eq!(compute_fee(LocationCategory::Province), 3000);
        assert_eq!(compute_fee(LocationCategory::Autre), 0);
    }

    #[test]
    fn override_wins_even_when_zero() {
        assert_eq!(final_fee(LocationCategory::Peripherie, Some(0)), 0);
        assert_eq!(final_fee(LocationCategory::Peripherie, Some(2500)), 2500);
        assert_eq!(final_fee(LocationCategory::Peripherie, None), 4000);
    }

    #[test]
    fn negative_override_is_rejected() {
        let err = validate_override(Some(-1)).unwrap_err();
        assert_eq!(err.field(), Some("frais_override"));
        assert_eq!(validate_override(None).unwrap(), None);
    }

    #[test]
    fn snapshot_records_both_values() {
        let snapshot =
            FeeSnapshot::capture(LocationId::new(), LocationCategory::Ville, Some(1000), Utc::now());
        assert_eq!(snapshot.computed, 3000);
        assert_eq!(snapshot.override_amount, Some(1000));
        assert_eq!(snapshot.final_amount, 1000);
    }

    #[test]
    fn category_codes() {
        assert_eq!(
            serde_json::to_string(&LocationCategory::PlusPeripherie).unwrap(),
            "\"PLUS_PERIPHERIE\""
        );
        assert_eq!("ville".parse::<LocationCategory>().unwrap(), LocationCategory::Ville);
        assert!("LUNE".parse::<LocationCategory>().is_err());
    }
}
