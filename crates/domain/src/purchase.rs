//! Purchase ledger records.

use chrono::{DateTime, NaiveDate, Utc};
use common::{ArticleId, PurchaseId, PurchaseLineId, UserId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, Money};

/// Purchase header (supplier bill).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    #[serde(rename = "user")]
    pub user_id: Option<UserId>,
    #[serde(rename = "fournisseur")]
    pub supplier: String,
    #[serde(rename = "date_achat")]
    pub purchase_date: Option<NaiveDate>,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One article received in a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub id: PurchaseLineId,
    #[serde(rename = "achat")]
    pub purchase_id: PurchaseId,
    #[serde(rename = "article")]
    pub article_id: ArticleId,
    #[serde(rename = "quantite")]
    pub quantity: u32,
    #[serde(rename = "prix_achat_unitaire")]
    pub unit_cost: Money,
    #[serde(rename = "prix_vente_unitaire")]
    pub unit_sale_price: Money,
    /// Copy the prices onto the article when the line is applied.
    #[serde(rename = "maj_prix_article")]
    pub update_article_prices: bool,
    pub created_at: DateTime<Utc>,
}

impl PurchaseLine {
    pub fn total(&self) -> Money {
        self.unit_cost.times(self.quantity)
    }
}

/// Requested purchase line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLineRequest {
    #[serde(rename = "article")]
    pub article_id: ArticleId,
    #[serde(rename = "quantite")]
    pub quantity: i64,
    #[serde(rename = "prix_achat_unitaire", default)]
    pub unit_cost: Money,
    #[serde(rename = "prix_vente_unitaire", default)]
    pub unit_sale_price: Money,
    #[serde(rename = "maj_prix_article", default = "default_true")]
    pub update_article_prices: bool,
}

fn default_true() -> bool {
    true
}

impl PurchaseLineRequest {
    pub fn validate(&self, index: usize) -> Result<u32, DomainError> {
        let quantity = match u32::try_from(self.quantity) {
            Ok(q) if q >= 1 => q,
            _ => {
                return Err(DomainError::validation(
                    format!("lignes[{index}].quantite"),
                    "quantity must be a positive integer",
                ));
            }
        };
        if self.unit_cost.is_negative() || self.unit_sale_price.is_negative() {
            return Err(DomainError::validation(
                format!("lignes[{index}]"),
                "prices must not be negative",
            ));
        }
        Ok(quantity)
    }
}

/// Sum of quantity times unit cost.
pub fn purchase_total(lines: &[PurchaseLine]) -> Money {
    lines.iter().map(PurchaseLine::total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_quantity_times_cost() {
        let now = Utc::now();
        let purchase_id = PurchaseId::new();
        let lines = vec![
            PurchaseLine {
                id: PurchaseLineId::new(),
                purchase_id,
                article_id: ArticleId::new(),
                quantity: 4,
                unit_cost: Money::from_units(250),
                unit_sale_price: Money::from_units(400),
                update_article_prices: true,
                created_at: now,
            },
            PurchaseLine {
                id: PurchaseLineId::new(),
                purchase_id,
                article_id: ArticleId::new(),
                quantity: 1,
                unit_cost: Money::from_units(1000),
                unit_sale_price: Money::from_units(1500),
                update_article_prices: false,
                created_at: now,
            },
        ];
        assert_eq!(purchase_total(&lines), Money::from_units(2000));
    }

    #[test]
    fn request_defaults_to_updating_prices() {
        let id = ArticleId::new();
        let json = format!(r#"{{"article":"{id}","quantite":2,"prix_achat_unitaire":300}}"#);
        let request: PurchaseLineRequest = serde_json::from_str(&json).unwrap();
        assert!(request.update_article_prices);
        assert_eq!(request.validate(0).unwrap(), 2);
    }

    #[test]
    fn request_rejects_zero_quantity() {
        let request = PurchaseLineRequest {
            article_id: ArticleId::new(),
            quantity: 0,
            unit_cost: Money::zero(),
            unit_sale_price: Money::zero(),
            update_article_prices: true,
        };
        assert_eq!(
            request.validate(3).unwrap_err().field(),
            Some("lignes[3].quantite")
        );
    }
}
