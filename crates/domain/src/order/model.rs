//! Order records and derived totals.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use common::{ArticleId, ClientId, FeeId, LocationId, OrderId, OrderLineId, PageId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::delivery::DeliveryStatus;
use crate::{ClientSnapshot, DomainError, FeeSnapshot, Money};

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "user")]
    pub user_id: Option<UserId>,
    #[serde(rename = "page")]
    pub page_id: Option<PageId>,
    #[serde(rename = "client")]
    pub client_id: ClientId,
    #[serde(rename = "lieu_livraison")]
    pub location_id: LocationId,
    #[serde(rename = "frais_livraison")]
    pub fee_id: FeeId,
    pub precision_lieu: String,
    pub date_livraison: Option<NaiveDate>,
    #[serde(flatten)]
    pub client: ClientSnapshot,
    #[serde(rename = "statut")]
    pub status: OrderStatus,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Order date: the creation day in the business timezone `offset`.
    pub fn date_commande(&self, offset: FixedOffset) -> NaiveDate {
        self.created_at.with_timezone(&offset).date_naive()
    }

    /// Aligns the order with its delivery after a transition.
    ///
    /// Returns true when the status changed.
    pub fn sync_with_delivery(
        &mut self,
        delivery: DeliveryStatus,
        date_prevue: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> bool {
        let next = self.status.after_delivery(delivery);
        if delivery == DeliveryStatus::Delivered && self.date_livraison.is_none() {
            self.date_livraison = date_prevue;
        }
        self.updated_at = now;
        match next {
            Some(status) if status != self.status => {
                self.status = status;
                true
            }
            _ => false,
        }
    }

    /// Sets the planned delivery date.
    pub fn schedule(&mut self, date: NaiveDate, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_finalized() {
            return Err(DomainError::OrderFinalized {
                status: self.status,
            });
        }
        self.date_livraison = Some(date);
        self.updated_at = now;
        Ok(())
    }
}

/// One article-quantity-price entry within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    #[serde(rename = "commande")]
    pub order_id: OrderId,
    #[serde(rename = "article")]
    pub article_id: ArticleId,
    #[serde(rename = "quantite")]
    pub quantity: u32,
    /// Sale price captured when the line was created.
    #[serde(rename = "prix_vente_unitaire")]
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Quantity times the whole-unit price.
    pub fn subtotal(&self) -> Result<i64, DomainError> {
        let unit = self.unit_price.whole_units()?;
        i64::from(self.quantity)
            .checked_mul(unit)
            .ok_or_else(|| DomainError::AmountOutOfRange {
                amount: self
                    .unit_price
                    .checked_times(self.quantity)
                    .map(|m| m.amount())
                    .unwrap_or(Decimal::MAX),
            })
    }
}

/// Requested line before it is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    #[serde(rename = "article")]
    pub article_id: ArticleId,
    #[serde(rename = "quantite")]
    pub quantity: i64,
}

/// Checks a requested line set and returns positive quantities.
pub fn validate_lines(lines: &[LineRequest]) -> Result<Vec<(ArticleId, u32)>, DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("lignes", "at least one line is required"));
    }
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| match u32::try_from(line.quantity) {
            Ok(quantity) if quantity >= 1 => Ok((line.article_id, quantity)),
            _ => Err(DomainError::validation(
                format!("lignes[{index}].quantite"),
                "quantity must be a positive integer",
            )),
        })
        .collect()
}

/// Derived order amounts, in whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub total_articles: i64,
    pub frais_final: i64,
    pub total_commande: i64,
}

impl OrderTotals {
    pub fn compute(lines: &[OrderLine], fee: Option<&FeeSnapshot>) -> Result<Self, DomainError> {
        let mut total_articles: i64 = 0;
        for line in lines {
            total_articles = total_articles
                .checked_add(line.subtotal()?)
                .ok_or_else(|| overflow(total_articles))?;
        }
        let frais_final = fee.map(|f| f.final_amount).unwrap_or_default();
        let total_commande = total_articles
            .checked_add(frais_final)
            .ok_or_else(|| overflow(total_articles))?;
        Ok(Self {
            total_articles,
            frais_final,
            total_commande,
        })
    }
}

fn overflow(partial: i64) -> DomainError {
    DomainError::AmountOutOfRange {
        amount: Decimal::from(partial),
    }
}
