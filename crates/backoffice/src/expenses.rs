//! Expense ledger: categories, charges and their totals.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use common::serde_helpers::double_option;
use common::{Actor, ChargeCategoryId, ChargeId, OrderId};
use domain::{Charge, ChargeCategory, ChargeStatus, Money, PaymentMode, required_text};
use serde::{Deserialize, Serialize};
use store::{ChargeFilter, Store, Transaction};

use crate::{Backoffice, Result, ServiceError};

/// Number of categories reported by [`Backoffice::charge_stats`].
pub const TOP_CATEGORIES: usize = 12;

#[derive(Debug, Clone, Deserialize)]
pub struct NewChargeCategory {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(default = "active_by_default", rename = "actif")]
    pub active: bool,
    #[serde(default, rename = "ordre")]
    pub position: i32,
}

fn active_by_default() -> bool {
    true
}

fn cash() -> PaymentMode {
    PaymentMode::Cash
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCharge {
    #[serde(default)]
    pub date_charge: Option<NaiveDate>,
    #[serde(rename = "categorie")]
    pub category_id: ChargeCategoryId,
    #[serde(rename = "libelle")]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "montant")]
    pub amount: Money,
    #[serde(default, rename = "statut")]
    pub status: ChargeStatus,
    #[serde(default = "cash", rename = "mode_paiement")]
    pub payment_mode: PaymentMode,
    #[serde(default, rename = "commande")]
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCharge {
    #[serde(default)]
    pub date_charge: Option<NaiveDate>,
    #[serde(default, rename = "categorie")]
    pub category_id: Option<ChargeCategoryId>,
    #[serde(default, rename = "libelle")]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "montant")]
    pub amount: Option<Money>,
    #[serde(default, rename = "statut")]
    pub status: Option<ChargeStatus>,
    #[serde(default, rename = "mode_paiement")]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default, rename = "commande", deserialize_with = "double_option")]
    pub order_id: Option<Option<OrderId>>,
}

/// Query parameters of the charge list and stats.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargeQuery {
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    #[serde(default)]
    pub categorie: Option<ChargeCategoryId>,
    #[serde(default)]
    pub statut: Option<ChargeStatus>,
    #[serde(default)]
    pub q: Option<String>,
}

impl ChargeQuery {
    pub fn filter(&self) -> ChargeFilter {
        ChargeFilter {
            date_from: self.date_from,
            date_to: self.date_to,
            category_id: self.categorie,
            status: self.statut,
            search: self.q.clone().filter(|q| !q.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTotal {
    pub statut: ChargeStatus,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub categorie_nom: String,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeStats {
    pub total: Money,
    pub by_statut: Vec<StatusTotal>,
    pub by_categorie: Vec<CategoryTotal>,
}

impl ChargeStats {
    /// Totals of `charges`; categories are ranked by total, largest first.
    pub fn compute(charges: &[Charge], categories: &[ChargeCategory]) -> Self {
        let names: HashMap<ChargeCategoryId, &str> =
            categories.iter().map(|c| (c.id, c.name.as_str())).collect();

        let mut by_status: BTreeMap<&str, (ChargeStatus, Money)> = BTreeMap::new();
        let mut by_category: HashMap<&str, Money> = HashMap::new();
        for charge in charges {
            by_status
                .entry(charge.status.as_str())
                .or_insert((charge.status, Money::zero()))
                .1 += charge.amount;
            let name = names.get(&charge.category_id).copied().unwrap_or_default();
            *by_category.entry(name).or_default() += charge.amount;
        }

        let mut by_categorie: Vec<CategoryTotal> = by_category
            .into_iter()
            .map(|(name, total)| CategoryTotal {
                categorie_nom: name.to_string(),
                total,
            })
            .collect();
        by_categorie.sort_by(|a, b| b.total.cmp(&a.total).then(a.categorie_nom.cmp(&b.categorie_nom)));
        by_categorie.truncate(TOP_CATEGORIES);

        Self {
            total: charges.iter().map(|c| c.amount).sum(),
            by_statut: by_status
                .into_values()
                .map(|(statut, total)| StatusTotal { statut, total })
                .collect(),
            by_categorie,
        }
    }
}

impl<S: Store> Backoffice<S> {
    pub async fn list_charge_categories(&self, active_only: bool) -> Result<Vec<ChargeCategory>> {
        let mut tx = self.store().begin().await?;
        let mut categories = tx.list_charge_categories().await?;
        if active_only {
            categories.retain(|c| c.active);
        }
        Ok(categories)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create_charge_category(&self, input: NewChargeCategory) -> Result<ChargeCategory> {
        let category = ChargeCategory {
            id: ChargeCategoryId::new(),
            name: required_text("nom", &input.name)?,
            active: input.active,
            position: input.position,
        };
        let mut tx = self.store().begin().await?;
        tx.insert_charge_category(&category).await?;
        tx.commit().await?;
        Ok(category)
    }

    #[tracing::instrument(skip(self, input, actor))]
    pub async fn create_charge(&self, input: NewCharge, actor: &Actor) -> Result<Charge> {
        let now = self.now();
        let charge = Charge {
            id: ChargeId::new(),
            date_charge: input.date_charge.unwrap_or_else(|| self.today()),
            category_id: input.category_id,
            label: required_text("libelle", &input.label)?,
            description: input.description.trim().to_string(),
            amount: Charge::validate_amount(input.amount)?,
            status: input.status,
            payment_mode: input.payment_mode,
            order_id: input.order_id,
            created_by: actor.recorded(),
            created_at: now,
            updated_at: now,
        };
        let mut tx = self.store().begin().await?;
        if tx.get_charge_category(charge.category_id).await?.is_none() {
            return Err(ServiceError::not_found("charge category", charge.category_id));
        }
        if let Some(order_id) = charge.order_id
            && tx.get_order(order_id).await?.is_none()
        {
            return Err(ServiceError::not_found("order", order_id));
        }
        tx.insert_charge(&charge).await?;
        tx.commit().await?;
        Ok(charge)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_charge(&self, id: ChargeId, input: UpdateCharge) -> Result<Charge> {
        let mut tx = self.store().begin().await?;
        let mut charge = tx
            .get_charge(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("charge", id))?;

        if let Some(date) = input.date_charge {
            charge.date_charge = date;
        }
        if let Some(category_id) = input.category_id {
            if tx.get_charge_category(category_id).await?.is_none() {
                return Err(ServiceError::not_found("charge category", category_id));
            }
            charge.category_id = category_id;
        }
        if let Some(label) = input.label {
            charge.label = required_text("libelle", &label)?;
        }
        if let Some(description) = input.description {
            charge.description = description.trim().to_string();
        }
        if let Some(amount) = input.amount {
            charge.amount = Charge::validate_amount(amount)?;
        }
        if let Some(status) = input.status {
            charge.status = status;
        }
        if let Some(mode) = input.payment_mode {
            charge.payment_mode = mode;
        }
        if let Some(order_id) = input.order_id {
            if let Some(order_id) = order_id
                && tx.get_order(order_id).await?.is_none()
            {
                return Err(ServiceError::not_found("order", order_id));
            }
            charge.order_id = order_id;
        }
        charge.updated_at = self.now();
        tx.update_charge(&charge).await?;
        tx.commit().await?;
        Ok(charge)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_charge(&self, id: ChargeId) -> Result<()> {
        let mut tx = self.store().begin().await?;
        if !tx.delete_charge(id).await? {
            return Err(ServiceError::not_found("charge", id));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_charge(&self, id: ChargeId) -> Result<Charge> {
        let mut tx = self.store().begin().await?;
        tx.get_charge(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("charge", id))
    }

    pub async fn list_charges(&self, query: &ChargeQuery) -> Result<Vec<Charge>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.list_charges(&query.filter()).await?)
    }

    pub async fn charge_stats(&self, query: &ChargeQuery) -> Result<ChargeStats> {
        let mut tx = self.store().begin().await?;
        let charges = tx.list_charges(&query.filter()).await?;
        let categories = tx.list_charge_categories().await?;
        Ok(ChargeStats::compute(&charges, &categories))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn charge(category: ChargeCategoryId, status: ChargeStatus, amount: i64) -> Charge {
        let now = Utc::now();
        Charge {
            id: ChargeId::new(),
            date_charge: now.date_naive(),
            category_id: category,
            label: "Carburant".to_string(),
            description: String::new(),
            amount: Money::from_units(amount),
            status,
            payment_mode: PaymentMode::Cash,
            order_id: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stats_group_by_status_and_rank_categories() {
        let transport = ChargeCategory {
            id: ChargeCategoryId::new(),
            name: "Transport".to_string(),
            active: true,
            position: 1,
        };
        let loyer = ChargeCategory {
            id: ChargeCategoryId::new(),
            name: "Loyer".to_string(),
            active: true,
            position: 2,
        };
        let charges = vec![
            charge(transport.id, ChargeStatus::Paid, 2000),
            charge(transport.id, ChargeStatus::Draft, 500),
            charge(loyer.id, ChargeStatus::Paid, 150_000),
        ];

        let stats = ChargeStats::compute(&charges, &[transport, loyer]);
        assert_eq!(stats.total, Money::from_units(152_500));
        assert_eq!(stats.by_categorie[0].categorie_nom, "Loyer");
        assert_eq!(stats.by_categorie[1].total, Money::from_units(2500));
        let paid = stats
            .by_statut
            .iter()
            .find(|s| s.statut == ChargeStatus::Paid)
            .unwrap();
        assert_eq!(paid.total, Money::from_units(152_000));
    }

    #[test]
    fn stats_keep_twelve_categories() {
        let categories: Vec<ChargeCategory> = (0..15)
            .map(|i| ChargeCategory {
                id: ChargeCategoryId::new(),
                name: format!("Cat {i:02}"),
                active: true,
                position: i,
            })
            .collect();
        let charges: Vec<Charge> = categories
            .iter()
            .map(|c| charge(c.id, ChargeStatus::Paid, 100))
            .collect();
        let stats = ChargeStats::compute(&charges, &categories);
        assert_eq!(stats.by_categorie.len(), TOP_CATEGORIES);
    }
}
