//! Purchase ledger: supplier purchases that restock articles.

use chrono::{DateTime, NaiveDate, Utc};
use common::serde_helpers::double_option;
use common::{Actor, PurchaseId, PurchaseLineId};
use domain::{DomainError, Money, Purchase, PurchaseLine, PurchaseLineRequest, purchase_total};
use serde::{Deserialize, Serialize};
use store::{Store, Transaction};

use crate::{Backoffice, Result, ServiceError, inventory};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPurchase {
    #[serde(default, rename = "fournisseur")]
    pub supplier: String,
    #[serde(default, rename = "date_achat")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub lignes: Vec<PurchaseLineRequest>,
}

/// Partial purchase update. A new line set replaces the old one entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePurchase {
    #[serde(default, rename = "fournisseur")]
    pub supplier: Option<String>,
    #[serde(default, rename = "date_achat", deserialize_with = "double_option")]
    pub purchase_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub lignes: Option<Vec<PurchaseLineRequest>>,
}

/// Purchase with its lines and total cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub lignes: Vec<PurchaseLine>,
    pub total: Money,
}

impl PurchaseView {
    fn new(purchase: Purchase, lignes: Vec<PurchaseLine>) -> Self {
        Self {
            total: purchase_total(&lignes),
            purchase,
            lignes,
        }
    }
}

fn validate_requests(requests: &[PurchaseLineRequest]) -> Result<Vec<u32>> {
    Ok(requests
        .iter()
        .enumerate()
        .map(|(index, request)| request.validate(index))
        .collect::<std::result::Result<_, _>>()?)
}

/// Records each line, credits stock and, when asked, updates article prices.
///
/// Articles are locked up front in [`inventory::lock_sequence`] order. A zero price leaves the article's price unchanged.
async fn apply_lines<T: Transaction>(
    tx: &mut T,
    purchase_id: PurchaseId,
    requests: &[PurchaseLineRequest],
    quantities: &[u32],
    now: DateTime<Utc>,
) -> Result<()> {
    let articles = inventory::lock_articles(tx, requests.iter().map(|r| r.article_id)).await?;
    for (index, (request, quantity)) in requests.iter().zip(quantities).enumerate() {
        if !articles.contains_key(&request.article_id) {
            return Err(DomainError::validation(
                format!("lignes[{index}].article"),
                format!("unknown article {}", request.article_id),
            )
            .into());
        }
        let line = PurchaseLine {
            id: PurchaseLineId::new(),
            purchase_id,
            article_id: request.article_id,
            quantity: *quantity,
            unit_cost: request.unit_cost,
            unit_sale_price: request.unit_sale_price,
            update_article_prices: request.update_article_prices,
            created_at: now,
        };
        tx.insert_purchase_line(&line).await?;
        inventory::adjust(tx, line.article_id, i64::from(line.quantity), now).await?;

        if line.update_article_prices
            && let Some(mut article) = tx.lock_article(line.article_id).await?
        {
            if !line.unit_cost.is_zero() {
                article.purchase_price = line.unit_cost;
            }
            if !line.unit_sale_price.is_zero() {
                article.sale_price = line.unit_sale_price;
            }
            article.updated_at = now;
            tx.update_article(&article).await?;
        }
    }
    Ok(())
}

/// Debits the stock brought in by every line, then deletes the lines.
async fn roll_back_lines<T: Transaction>(
    tx: &mut T,
    purchase_id: PurchaseId,
    now: DateTime<Utc>,
) -> Result<()> {
    let lines = tx.purchase_lines(purchase_id).await?;
    inventory::lock_articles(tx, lines.iter().map(|l| l.article_id)).await?;
    for line in lines {
        inventory::adjust(tx, line.article_id, -i64::from(line.quantity), now).await?;
    }
    tx.delete_purchase_lines(purchase_id).await?;
    Ok(())
}

impl<S: Store> Backoffice<S> {
    #[tracing::instrument(skip(self, input, actor))]
    pub async fn create_purchase(&self, input: NewPurchase, actor: &Actor) -> Result<PurchaseView> {
        let now = self.now();
        let quantities = validate_requests(&input.lignes)?;
        let purchase = Purchase {
            id: PurchaseId::new(),
            user_id: actor.recorded(),
            supplier: input.supplier.trim().to_string(),
            purchase_date: input.purchase_date,
            note: input.note.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store().begin().await?;
        tx.insert_purchase(&purchase).await?;
        apply_lines(&mut tx, purchase.id, &input.lignes, &quantities, now).await?;
        let lines = tx.purchase_lines(purchase.id).await?;
        tx.commit().await?;

        tracing::info!(purchase_id = %purchase.id, lines = lines.len(), "purchase recorded");
        Ok(PurchaseView::new(purchase, lines))
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update_purchase(&self, id: PurchaseId, input: UpdatePurchase) -> Result<PurchaseView> {
        let now = self.now();
        let quantities = input.lignes.as_deref().map(validate_requests).transpose()?;

        let mut tx = self.store().begin().await?;
        let mut purchase = tx
            .get_purchase(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("purchase", id))?;
        if let Some(supplier) = input.supplier {
            purchase.supplier = supplier.trim().to_string();
        }
        if let Some(date) = input.purchase_date {
            purchase.purchase_date = date;
        }
        if let Some(note) = input.note {
            purchase.note = note.trim().to_string();
        }
        purchase.updated_at = now;
        tx.update_purchase(&purchase).await?;

        if let (Some(requests), Some(quantities)) = (&input.lignes, &quantities) {
            roll_back_lines(&mut tx, id, now).await?;
            apply_lines(&mut tx, id, requests, quantities, now).await?;
        }
        let lines = tx.purchase_lines(id).await?;
        tx.commit().await?;
        Ok(PurchaseView::new(purchase, lines))
    }

    /// Rolls back the stock of every line, then deletes the purchase.
    #[tracing::instrument(skip(self))]
    pub async fn delete_purchase(&self, id: PurchaseId) -> Result<()> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        if tx.get_purchase(id).await?.is_none() {
            return Err(ServiceError::not_found("purchase", id));
        }
        roll_back_lines(&mut tx, id, now).await?;
        tx.delete_purchase(id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_purchase(&self, id: PurchaseId) -> Result<PurchaseView> {
        let mut tx = self.store().begin().await?;
        let purchase = tx
            .get_purchase(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("purchase", id))?;
        let lines = tx.purchase_lines(id).await?;
        Ok(PurchaseView::new(purchase, lines))
    }

    /// Newest first.
    pub async fn list_purchases(&self) -> Result<Vec<PurchaseView>> {
        let mut tx = self.store().begin().await?;
        let mut views = Vec::new();
        for purchase in tx.list_purchases().await? {
            let lines = tx.purchase_lines(purchase.id).await?;
            views.push(PurchaseView::new(purchase, lines));
        }
        Ok(views)
    }
}
