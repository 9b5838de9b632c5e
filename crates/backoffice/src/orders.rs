//! Order aggregate: create, update, delete and queries.

use chrono::{DateTime, NaiveDate, Utc};
use common::serde_helpers::double_option;
use common::{Actor, ClientId, Clock, LocationId, OrderId, OrderLineId, PageId};
use domain::fees::validate_override;
use domain::{
    DomainError, FeeSnapshot, LineRequest, Location, LocationCategory, Order, OrderLine,
    OrderStatus, validate_lines,
};
use serde::{Deserialize, Serialize};
use store::{OrderFilter, Store, Transaction};

use crate::catalog::{
    ClientInput, LocationInput, channel_config, resolve_client, resolve_location, resolve_page,
};
use crate::invoices::ensure_invoice;
use crate::views::{OrderDetail, PageRequest, Paginated, load_order_detail, load_order_details};
use crate::{Backoffice, Result, ServiceError, inventory};

/// New order. Any `statut` sent by the caller is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrder {
    #[serde(default)]
    pub page: Option<PageId>,
    #[serde(default)]
    pub client_input: ClientInput,
    #[serde(default)]
    pub lieu_input: LocationInput,
    #[serde(default)]
    pub frais_override: Option<i64>,
    #[serde(default)]
    pub date_livraison: Option<NaiveDate>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub precision_lieu: String,
    #[serde(default)]
    pub lignes: Vec<LineRequest>,
}

/// Partial order update. Absent fields keep their value.
///
/// `page`, `frais_override` and `date_livraison` distinguish an explicit
/// `null` from an absent field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrder {
    #[serde(default, deserialize_with = "double_option")]
    pub page: Option<Option<PageId>>,
    #[serde(default)]
    pub client_input: Option<ClientInput>,
    #[serde(default)]
    pub lieu_input: Option<LocationInput>,
    #[serde(default, deserialize_with = "double_option")]
    pub frais_override: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub date_livraison: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub precision_lieu: Option<String>,
    #[serde(default)]
    pub lignes: Option<Vec<LineRequest>>,
}

/// Query parameters of the order list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub statut: Option<OrderStatus>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub lieu: Option<String>,
    #[serde(default)]
    pub date_livraison: Option<NaiveDate>,
    #[serde(default)]
    pub date_commande: Option<NaiveDate>,
    #[serde(default)]
    pub page_id: Option<PageId>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl OrderQuery {
    /// Store filter; `date_commande` is a business day read through `clock`.
    pub fn filter(&self, clock: &dyn Clock) -> OrderFilter {
        OrderFilter {
            status: self.statut,
            client: self.client.clone().filter(|c| !c.trim().is_empty()),
            location: self.lieu.clone().filter(|l| !l.trim().is_empty()),
            date_livraison: self.date_livraison,
            created_from: self.date_commande.map(|d| clock.day_start(d)),
            created_before: self.date_commande.and_then(|d| clock.day_end(d)),
            page_id: self.page_id,
            ..Default::default()
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.page_size)
    }
}

/// Location of a client's most recent order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastLocation {
    pub lieu_id: LocationId,
    pub lieu_nom: String,
    pub categorie: LocationCategory,
    pub frais_auto: i64,
    pub precision_lieu: String,
}

async fn capture_fee<T: Transaction>(
    tx: &mut T,
    location: &Location,
    override_amount: Option<i64>,
    now: DateTime<Utc>,
) -> Result<FeeSnapshot> {
    let fee = FeeSnapshot::capture(location.id, location.category, override_amount, now);
    tx.insert_fee(&fee).await?;
    Ok(fee)
}

/// Prices each line at the article's current sale price and debits stock.
///
/// Articles are locked up front in [`inventory::lock_sequence`] order.
async fn apply_lines<T: Transaction>(
    tx: &mut T,
    order_id: OrderId,
    lines: &[(common::ArticleId, u32)],
    now: DateTime<Utc>,
) -> Result<()> {
    let articles = inventory::lock_articles(tx, lines.iter().map(|(id, _)| *id)).await?;
    let mut total: i64 = 0;
    for (index, (article_id, quantity)) in lines.iter().enumerate() {
        let article = articles.get(article_id).ok_or_else(|| {
            DomainError::validation(
                format!("lignes[{index}].article"),
                format!("unknown article {article_id}"),
            )
        })?;
        let line = OrderLine {
            id: OrderLineId::new(),
            order_id,
            article_id: *article_id,
            quantity: *quantity,
            unit_price: article.sale_price,
            created_at: now,
        };
        total = line
            .subtotal()
            .ok()
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(|| {
                DomainError::validation(
                    format!("lignes[{index}].quantite"),
                    "line total exceeds the supported amount",
                )
            })?;
        tx.insert_order_line(&line).await?;
        inventory::adjust(tx, *article_id, -i64::from(*quantity), now).await?;
    }
    Ok(())
}

/// Credits stock for every current line, then deletes them.
async fn roll_back_lines<T: Transaction>(
    tx: &mut T,
    order_id: OrderId,
    now: DateTime<Utc>,
) -> Result<()> {
    restock_lines(tx, order_id, now).await?;
    tx.delete_order_lines(order_id).await?;
    Ok(())
}

async fn restock_lines<T: Transaction>(
    tx: &mut T,
    order_id: OrderId,
    now: DateTime<Utc>,
) -> Result<()> {
    let lines = tx.order_lines(order_id).await?;
    inventory::lock_articles(tx, lines.iter().map(|l| l.article_id)).await?;
    for line in lines {
        inventory::adjust(tx, line.article_id, i64::from(line.quantity), now).await?;
    }
    Ok(())
}

impl<S: Store> Backoffice<S> {
    /// Creates an order in `EN_ATTENTE`, debits stock and issues its invoice.
    #[tracing::instrument(skip(self, input, actor))]
    pub async fn create_order(&self, input: CreateOrder, actor: &Actor) -> Result<OrderDetail> {
        let now = self.now();
        let lines = validate_lines(&input.lignes)?;
        let override_amount = validate_override(input.frais_override)?;

        let mut tx = self.store().begin().await?;
        let page_id = match input.page {
            Some(page_id) => {
                let config = channel_config(&mut tx, now).await?;
                Some(resolve_page(&mut tx, &config, page_id).await?.id)
            }
            None => None,
        };
        let client = resolve_client(&mut tx, &input.client_input, now).await?;
        let location = resolve_location(&mut tx, &input.lieu_input, now).await?;
        let fee = capture_fee(&mut tx, &location, override_amount, now).await?;

        let order = Order {
            id: OrderId::new(),
            user_id: actor.recorded(),
            page_id,
            client_id: client.id,
            location_id: location.id,
            fee_id: fee.id,
            precision_lieu: input.precision_lieu.trim().to_string(),
            date_livraison: input.date_livraison,
            client: client.snapshot(),
            status: OrderStatus::Pending,
            note: input.note.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        tx.insert_order(&order).await?;
        apply_lines(&mut tx, order.id, &lines, now).await?;
        ensure_invoice(&mut tx, order.id, now, self.offset()).await?;

        let detail = load_order_detail(&mut tx, order, self.offset()).await?;
        tx.commit().await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %detail.id(),
            total = detail.totals.total_commande,
            "order created"
        );
        Ok(detail)
    }

    /// Applies a partial update and resets the status to `EN_ATTENTE`.
    ///
    /// A new line set replaces the old one entirely: old lines are credited
    /// back to stock before the new ones are debited.
    #[tracing::instrument(skip(self, input))]
    pub async fn update_order(&self, id: OrderId, input: UpdateOrder) -> Result<OrderDetail> {
        let now = self.now();
        let lines = input.lignes.as_deref().map(validate_lines).transpose()?;
        let override_amount = match input.frais_override {
            Some(value) => validate_override(value)?,
            None => None,
        };

        let mut tx = self.store().begin().await?;
        let mut order = tx
            .lock_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))?;

        if let Some(page) = input.page {
            order.page_id = match page {
                Some(page_id) => {
                    let config = channel_config(&mut tx, now).await?;
                    Some(resolve_page(&mut tx, &config, page_id).await?.id)
                }
                None => None,
            };
        }
        if let Some(client_input) = &input.client_input {
            order.client_id = resolve_client(&mut tx, client_input, now).await?.id;
        }
        if let Some(client) = tx.get_client(order.client_id).await? {
            order.client = client.snapshot();
        }

        let location = match &input.lieu_input {
            Some(lieu_input) => Some(resolve_location(&mut tx, lieu_input, now).await?),
            None => None,
        };
        if location.is_some() || input.frais_override.is_some() {
            let location = match location {
                Some(location) => location,
                None => tx
                    .get_location(order.location_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("location", order.location_id))?,
            };
            let fee = capture_fee(&mut tx, &location, override_amount, now).await?;
            order.location_id = location.id;
            order.fee_id = fee.id;
        }

        if let Some(precision) = input.precision_lieu {
            order.precision_lieu = precision.trim().to_string();
        }
        if let Some(date) = input.date_livraison {
            order.date_livraison = date;
        }
        if let Some(note) = input.note {
            order.note = note.trim().to_string();
        }
        order.status = OrderStatus::Pending;
        order.updated_at = now;
        tx.update_order(&order).await?;

        if let Some(lines) = lines {
            roll_back_lines(&mut tx, order.id, now).await?;
            apply_lines(&mut tx, order.id, &lines, now).await?;
        }

        let detail = load_order_detail(&mut tx, order, self.offset()).await?;
        tx.commit().await?;

        metrics::counter!("orders_updated_total").increment(1);
        Ok(detail)
    }

    /// Credits stock for every line, then deletes the order and its satellites.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<()> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        tx.lock_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))?;
        restock_lines(&mut tx, id, now).await?;
        tx.delete_order(id).await?;
        tx.commit().await?;

        metrics::counter!("orders_deleted_total").increment(1);
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    pub async fn get_order(&self, id: OrderId) -> Result<OrderDetail> {
        let mut tx = self.store().begin().await?;
        let order = tx
            .get_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", id))?;
        load_order_detail(&mut tx, order, self.offset()).await
    }

    /// Newest orders first, one page at a time.
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Paginated<OrderDetail>> {
        let page = query.page_request();
        let filter = query.filter(self.clock().as_ref());
        let mut tx = self.store().begin().await?;
        let count = tx.count_orders(&filter).await?;
        let orders = tx
            .list_orders(&filter.paginated(page.page_size, page.offset()))
            .await?;
        let results = load_order_details(&mut tx, orders, self.offset()).await?;
        Ok(Paginated {
            count,
            page: page.page,
            page_size: page.page_size,
            results,
        })
    }

    /// Location used by the client's most recent order, if any.
    pub async fn last_location(&self, client_id: ClientId) -> Result<Option<LastLocation>> {
        let mut tx = self.store().begin().await?;
        let filter = OrderFilter {
            client_id: Some(client_id),
            ..Default::default()
        }
        .paginated(1, 0);
        let Some(order) = tx.list_orders(&filter).await?.into_iter().next() else {
            return Ok(None);
        };
        let Some(location) = tx.get_location(order.location_id).await? else {
            return Ok(None);
        };
        Ok(Some(LastLocation {
            lieu_id: location.id,
            lieu_nom: location.name,
            categorie: location.category,
            frais_auto: location.category.base_fee(),
            precision_lieu: order.precision_lieu,
        }))
    }
}
