use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{
    ArticleId, ChargeCategoryId, ChargeId, ClientId, ConfigurationId, DeliveryId, FeeId,
    LocationId, OrderId, PageId, PurchaseId,
};
use domain::invoice::last_sequence;
use domain::{
    Article, ChannelConfiguration, Charge, ChargeCategory, Client, Delivery, DeliveryEvent,
    FeeSnapshot, Invoice, Location, Money, Order, OrderLine, Page, Payment, Purchase,
    PurchaseLine,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::filter::contains_ci;
use crate::{
    ChargeFilter, DeliveryFilter, LocationFilter, OrderFilter, Result, StoreError,
    store::{Store, Transaction},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    articles: Vec<Article>,
    clients: Vec<Client>,
    locations: Vec<Location>,
    configurations: Vec<ChannelConfiguration>,
    pages: Vec<Page>,
    fees: Vec<FeeSnapshot>,
    orders: Vec<Order>,
    order_lines: Vec<OrderLine>,
    payments: Vec<Payment>,
    deliveries: Vec<Delivery>,
    delivery_events: Vec<DeliveryEvent>,
    invoices: Vec<Invoice>,
    invoice_counters: HashMap<i32, u32>,
    purchases: Vec<Purchase>,
    purchase_lines: Vec<PurchaseLine>,
    charge_categories: Vec<ChargeCategory>,
    charges: Vec<Charge>,
}

impl Tables {
    fn location_name(&self, id: LocationId) -> &str {
        self.locations
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.name.as_str())
            .unwrap_or_default()
    }
}

fn replace<T: Clone>(rows: &mut [T], row: &T, same: impl Fn(&T) -> bool) {
    if let Some(slot) = rows.iter_mut().find(|r| same(r)) {
        *slot = row.clone();
    }
}

/// In-memory store for tests and database-less runs.
///
/// Transactions are fully serialised: `begin` takes the store lock and works on
/// a copy of every table, which `commit` swaps in. Row locks are therefore
/// implied by the transaction itself.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(MemoryTransaction { guard, work })
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self) -> Result<()> {
        let MemoryTransaction { mut guard, work } = self;
        *guard = work;
        Ok(())
    }

    async fn insert_article(&mut self, article: &Article) -> Result<()> {
        if self
            .work
            .articles
            .iter()
            .any(|a| a.reference == article.reference)
        {
            return Err(StoreError::unique("articles_reference_key"));
        }
        self.work.articles.push(article.clone());
        Ok(())
    }

    async fn get_article(&mut self, id: ArticleId) -> Result<Option<Article>> {
        Ok(self.work.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn lock_article(&mut self, id: ArticleId) -> Result<Option<Article>> {
        self.get_article(id).await
    }

    async fn update_article(&mut self, article: &Article) -> Result<()> {
        if self
            .work
            .articles
            .iter()
            .any(|a| a.reference == article.reference && a.id != article.id)
        {
            return Err(StoreError::unique("articles_reference_key"));
        }
        replace(&mut self.work.articles, article, |a| a.id == article.id);
        Ok(())
    }

    async fn list_articles(&mut self, search: Option<&str>) -> Result<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .work
            .articles
            .iter()
            .filter(|a| {
                search.is_none_or(|q| contains_ci(&a.name, q) || contains_ci(&a.reference, q))
            })
            .cloned()
            .collect();
        articles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(articles)
    }

    async fn delete_article(&mut self, id: ArticleId) -> Result<bool> {
        let referenced = self.work.order_lines.iter().any(|l| l.article_id == id)
            || self.work.purchase_lines.iter().any(|l| l.article_id == id);
        if referenced {
            return Err(StoreError::Referenced {
                entity: "article",
                id: id.to_string(),
            });
        }
        let before = self.work.articles.len();
        self.work.articles.retain(|a| a.id != id);
        Ok(self.work.articles.len() != before)
    }

    async fn insert_client(&mut self, client: &Client) -> Result<()> {
        self.work.clients.push(client.clone());
        Ok(())
    }

    async fn get_client(&mut self, id: ClientId) -> Result<Option<Client>> {
        Ok(self.work.clients.iter().find(|c| c.id == id).cloned())
    }

    async fn find_client(&mut self, name: &str, contact: Option<&str>) -> Result<Option<Client>> {
        Ok(self
            .work
            .clients
            .iter()
            .filter(|c| c.matches(name, contact))
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn update_client(&mut self, client: &Client) -> Result<()> {
        replace(&mut self.work.clients, client, |c| c.id == client.id);
        Ok(())
    }

    async fn list_clients(&mut self, search: Option<&str>) -> Result<Vec<Client>> {
        let mut clients: Vec<Client> = self
            .work
            .clients
            .iter()
            .filter(|c| {
                search.is_none_or(|q| contains_ci(&c.name, q) || contains_ci(&c.contact, q))
            })
            .cloned()
            .collect();
        clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(clients)
    }

    async fn insert_location(&mut self, location: &Location) -> Result<()> {
        self.work.locations.push(location.clone());
        Ok(())
    }

    async fn get_location(&mut self, id: LocationId) -> Result<Option<Location>> {
        Ok(self.work.locations.iter().find(|l| l.id == id).cloned())
    }

    async fn find_location(&mut self, name: &str) -> Result<Option<Location>> {
        Ok(self
            .work
            .locations
            .iter()
            .filter(|l| l.matches(name))
            .min_by_key(|l| l.created_at)
            .cloned())
    }

    async fn list_locations(&mut self, filter: &LocationFilter) -> Result<Vec<Location>> {
        let mut locations: Vec<Location> = self
            .work
            .locations
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    async fn active_configuration(&mut self) -> Result<Option<ChannelConfiguration>> {
        Ok(self
            .work
            .configurations
            .iter()
            .min_by_key(|c| c.created_at)
            .cloned())
    }

    async fn insert_configuration(&mut self, configuration: &ChannelConfiguration) -> Result<()> {
        self.work.configurations.push(configuration.clone());
        Ok(())
    }

    async fn get_page(&mut self, id: PageId) -> Result<Option<Page>> {
        Ok(self.work.pages.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_page(&mut self, page: &Page) -> Result<()> {
        self.work.pages.push(page.clone());
        Ok(())
    }

    async fn list_pages(&mut self, configuration: ConfigurationId) -> Result<Vec<Page>> {
        let mut pages: Vec<Page> = self
            .work
            .pages
            .iter()
            .filter(|p| p.configuration_id == configuration)
            .cloned()
            .collect();
        pages.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        Ok(pages)
    }

    async fn insert_fee(&mut self, fee: &FeeSnapshot) -> Result<()> {
        self.work.fees.push(fee.clone());
        Ok(())
    }

    async fn get_fee(&mut self, id: FeeId) -> Result<Option<FeeSnapshot>> {
        Ok(self.work.fees.iter().find(|f| f.id == id).cloned())
    }

    async fn fees_by_ids(&mut self, ids: &[FeeId]) -> Result<Vec<FeeSnapshot>> {
        Ok(self
            .work
            .fees
            .iter()
            .filter(|f| ids.contains(&f.id))
            .cloned()
            .collect())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.work.orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.work.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.get_order(id).await
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        replace(&mut self.work.orders, order, |o| o.id == order.id);
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool> {
        let tables = &mut self.work;
        let before = tables.orders.len();
        tables.orders.retain(|o| o.id != id);
        if tables.orders.len() == before {
            return Ok(false);
        }
        tables.order_lines.retain(|l| l.order_id != id);
        tables.payments.retain(|p| p.order_id != id);
        tables.invoices.retain(|i| i.order_id != id);
        let deliveries: Vec<DeliveryId> = tables
            .deliveries
            .iter()
            .filter(|d| d.order_id == id)
            .map(|d| d.id)
            .collect();
        tables.deliveries.retain(|d| d.order_id != id);
        tables
            .delivery_events
            .retain(|e| !deliveries.contains(&e.delivery_id));
        for charge in tables.charges.iter_mut().filter(|c| c.order_id == Some(id)) {
            charge.order_id = None;
        }
        Ok(true)
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let tables = &self.work;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| filter.matches(o, tables.location_name(o.location_id)))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = usize::try_from(filter.offset).unwrap_or_default();
        let limit = filter
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        Ok(orders.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_orders(&mut self, filter: &OrderFilter) -> Result<i64> {
        let tables = &self.work;
        let count = tables
            .orders
            .iter()
            .filter(|o| filter.matches(o, tables.location_name(o.location_id)))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn orders_without_delivery(&mut self, limit: i64) -> Result<Vec<Order>> {
        let tables = &self.work;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| !o.status.is_finalized())
            .filter(|o| !tables.deliveries.iter().any(|d| d.order_id == o.id))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders.truncate(usize::try_from(limit).unwrap_or_default());
        Ok(orders)
    }

    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<()> {
        self.work.order_lines.push(line.clone());
        Ok(())
    }

    async fn order_lines(&mut self, order: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self
            .work
            .order_lines
            .iter()
            .filter(|l| l.order_id == order)
            .cloned()
            .collect())
    }

    async fn lines_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<OrderLine>> {
        Ok(self
            .work
            .order_lines
            .iter()
            .filter(|l| orders.contains(&l.order_id))
            .cloned()
            .collect())
    }

    async fn delete_order_lines(&mut self, order: OrderId) -> Result<u64> {
        let before = self.work.order_lines.len();
        self.work.order_lines.retain(|l| l.order_id != order);
        Ok((before - self.work.order_lines.len()) as u64)
    }

    async fn payment_for_order(&mut self, order: OrderId) -> Result<Option<Payment>> {
        Ok(self
            .work
            .payments
            .iter()
            .find(|p| p.order_id == order)
            .cloned())
    }

    async fn lock_payment(&mut self, order: OrderId) -> Result<Option<Payment>> {
        self.payment_for_order(order).await
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        if self
            .work
            .payments
            .iter()
            .any(|p| p.order_id == payment.order_id)
        {
            return Err(StoreError::unique("payments_order_id_key"));
        }
        self.work.payments.push(payment.clone());
        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<()> {
        replace(&mut self.work.payments, payment, |p| p.id == payment.id);
        Ok(())
    }

    async fn payments_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<Payment>> {
        Ok(self
            .work
            .payments
            .iter()
            .filter(|p| orders.contains(&p.order_id))
            .cloned()
            .collect())
    }

    async fn insert_delivery(&mut self, delivery: &Delivery) -> Result<()> {
        if self
            .work
            .deliveries
            .iter()
            .any(|d| d.order_id == delivery.order_id)
        {
            return Err(StoreError::unique("deliveries_order_id_key"));
        }
        self.work.deliveries.push(delivery.clone());
        Ok(())
    }

    async fn get_delivery(&mut self, id: DeliveryId) -> Result<Option<Delivery>> {
        Ok(self.work.deliveries.iter().find(|d| d.id == id).cloned())
    }

    async fn lock_delivery(&mut self, id: DeliveryId) -> Result<Option<Delivery>> {
        self.get_delivery(id).await
    }

    async fn delivery_for_order(&mut self, order: OrderId) -> Result<Option<Delivery>> {
        Ok(self
            .work
            .deliveries
            .iter()
            .find(|d| d.order_id == order)
            .cloned())
    }

    async fn update_delivery(&mut self, delivery: &Delivery) -> Result<()> {
        replace(&mut self.work.deliveries, delivery, |d| d.id == delivery.id);
        Ok(())
    }

    async fn list_deliveries(&mut self, filter: &DeliveryFilter) -> Result<Vec<Delivery>> {
        let tables = &self.work;
        let mut deliveries: Vec<Delivery> = tables
            .deliveries
            .iter()
            .filter(|d| filter.status.is_none_or(|s| d.status == s))
            .filter(|d| filter.date_prevue.is_none_or(|date| d.date_prevue == Some(date)))
            .filter(|d| {
                if filter.page_id.is_none() && filter.search.is_none() {
                    return true;
                }
                let Some(order) = tables.orders.iter().find(|o| o.id == d.order_id) else {
                    return false;
                };
                filter.page_id.is_none_or(|p| order.page_id == Some(p))
                    && filter.search.as_deref().is_none_or(|q| {
                        contains_ci(&order.client.name, q) || contains_ci(&order.client.contact, q)
                    })
            })
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deliveries)
    }

    async fn deliveries_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<Delivery>> {
        Ok(self
            .work
            .deliveries
            .iter()
            .filter(|d| orders.contains(&d.order_id))
            .cloned()
            .collect())
    }

    async fn append_delivery_event(&mut self, event: &DeliveryEvent) -> Result<()> {
        self.work.delivery_events.push(event.clone());
        Ok(())
    }

    async fn delivery_events(&mut self, delivery: DeliveryId) -> Result<Vec<DeliveryEvent>> {
        Ok(self
            .work
            .delivery_events
            .iter()
            .filter(|e| e.delivery_id == delivery)
            .cloned()
            .collect())
    }

    async fn invoice_for_order(&mut self, order: OrderId) -> Result<Option<Invoice>> {
        Ok(self
            .work
            .invoices
            .iter()
            .find(|i| i.order_id == order)
            .cloned())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        if self
            .work
            .invoices
            .iter()
            .any(|i| i.order_id == invoice.order_id)
        {
            return Err(StoreError::unique("invoices_order_id_key"));
        }
        if self.work.invoices.iter().any(|i| i.numero == invoice.numero) {
            return Err(StoreError::unique("invoices_numero_key"));
        }
        self.work.invoices.push(invoice.clone());
        Ok(())
    }

    async fn next_invoice_sequence(&mut self, year: i32) -> Result<u32> {
        let tables = &mut self.work;
        if !tables.invoice_counters.contains_key(&year) {
            let seed = last_sequence(tables.invoices.iter().map(|i| i.numero.as_str()), year);
            tables.invoice_counters.insert(year, seed);
        }
        let counter = tables.invoice_counters.entry(year).or_default();
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        self.work.purchases.push(purchase.clone());
        Ok(())
    }

    async fn get_purchase(&mut self, id: PurchaseId) -> Result<Option<Purchase>> {
        Ok(self.work.purchases.iter().find(|p| p.id == id).cloned())
    }

    async fn update_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        replace(&mut self.work.purchases, purchase, |p| p.id == purchase.id);
        Ok(())
    }

    async fn delete_purchase(&mut self, id: PurchaseId) -> Result<bool> {
        let before = self.work.purchases.len();
        self.work.purchases.retain(|p| p.id != id);
        self.work.purchase_lines.retain(|l| l.purchase_id != id);
        Ok(self.work.purchases.len() != before)
    }

    async fn list_purchases(&mut self) -> Result<Vec<Purchase>> {
        let mut purchases = self.work.purchases.clone();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(purchases)
    }

    async fn insert_purchase_line(&mut self, line: &PurchaseLine) -> Result<()> {
        self.work.purchase_lines.push(line.clone());
        Ok(())
    }

    async fn purchase_lines(&mut self, purchase: PurchaseId) -> Result<Vec<PurchaseLine>> {
        Ok(self
            .work
            .purchase_lines
            .iter()
            .filter(|l| l.purchase_id == purchase)
            .cloned()
            .collect())
    }

    async fn delete_purchase_lines(&mut self, purchase: PurchaseId) -> Result<u64> {
        let before = self.work.purchase_lines.len();
        self.work.purchase_lines.retain(|l| l.purchase_id != purchase);
        Ok((before - self.work.purchase_lines.len()) as u64)
    }

    async fn latest_purchase_costs(
        &mut self,
        articles: &[ArticleId],
    ) -> Result<HashMap<ArticleId, Money>> {
        let tables = &self.work;
        let mut latest: HashMap<ArticleId, &PurchaseLine> = HashMap::new();
        let rank = |line: &PurchaseLine| {
            let date = tables
                .purchases
                .iter()
                .find(|p| p.id == line.purchase_id)
                .and_then(|p| p.purchase_date);
            (date, line.created_at)
        };
        for line in tables
            .purchase_lines
            .iter()
            .filter(|l| articles.contains(&l.article_id))
        {
            match latest.get(&line.article_id) {
                Some(current) if rank(*current) >= rank(line) => {}
                _ => {
                    latest.insert(line.article_id, line);
                }
            }
        }
        Ok(latest
            .into_iter()
            .map(|(article, line)| (article, line.unit_cost))
            .collect())
    }

    async fn insert_charge_category(&mut self, category: &ChargeCategory) -> Result<()> {
        if self
            .work
            .charge_categories
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&category.name))
        {
            return Err(StoreError::unique("charge_categories_name_key"));
        }
        self.work.charge_categories.push(category.clone());
        Ok(())
    }

    async fn get_charge_category(&mut self, id: ChargeCategoryId) -> Result<Option<ChargeCategory>> {
        Ok(self
            .work
            .charge_categories
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list_charge_categories(&mut self) -> Result<Vec<ChargeCategory>> {
        let mut categories = self.work.charge_categories.clone();
        categories.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn insert_charge(&mut self, charge: &Charge) -> Result<()> {
        self.work.charges.push(charge.clone());
        Ok(())
    }

    async fn get_charge(&mut self, id: ChargeId) -> Result<Option<Charge>> {
        Ok(self.work.charges.iter().find(|c| c.id == id).cloned())
    }

    async fn update_charge(&mut self, charge: &Charge) -> Result<()> {
        replace(&mut self.work.charges, charge, |c| c.id == charge.id);
        Ok(())
    }

    async fn delete_charge(&mut self, id: ChargeId) -> Result<bool> {
        let before = self.work.charges.len();
        self.work.charges.retain(|c| c.id != id);
        Ok(self.work.charges.len() != before)
    }

    async fn list_charges(&mut self, filter: &ChargeFilter) -> Result<Vec<Charge>> {
        let mut charges: Vec<Charge> = self
            .work
            .charges
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        charges.sort_by(|a, b| {
            b.date_charge
                .cmp(&a.date_charge)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(charges)
    }
}
