use std::collections::HashMap;

use async_trait::async_trait;
use common::{
    ArticleId, ChargeCategoryId, ChargeId, ClientId, ConfigurationId, DeliveryId, FeeId,
    LocationId, OrderId, PageId, PurchaseId,
};
use domain::{
    Article, ChannelConfiguration, Charge, ChargeCategory, Client, Delivery, DeliveryEvent,
    FeeSnapshot, Invoice, Location, Money, Order, OrderLine, Page, Payment, Purchase,
    PurchaseLine,
};

use crate::{ChargeFilter, DeliveryFilter, LocationFilter, OrderFilter, Result};

/// Entry point of a persistence backend.
///
/// Every service operation runs inside exactly one [`Transaction`]. A
/// transaction must be committed explicitly; dropping it discards every write.
/// Implementations must not be asked to open a second transaction while the
/// current task still holds one.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Tx: Transaction;

    async fn begin(&self) -> Result<Self::Tx>;
}

/// A unit of work over all back-office tables.
///
/// `lock_*` methods return the row and hold a write lock on it until the
/// transaction ends.
#[async_trait]
pub trait Transaction: Send {
    async fn commit(self) -> Result<()>;

    // Articles

    async fn insert_article(&mut self, article: &Article) -> Result<()>;
    async fn get_article(&mut self, id: ArticleId) -> Result<Option<Article>>;
    async fn lock_article(&mut self, id: ArticleId) -> Result<Option<Article>>;
    async fn update_article(&mut self, article: &Article) -> Result<()>;
    async fn list_articles(&mut self, search: Option<&str>) -> Result<Vec<Article>>;
    /// Fails with [`crate::StoreError::Referenced`] while order or purchase lines use it.
    async fn delete_article(&mut self, id: ArticleId) -> Result<bool>;

    // Clients

    async fn insert_client(&mut self, client: &Client) -> Result<()>;
    async fn get_client(&mut self, id: ClientId) -> Result<Option<Client>>;
    /// Newest client whose name (and contact, when given) match case-insensitively.
    async fn find_client(&mut self, name: &str, contact: Option<&str>) -> Result<Option<Client>>;
    async fn update_client(&mut self, client: &Client) -> Result<()>;
    async fn list_clients(&mut self, search: Option<&str>) -> Result<Vec<Client>>;

    // Locations

    async fn insert_location(&mut self, location: &Location) -> Result<()>;
    async fn get_location(&mut self, id: LocationId) -> Result<Option<Location>>;
    /// Oldest location whose name matches case-insensitively.
    async fn find_location(&mut self, name: &str) -> Result<Option<Location>>;
    async fn list_locations(&mut self, filter: &LocationFilter) -> Result<Vec<Location>>;

    // Sales channels

    /// Oldest configuration record.
    async fn active_configuration(&mut self) -> Result<Option<ChannelConfiguration>>;
    async fn insert_configuration(&mut self, configuration: &ChannelConfiguration) -> Result<()>;
    async fn get_page(&mut self, id: PageId) -> Result<Option<Page>>;
    async fn insert_page(&mut self, page: &Page) -> Result<()>;
    async fn list_pages(&mut self, configuration: ConfigurationId) -> Result<Vec<Page>>;

    // Fee snapshots

    async fn insert_fee(&mut self, fee: &FeeSnapshot) -> Result<()>;
    async fn get_fee(&mut self, id: FeeId) -> Result<Option<FeeSnapshot>>;
    async fn fees_by_ids(&mut self, ids: &[FeeId]) -> Result<Vec<FeeSnapshot>>;

    // Orders

    async fn insert_order(&mut self, order: &Order) -> Result<()>;
    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>>;
    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>>;
    async fn update_order(&mut self, order: &Order) -> Result<()>;
    /// Deletes the order with its lines and satellite records.
    async fn delete_order(&mut self, id: OrderId) -> Result<bool>;
    /// Newest first.
    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>>;
    /// Ignores `limit` and `offset`.
    async fn count_orders(&mut self, filter: &OrderFilter) -> Result<i64>;
    /// Oldest open orders that have no delivery record.
    async fn orders_without_delivery(&mut self, limit: i64) -> Result<Vec<Order>>;

    // Order lines

    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<()>;
    async fn order_lines(&mut self, order: OrderId) -> Result<Vec<OrderLine>>;
    async fn lines_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<OrderLine>>;
    async fn delete_order_lines(&mut self, order: OrderId) -> Result<u64>;

    // Payments

    async fn payment_for_order(&mut self, order: OrderId) -> Result<Option<Payment>>;
    async fn lock_payment(&mut self, order: OrderId) -> Result<Option<Payment>>;
    async fn insert_payment(&mut self, payment: &Payment) -> Result<()>;
    async fn update_payment(&mut self, payment: &Payment) -> Result<()>;
    async fn payments_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<Payment>>;

    // Deliveries

    async fn insert_delivery(&mut self, delivery: &Delivery) -> Result<()>;
    async fn get_delivery(&mut self, id: DeliveryId) -> Result<Option<Delivery>>;
    async fn lock_delivery(&mut self, id: DeliveryId) -> Result<Option<Delivery>>;
    async fn delivery_for_order(&mut self, order: OrderId) -> Result<Option<Delivery>>;
    async fn update_delivery(&mut self, delivery: &Delivery) -> Result<()>;
    async fn list_deliveries(&mut self, filter: &DeliveryFilter) -> Result<Vec<Delivery>>;
    async fn deliveries_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<Delivery>>;
    async fn append_delivery_event(&mut self, event: &DeliveryEvent) -> Result<()>;
    /// Oldest first.
    async fn delivery_events(&mut self, delivery: DeliveryId) -> Result<Vec<DeliveryEvent>>;

    // Invoices

    async fn invoice_for_order(&mut self, order: OrderId) -> Result<Option<Invoice>>;
    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<()>;
    /// Reserves the next sequence of `year`, seeded from existing numbers.
    async fn next_invoice_sequence(&mut self, year: i32) -> Result<u32>;

    // Purchases

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()>;
    async fn get_purchase(&mut self, id: PurchaseId) -> Result<Option<Purchase>>;
    async fn update_purchase(&mut self, purchase: &Purchase) -> Result<()>;
    async fn delete_purchase(&mut self, id: PurchaseId) -> Result<bool>;
    /// Newest first.
    async fn list_purchases(&mut self) -> Result<Vec<Purchase>>;
    async fn insert_purchase_line(&mut self, line: &PurchaseLine) -> Result<()>;
    async fn purchase_lines(&mut self, purchase: PurchaseId) -> Result<Vec<PurchaseLine>>;
    async fn delete_purchase_lines(&mut self, purchase: PurchaseId) -> Result<u64>;
    /// Unit cost of the most recent purchase line per article.
    async fn latest_purchase_costs(
        &mut self,
        articles: &[ArticleId],
    ) -> Result<HashMap<ArticleId, Money>>;

    // Expenses

    async fn insert_charge_category(&mut self, category: &ChargeCategory) -> Result<()>;
    async fn get_charge_category(&mut self, id: ChargeCategoryId) -> Result<Option<ChargeCategory>>;
    async fn list_charge_categories(&mut self) -> Result<Vec<ChargeCategory>>;
    async fn insert_charge(&mut self, charge: &Charge) -> Result<()>;
    async fn get_charge(&mut self, id: ChargeId) -> Result<Option<Charge>>;
    async fn update_charge(&mut self, charge: &Charge) -> Result<()>;
    async fn delete_charge(&mut self, id: ChargeId) -> Result<bool>;
    async fn list_charges(&mut self, filter: &ChargeFilter) -> Result<Vec<Charge>>;
}
