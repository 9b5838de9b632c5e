use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use common::{
    ArticleId, ChargeCategoryId, ChargeId, ClientId, ConfigurationId, DeliveryEventId, DeliveryId,
    FeeId, InvoiceId, LocationId, OrderId, OrderLineId, PageId, PaymentId, PurchaseId,
    PurchaseLineId, UserId,
};
use domain::{
    Article, ChannelConfiguration, Charge, ChargeCategory, Client, ClientSnapshot, Delivery,
    DeliveryEvent, DomainError, FeeSnapshot, Invoice, Location, Money, Order, OrderLine, Page,
    Payment, Purchase, PurchaseLine,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ChargeFilter, DeliveryFilter, LocationFilter, OrderFilter, Result, StoreError,
    store::{Store, Transaction},
};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTransaction;

    async fn begin(&self) -> Result<PostgresTransaction> {
        Ok(PostgresTransaction {
            tx: self.pool.begin().await?,
        })
    }
}

const ARTICLE_COLUMNS: &str =
    "id, name, reference, purchase_price, sale_price, description, stock, created_at, updated_at";
const CLIENT_COLUMNS: &str = "id, name, address, contact, created_at, updated_at";
const LOCATION_COLUMNS: &str = "id, name, category, active, created_at, updated_at";
const PAGE_COLUMNS: &str = "id, configuration_id, name, link, position, active, created_at";
const FEE_COLUMNS: &str =
    "id, location_id, computed, override_amount, final_amount, created_at";
const ORDER_COLUMNS: &str = "o.id, o.user_id, o.page_id, o.client_id, o.location_id, o.fee_id, \
     o.precision_lieu, o.date_livraison, o.client_name, o.client_contact, o.client_address, \
     o.status, o.note, o.created_at, o.updated_at";
const LINE_COLUMNS: &str = "id, order_id, article_id, quantity, unit_price, created_at";
const PAYMENT_COLUMNS: &str = "id, order_id, status, mode, reference, collected_by, collected_at, \
     note, created_at, updated_at";
const DELIVERY_COLUMNS: &str = "d.id, d.order_id, d.status, d.date_prevue, d.date_reelle, \
     d.reason, d.comment, d.updated_by, d.created_at, d.updated_at";
const EVENT_COLUMNS: &str =
    "id, delivery_id, from_status, to_status, message, meta, actor, created_at";
const PURCHASE_COLUMNS: &str =
    "id, user_id, supplier, purchase_date, note, created_at, updated_at";
const PURCHASE_LINE_COLUMNS: &str = "id, purchase_id, article_id, quantity, unit_cost, \
     unit_sale_price, update_article_prices, created_at";
const CHARGE_COLUMNS: &str = "id, date_charge, category_id, label, description, amount, status, \
     payment_mode, order_id, created_by, created_at, updated_at";

/// Maps constraint violations on writes to store errors.
fn write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::unique(db_err.constraint().unwrap_or("unique"));
    }
    StoreError::Database(e)
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn quantity_to_db(quantity: u32) -> Result<i32> {
    i32::try_from(quantity).map_err(|_| StoreError::Corrupt(format!("quantity {quantity} out of range")))
}

fn quantity_from_row(row: &PgRow) -> Result<u32> {
    let quantity: i32 = row.try_get("quantity")?;
    u32::try_from(quantity).map_err(|_| StoreError::Corrupt(format!("negative quantity {quantity}")))
}

fn code<T: FromStr<Err = DomainError>>(row: &PgRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: DomainError| StoreError::Corrupt(format!("{column}: {e}")))
}

fn optional_code<T: FromStr<Err = DomainError>>(row: &PgRow, column: &str) -> Result<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        value
            .parse()
            .map_err(|e: DomainError| StoreError::Corrupt(format!("{column}: {e}")))
    })
    .transpose()
}

fn money(row: &PgRow, column: &str) -> Result<Money> {
    Ok(Money::new(row.try_get::<Decimal, _>(column)?))
}

fn user(row: &PgRow, column: &str) -> Result<Option<UserId>> {
    Ok(row.try_get::<Option<i64>, _>(column)?.map(UserId::new))
}

fn article_from_row(row: &PgRow) -> Result<Article> {
    Ok(Article {
        id: ArticleId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        reference: row.try_get("reference")?,
        purchase_price: money(row, "purchase_price")?,
        sale_price: money(row, "sale_price")?,
        description: row.try_get("description")?,
        stock: row.try_get("stock")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn client_from_row(row: &PgRow) -> Result<Client> {
    Ok(Client {
        id: ClientId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        contact: row.try_get("contact")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn location_from_row(row: &PgRow) -> Result<Location> {
    Ok(Location {
        id: LocationId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        category: code(row, "category")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn configuration_from_row(row: &PgRow) -> Result<ChannelConfiguration> {
    Ok(ChannelConfiguration {
        id: ConfigurationId::from_uuid(row.try_get("id")?),
        app_name: row.try_get("app_name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn page_from_row(row: &PgRow) -> Result<Page> {
    Ok(Page {
        id: PageId::from_uuid(row.try_get("id")?),
        configuration_id: ConfigurationId::from_uuid(row.try_get("configuration_id")?),
        name: row.try_get("name")?,
        link: row.try_get("link")?,
        position: row.try_get("position")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn fee_from_row(row: &PgRow) -> Result<FeeSnapshot> {
    Ok(FeeSnapshot {
        id: FeeId::from_uuid(row.try_get("id")?),
        location_id: LocationId::from_uuid(row.try_get("location_id")?),
        computed: row.try_get("computed")?,
        override_amount: row.try_get("override_amount")?,
        final_amount: row.try_get("final_amount")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        user_id: user(row, "user_id")?,
        page_id: row.try_get::<Option<Uuid>, _>("page_id")?.map(PageId::from_uuid),
        client_id: ClientId::from_uuid(row.try_get("client_id")?),
        location_id: LocationId::from_uuid(row.try_get("location_id")?),
        fee_id: FeeId::from_uuid(row.try_get("fee_id")?),
        precision_lieu: row.try_get("precision_lieu")?,
        date_livraison: row.try_get("date_livraison")?,
        client: ClientSnapshot {
            name: row.try_get("client_name")?,
            contact: row.try_get("client_contact")?,
            address: row.try_get("client_address")?,
        },
        status: code(row, "status")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn line_from_row(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        id: OrderLineId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        article_id: ArticleId::from_uuid(row.try_get("article_id")?),
        quantity: quantity_from_row(row)?,
        unit_price: money(row, "unit_price")?,
        created_at: row.try_get("created_at")?,
    })
}

fn payment_from_row(row: &PgRow) -> Result<Payment> {
    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        status: code(row, "status")?,
        mode: optional_code(row, "mode")?,
        reference: row.try_get("reference")?,
        collected_by: user(row, "collected_by")?,
        collected_at: row.try_get("collected_at")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn delivery_from_row(row: &PgRow) -> Result<Delivery> {
    Ok(Delivery {
        id: DeliveryId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        status: code(row, "status")?,
        date_prevue: row.try_get("date_prevue")?,
        date_reelle: row.try_get("date_reelle")?,
        reason: row.try_get("reason")?,
        comment: row.try_get("comment")?,
        updated_by: user(row, "updated_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn event_from_row(row: &PgRow) -> Result<DeliveryEvent> {
    Ok(DeliveryEvent {
        id: DeliveryEventId::from_uuid(row.try_get("id")?),
        delivery_id: DeliveryId::from_uuid(row.try_get("delivery_id")?),
        from_status: optional_code(row, "from_status")?,
        to_status: code(row, "to_status")?,
        message: row.try_get("message")?,
        meta: row.try_get("meta")?,
        actor: user(row, "actor")?,
        created_at: row.try_get("created_at")?,
    })
}

fn invoice_from_row(row: &PgRow) -> Result<Invoice> {
    Ok(Invoice {
        id: InvoiceId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        numero: row.try_get("numero")?,
        date_emission: row.try_get("date_emission")?,
    })
}

fn purchase_from_row(row: &PgRow) -> Result<Purchase> {
    Ok(Purchase {
        id: PurchaseId::from_uuid(row.try_get("id")?),
        user_id: user(row, "user_id")?,
        supplier: row.try_get("supplier")?,
        purchase_date: row.try_get("purchase_date")?,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn purchase_line_from_row(row: &PgRow) -> Result<PurchaseLine> {
    Ok(PurchaseLine {
        id: PurchaseLineId::from_uuid(row.try_get("id")?),
        purchase_id: PurchaseId::from_uuid(row.try_get("purchase_id")?),
        article_id: ArticleId::from_uuid(row.try_get("article_id")?),
        quantity: quantity_from_row(row)?,
        unit_cost: money(row, "unit_cost")?,
        unit_sale_price: money(row, "unit_sale_price")?,
        update_article_prices: row.try_get("update_article_prices")?,
        created_at: row.try_get("created_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<ChargeCategory> {
    Ok(ChargeCategory {
        id: ChargeCategoryId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        active: row.try_get("active")?,
        position: row.try_get("position")?,
    })
}

fn charge_from_row(row: &PgRow) -> Result<Charge> {
    Ok(Charge {
        id: ChargeId::from_uuid(row.try_get("id")?),
        date_charge: row.try_get("date_charge")?,
        category_id: ChargeCategoryId::from_uuid(row.try_get("category_id")?),
        label: row.try_get("label")?,
        description: row.try_get("description")?,
        amount: money(row, "amount")?,
        status: code(row, "status")?,
        payment_mode: code(row, "payment_mode")?,
        order_id: row.try_get::<Option<Uuid>, _>("order_id")?.map(OrderId::from_uuid),
        created_by: user(row, "created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_order_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND o.status = ").push_bind(status.as_str());
    }
    if let Some(client_id) = filter.client_id {
        qb.push(" AND o.client_id = ").push_bind(client_id.as_uuid());
    }
    if let Some(page_id) = filter.page_id {
        qb.push(" AND o.page_id = ").push_bind(page_id.as_uuid());
    }
    if let Some(date) = filter.date_livraison {
        qb.push(" AND o.date_livraison = ").push_bind(date);
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND o.created_at >= ").push_bind(from);
    }
    if let Some(before) = filter.created_before {
        qb.push(" AND o.created_at < ").push_bind(before);
    }
    if let Some(client) = filter.client.as_deref() {
        let pattern = like_pattern(client);
        qb.push(" AND (o.client_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR o.client_contact ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(location) = filter.location.as_deref() {
        qb.push(" AND l.name ILIKE ").push_bind(like_pattern(location));
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = like_pattern(search);
        qb.push(" AND (o.client_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR o.client_contact ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR l.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR o.note ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn insert_article(&mut self, article: &Article) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO articles (id, name, reference, purchase_price, sale_price, description, stock, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(article.id.as_uuid())
        .bind(&article.name)
        .bind(&article.reference)
        .bind(article.purchase_price.amount())
        .bind(article.sale_price.amount())
        .bind(&article.description)
        .bind(article.stock)
        .bind(article.created_at)
        .bind(article.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_article(&mut self, id: ArticleId) -> Result<Option<Article>> {
        let row = sqlx::query(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn lock_article(&mut self, id: ArticleId) -> Result<Option<Article>> {
        let row = sqlx::query(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(article_from_row).transpose()
    }

    async fn update_article(&mut self, article: &Article) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE articles
            SET name = $2, reference = $3, purchase_price = $4, sale_price = $5,
                description = $6, stock = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(article.id.as_uuid())
        .bind(&article.name)
        .bind(&article.reference)
        .bind(article.purchase_price.amount())
        .bind(article.sale_price.amount())
        .bind(&article.description)
        .bind(article.stock)
        .bind(article.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn list_articles(&mut self, search: Option<&str>) -> Result<Vec<Article>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE 1=1"
        ));
        if let Some(search) = search {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR reference ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY name ASC");
        let rows = qb.build().fetch_all(&mut *self.tx).await?;
        rows.iter().map(article_from_row).collect()
    }

    async fn delete_article(&mut self, id: ArticleId) -> Result<bool> {
        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM order_lines WHERE article_id = $1)
                OR EXISTS (SELECT 1 FROM purchase_lines WHERE article_id = $1)
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&mut *self.tx)
        .await?;
        if referenced {
            return Err(StoreError::Referenced {
                entity: "article",
                id: id.to_string(),
            });
        }
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_client(&mut self, client: &Client) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (id, name, address, contact, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(client.id.as_uuid())
        .bind(&client.name)
        .bind(&client.address)
        .bind(&client.contact)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_client(&mut self, id: ClientId) -> Result<Option<Client>> {
        let row = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(client_from_row).transpose()
    }

    async fn find_client(&mut self, name: &str, contact: Option<&str>) -> Result<Option<Client>> {
        let contact = contact.map(str::trim).filter(|c| !c.is_empty());
        let row = sqlx::query(&format!(
            r#"
            SELECT {CLIENT_COLUMNS} FROM clients
            WHERE lower(trim(name)) = lower(trim($1))
              AND ($2::text IS NULL OR lower(trim(contact)) = lower($2))
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(name)
        .bind(contact)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(client_from_row).transpose()
    }

    async fn update_client(&mut self, client: &Client) -> Result<()> {
        sqlx::query(
            "UPDATE clients SET name = $2, address = $3, contact = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(client.id.as_uuid())
        .bind(&client.name)
        .bind(&client.address)
        .bind(&client.contact)
        .bind(client.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn list_clients(&mut self, search: Option<&str>) -> Result<Vec<Client>> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE 1=1"));
        if let Some(search) = search {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR contact ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY created_at DESC");
        let rows = qb.build().fetch_all(&mut *self.tx).await?;
        rows.iter().map(client_from_row).collect()
    }

    async fn insert_location(&mut self, location: &Location) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO locations (id, name, category, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(location.id.as_uuid())
        .bind(&location.name)
        .bind(location.category.as_str())
        .bind(location.active)
        .bind(location.created_at)
        .bind(location.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_location(&mut self, id: LocationId) -> Result<Option<Location>> {
        let row = sqlx::query(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(location_from_row).transpose()
    }

    async fn find_location(&mut self, name: &str) -> Result<Option<Location>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {LOCATION_COLUMNS} FROM locations
            WHERE lower(trim(name)) = lower(trim($1))
            ORDER BY created_at ASC
            LIMIT 1
            "#
        ))
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(location_from_row).transpose()
    }

    async fn list_locations(&mut self, filter: &LocationFilter) -> Result<Vec<Location>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {LOCATION_COLUMNS} FROM locations WHERE 1=1"
        ));
        if let Some(search) = filter.search.as_deref() {
            qb.push(" AND name ILIKE ").push_bind(like_pattern(search));
        }
        if let Some(active) = filter.active {
            qb.push(" AND active = ").push_bind(active);
        }
        if let Some(category) = filter.category {
            qb.push(" AND category = ").push_bind(category.as_str());
        }
        qb.push(" ORDER BY name ASC");
        let rows = qb.build().fetch_all(&mut *self.tx).await?;
        rows.iter().map(location_from_row).collect()
    }

    async fn active_configuration(&mut self) -> Result<Option<ChannelConfiguration>> {
        let row = sqlx::query(
            "SELECT id, app_name, created_at FROM configurations ORDER BY created_at ASC LIMIT 1",
        )
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(configuration_from_row).transpose()
    }

    async fn insert_configuration(&mut self, configuration: &ChannelConfiguration) -> Result<()> {
        sqlx::query("INSERT INTO configurations (id, app_name, created_at) VALUES ($1, $2, $3)")
            .bind(configuration.id.as_uuid())
            .bind(&configuration.app_name)
            .bind(configuration.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(write_error)?;
        Ok(())
    }

    async fn get_page(&mut self, id: PageId) -> Result<Option<Page>> {
        let row = sqlx::query(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn insert_page(&mut self, page: &Page) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pages (id, configuration_id, name, link, position, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(page.id.as_uuid())
        .bind(page.configuration_id.as_uuid())
        .bind(&page.name)
        .bind(&page.link)
        .bind(page.position)
        .bind(page.active)
        .bind(page.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn list_pages(&mut self, configuration: ConfigurationId) -> Result<Vec<Page>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE configuration_id = $1 ORDER BY position ASC, name ASC"
        ))
        .bind(configuration.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(page_from_row).collect()
    }

    async fn insert_fee(&mut self, fee: &FeeSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fees (id, location_id, computed, override_amount, final_amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(fee.id.as_uuid())
        .bind(fee.location_id.as_uuid())
        .bind(fee.computed)
        .bind(fee.override_amount)
        .bind(fee.final_amount)
        .bind(fee.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_fee(&mut self, id: FeeId) -> Result<Option<FeeSnapshot>> {
        let row = sqlx::query(&format!("SELECT {FEE_COLUMNS} FROM fees WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(fee_from_row).transpose()
    }

    async fn fees_by_ids(&mut self, ids: &[FeeId]) -> Result<Vec<FeeSnapshot>> {
        let rows = sqlx::query(&format!("SELECT {FEE_COLUMNS} FROM fees WHERE id = ANY($1)"))
            .bind(uuids(ids))
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(fee_from_row).collect()
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, page_id, client_id, location_id, fee_id, precision_lieu,
                                date_livraison, client_name, client_contact, client_address, status,
                                note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.map(|u| u.as_i64()))
        .bind(order.page_id.map(|p| p.as_uuid()))
        .bind(order.client_id.as_uuid())
        .bind(order.location_id.as_uuid())
        .bind(order.fee_id.as_uuid())
        .bind(&order.precision_lieu)
        .bind(order.date_livraison)
        .bind(&order.client.name)
        .bind(&order.client.contact)
        .bind(&order.client.address)
        .bind(order.status.as_str())
        .bind(&order.note)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(order_from_row).transpose()
    }

    async fn update_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET page_id = $2, client_id = $3, location_id = $4, fee_id = $5, precision_lieu = $6,
                date_livraison = $7, client_name = $8, client_contact = $9, client_address = $10,
                status = $11, note = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.page_id.map(|p| p.as_uuid()))
        .bind(order.client_id.as_uuid())
        .bind(order.location_id.as_uuid())
        .bind(order.fee_id.as_uuid())
        .bind(&order.precision_lieu)
        .bind(order.date_livraison)
        .bind(&order.client.name)
        .bind(&order.client.contact)
        .bind(&order.client.address)
        .bind(order.status.as_str())
        .bind(&order.note)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ORDER_COLUMNS} FROM orders o JOIN locations l ON l.id = o.location_id WHERE 1=1"
        ));
        push_order_filter(&mut qb, filter);
        qb.push(" ORDER BY o.created_at DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        qb.push(" OFFSET ").push_bind(filter.offset);
        let rows = qb.build().fetch_all(&mut *self.tx).await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn count_orders(&mut self, filter: &OrderFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM orders o JOIN locations l ON l.id = o.location_id WHERE 1=1",
        );
        push_order_filter(&mut qb, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&mut *self.tx).await?;
        Ok(count)
    }

    async fn orders_without_delivery(&mut self, limit: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders o
            WHERE o.status NOT IN ('LIVREE', 'ANNULEE')
              AND NOT EXISTS (SELECT 1 FROM deliveries d WHERE d.order_id = o.id)
            ORDER BY o.created_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(order_from_row).collect()
    }

    async fn insert_order_line(&mut self, line: &OrderLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_lines (id, order_id, article_id, quantity, unit_price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.order_id.as_uuid())
        .bind(line.article_id.as_uuid())
        .bind(quantity_to_db(line.quantity)?)
        .bind(line.unit_price.amount())
        .bind(line.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn order_lines(&mut self, order: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(order.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(line_from_row).collect()
    }

    async fn lines_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ANY($1) ORDER BY created_at ASC"
        ))
        .bind(uuids(orders))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(line_from_row).collect()
    }

    async fn delete_order_lines(&mut self, order: OrderId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(order.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn payment_for_order(&mut self, order: OrderId) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1"
        ))
        .bind(order.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn lock_payment(&mut self, order: OrderId) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 FOR UPDATE"
        ))
        .bind(order.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, status, mode, reference, collected_by, collected_at,
                                  note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.mode.map(|m| m.as_str()))
        .bind(&payment.reference)
        .bind(payment.collected_by.map(|u| u.as_i64()))
        .bind(payment.collected_at)
        .bind(&payment.note)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, mode = $3, reference = $4, collected_by = $5, collected_at = $6,
                note = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(payment.mode.map(|m| m.as_str()))
        .bind(&payment.reference)
        .bind(payment.collected_by.map(|u| u.as_i64()))
        .bind(payment.collected_at)
        .bind(&payment.note)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn payments_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ANY($1)"
        ))
        .bind(uuids(orders))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn insert_delivery(&mut self, delivery: &Delivery) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO deliveries (id, order_id, status, date_prevue, date_reelle, reason, comment,
                                    updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(delivery.id.as_uuid())
        .bind(delivery.order_id.as_uuid())
        .bind(delivery.status.as_str())
        .bind(delivery.date_prevue)
        .bind(delivery.date_reelle)
        .bind(&delivery.reason)
        .bind(&delivery.comment)
        .bind(delivery.updated_by.map(|u| u.as_i64()))
        .bind(delivery.created_at)
        .bind(delivery.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_delivery(&mut self, id: DeliveryId) -> Result<Option<Delivery>> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d WHERE d.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(delivery_from_row).transpose()
    }

    async fn lock_delivery(&mut self, id: DeliveryId) -> Result<Option<Delivery>> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d WHERE d.id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(delivery_from_row).transpose()
    }

    async fn delivery_for_order(&mut self, order: OrderId) -> Result<Option<Delivery>> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d WHERE d.order_id = $1"
        ))
        .bind(order.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(delivery_from_row).transpose()
    }

    async fn update_delivery(&mut self, delivery: &Delivery) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE deliveries
            SET status = $2, date_prevue = $3, date_reelle = $4, reason = $5, comment = $6,
                updated_by = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(delivery.id.as_uuid())
        .bind(delivery.status.as_str())
        .bind(delivery.date_prevue)
        .bind(delivery.date_reelle)
        .bind(&delivery.reason)
        .bind(&delivery.comment)
        .bind(delivery.updated_by.map(|u| u.as_i64()))
        .bind(delivery.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn list_deliveries(&mut self, filter: &DeliveryFilter) -> Result<Vec<Delivery>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d JOIN orders o ON o.id = d.order_id WHERE 1=1"
        ));
        if let Some(status) = filter.status {
            qb.push(" AND d.status = ").push_bind(status.as_str());
        }
        if let Some(date) = filter.date_prevue {
            qb.push(" AND d.date_prevue = ").push_bind(date);
        }
        if let Some(page_id) = filter.page_id {
            qb.push(" AND o.page_id = ").push_bind(page_id.as_uuid());
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            qb.push(" AND (o.client_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR o.client_contact ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY d.created_at DESC");
        let rows = qb.build().fetch_all(&mut *self.tx).await?;
        rows.iter().map(delivery_from_row).collect()
    }

    async fn deliveries_for_orders(&mut self, orders: &[OrderId]) -> Result<Vec<Delivery>> {
        let rows = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d WHERE d.order_id = ANY($1)"
        ))
        .bind(uuids(orders))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(delivery_from_row).collect()
    }

    async fn append_delivery_event(&mut self, event: &DeliveryEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO delivery_events (id, delivery_id, from_status, to_status, message, meta, actor, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.delivery_id.as_uuid())
        .bind(event.from_status.map(|s| s.as_str()))
        .bind(event.to_status.as_str())
        .bind(&event.message)
        .bind(&event.meta)
        .bind(event.actor.map(|u| u.as_i64()))
        .bind(event.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn delivery_events(&mut self, delivery: DeliveryId) -> Result<Vec<DeliveryEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM delivery_events WHERE delivery_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(delivery.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn invoice_for_order(&mut self, order: OrderId) -> Result<Option<Invoice>> {
        let row = sqlx::query(
            "SELECT id, order_id, numero, date_emission FROM invoices WHERE order_id = $1",
        )
        .bind(order.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> Result<()> {
        sqlx::query(
            "INSERT INTO invoices (id, order_id, numero, date_emission) VALUES ($1, $2, $3, $4)",
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.order_id.as_uuid())
        .bind(&invoice.numero)
        .bind(invoice.date_emission)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn next_invoice_sequence(&mut self, year: i32) -> Result<u32> {
        // The upsert takes a row lock on the year's counter until commit.
        let value: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_counters (year, last_value)
            VALUES (
                $1,
                COALESCE(
                    (SELECT MAX(CAST(SUBSTRING(numero FROM 5) AS INTEGER))
                     FROM invoices
                     WHERE numero ~ ('^' || $2 || '[0-9]{5}$')),
                    0
                ) + 1
            )
            ON CONFLICT (year) DO UPDATE SET last_value = invoice_counters.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .bind(year.to_string())
        .fetch_one(&mut *self.tx)
        .await?;
        u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("invoice counter {value}")))
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO purchases (id, user_id, supplier, purchase_date, note, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(purchase.id.as_uuid())
        .bind(purchase.user_id.map(|u| u.as_i64()))
        .bind(&purchase.supplier)
        .bind(purchase.purchase_date)
        .bind(&purchase.note)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_purchase(&mut self, id: PurchaseId) -> Result<Option<Purchase>> {
        let row = sqlx::query(&format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(purchase_from_row).transpose()
    }

    async fn update_purchase(&mut self, purchase: &Purchase) -> Result<()> {
        sqlx::query(
            "UPDATE purchases SET supplier = $2, purchase_date = $3, note = $4, updated_at = $5 WHERE id = $1",
        )
        .bind(purchase.id.as_uuid())
        .bind(&purchase.supplier)
        .bind(purchase.purchase_date)
        .bind(&purchase.note)
        .bind(purchase.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_purchase(&mut self, id: PurchaseId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM purchases WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_purchases(&mut self) -> Result<Vec<Purchase>> {
        let rows = sqlx::query(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases ORDER BY created_at DESC"
        ))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(purchase_from_row).collect()
    }

    async fn insert_purchase_line(&mut self, line: &PurchaseLine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO purchase_lines (id, purchase_id, article_id, quantity, unit_cost,
                                        unit_sale_price, update_article_prices, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(line.id.as_uuid())
        .bind(line.purchase_id.as_uuid())
        .bind(line.article_id.as_uuid())
        .bind(quantity_to_db(line.quantity)?)
        .bind(line.unit_cost.amount())
        .bind(line.unit_sale_price.amount())
        .bind(line.update_article_prices)
        .bind(line.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn purchase_lines(&mut self, purchase: PurchaseId) -> Result<Vec<PurchaseLine>> {
        let rows = sqlx::query(&format!(
            "SELECT {PURCHASE_LINE_COLUMNS} FROM purchase_lines WHERE purchase_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(purchase.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(purchase_line_from_row).collect()
    }

    async fn delete_purchase_lines(&mut self, purchase: PurchaseId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM purchase_lines WHERE purchase_id = $1")
            .bind(purchase.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn latest_purchase_costs(
        &mut self,
        articles: &[ArticleId],
    ) -> Result<HashMap<ArticleId, Money>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (l.article_id) l.article_id, l.unit_cost
            FROM purchase_lines l
            JOIN purchases p ON p.id = l.purchase_id
            WHERE l.article_id = ANY($1)
            ORDER BY l.article_id, p.purchase_date DESC NULLS LAST, l.created_at DESC
            "#,
        )
        .bind(uuids(articles))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter()
            .map(|row| {
                Ok((
                    ArticleId::from_uuid(row.try_get("article_id")?),
                    money(row, "unit_cost")?,
                ))
            })
            .collect()
    }

    async fn insert_charge_category(&mut self, category: &ChargeCategory) -> Result<()> {
        sqlx::query(
            "INSERT INTO charge_categories (id, name, active, position) VALUES ($1, $2, $3, $4)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(category.active)
        .bind(category.position)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_charge_category(&mut self, id: ChargeCategoryId) -> Result<Option<ChargeCategory>> {
        let row = sqlx::query("SELECT id, name, active, position FROM charge_categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_charge_categories(&mut self) -> Result<Vec<ChargeCategory>> {
        let rows = sqlx::query(
            "SELECT id, name, active, position FROM charge_categories ORDER BY position ASC, name ASC",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn insert_charge(&mut self, charge: &Charge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO charges (id, date_charge, category_id, label, description, amount, status,
                                 payment_mode, order_id, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(charge.id.as_uuid())
        .bind(charge.date_charge)
        .bind(charge.category_id.as_uuid())
        .bind(&charge.label)
        .bind(&charge.description)
        .bind(charge.amount.amount())
        .bind(charge.status.as_str())
        .bind(charge.payment_mode.as_str())
        .bind(charge.order_id.map(|o| o.as_uuid()))
        .bind(charge.created_by.map(|u| u.as_i64()))
        .bind(charge.created_at)
        .bind(charge.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_charge(&mut self, id: ChargeId) -> Result<Option<Charge>> {
        let row = sqlx::query(&format!("SELECT {CHARGE_COLUMNS} FROM charges WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(charge_from_row).transpose()
    }

    async fn update_charge(&mut self, charge: &Charge) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE charges
            SET date_charge = $2, category_id = $3, label = $4, description = $5, amount = $6,
                status = $7, payment_mode = $8, order_id = $9, updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(charge.id.as_uuid())
        .bind(charge.date_charge)
        .bind(charge.category_id.as_uuid())
        .bind(&charge.label)
        .bind(&charge.description)
        .bind(charge.amount.amount())
        .bind(charge.status.as_str())
        .bind(charge.payment_mode.as_str())
        .bind(charge.order_id.map(|o| o.as_uuid()))
        .bind(charge.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn delete_charge(&mut self, id: ChargeId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM charges WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_charges(&mut self, filter: &ChargeFilter) -> Result<Vec<Charge>> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {CHARGE_COLUMNS} FROM charges WHERE 1=1"));
        if let Some(date) = filter.date_from {
            qb.push(" AND date_charge >= ").push_bind(date);
        }
        if let Some(date) = filter.date_to {
            qb.push(" AND date_charge <= ").push_bind(date);
        }
        if let Some(category) = filter.category_id {
            qb.push(" AND category_id = ").push_bind(category.as_uuid());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = like_pattern(search);
            qb.push(" AND (label ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY date_charge DESC, created_at DESC");
        let rows = qb.build().fetch_all(&mut *self.tx).await?;
        rows.iter().map(charge_from_row).collect()
    }
}
