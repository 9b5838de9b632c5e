//! Read models returned by the services.

use std::collections::{HashMap, HashSet};

use chrono::{FixedOffset, NaiveDate};
use common::{ArticleId, ClientId, LocationId, OrderId, PageId};
use domain::{
    Article, Client, FeeSnapshot, Location, LocationCategory, Money, Order, OrderLine,
    OrderTotals, Page,
};
use serde::Serialize;
use store::Transaction;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub id: ArticleId,
    pub nom_produit: String,
    pub reference: String,
    pub prix_vente: Money,
    pub quantite_stock: i64,
}

impl From<&Article> for ArticleSummary {
    fn from(article: &Article) -> Self {
        Self {
            id: article.id,
            nom_produit: article.name.clone(),
            reference: article.reference.clone(),
            prix_vente: article.sale_price,
            quantite_stock: article.stock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub id: ClientId,
    pub nom: String,
    pub contact: String,
}

impl From<&Client> for ClientSummary {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            nom: client.name.clone(),
            contact: client.contact.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSummary {
    pub id: LocationId,
    pub nom: String,
    pub categorie: LocationCategory,
    pub default_frais: i64,
}

impl From<&Location> for LocationSummary {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id,
            nom: location.name.clone(),
            categorie: location.category,
            default_frais: location.category.base_fee(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub id: PageId,
    pub nom: String,
    pub lien: String,
}

impl From<&Page> for PageSummary {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id,
            nom: page.name.clone(),
            lien: page.link.clone(),
        }
    }
}

/// Order line with its article and subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDetail {
    #[serde(flatten)]
    pub line: OrderLine,
    pub article_detail: Option<ArticleSummary>,
    pub sous_total: i64,
}

/// Order with its lines, related records and derived totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub date_commande: NaiveDate,
    pub page_detail: Option<PageSummary>,
    pub client_detail: Option<ClientSummary>,
    pub lieu_detail: Option<LocationSummary>,
    pub lignes_detail: Vec<LineDetail>,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

impl OrderDetail {
    pub fn id(&self) -> OrderId {
        self.order.id
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub results: Vec<T>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Page-number pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Normalises user input: page starts at 1, size defaults to 20 and caps at 200.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    /// Cuts one page out of an already filtered list.
    pub fn slice<T>(&self, items: Vec<T>) -> Paginated<T> {
        let count = items.len() as i64;
        let results = items
            .into_iter()
            .skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(self.page_size).unwrap_or_default())
            .collect();
        Paginated {
            count,
            page: self.page,
            page_size: self.page_size,
            results,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Builds order details with one batched load per related table.
///
/// Order dates are read in the business timezone `offset`.
pub(crate) async fn load_order_details<T: Transaction>(
    tx: &mut T,
    orders: Vec<Order>,
    offset: FixedOffset,
) -> Result<Vec<OrderDetail>> {
    let order_ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
    let fee_ids: Vec<_> = orders.iter().map(|o| o.fee_id).collect();

    let mut lines_by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
    for line in tx.lines_for_orders(&order_ids).await? {
        lines_by_order.entry(line.order_id).or_default().push(line);
    }
    let fees: HashMap<_, FeeSnapshot> = tx
        .fees_by_ids(&fee_ids)
        .await?
        .into_iter()
        .map(|fee| (fee.id, fee))
        .collect();

    let mut articles: HashMap<ArticleId, Option<ArticleSummary>> = HashMap::new();
    let article_ids: HashSet<ArticleId> = lines_by_order
        .values()
        .flatten()
        .map(|line| line.article_id)
        .collect();
    for id in article_ids {
        let article = tx.get_article(id).await?;
        articles.insert(id, article.as_ref().map(ArticleSummary::from));
    }

    let mut clients: HashMap<ClientId, Option<ClientSummary>> = HashMap::new();
    let mut locations: HashMap<LocationId, Option<LocationSummary>> = HashMap::new();
    let mut pages: HashMap<PageId, Option<PageSummary>> = HashMap::new();
    for order in &orders {
        if !clients.contains_key(&order.client_id) {
            let client = tx.get_client(order.client_id).await?;
            clients.insert(order.client_id, client.as_ref().map(ClientSummary::from));
        }
        if !locations.contains_key(&order.location_id) {
            let location = tx.get_location(order.location_id).await?;
            locations.insert(order.location_id, location.as_ref().map(LocationSummary::from));
        }
        if let Some(page_id) = order.page_id
            && !pages.contains_key(&page_id)
        {
            let page = tx.get_page(page_id).await?;
            pages.insert(page_id, page.as_ref().map(PageSummary::from));
        }
    }

    orders
        .into_iter()
        .map(|order| -> Result<OrderDetail> {
            let lines = lines_by_order.remove(&order.id).unwrap_or_default();
            let totals = OrderTotals::compute(&lines, fees.get(&order.fee_id))?;
            let lignes_detail = lines
                .into_iter()
                .map(|line| -> Result<LineDetail> {
                    Ok(LineDetail {
                        article_detail: articles.get(&line.article_id).cloned().flatten(),
                        sous_total: line.subtotal()?,
                        line,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(OrderDetail {
                date_commande: order.date_commande(offset),
                page_detail: order.page_id.and_then(|id| pages.get(&id).cloned().flatten()),
                client_detail: clients.get(&order.client_id).cloned().flatten(),
                lieu_detail: locations.get(&order.location_id).cloned().flatten(),
                lignes_detail,
                totals,
                order,
            })
        })
        .collect()
}

pub(crate) async fn load_order_detail<T: Transaction>(
    tx: &mut T,
    order: Order,
    offset: FixedOffset,
) -> Result<OrderDetail> {
    let mut details = load_order_details(tx, vec![order], offset).await?;
    details
        .pop()
        .ok_or_else(|| crate::ServiceError::Store(store::StoreError::Corrupt("empty order batch".into())))
}
