//! Dashboard reports.
//!
//! Money is summed exactly and truncated to whole units only in the
//! returned figures. Order counts and revenue cover every order of the
//! range, cancelled ones included; cost of goods and the best sellers only
//! cover orders that are not cancelled.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use common::{ArticleId, PageId, SharedClock, SystemClock};
use domain::{ChargeStatus, Money, OrderStatus, PaymentMode};
use serde::Serialize;
use store::{ChargeFilter, Store, Transaction};

use crate::{DateRange, ReportQuery, Result, SalesSnapshot};

/// Headline figures of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub range: DateRange,
    pub nb_commandes: i64,
    pub nb_livrees: i64,
    pub nb_annulees: i64,
    pub ca_total_commandes: i64,
    pub ca_total_encaisse: i64,
    pub panier_moyen: i64,
    pub panier_moyen_encaisse: i64,
    pub cout_achats: i64,
    pub charges_payees: i64,
    pub marge_estimee: i64,
}

impl Overview {
    /// `costs` holds the unit cost of every sold article; `paid_charges`
    /// is the total of paid expenses in the range.
    pub fn compute(
        range: DateRange,
        snapshot: &SalesSnapshot,
        costs: &HashMap<ArticleId, Money>,
        paid_charges: Money,
    ) -> Result<Self> {
        let count_status = |status: OrderStatus| {
            snapshot.orders.iter().filter(|o| o.status == status).count() as i64
        };

        let mut count = 0i64;
        let mut revenue = Money::zero();
        let mut paid_count = 0i64;
        let mut paid_revenue = Money::zero();
        let mut cogs = Money::zero();
        for order in &snapshot.orders {
            let order_revenue = snapshot.revenue(order);
            count += 1;
            revenue += order_revenue;
            if snapshot.is_paid(order) {
                paid_count += 1;
                paid_revenue += order_revenue;
            }
        }
        for order in snapshot.active() {
            for line in snapshot.lines_of(order) {
                let cost = costs.get(&line.article_id).copied().unwrap_or_default();
                cogs += cost.times(line.quantity);
            }
        }

        let ca_total_commandes = revenue.whole_units()?;
        let ca_total_encaisse = paid_revenue.whole_units()?;
        Ok(Self {
            range,
            nb_commandes: count,
            nb_livrees: count_status(OrderStatus::Delivered),
            nb_annulees: count_status(OrderStatus::Cancelled),
            ca_total_commandes,
            ca_total_encaisse,
            panier_moyen: average(ca_total_commandes, count),
            panier_moyen_encaisse: average(ca_total_encaisse, paid_count),
            cout_achats: cogs.whole_units()?,
            charges_payees: paid_charges.whole_units()?,
            marge_estimee: (revenue - cogs - paid_charges).whole_units()?,
        })
    }
}

fn average(total: i64, count: i64) -> i64 {
    if count == 0 { 0 } else { total / count }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayPoint {
    pub x: NaiveDate,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueByDay {
    pub range: DateRange,
    pub label: &'static str,
    pub points: Vec<DayPoint>,
}

impl RevenueByDay {
    /// Revenue per order date, days read in the business timezone `offset`.
    pub fn compute(
        range: DateRange,
        snapshot: &SalesSnapshot,
        offset: FixedOffset,
    ) -> Result<Self> {
        let mut days: BTreeMap<NaiveDate, Money> = BTreeMap::new();
        for order in &snapshot.orders {
            *days.entry(order.date_commande(offset)).or_default() += snapshot.revenue(order);
        }
        let points = days
            .into_iter()
            .map(|(x, total)| -> Result<DayPoint> {
                Ok(DayPoint {
                    x,
                    y: total.whole_units()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            range,
            label: "CA (commandes)",
            points,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub statut: OrderStatus,
    pub nb: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrdersByStatus {
    pub range: DateRange,
    pub items: Vec<StatusCount>,
}

impl OrdersByStatus {
    /// Counts per status present in the range, ordered by status code.
    pub fn compute(range: DateRange, snapshot: &SalesSnapshot) -> Self {
        let mut counts: BTreeMap<&'static str, StatusCount> = BTreeMap::new();
        for order in &snapshot.orders {
            counts
                .entry(order.status.as_str())
                .or_insert(StatusCount {
                    statut: order.status,
                    nb: 0,
                })
                .nb += 1;
        }
        Self {
            range,
            items: counts.into_values().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopArticle {
    pub article_id: ArticleId,
    pub reference: String,
    pub nom_produit: String,
    pub quantite: i64,
    pub ca: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopArticles {
    pub range: DateRange,
    pub items: Vec<TopArticle>,
}

/// Quantity and exact revenue per article, best sellers first.
pub fn article_sales(snapshot: &SalesSnapshot) -> Vec<(ArticleId, i64, Money)> {
    let mut totals: HashMap<ArticleId, (i64, Money)> = HashMap::new();
    for order in snapshot.active() {
        for line in snapshot.lines_of(order) {
            let entry = totals.entry(line.article_id).or_default();
            entry.0 += i64::from(line.quantity);
            entry.1 += line.unit_price.times(line.quantity);
        }
    }
    let mut sales: Vec<_> = totals
        .into_iter()
        .map(|(id, (quantity, revenue))| (id, quantity, revenue))
        .collect();
    sales.sort_by(|a, b| b.2.cmp(&a.2).then(b.1.cmp(&a.1)));
    sales
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeTotal {
    pub mode: Option<PaymentMode>,
    pub nb: i64,
    pub ca: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMix {
    pub range: DateRange,
    pub items: Vec<ModeTotal>,
}

impl PaymentMix {
    /// Paid orders grouped by payment mode.
    pub fn compute(range: DateRange, snapshot: &SalesSnapshot) -> Result<Self> {
        let mut modes: BTreeMap<&'static str, (Option<PaymentMode>, i64, Money)> = BTreeMap::new();
        for order in snapshot.orders.iter().filter(|o| snapshot.is_paid(o)) {
            let mode = snapshot.payments.get(&order.id).and_then(|p| p.mode);
            let entry = modes
                .entry(mode.map(|m| m.as_str()).unwrap_or_default())
                .or_insert((mode, 0, Money::zero()));
            entry.1 += 1;
            entry.2 += snapshot.revenue(order);
        }
        let items = modes
            .into_values()
            .map(|(mode, nb, total)| -> Result<ModeTotal> {
                Ok(ModeTotal {
                    mode,
                    nb,
                    ca: total.whole_units()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { range, items })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSales {
    pub page_id: Option<PageId>,
    pub page_nom: Option<String>,
    pub nb: i64,
    pub ca: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesByChannel {
    pub range: DateRange,
    pub items: Vec<ChannelSales>,
}

/// Order count and exact revenue per channel, busiest first.
pub fn channel_sales(snapshot: &SalesSnapshot) -> Vec<(Option<PageId>, i64, Money)> {
    let mut channels: HashMap<Option<PageId>, (i64, Money)> = HashMap::new();
    for order in &snapshot.orders {
        let entry = channels.entry(order.page_id).or_default();
        entry.0 += 1;
        entry.1 += snapshot.revenue(order);
    }
    let mut sales: Vec<_> = channels
        .into_iter()
        .map(|(page, (nb, revenue))| (page, nb, revenue))
        .collect();
    sales.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)));
    sales
}

/// Read-only dashboard over a [`Store`].
#[derive(Clone)]
pub struct Reporter<S: Store> {
    store: S,
    clock: SharedClock,
}

impl<S: Store> Reporter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock::default()),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    async fn snapshot(&self, query: &ReportQuery) -> Result<(DateRange, S::Tx, SalesSnapshot)> {
        let range = query.range(self.clock.today())?;
        let mut tx = self.store.begin().await?;
        let snapshot =
            SalesSnapshot::load(&mut tx, &range, query.page, self.clock.as_ref()).await?;
        Ok((range, tx, snapshot))
    }

    #[tracing::instrument(skip(self))]
    pub async fn overview(&self, query: &ReportQuery) -> Result<Overview> {
        let (range, mut tx, snapshot) = self.snapshot(query).await?;

        let mut sold: Vec<ArticleId> = snapshot
            .active()
            .flat_map(|o| snapshot.lines_of(o))
            .map(|l| l.article_id)
            .collect();
        sold.sort();
        sold.dedup();
        let mut costs = tx.latest_purchase_costs(&sold).await?;
        for article_id in &sold {
            if !costs.contains_key(article_id)
                && let Some(article) = tx.get_article(*article_id).await?
            {
                costs.insert(*article_id, article.purchase_price);
            }
        }

        let charges = tx
            .list_charges(&ChargeFilter {
                date_from: Some(range.date_from),
                date_to: Some(range.date_to),
                status: Some(ChargeStatus::Paid),
                ..Default::default()
            })
            .await?;
        let paid_charges: Money = charges.iter().map(|c| c.amount).sum();

        Overview::compute(range, &snapshot, &costs, paid_charges)
    }

    pub async fn revenue_by_day(&self, query: &ReportQuery) -> Result<RevenueByDay> {
        let (range, _tx, snapshot) = self.snapshot(query).await?;
        RevenueByDay::compute(range, &snapshot, self.clock.offset())
    }

    pub async fn orders_by_status(&self, query: &ReportQuery) -> Result<OrdersByStatus> {
        let (range, _tx, snapshot) = self.snapshot(query).await?;
        Ok(OrdersByStatus::compute(range, &snapshot))
    }

    pub async fn top_articles(&self, query: &ReportQuery) -> Result<TopArticles> {
        let (range, mut tx, snapshot) = self.snapshot(query).await?;
        let mut items = Vec::new();
        for (article_id, quantite, revenue) in
            article_sales(&snapshot).into_iter().take(query.top_limit())
        {
            let article = tx.get_article(article_id).await?;
            items.push(TopArticle {
                article_id,
                reference: article.as_ref().map(|a| a.reference.clone()).unwrap_or_default(),
                nom_produit: article.map(|a| a.name).unwrap_or_default(),
                quantite,
                ca: revenue.whole_units()?,
            });
        }
        Ok(TopArticles { range, items })
    }

    pub async fn payment_mix(&self, query: &ReportQuery) -> Result<PaymentMix> {
        let (range, _tx, snapshot) = self.snapshot(query).await?;
        PaymentMix::compute(range, &snapshot)
    }

    pub async fn sales_by_channel(&self, query: &ReportQuery) -> Result<SalesByChannel> {
        let (range, mut tx, snapshot) = self.snapshot(query).await?;
        let mut items = Vec::new();
        for (page_id, nb, revenue) in channel_sales(&snapshot) {
            let page_nom = match page_id {
                Some(id) => tx.get_page(id).await?.map(|p| p.name),
                None => None,
            };
            items.push(ChannelSales {
                page_id,
                page_nom,
                nb,
                ca: revenue.whole_units()?,
            });
        }
        Ok(SalesByChannel { range, items })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use common::{ClientId, FeeId, LocationId, OrderId, OrderLineId, PaymentId, business_offset};
    use domain::{ClientSnapshot, Order, OrderLine, Payment, PaymentStatus};
    use rust_decimal::Decimal;

    use super::*;

    fn range() -> DateRange {
        DateRange::resolve(None, None, NaiveDate::from_ymd_opt(2025, 5, 31).unwrap()).unwrap()
    }

    fn order(status: OrderStatus, day: u32, fee: i64, snapshot: &mut SalesSnapshot) -> Order {
        order_at(status, Utc.with_ymd_and_hms(2025, 5, day, 10, 0, 0).unwrap(), fee, snapshot)
    }

    fn order_at(
        status: OrderStatus,
        at: chrono::DateTime<Utc>,
        fee: i64,
        snapshot: &mut SalesSnapshot,
    ) -> Order {
        let order = Order {
            id: OrderId::new(),
            user_id: None,
            page_id: None,
            client_id: ClientId::new(),
            location_id: LocationId::new(),
            fee_id: FeeId::new(),
            precision_lieu: String::new(),
            date_livraison: None,
            client: ClientSnapshot::default(),
            status,
            note: String::new(),
            created_at: at,
            updated_at: at,
        };
        snapshot.fees.insert(order.fee_id, fee);
        snapshot.orders.push(order.clone());
        order
    }

    fn line(snapshot: &mut SalesSnapshot, order: &Order, article: ArticleId, quantity: u32, price: Money) {
        snapshot.lines.entry(order.id).or_default().push(OrderLine {
            id: OrderLineId::new(),
            order_id: order.id,
            article_id: article,
            quantity,
            unit_price: price,
            created_at: order.created_at,
        });
    }

    fn paid(snapshot: &mut SalesSnapshot, order: &Order, mode: PaymentMode) {
        let mut payment = Payment::pending(order.id, order.created_at);
        payment.status = PaymentStatus::Paid;
        payment.mode = Some(mode);
        payment.id = PaymentId::new();
        snapshot.payments.insert(order.id, payment);
    }

    #[test]
    fn overview_counts_cancelled_orders_but_not_their_cost() {
        let mut snapshot = SalesSnapshot::default();
        let soap = ArticleId::new();
        let first = order(OrderStatus::Delivered, 2, 3000, &mut snapshot);
        line(&mut snapshot, &first, soap, 3, Money::from_units(1000));
        paid(&mut snapshot, &first, PaymentMode::Cash);
        let second = order(OrderStatus::Pending, 3, 0, &mut snapshot);
        line(&mut snapshot, &second, soap, 1, Money::new(Decimal::new(99950, 2)));
        let cancelled = order(OrderStatus::Cancelled, 3, 4000, &mut snapshot);
        line(&mut snapshot, &cancelled, soap, 10, Money::from_units(1000));

        let costs = HashMap::from([(soap, Money::from_units(600))]);
        let overview =
            Overview::compute(range(), &snapshot, &costs, Money::from_units(500)).unwrap();

        assert_eq!(overview.nb_commandes, 3);
        assert_eq!(overview.nb_livrees, 1);
        assert_eq!(overview.nb_annulees, 1);
        assert_eq!(overview.ca_total_commandes, 20999);
        assert_eq!(overview.ca_total_encaisse, 6000);
        assert_eq!(overview.panier_moyen, 6999);
        assert_eq!(overview.panier_moyen_encaisse, 6000);
        assert_eq!(overview.cout_achats, 2400);
        assert_eq!(overview.charges_payees, 500);
        assert_eq!(overview.marge_estimee, 18099);
    }

    #[test]
    fn empty_range_has_zero_averages() {
        let overview =
            Overview::compute(range(), &SalesSnapshot::default(), &HashMap::new(), Money::zero())
                .unwrap();
        assert_eq!(overview.panier_moyen, 0);
        assert_eq!(overview.marge_estimee, 0);
    }

    #[test]
    fn revenue_is_grouped_by_order_day() {
        let mut snapshot = SalesSnapshot::default();
        let article = ArticleId::new();
        for day in [2, 2, 5] {
            let o = order(OrderStatus::Pending, day, 1000, &mut snapshot);
            line(&mut snapshot, &o, article, 1, Money::from_units(500));
        }
        let report = RevenueByDay::compute(range(), &snapshot, business_offset()).unwrap();
        assert_eq!(report.points.len(), 2);
        assert_eq!(report.points[0].y, 3000);
        assert_eq!(report.points[1].x, NaiveDate::from_ymd_opt(2025, 5, 5).unwrap());
    }

    #[test]
    fn late_evening_orders_count_on_the_local_day() {
        let mut snapshot = SalesSnapshot::default();
        let evening = Utc.with_ymd_and_hms(2025, 5, 2, 22, 0, 0).unwrap();
        order_at(OrderStatus::Pending, evening, 700, &mut snapshot);

        let report = RevenueByDay::compute(range(), &snapshot, business_offset()).unwrap();
        assert_eq!(report.points, vec![DayPoint {
            x: NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
            y: 700,
        }]);
    }

    #[test]
    fn status_counts_include_cancelled() {
        let mut snapshot = SalesSnapshot::default();
        order(OrderStatus::Cancelled, 1, 0, &mut snapshot);
        order(OrderStatus::Pending, 1, 0, &mut snapshot);
        order(OrderStatus::Pending, 2, 0, &mut snapshot);
        let report = OrdersByStatus::compute(range(), &snapshot);
        let pending = report
            .items
            .iter()
            .find(|i| i.statut == OrderStatus::Pending)
            .unwrap();
        assert_eq!(pending.nb, 2);
        assert_eq!(report.items.len(), 2);
    }

    #[test]
    fn best_sellers_rank_by_revenue() {
        let mut snapshot = SalesSnapshot::default();
        let cheap = ArticleId::new();
        let dear = ArticleId::new();
        let o = order(OrderStatus::Pending, 4, 0, &mut snapshot);
        line(&mut snapshot, &o, cheap, 10, Money::from_units(100));
        line(&mut snapshot, &o, dear, 1, Money::from_units(5000));
        let sales = article_sales(&snapshot);
        assert_eq!(sales[0].0, dear);
        assert_eq!(sales[1].1, 10);
    }

    #[test]
    fn cancelled_orders_stay_in_revenue_series_but_not_best_sellers() {
        let mut snapshot = SalesSnapshot::default();
        let kept = ArticleId::new();
        let dropped = ArticleId::new();
        let live = order(OrderStatus::Pending, 6, 1000, &mut snapshot);
        line(&mut snapshot, &live, kept, 1, Money::from_units(500));
        let cancelled = order(OrderStatus::Cancelled, 6, 0, &mut snapshot);
        line(&mut snapshot, &cancelled, dropped, 4, Money::from_units(2000));
        paid(&mut snapshot, &cancelled, PaymentMode::Cash);

        let days = RevenueByDay::compute(range(), &snapshot, business_offset()).unwrap();
        assert_eq!(days.points, vec![DayPoint {
            x: NaiveDate::from_ymd_opt(2025, 5, 6).unwrap(),
            y: 9500,
        }]);

        let channels = channel_sales(&snapshot);
        assert_eq!(channels[0].1, 2);
        assert_eq!(channels[0].2, Money::from_units(9500));

        let mix = PaymentMix::compute(range(), &snapshot).unwrap();
        assert_eq!(mix.items[0].ca, 8000);

        let sales = article_sales(&snapshot);
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].0, kept);
    }

    #[test]
    fn payment_mix_counts_paid_orders_only() {
        let mut snapshot = SalesSnapshot::default();
        let article = ArticleId::new();
        let a = order(OrderStatus::Pending, 4, 0, &mut snapshot);
        line(&mut snapshot, &a, article, 1, Money::from_units(2000));
        paid(&mut snapshot, &a, PaymentMode::Mvola);
        let b = order(OrderStatus::Pending, 4, 0, &mut snapshot);
        line(&mut snapshot, &b, article, 1, Money::from_units(2000));

        let mix = PaymentMix::compute(range(), &snapshot).unwrap();
        assert_eq!(mix.items.len(), 1);
        assert_eq!(mix.items[0].mode, Some(PaymentMode::Mvola));
        assert_eq!(mix.items[0].ca, 2000);
    }
}
