//! Orders of a date range loaded once per report.

use std::collections::HashMap;

use common::{Clock, FeeId, OrderId, PageId};
use domain::{Money, Order, OrderLine, OrderStatus, Payment, PaymentStatus};
use store::{OrderFilter, Transaction};

use crate::{DateRange, Result};

/// Orders created in a range with their lines, fees and payments.
#[derive(Debug, Clone, Default)]
pub struct SalesSnapshot {
    pub orders: Vec<Order>,
    pub lines: HashMap<OrderId, Vec<OrderLine>>,
    pub fees: HashMap<FeeId, i64>,
    pub payments: HashMap<OrderId, Payment>,
}

impl SalesSnapshot {
    /// Loads the orders whose business-day date falls in `range`.
    pub async fn load<T: Transaction>(
        tx: &mut T,
        range: &DateRange,
        page_id: Option<PageId>,
        clock: &dyn Clock,
    ) -> Result<Self> {
        let filter = OrderFilter::created_between(
            clock.day_start(range.date_from),
            clock.day_end(range.date_to),
            page_id,
        );
        let orders = tx.list_orders(&filter).await?;
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let fee_ids: Vec<FeeId> = orders.iter().map(|o| o.fee_id).collect();

        let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for line in tx.lines_for_orders(&ids).await? {
            lines.entry(line.order_id).or_default().push(line);
        }
        let fees = tx
            .fees_by_ids(&fee_ids)
            .await?
            .into_iter()
            .map(|fee| (fee.id, fee.final_amount))
            .collect();
        let payments = tx
            .payments_for_orders(&ids)
            .await?
            .into_iter()
            .map(|p| (p.order_id, p))
            .collect();

        tracing::debug!(orders = orders.len(), "sales snapshot loaded");
        Ok(Self {
            orders,
            lines,
            fees,
            payments,
        })
    }

    pub fn lines_of(&self, order: &Order) -> &[OrderLine] {
        self.lines.get(&order.id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Exact sum of quantity times captured unit price.
    pub fn articles_total(&self, order: &Order) -> Money {
        self.lines_of(order)
            .iter()
            .map(|line| line.unit_price.times(line.quantity))
            .sum()
    }

    pub fn fee(&self, order: &Order) -> i64 {
        self.fees.get(&order.fee_id).copied().unwrap_or_default()
    }

    /// Articles plus delivery fee.
    pub fn revenue(&self, order: &Order) -> Money {
        self.articles_total(order) + Money::from_units(self.fee(order))
    }

    pub fn payment_status(&self, order: &Order) -> Option<PaymentStatus> {
        self.payments.get(&order.id).map(|p| p.status)
    }

    pub fn is_paid(&self, order: &Order) -> bool {
        self.payment_status(order) == Some(PaymentStatus::Paid)
    }

    /// Orders that are not cancelled; their lines count as sold goods.
    pub fn active(&self) -> impl Iterator<Item = &Order> {
        self.orders
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
    }
}
