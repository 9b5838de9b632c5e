//! Payment ledger: one payment record per order, created lazily.

use chrono::{DateTime, Utc};
use common::{Actor, OrderId};
use domain::{Order, Payment, PaymentMode, PaymentStatus};
use serde::{Deserialize, Serialize};
use store::{OrderFilter, Store, Transaction, filter::contains_ci};

use crate::invoices::ensure_invoice;
use crate::views::{OrderDetail, PageRequest, Paginated, load_order_details};
use crate::{Backoffice, Result, ServiceError};

#[derive(Debug, Clone, Deserialize)]
pub struct PayRequest {
    pub mode: PaymentMode,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelPaymentRequest {
    #[serde(default)]
    pub note: Option<String>,
}

/// Result of a payment action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentOutcome {
    pub ok: bool,
    pub commande_id: OrderId,
    pub paiement_statut: PaymentStatus,
}

/// Query parameters of the payment list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentQuery {
    #[serde(default)]
    pub paiement_statut: Option<PaymentStatus>,
    #[serde(default)]
    pub statut: Option<domain::OrderStatus>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

/// Order with its payment state; orders without a record show `EN_ATTENTE`.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentListItem {
    #[serde(flatten)]
    pub order: OrderDetail,
    pub paiement_statut: PaymentStatus,
    pub paiement_mode: Option<PaymentMode>,
    pub paiement_reference: String,
    pub encaisse_le: Option<DateTime<Utc>>,
}

/// Locks the order then its payment, creating a pending record when missing.
async fn lock_for_payment<T: Transaction>(
    tx: &mut T,
    order_id: OrderId,
    now: DateTime<Utc>,
) -> Result<(Order, Payment)> {
    let order = tx
        .lock_order(order_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("order", order_id))?;
    let payment = match tx.lock_payment(order_id).await? {
        Some(payment) => payment,
        None => {
            let payment = Payment::pending(order_id, now);
            tx.insert_payment(&payment).await?;
            payment
        }
    };
    Ok((order, payment))
}

impl<S: Store> Backoffice<S> {
    /// Records the payment of an order.
    #[tracing::instrument(skip(self, request, actor), fields(mode = %request.mode))]
    pub async fn pay(
        &self,
        order_id: OrderId,
        request: &PayRequest,
        actor: &Actor,
    ) -> Result<PaymentOutcome> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        let (order, mut payment) = lock_for_payment(&mut tx, order_id, now).await?;

        if let Err(err) = payment.pay(
            order.status,
            request.mode,
            request.reference.as_deref(),
            request.note.as_deref(),
            actor,
            now,
        ) {
            metrics::counter!("payments_total", "outcome" => "rejected").increment(1);
            return Err(err.into());
        }
        tx.update_payment(&payment).await?;
        ensure_invoice(&mut tx, order_id, now, self.offset()).await?;
        tx.commit().await?;

        metrics::counter!("payments_total", "outcome" => "paid").increment(1);
        tracing::info!(order_id = %order_id, "payment recorded");
        Ok(PaymentOutcome {
            ok: true,
            commande_id: order_id,
            paiement_statut: payment.status,
        })
    }

    /// Cancels a pending payment.
    #[tracing::instrument(skip(self, request, actor))]
    pub async fn cancel_payment(
        &self,
        order_id: OrderId,
        request: &CancelPaymentRequest,
        actor: &Actor,
    ) -> Result<PaymentOutcome> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        let (_, mut payment) = lock_for_payment(&mut tx, order_id, now).await?;

        if let Err(err) = payment.cancel(request.note.as_deref(), actor, now) {
            metrics::counter!("payments_total", "outcome" => "rejected").increment(1);
            return Err(err.into());
        }
        tx.update_payment(&payment).await?;
        ensure_invoice(&mut tx, order_id, now, self.offset()).await?;
        tx.commit().await?;

        metrics::counter!("payments_total", "outcome" => "cancelled").increment(1);
        Ok(PaymentOutcome {
            ok: true,
            commande_id: order_id,
            paiement_statut: payment.status,
        })
    }

    pub async fn payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.payment_for_order(order_id).await?)
    }

    /// Orders with their payment state, newest first.
    pub async fn list_payments(
        &self,
        query: &PaymentQuery,
    ) -> Result<Paginated<PaymentListItem>> {
        let mut tx = self.store().begin().await?;
        let filter = OrderFilter {
            status: query.statut,
            ..Default::default()
        };
        let mut orders = tx.list_orders(&filter).await?;
        if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
            orders.retain(|o| contains_ci(&o.client.name, q) || contains_ci(&o.client.contact, q));
        }

        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let payments = tx.payments_for_orders(&ids).await?;
        let payment_of = |id: OrderId| payments.iter().find(|p| p.order_id == id);

        if let Some(wanted) = query.paiement_statut {
            orders.retain(|o| {
                payment_of(o.id).map_or(PaymentStatus::Pending, |p| p.status) == wanted
            });
        }

        let page = PageRequest::new(query.page, query.page_size).slice(orders);
        let details = load_order_details(&mut tx, page.results, self.offset()).await?;
        let results = details
            .into_iter()
            .map(|order| {
                let payment = payment_of(order.id());
                PaymentListItem {
                    paiement_statut: payment.map_or(PaymentStatus::Pending, |p| p.status),
                    paiement_mode: payment.and_then(|p| p.mode),
                    paiement_reference: payment.map(|p| p.reference.clone()).unwrap_or_default(),
                    encaisse_le: payment.and_then(|p| p.collected_at),
                    order,
                }
            })
            .collect();
        Ok(Paginated {
            count: page.count,
            page: page.page,
            page_size: page.page_size,
            results,
        })
    }
}
