//! Delivery tracker: status transitions, scheduling and the reconcile sweep.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use common::{Actor, DeliveryId, OrderId, PageId};
use domain::{
    Delivery, DeliveryEvent, DeliveryStatus, Order, OrderStatus, TransitionRequest,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use store::{DeliveryFilter, OrderFilter, Store, Transaction};

use crate::views::{OrderDetail, load_order_details};
use crate::{Backoffice, Result, ServiceError};

/// Delivery with its order and audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryView {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub commande_detail: Option<OrderDetail>,
    pub events: Vec<DeliveryEvent>,
}

/// Generic status change; `statut` is parsed against the known codes.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub statut: String,
    #[serde(flatten)]
    pub request: TransitionRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    #[serde(alias = "commande_id")]
    pub order_id: OrderId,
    pub date_livraison: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleOutcome {
    pub commande_id: OrderId,
    pub date_livraison: NaiveDate,
    pub livraison_id: DeliveryId,
    pub livraison_created: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDelivery {
    #[serde(alias = "commande_id")]
    pub order_id: OrderId,
    #[serde(default)]
    pub date_prevue: Option<NaiveDate>,
}

/// Query parameters of the delivery list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryQuery {
    #[serde(default)]
    pub statut: Option<DeliveryStatus>,
    #[serde(default)]
    pub date_prevue: Option<NaiveDate>,
    /// Sales channel.
    #[serde(default)]
    pub page: Option<PageId>,
    #[serde(default)]
    pub q: Option<String>,
}

impl DeliveryQuery {
    pub fn filter(&self) -> DeliveryFilter {
        DeliveryFilter {
            status: self.statut,
            date_prevue: self.date_prevue,
            page_id: self.page,
            search: self.q.clone().filter(|q| !q.trim().is_empty()),
        }
    }
}

/// Query parameters of the orders-to-schedule list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleQuery {
    #[serde(default)]
    pub statut: Option<OrderStatus>,
    #[serde(default)]
    pub page: Option<PageId>,
    #[serde(default)]
    pub date_livraison: Option<NaiveDate>,
    #[serde(default)]
    pub q: Option<String>,
}

/// Open order with the tracker fields, when a tracker exists.
#[derive(Debug, Clone, Serialize)]
pub struct ToScheduleItem {
    #[serde(flatten)]
    pub order: Order,
    pub livraison_id: Option<DeliveryId>,
    pub livraison_statut: Option<DeliveryStatus>,
    pub date_prevue: Option<NaiveDate>,
}

/// Opens a tracker in `A_PREPARER` and logs its creation.
async fn open_delivery<T: Transaction>(
    tx: &mut T,
    order: &Order,
    date_prevue: Option<NaiveDate>,
    message: &str,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Delivery> {
    let delivery = Delivery::open(order.id, date_prevue, actor, now);
    tx.insert_delivery(&delivery).await?;
    let event = DeliveryEvent::record(
        &delivery,
        None,
        message,
        &json!({ "commande_id": order.id }),
        actor,
        now,
    )?;
    tx.append_delivery_event(&event).await?;
    Ok(delivery)
}

async fn delivery_views<T: Transaction>(
    tx: &mut T,
    deliveries: Vec<Delivery>,
    offset: FixedOffset,
) -> Result<Vec<DeliveryView>> {
    let mut orders = Vec::with_capacity(deliveries.len());
    for delivery in &deliveries {
        if let Some(order) = tx.get_order(delivery.order_id).await? {
            orders.push(order);
        }
    }
    let mut details: HashMap<OrderId, OrderDetail> = load_order_details(tx, orders, offset)
        .await?
        .into_iter()
        .map(|detail| (detail.id(), detail))
        .collect();

    let mut views = Vec::with_capacity(deliveries.len());
    for delivery in deliveries {
        let events = tx.delivery_events(delivery.id).await?;
        views.push(DeliveryView {
            commande_detail: details.remove(&delivery.order_id),
            events,
            delivery,
        });
    }
    Ok(views)
}

impl<S: Store> Backoffice<S> {
    /// Moves a delivery to `to` and aligns its order.
    ///
    /// Appends exactly one event on success; a rejected transition leaves
    /// the delivery, the order and the event log untouched.
    #[tracing::instrument(skip(self, request, actor))]
    pub async fn transition_delivery(
        &self,
        id: DeliveryId,
        to: DeliveryStatus,
        request: &TransitionRequest,
        actor: &Actor,
    ) -> Result<DeliveryView> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        let order_id = tx
            .get_delivery(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery", id))?
            .order_id;
        let mut order = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", order_id))?;
        let mut delivery = tx
            .lock_delivery(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery", id))?;

        let from = delivery.transition(to, request, actor, now, self.offset())?;
        tx.update_delivery(&delivery).await?;

        if order.sync_with_delivery(to, delivery.date_prevue, now) {
            tracing::debug!(order_id = %order.id, status = %order.status, "order status synced");
        }
        tx.update_order(&order).await?;

        let event = DeliveryEvent::record(
            &delivery,
            Some(from),
            format!("status changed: {from} -> {to}"),
            &json!({ "payload": request }),
            actor,
            now,
        )?;
        tx.append_delivery_event(&event).await?;

        let mut views = delivery_views(&mut tx, vec![delivery], self.offset()).await?;
        tx.commit().await?;

        metrics::counter!("delivery_transitions_total", "to" => to.as_str()).increment(1);
        tracing::info!(delivery_id = %id, %from, %to, "delivery transitioned");
        views
            .pop()
            .ok_or_else(|| ServiceError::not_found("delivery", id))
    }

    /// Status change from a raw status code.
    pub async fn change_delivery_status(
        &self,
        id: DeliveryId,
        change: &StatusChange,
        actor: &Actor,
    ) -> Result<DeliveryView> {
        let to: DeliveryStatus = change.statut.parse()?;
        self.transition_delivery(id, to, &change.request, actor).await
    }

    /// Sets an order's delivery date and creates or updates its tracker.
    #[tracing::instrument(skip(self, request, actor), fields(order_id = %request.order_id))]
    pub async fn schedule_order(
        &self,
        request: &ScheduleRequest,
        actor: &Actor,
    ) -> Result<ScheduleOutcome> {
        let now = self.now();
        let date = request.date_livraison;
        let mut tx = self.store().begin().await?;
        let mut order = tx
            .lock_order(request.order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", request.order_id))?;
        order.schedule(date, now)?;
        tx.update_order(&order).await?;

        let existing = match tx.delivery_for_order(order.id).await? {
            Some(delivery) => tx.lock_delivery(delivery.id).await?,
            None => None,
        };
        let (delivery, created) = match existing {
            None => {
                let delivery =
                    open_delivery(&mut tx, &order, Some(date), "created by scheduling", actor, now)
                        .await?;
                (delivery, true)
            }
            Some(mut delivery) => {
                delivery.reschedule(date, actor, now)?;
                tx.update_delivery(&delivery).await?;
                let event = DeliveryEvent::record(
                    &delivery,
                    Some(delivery.status),
                    "planned date updated by scheduling",
                    &json!({ "commande_id": order.id, "date_prevue": date }),
                    actor,
                    now,
                )?;
                tx.append_delivery_event(&event).await?;
                (delivery, false)
            }
        };
        tx.commit().await?;

        Ok(ScheduleOutcome {
            commande_id: order.id,
            date_livraison: date,
            livraison_id: delivery.id,
            livraison_created: created,
        })
    }

    /// Creates the tracker of an order explicitly.
    #[tracing::instrument(skip(self, request, actor), fields(order_id = %request.order_id))]
    pub async fn create_delivery(
        &self,
        request: &CreateDelivery,
        actor: &Actor,
    ) -> Result<DeliveryView> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        let order = tx
            .lock_order(request.order_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("order", request.order_id))?;
        if tx.delivery_for_order(order.id).await?.is_some() {
            return Err(ServiceError::AlreadyExists {
                entity: "delivery",
                order_id: order.id.to_string(),
            });
        }
        let date_prevue = request.date_prevue.or(order.date_livraison);
        let delivery = open_delivery(
            &mut tx,
            &order,
            date_prevue,
            "delivery tracking created",
            actor,
            now,
        )
        .await?;
        let mut views = delivery_views(&mut tx, vec![delivery], self.offset()).await?;
        tx.commit().await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::not_found("order", request.order_id))
    }

    /// Creates missing trackers for open orders, oldest first, one batch at a time.
    ///
    /// Returns the number of trackers created.
    #[tracing::instrument(skip(self, actor))]
    pub async fn reconcile_deliveries(&self, actor: &Actor) -> Result<u64> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        let orders = tx.orders_without_delivery(self.reconcile_batch()).await?;
        let mut created = 0;
        for order in &orders {
            open_delivery(&mut tx, order, order.date_livraison, "created by sync", actor, now)
                .await?;
            created += 1;
        }
        tx.commit().await?;

        if created > 0 {
            metrics::counter!("deliveries_reconciled_total").increment(created);
            tracing::info!(created, "delivery trackers reconciled");
        }
        Ok(created)
    }

    /// Trackers matching `query`, after a reconcile sweep.
    pub async fn list_deliveries(
        &self,
        query: &DeliveryQuery,
        actor: &Actor,
    ) -> Result<Vec<DeliveryView>> {
        self.reconcile_deliveries(actor).await?;
        let mut tx = self.store().begin().await?;
        let deliveries = tx.list_deliveries(&query.filter()).await?;
        delivery_views(&mut tx, deliveries, self.offset()).await
    }

    /// One tracker with its order and full event log.
    pub async fn delivery_history(&self, id: DeliveryId) -> Result<DeliveryView> {
        let mut tx = self.store().begin().await?;
        let delivery = tx
            .get_delivery(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("delivery", id))?;
        let mut views = delivery_views(&mut tx, vec![delivery], self.offset()).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::not_found("delivery", id))
    }

    /// Tracker of an order, if one exists.
    pub async fn delivery_for_order(&self, order_id: OrderId) -> Result<Option<Delivery>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.delivery_for_order(order_id).await?)
    }

    /// Open orders, newest first, with their tracker fields.
    pub async fn orders_to_schedule(&self, query: &ScheduleQuery) -> Result<Vec<ToScheduleItem>> {
        let filter = OrderFilter {
            status: query.statut,
            page_id: query.page,
            date_livraison: query.date_livraison,
            search: query.q.clone().filter(|q| !q.trim().is_empty()),
            ..Default::default()
        };
        let mut tx = self.store().begin().await?;
        let orders: Vec<Order> = tx
            .list_orders(&filter)
            .await?
            .into_iter()
            .filter(|o| !o.status.is_finalized())
            .collect();
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let deliveries: HashMap<OrderId, Delivery> = tx
            .deliveries_for_orders(&ids)
            .await?
            .into_iter()
            .map(|d| (d.order_id, d))
            .collect();

        Ok(orders
            .into_iter()
            .map(|order| {
                let delivery = deliveries.get(&order.id);
                ToScheduleItem {
                    livraison_id: delivery.map(|d| d.id),
                    livraison_statut: delivery.map(|d| d.status),
                    date_prevue: delivery.and_then(|d| d.date_prevue),
                    order,
                }
            })
            .collect())
    }
}
