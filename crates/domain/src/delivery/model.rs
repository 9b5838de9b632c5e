//! Delivery tracking record and its audit events.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use common::{Actor, DeliveryEventId, DeliveryId, OrderId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DeliveryStatus, metadata};
use crate::DomainError;

/// Fulfilment record of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: DeliveryId,
    #[serde(rename = "commande")]
    pub order_id: OrderId,
    #[serde(rename = "statut")]
    pub status: DeliveryStatus,
    pub date_prevue: Option<NaiveDate>,
    pub date_reelle: Option<DateTime<Utc>>,
    #[serde(rename = "raison")]
    pub reason: String,
    #[serde(rename = "commentaire")]
    pub comment: String,
    #[serde(rename = "maj_par")]
    pub updated_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional context sent with a status change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionRequest {
    #[serde(default, alias = "raison")]
    pub reason: Option<String>,
    #[serde(default, alias = "commentaire")]
    pub comment: Option<String>,
    #[serde(default)]
    pub date_prevue: Option<NaiveDate>,
}

impl Delivery {
    /// New record in `A_PREPARER`.
    pub fn open(
        order_id: OrderId,
        date_prevue: Option<NaiveDate>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DeliveryId::new(),
            order_id,
            status: DeliveryStatus::ToPrepare,
            date_prevue,
            date_reelle: None,
            reason: String::new(),
            comment: String::new(),
            updated_by: actor.recorded(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the delivery to `to` and returns the previous status.
    ///
    /// `offset` is the business timezone that "today" is read in.
    /// Nothing is modified when the transition is rejected.
    pub fn transition(
        &mut self,
        to: DeliveryStatus,
        request: &TransitionRequest,
        actor: &Actor,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<DeliveryStatus, DomainError> {
        let from = self.status;
        from.check_transition(to)?;

        self.reason = request.reason.clone().unwrap_or_default();
        self.comment = request.comment.clone().unwrap_or_default();
        if request.date_prevue.is_some() {
            self.date_prevue = request.date_prevue;
        }
        match to {
            DeliveryStatus::Delivered => {
                if self.date_prevue.is_none() {
                    self.date_prevue = Some(now.with_timezone(&offset).date_naive());
                }
                self.date_reelle = Some(now);
            }
            DeliveryStatus::Cancelled | DeliveryStatus::Postponed => self.date_reelle = None,
            DeliveryStatus::ToPrepare | DeliveryStatus::OutForDelivery => {}
        }
        self.status = to;
        self.updated_by = actor.recorded();
        self.updated_at = now;
        Ok(from)
    }

    /// Changes the planned date of an open delivery.
    pub fn reschedule(
        &mut self,
        date: NaiveDate,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status.is_finalized() {
            return Err(DomainError::DeliveryFinalized {
                status: self.status,
            });
        }
        self.date_prevue = Some(date);
        self.updated_by = actor.recorded();
        self.updated_at = now;
        Ok(())
    }
}

/// Append-only audit entry of a delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub id: DeliveryEventId,
    #[serde(rename = "livraison")]
    pub delivery_id: DeliveryId,
    #[serde(rename = "from_statut")]
    pub from_status: Option<DeliveryStatus>,
    #[serde(rename = "to_statut")]
    pub to_status: DeliveryStatus,
    pub message: String,
    pub meta: Value,
    #[serde(rename = "acteur")]
    pub actor: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl DeliveryEvent {
    /// Builds an event for the current status of `delivery`.
    ///
    /// `meta` goes through [`metadata::coerce`] so only JSON primitives are stored.
    pub fn record<M: Serialize + ?Sized>(
        delivery: &Delivery,
        from_status: Option<DeliveryStatus>,
        message: impl Into<String>,
        meta: &M,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: DeliveryEventId::new(),
            delivery_id: delivery.id,
            from_status,
            to_status: delivery.status,
            message: message.into(),
            meta: metadata::coerce(meta)?,
            actor: actor.recorded(),
            created_at: now,
        })
    }
}
