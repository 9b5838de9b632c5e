//! Query filters shared by the store implementations.

use chrono::{DateTime, NaiveDate, Utc};
use common::{ChargeCategoryId, ClientId, PageId};
use domain::{
    Charge, ChargeStatus, DeliveryStatus, Location, LocationCategory, Order, OrderStatus,
};

/// Case-insensitive substring match; an empty needle matches everything.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Client name or contact contains.
    pub client: Option<String>,
    pub client_id: Option<ClientId>,
    /// Location name contains.
    pub location: Option<String>,
    pub date_livraison: Option<NaiveDate>,
    /// Creation instant in `created_from..created_before`.
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub page_id: Option<PageId>,
    /// Free text on client snapshot, location name or note.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl OrderFilter {
    /// Orders created within `from..before`, optionally for one channel.
    pub fn created_between(
        from: DateTime<Utc>,
        before: Option<DateTime<Utc>>,
        page_id: Option<PageId>,
    ) -> Self {
        Self {
            created_from: Some(from),
            created_before: before,
            page_id,
            ..Default::default()
        }
    }

    pub fn paginated(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// In-memory evaluation; `location_name` is the name of the order's location.
    pub fn matches(&self, order: &Order, location_name: &str) -> bool {
        self.status.is_none_or(|s| order.status == s)
            && self.client_id.is_none_or(|id| order.client_id == id)
            && self.page_id.is_none_or(|id| order.page_id == Some(id))
            && self.date_livraison.is_none_or(|d| order.date_livraison == Some(d))
            && self.created_from.is_none_or(|t| order.created_at >= t)
            && self.created_before.is_none_or(|t| order.created_at < t)
            && self.client.as_deref().is_none_or(|q| {
                contains_ci(&order.client.name, q) || contains_ci(&order.client.contact, q)
            })
            && self.location.as_deref().is_none_or(|q| contains_ci(location_name, q))
            && self.search.as_deref().is_none_or(|q| {
                contains_ci(&order.client.name, q)
                    || contains_ci(&order.client.contact, q)
                    || contains_ci(location_name, q)
                    || contains_ci(&order.note, q)
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub date_prevue: Option<NaiveDate>,
    pub page_id: Option<PageId>,
    /// Client name or contact of the order contains.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub category: Option<LocationCategory>,
}

impl LocationFilter {
    pub fn matches(&self, location: &Location) -> bool {
        self.search.as_deref().is_none_or(|q| contains_ci(&location.name, q))
            && self.active.is_none_or(|a| location.active == a)
            && self.category.is_none_or(|c| location.category == c)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChargeFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub category_id: Option<ChargeCategoryId>,
    pub status: Option<ChargeStatus>,
    /// Label or description contains.
    pub search: Option<String>,
}

impl ChargeFilter {
    pub fn matches(&self, charge: &Charge) -> bool {
        self.date_from.is_none_or(|d| charge.date_charge >= d)
            && self.date_to.is_none_or(|d| charge.date_charge <= d)
            && self.category_id.is_none_or(|id| charge.category_id == id)
            && self.status.is_none_or(|s| charge.status == s)
            && self.search.as_deref().is_none_or(|q| {
                contains_ci(&charge.label, q) || contains_ci(&charge.description, q)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_case_insensitive() {
        assert!(contains_ci("Analakely Centre", "analakely"));
        assert!(contains_ci("anything", "  "));
        assert!(!contains_ci("Ivato", "tana"));
    }
}
