//! Articles, clients, delivery locations and sales channels.

use chrono::{DateTime, Utc};
use common::{ArticleId, ClientId, ConfigurationId, LocationId, PageId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, LocationCategory, Money};

/// Inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    #[serde(rename = "nom_produit")]
    pub name: String,
    pub reference: String,
    #[serde(rename = "prix_achat")]
    pub purchase_price: Money,
    #[serde(rename = "prix_vente")]
    pub sale_price: Money,
    pub description: String,
    #[serde(rename = "quantite_stock")]
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of applying a stock delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub before: i64,
    pub after: i64,
    /// The raw result was negative and has been floored at zero.
    pub clamped: bool,
}

impl Article {
    /// Adds `delta` to the stock, flooring the result at zero.
    ///
    /// Overselling never fails; the deficit is dropped.
    pub fn apply_stock_delta(&mut self, delta: i64, now: DateTime<Utc>) -> StockChange {
        let before = self.stock;
        let raw = before.saturating_add(delta);
        let after = raw.max(0);
        self.stock = after;
        self.updated_at = now;
        StockChange {
            before,
            after,
            clamped: raw < 0,
        }
    }
}

/// Customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "adresse")]
    pub address: String,
    pub contact: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Case-insensitive match on trimmed name, and on contact when one is given.
    pub fn matches(&self, name: &str, contact: Option<&str>) -> bool {
        let same_name = self.name.trim().to_lowercase() == name.trim().to_lowercase();
        match contact.map(str::trim).filter(|c| !c.is_empty()) {
            Some(contact) => {
                same_name && self.contact.trim().to_lowercase() == contact.to_lowercase()
            }
            None => same_name,
        }
    }

    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            name: self.name.clone(),
            contact: self.contact.clone(),
            address: self.address.clone(),
        }
    }
}

/// Client details copied onto an order when it is saved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientSnapshot {
    #[serde(rename = "client_nom")]
    pub name: String,
    #[serde(rename = "client_contact")]
    pub contact: String,
    #[serde(rename = "client_adresse")]
    pub address: String,
}

/// Delivery location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "categorie")]
    pub category: LocationCategory,
    #[serde(rename = "actif")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn matches(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

/// Application configuration record owning the sales channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfiguration {
    pub id: ConfigurationId,
    pub app_name: String,
    pub created_at: DateTime<Utc>,
}

impl ChannelConfiguration {
    pub const DEFAULT_APP_NAME: &'static str = "Mon Application";
}

/// Sales channel (page) an order can be attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    #[serde(rename = "config")]
    pub configuration_id: ConfigurationId,
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "lien")]
    pub link: String,
    #[serde(rename = "ordre")]
    pub position: i32,
    #[serde(rename = "actif")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Active configuration resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub configuration: ChannelConfiguration,
}

impl ChannelConfig {
    pub fn new(configuration: ChannelConfiguration) -> Self {
        Self { configuration }
    }

    /// A page is usable when it belongs to the active configuration and is active.
    pub fn validate(&self, page: &Page) -> Result<(), DomainError> {
        if page.configuration_id != self.configuration.id {
            return Err(DomainError::validation(
                "page",
                "page does not belong to the active configuration",
            ));
        }
        if !page.active {
            return Err(DomainError::validation("page", "page is inactive"));
        }
        Ok(())
    }
}

/// Trims a required text input.
pub fn required_text(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DomainError::validation(field, "this field is required"))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(stock: i64) -> Article {
        let now = Utc::now();
        Article {
            id: ArticleId::new(),
            name: "Savon".into(),
            reference: "SAV-01".into(),
            purchase_price: Money::from_units(600),
            sale_price: Money::from_units(1000),
            description: String::new(),
            stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stock_debit_and_credit() {
        let mut a = article(10);
        let change = a.apply_stock_delta(-3, Utc::now());
        assert_eq!(change, StockChange { before: 10, after: 7, clamped: false });
        a.apply_stock_delta(3, Utc::now());
        assert_eq!(a.stock, 10);
    }

    #[test]
    fn oversell_clamps_to_zero() {
        let mut a = article(2);
        let change = a.apply_stock_delta(-5, Utc::now());
        assert!(change.clamped);
        assert_eq!(a.stock, 0);
    }

    #[test]
    fn client_matching_is_case_insensitive() {
        let now = Utc::now();
        let client = Client {
            id: ClientId::new(),
            name: "Rakoto Jean".into(),
            address: String::new(),
            contact: "034 11 222 33".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(client.matches("  rakoto JEAN ", None));
        assert!(client.matches("Rakoto Jean", Some("034 11 222 33")));
        assert!(client.matches("Rakoto Jean", Some("  ")));
        assert!(!client.matches("Rakoto Jean", Some("032 00 000 00")));
        assert!(!client.matches("Rabe", None));
    }

    #[test]
    fn page_must_belong_to_active_configuration() {
        let now = Utc::now();
        let active = ChannelConfiguration {
            id: ConfigurationId::new(),
            app_name: ChannelConfiguration::DEFAULT_APP_NAME.into(),
            created_at: now,
        };
        let config = ChannelConfig::new(active.clone());
        let mut page = Page {
            id: PageId::new(),
            configuration_id: active.id,
            name: "Facebook".into(),
            link: String::new(),
            position: 0,
            active: true,
            created_at: now,
        };
        assert!(config.validate(&page).is_ok());

        page.active = false;
        assert_eq!(config.validate(&page).unwrap_err().field(), Some("page"));

        page.active = true;
        page.configuration_id = ConfigurationId::new();
        assert!(config.validate(&page).is_err());
    }

    #[test]
    fn required_text_trims() {
        assert_eq!(required_text("name", " Lot ").unwrap(), "Lot");
        assert!(required_text("name", "   ").is_err());
    }
}
