//! Articles, clients, delivery locations, sales channels and fee previews.

use chrono::{DateTime, Utc};
use common::{ArticleId, ClientId, ConfigurationId, LocationId, PageId};
use domain::fees::validate_override;
use domain::{
    Article, ChannelConfig, ChannelConfiguration, Client, DomainError, FeeQuote, Location,
    LocationCategory, Money, Page, required_text,
};
use serde::{Deserialize, Serialize};
use store::{LocationFilter, Store, Transaction};

use crate::{Backoffice, Result, ServiceError};

/// Existing client id, or a name and optional contact to find or create one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInput {
    #[serde(default)]
    pub id: Option<ClientId>,
    #[serde(default, rename = "nom")]
    pub name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

impl ClientInput {
    pub fn existing(id: ClientId) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn named(name: impl Into<String>, contact: Option<&str>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            contact: contact.map(str::to_string),
        }
    }
}

/// Existing location id, or a name to find or create one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInput {
    #[serde(default)]
    pub id: Option<LocationId>,
    #[serde(default, rename = "nom")]
    pub name: Option<String>,
}

impl LocationInput {
    pub fn existing(id: LocationId) -> Self {
        Self {
            id: Some(id),
            name: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewArticle {
    #[serde(rename = "nom_produit")]
    pub name: String,
    pub reference: String,
    #[serde(default, rename = "prix_achat")]
    pub purchase_price: Money,
    #[serde(default, rename = "prix_vente")]
    pub sale_price: Money,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "quantite_stock")]
    pub stock: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default, rename = "adresse")]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLocation {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(default, rename = "categorie")]
    pub category: LocationCategory,
    #[serde(default = "active_by_default", rename = "actif")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(default, rename = "lien")]
    pub link: String,
    #[serde(default, rename = "ordre")]
    pub position: i32,
    #[serde(default = "active_by_default", rename = "actif")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Fee preview request; nothing is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct FeePreview {
    pub lieu: LocationId,
    #[serde(default)]
    pub frais_override: Option<i64>,
}

/// Default fee of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocationFee {
    pub lieu_id: LocationId,
    pub categorie: LocationCategory,
    pub frais_defaut: i64,
}

/// Finds the client named by `input`, creating it when no match exists.
///
/// With a contact, a client of the same name and contact wins; otherwise
/// the newest namesake without a contact is reused and its contact filled in.
pub(crate) async fn resolve_client<T: Transaction>(
    tx: &mut T,
    input: &ClientInput,
    now: DateTime<Utc>,
) -> Result<Client> {
    if let Some(id) = input.id {
        return tx
            .get_client(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("client", id));
    }

    let name = input.name.as_deref().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(DomainError::validation("client_input", "provide an id or a name").into());
    }
    let contact = input
        .contact
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let mut found = tx.find_client(name, contact).await?;
    if found.is_none() && contact.is_some() {
        found = tx
            .find_client(name, None)
            .await?
            .filter(|c| c.contact.trim().is_empty());
    }
    if let Some(mut client) = found {
        if let Some(contact) = contact
            && client.contact.trim().is_empty()
        {
            client.contact = contact.to_string();
            client.updated_at = now;
            tx.update_client(&client).await?;
        }
        return Ok(client);
    }

    let client = Client {
        id: ClientId::new(),
        name: name.to_string(),
        address: String::new(),
        contact: contact.unwrap_or_default().to_string(),
        created_at: now,
        updated_at: now,
    };
    tx.insert_client(&client).await?;
    tracing::debug!(client_id = %client.id, "client created from order input");
    Ok(client)
}

/// Finds the location named by `input`, creating it in `AUTRE` when missing.
pub(crate) async fn resolve_location<T: Transaction>(
    tx: &mut T,
    input: &LocationInput,
    now: DateTime<Utc>,
) -> Result<Location> {
    if let Some(id) = input.id {
        return tx
            .get_location(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("location", id));
    }

    let name = input.name.as_deref().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(DomainError::validation("lieu_input", "provide an id or a name").into());
    }
    if let Some(location) = tx.find_location(name).await? {
        return Ok(location);
    }

    let location = Location {
        id: LocationId::new(),
        name: name.to_string(),
        category: LocationCategory::Autre,
        active: true,
        created_at: now,
        updated_at: now,
    };
    tx.insert_location(&location).await?;
    tracing::debug!(location_id = %location.id, "location created from order input");
    Ok(location)
}

/// Loads the active channel configuration, creating the default one on first use.
pub(crate) async fn channel_config<T: Transaction>(
    tx: &mut T,
    now: DateTime<Utc>,
) -> Result<ChannelConfig> {
    if let Some(configuration) = tx.active_configuration().await? {
        return Ok(ChannelConfig::new(configuration));
    }
    let configuration = ChannelConfiguration {
        id: ConfigurationId::new(),
        app_name: ChannelConfiguration::DEFAULT_APP_NAME.to_string(),
        created_at: now,
    };
    tx.insert_configuration(&configuration).await?;
    Ok(ChannelConfig::new(configuration))
}

/// Loads a page and checks it against the active configuration.
pub(crate) async fn resolve_page<T: Transaction>(
    tx: &mut T,
    config: &ChannelConfig,
    page_id: PageId,
) -> Result<Page> {
    let page = tx
        .get_page(page_id)
        .await?
        .ok_or_else(|| DomainError::validation("page", format!("unknown page {page_id}")))?;
    config.validate(&page)?;
    Ok(page)
}

impl<S: Store> Backoffice<S> {
    #[tracing::instrument(skip(self, input), fields(reference = %input.reference))]
    pub async fn create_article(&self, input: NewArticle) -> Result<Article> {
        let now = self.now();
        let article = Article {
            id: ArticleId::new(),
            name: required_text("nom_produit", &input.name)?,
            reference: required_text("reference", &input.reference)?,
            purchase_price: non_negative("prix_achat", input.purchase_price)?,
            sale_price: non_negative("prix_vente", input.sale_price)?,
            description: input.description.trim().to_string(),
            stock: input.stock.max(0),
            created_at: now,
            updated_at: now,
        };
        let mut tx = self.store().begin().await?;
        tx.insert_article(&article).await?;
        tx.commit().await?;
        Ok(article)
    }

    pub async fn get_article(&self, id: ArticleId) -> Result<Article> {
        let mut tx = self.store().begin().await?;
        tx.get_article(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("article", id))
    }

    pub async fn list_articles(&self, search: Option<&str>) -> Result<Vec<Article>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.list_articles(blank_to_none(search)).await?)
    }

    /// Deletes an article that no order or purchase line refers to.
    #[tracing::instrument(skip(self))]
    pub async fn delete_article(&self, id: ArticleId) -> Result<()> {
        let mut tx = self.store().begin().await?;
        if !tx.delete_article(id).await? {
            return Err(ServiceError::not_found("article", id));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn list_clients(&self, search: Option<&str>) -> Result<Vec<Client>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.list_clients(blank_to_none(search)).await?)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create_client(&self, input: NewClient) -> Result<Client> {
        let now = self.now();
        let client = Client {
            id: ClientId::new(),
            name: required_text("nom", &input.name)?,
            address: input.address.trim().to_string(),
            contact: input.contact.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        let mut tx = self.store().begin().await?;
        tx.insert_client(&client).await?;
        tx.commit().await?;
        Ok(client)
    }

    pub async fn list_locations(&self, filter: &LocationFilter) -> Result<Vec<Location>> {
        let mut tx = self.store().begin().await?;
        Ok(tx.list_locations(filter).await?)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn create_location(&self, input: NewLocation) -> Result<Location> {
        let now = self.now();
        let location = Location {
            id: LocationId::new(),
            name: required_text("nom", &input.name)?,
            category: input.category,
            active: input.active,
            created_at: now,
            updated_at: now,
        };
        let mut tx = self.store().begin().await?;
        tx.insert_location(&location).await?;
        tx.commit().await?;
        Ok(location)
    }

    pub async fn location_fee(&self, id: LocationId) -> Result<LocationFee> {
        let mut tx = self.store().begin().await?;
        let location = tx
            .get_location(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("location", id))?;
        Ok(LocationFee {
            lieu_id: location.id,
            categorie: location.category,
            frais_defaut: location.category.base_fee(),
        })
    }

    /// Computes the fee an order would get, without persisting a snapshot.
    pub async fn preview_fee(&self, request: &FeePreview) -> Result<FeeQuote> {
        let override_amount = validate_override(request.frais_override)?;
        let mut tx = self.store().begin().await?;
        let location = tx
            .get_location(request.lieu)
            .await?
            .ok_or_else(|| ServiceError::not_found("location", request.lieu))?;
        Ok(FeeQuote::new(location.category, override_amount))
    }

    /// The active configuration snapshot for this request.
    pub async fn channel_config(&self) -> Result<ChannelConfig> {
        let mut tx = self.store().begin().await?;
        let config = channel_config(&mut tx, self.now()).await?;
        tx.commit().await?;
        Ok(config)
    }

    pub async fn list_pages(&self) -> Result<Vec<Page>> {
        let mut tx = self.store().begin().await?;
        let config = channel_config(&mut tx, self.now()).await?;
        let pages = tx.list_pages(config.configuration.id).await?;
        tx.commit().await?;
        Ok(pages)
    }

    /// Adds a page to the active configuration.
    #[tracing::instrument(skip(self, input))]
    pub async fn create_page(&self, input: NewPage) -> Result<Page> {
        let now = self.now();
        let mut tx = self.store().begin().await?;
        let config = channel_config(&mut tx, now).await?;
        let page = Page {
            id: PageId::new(),
            configuration_id: config.configuration.id,
            name: required_text("nom", &input.name)?,
            link: input.link.trim().to_string(),
            position: input.position,
            active: input.active,
            created_at: now,
        };
        tx.insert_page(&page).await?;
        tx.commit().await?;
        Ok(page)
    }
}

fn non_negative(field: &str, amount: Money) -> Result<Money> {
    if amount.is_negative() {
        return Err(DomainError::validation(field, "amount must not be negative").into());
    }
    Ok(amount)
}

pub(crate) fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn client_is_reused_case_insensitively_and_contact_filled() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();

        let first = resolve_client(&mut tx, &ClientInput::named("  Rabe ", None), now)
            .await
            .unwrap();
        assert_eq!(first.name, "Rabe");
        assert_eq!(first.contact, "");

        let again = resolve_client(&mut tx, &ClientInput::named("RABE", Some("034 11")), now)
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(again.contact, "034 11");
        assert_eq!(
            tx.get_client(first.id).await.unwrap().unwrap().contact,
            "034 11"
        );
    }

    #[tokio::test]
    async fn client_with_other_contact_is_a_new_client() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();

        let first = resolve_client(&mut tx, &ClientInput::named("Rabe", Some("034")), now)
            .await
            .unwrap();
        let other = resolve_client(&mut tx, &ClientInput::named("Rabe", Some("032")), now)
            .await
            .unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn exact_contact_match_beats_blank_namesake() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();

        let with_contact = resolve_client(&mut tx, &ClientInput::named("Soa", Some("033")), now)
            .await
            .unwrap();
        let blank = resolve_client(&mut tx, &ClientInput::named("Soa", None), now)
            .await
            .unwrap();
        assert_eq!(blank.id, with_contact.id);

        let found = resolve_client(&mut tx, &ClientInput::named("soa", Some("033")), now)
            .await
            .unwrap();
        assert_eq!(found.id, with_contact.id);
        assert_eq!(tx.list_clients(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn client_input_needs_id_or_name() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = resolve_client(&mut tx, &ClientInput::default(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("client_input"));

        let err = resolve_client(&mut tx, &ClientInput::existing(ClientId::new()), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn new_location_defaults_to_autre() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut tx = store.begin().await.unwrap();

        let created = resolve_location(&mut tx, &LocationInput::named("Ivato"), now)
            .await
            .unwrap();
        assert_eq!(created.category, LocationCategory::Autre);
        let found = resolve_location(&mut tx, &LocationInput::named("ivato "), now)
            .await
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn configuration_is_created_once() {
        let store = MemoryStore::new();
        let service = Backoffice::new(store);
        let first = service.channel_config().await.unwrap();
        let second = service.channel_config().await.unwrap();
        assert_eq!(first.configuration.id, second.configuration.id);
        assert_eq!(first.configuration.app_name, "Mon Application");
    }

    #[tokio::test]
    async fn inactive_page_is_rejected() {
        let service = Backoffice::new(MemoryStore::new());
        let page = service
            .create_page(NewPage {
                name: "Facebook".to_string(),
                link: String::new(),
                position: 1,
                active: false,
            })
            .await
            .unwrap();

        let mut tx = service.store().begin().await.unwrap();
        let config = channel_config(&mut tx, Utc::now()).await.unwrap();
        let err = resolve_page(&mut tx, &config, page.id).await.unwrap_err();
        assert_eq!(err.field(), Some("page"));
    }

    #[tokio::test]
    async fn fee_preview_uses_override() {
        let service = Backoffice::new(MemoryStore::new());
        let location = service
            .create_location(NewLocation {
                name: "Ambohijatovo".to_string(),
                category: LocationCategory::Peripherie,
                active: true,
            })
            .await
            .unwrap();

        let quote = service
            .preview_fee(&FeePreview {
                lieu: location.id,
                frais_override: None,
            })
            .await
            .unwrap();
        assert_eq!(quote.frais_final, 4000);

        let quote = service
            .preview_fee(&FeePreview {
                lieu: location.id,
                frais_override: Some(4500),
            })
            .await
            .unwrap();
        assert_eq!(quote.frais_calcule, 4000);
        assert_eq!(quote.frais_final, 4500);

        let fee = service.location_fee(location.id).await.unwrap();
        assert_eq!(fee.frais_defaut, 4000);
    }
}
