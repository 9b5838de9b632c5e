//! Articles, clients, delivery locations, fee previews and sales channels.

use axum::Json;
use axum::http::StatusCode;
use backoffice::{FeePreview, LocationFee, NewArticle, NewClient, NewLocation, NewPage};
use common::{ArticleId, LocationId};
use domain::{Article, Client, FeeQuote, Location, LocationCategory, Page};
use serde::Deserialize;
use store::{LocationFilter, Store};

use super::{AppStateRef, SearchQuery};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub actif: Option<bool>,
    #[serde(default)]
    pub categorie: Option<LocationCategory>,
}

impl LocationQuery {
    fn filter(self) -> LocationFilter {
        LocationFilter {
            search: self.q.filter(|q| !q.trim().is_empty()),
            active: self.actif,
            category: self.categorie,
        }
    }
}

/// GET /articles?q=
pub async fn list_articles<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Article>>, ApiError> {
    Ok(Json(state.backoffice.list_articles(query.q.as_deref()).await?))
}

/// POST /articles
pub async fn create_article<S: Store>(
    state: AppStateRef<S>,
    ApiJson(input): ApiJson<NewArticle>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state.backoffice.create_article(input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// GET /articles/{id}
pub async fn get_article<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<ArticleId>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.backoffice.get_article(id).await?))
}

/// DELETE /articles/{id}: conflict while order or purchase lines refer to it.
pub async fn delete_article<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<ArticleId>,
) -> Result<StatusCode, ApiError> {
    state.backoffice.delete_article(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /clients?q=
pub async fn list_clients<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.backoffice.list_clients(query.q.as_deref()).await?))
}

/// POST /clients
pub async fn create_client<S: Store>(
    state: AppStateRef<S>,
    ApiJson(input): ApiJson<NewClient>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.backoffice.create_client(input).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /locations?q=&actif=&categorie=
pub async fn list_locations<S: Store>(
    state: AppStateRef<S>,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> Result<Json<Vec<Location>>, ApiError> {
    Ok(Json(state.backoffice.list_locations(&query.filter()).await?))
}

/// POST /locations
pub async fn create_location<S: Store>(
    state: AppStateRef<S>,
    ApiJson(input): ApiJson<NewLocation>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
    let location = state.backoffice.create_location(input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// GET /locations/{id}/fee
pub async fn location_fee<S: Store>(
    state: AppStateRef<S>,
    ApiPath(id): ApiPath<LocationId>,
) -> Result<Json<LocationFee>, ApiError> {
    Ok(Json(state.backoffice.location_fee(id).await?))
}

/// POST /fees/preview: nothing is persisted.
pub async fn preview_fee<S: Store>(
    state: AppStateRef<S>,
    ApiJson(request): ApiJson<FeePreview>,
) -> Result<Json<FeeQuote>, ApiError> {
    Ok(Json(state.backoffice.preview_fee(&request).await?))
}

/// GET /pages: pages of the active configuration.
pub async fn list_pages<S: Store>(state: AppStateRef<S>) -> Result<Json<Vec<Page>>, ApiError> {
    Ok(Json(state.backoffice.list_pages().await?))
}

/// POST /pages
pub async fn create_page<S: Store>(
    state: AppStateRef<S>,
    ApiJson(input): ApiJson<NewPage>,
) -> Result<(StatusCode, Json<Page>), ApiError> {
    let page = state.backoffice.create_page(input).await?;
    Ok((StatusCode::CREATED, Json(page)))
}
