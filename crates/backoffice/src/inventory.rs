//! Stock ledger shared by orders and purchases.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::ArticleId;
use domain::{Article, StockChange};
use store::Transaction;

use crate::{Result, ServiceError};

/// Article ids in the order their rows are locked: sorted, without duplicates.
///
/// Every mutation touching several articles locks them in this order.
pub fn lock_sequence(ids: impl IntoIterator<Item = ArticleId>) -> Vec<ArticleId> {
    let mut ids: Vec<ArticleId> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Locks the listed articles in [`lock_sequence`] order.
///
/// Unknown ids are absent from the returned map.
pub async fn lock_articles<T: Transaction>(
    tx: &mut T,
    ids: impl IntoIterator<Item = ArticleId>,
) -> Result<HashMap<ArticleId, Article>> {
    let mut articles = HashMap::new();
    for id in lock_sequence(ids) {
        if let Some(article) = tx.lock_article(id).await? {
            articles.insert(id, article);
        }
    }
    Ok(articles)
}

/// Adds `delta` to an article's stock under a row lock.
///
/// The result is floored at zero; a clamp is counted and logged but never
/// rejected.
pub async fn adjust<T: Transaction>(
    tx: &mut T,
    article_id: ArticleId,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<StockChange> {
    let mut article = tx
        .lock_article(article_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("article", article_id))?;

    let change = article.apply_stock_delta(delta, now);
    tx.update_article(&article).await?;

    if change.clamped {
        metrics::counter!("stock_clamped_total").increment(1);
        tracing::warn!(
            article_id = %article_id,
            reference = %article.reference,
            before = change.before,
            delta,
            "stock floored at zero"
        );
    }
    Ok(change)
}
