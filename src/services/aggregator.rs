//! Per-user article aggregation.
//!
//! For every preference of a user the aggregator serves up to
//! [`ARTICLES_PER_PREFERENCE`] articles: fresh cached entries first, then a
//! single provider search fills the shortfall. Newly fetched articles are
//! written back to the cache before they are returned. Expired entries are
//! only purged once they are no longer needed. Fills for the same
//! (user, term) are serialized so concurrent requests neither search twice nor
//! cache the same article twice.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sea_orm::{DatabaseConnection, DbErr};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::db::entities::cached_article;
use crate::db::services::{cached_article_service, preference_service};
use crate::news::{ArticleDocument, NewsProvider, ProviderError};

pub const ARTICLES_PER_PREFERENCE: usize = 10;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Store error: {0}")]
    Store(#[from] DbErr),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// One cached article together with the metadata it was cached under.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntry {
    pub user_id: i32,
    pub search_term: String,
    pub article_key: String,
    pub article: ArticleDocument,
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    /// The document handed to clients: the provider article plus cache metadata.
    pub fn into_document(self, is_cached: bool) -> Value {
        let mut document = self.article;
        document.insert("user_id".to_string(), Value::from(self.user_id));
        document.insert("search_term".to_string(), Value::String(self.search_term));
        document.insert("cached_at".to_string(), Value::String(self.cached_at.to_rfc3339()));
        document.insert("is_cached".to_string(), Value::Bool(is_cached));
        Value::Object(document)
    }
}

impl From<cached_article::Model> for CachedEntry {
    fn from(row: cached_article::Model) -> Self {
        let article = match row.article {
            Value::Object(map) => map,
            other => {
                let mut map = ArticleDocument::new();
                map.insert("article".to_string(), other);
                map
            }
        };
        CachedEntry {
            user_id: row.user_id,
            search_term: row.search_term,
            article_key: row.article_key,
            article,
            cached_at: row.cached_at,
        }
    }
}

/// Identity used to de-duplicate provider results within a term.
pub fn article_key(article: &ArticleDocument) -> String {
    ["webUrl", "id"]
        .iter()
        .find_map(|field| article.get(*field).and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| Value::Object(article.clone()).to_string())
}

#[async_trait]
pub trait ArticleCache: Send + Sync {
    /// Up to `limit` entries for (user, term), oldest first, skipping those cached before `not_before`.
    async fn find_fresh(
        &self,
        user_id: i32,
        search_term: &str,
        not_before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<CachedEntry>, DbErr>;

    /// Persists an entry. Returns false if its key was already cached for the term.
    async fn store(&self, entry: &CachedEntry) -> Result<bool, DbErr>;

    /// Removes entries for (user, term) cached before `cutoff`.
    async fn purge_stale(&self, user_id: i32, search_term: &str, cutoff: DateTime<Utc>) -> Result<u64, DbErr>;
}

#[async_trait]
pub trait PreferenceLookup: Send + Sync {
    /// Preference names of the user, in preference id order.
    async fn search_terms(&self, user_id: i32) -> Result<Vec<String>, DbErr>;
}

pub struct SeaOrmArticleCache {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmArticleCache {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ArticleCache for SeaOrmArticleCache {
    async fn find_fresh(
        &self,
        user_id: i32,
        search_term: &str,
        not_before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<CachedEntry>, DbErr> {
        let rows = cached_article_service::find_cached_articles(
            self.db.as_ref(),
            user_id,
            search_term,
            not_before,
            limit as u64,
        )
        .await?;
        Ok(rows.into_iter().map(CachedEntry::from).collect())
    }

    async fn store(&self, entry: &CachedEntry) -> Result<bool, DbErr> {
        let inserted = cached_article_service::insert_cached_article(
            self.db.as_ref(),
            entry.user_id,
            &entry.search_term,
            &entry.article_key,
            Value::Object(entry.article.clone()),
            entry.cached_at,
        )
        .await?;
        Ok(inserted > 0)
    }

    async fn purge_stale(&self, user_id: i32, search_term: &str, cutoff: DateTime<Utc>) -> Result<u64, DbErr> {
        cached_article_service::purge_stale_articles(self.db.as_ref(), user_id, search_term, cutoff).await
    }
}

pub struct SeaOrmPreferenceLookup {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmPreferenceLookup {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PreferenceLookup for SeaOrmPreferenceLookup {
    async fn search_terms(&self, user_id: i32) -> Result<Vec<String>, DbErr> {
        preference_service::get_user_preference_names(self.db.as_ref(), user_id).await
    }
}

/// Articles produced for one preference term.
#[derive(Debug, Default)]
pub struct TermArticles {
    pub cached: Vec<CachedEntry>,
    pub fetched: Vec<CachedEntry>,
}

impl TermArticles {
    /// Cached documents first, then freshly fetched ones.
    pub fn into_documents(self) -> impl Iterator<Item = Value> {
        self.cached
            .into_iter()
            .map(|entry| entry.into_document(true))
            .chain(self.fetched.into_iter().map(|entry| entry.into_document(false)))
    }
}

pub struct ArticleAggregator {
    preferences: Arc<dyn PreferenceLookup>,
    cache: Arc<dyn ArticleCache>,
    provider: Arc<dyn NewsProvider>,
    freshness: Option<Duration>,
    fill_locks: DashMap<(i32, String), Arc<Mutex<()>>>,
}

impl ArticleAggregator {
    /// `freshness` of `None` keeps cached articles forever.
    pub fn new(
        preferences: Arc<dyn PreferenceLookup>,
        cache: Arc<dyn ArticleCache>,
        provider: Arc<dyn NewsProvider>,
        freshness: Option<Duration>,
    ) -> Self {
        Self {
            preferences,
            cache,
            provider,
            freshness,
            fill_locks: DashMap::new(),
        }
    }

    /// All articles for the user's preferences, in preference order. Any store
    /// failure or hard provider failure fails the whole call.
    pub async fn fetch_for_user(&self, user_id: i32) -> Result<Vec<Value>, AggregateError> {
        let terms = self.preferences.search_terms(user_id).await?;

        let mut articles = Vec::with_capacity(terms.len() * ARTICLES_PER_PREFERENCE);
        for term in &terms {
            let batch = self.fill_term(user_id, term).await?;
            debug!(
                user_id,
                search_term = %term,
                cached = batch.cached.len(),
                fetched = batch.fetched.len(),
                "Collected articles for preference."
            );
            articles.extend(batch.into_documents());
        }
        Ok(articles)
    }

    /// Serves one term from cache and tops it up from the provider on shortfall.
    pub async fn fill_term(&self, user_id: i32, search_term: &str) -> Result<TermArticles, AggregateError> {
        let lock = self.fill_lock(user_id, search_term);
        let _guard = lock.lock().await;

        let now = Utc::now();
        let cutoff = self.freshness.map(|ttl| now - ttl);

        let cached = self
            .cache
            .find_fresh(user_id, search_term, cutoff, ARTICLES_PER_PREFERENCE)
            .await?;
        let mut batch = TermArticles { cached, fetched: Vec::new() };

        let shortfall = ARTICLES_PER_PREFERENCE.saturating_sub(batch.cached.len());
        if shortfall == 0 {
            self.purge_expired(user_id, search_term, cutoff).await?;
            return Ok(batch);
        }

        let results = match self.provider.search(search_term).await {
            Ok(results) => results,
            Err(e) if e.is_soft() => {
                warn!(user_id, search_term, error = %e, "Provider search failed; serving cached articles only.");
                // Stale entries stay until the provider can replace them.
                if let Some(cutoff) = cutoff {
                    let stale = self
                        .cache
                        .find_fresh(user_id, search_term, None, ARTICLES_PER_PREFERENCE)
                        .await?
                        .into_iter()
                        .filter(|entry| entry.cached_at < cutoff)
                        .take(shortfall);
                    batch.cached.extend(stale);
                }
                return Ok(batch);
            }
            Err(e) => return Err(e.into()),
        };

        self.purge_expired(user_id, search_term, cutoff).await?;

        let mut seen: HashSet<String> = batch.cached.iter().map(|entry| entry.article_key.clone()).collect();
        for article in results {
            if batch.fetched.len() == shortfall {
                break;
            }
            let key = article_key(&article);
            if !seen.insert(key.clone()) {
                continue;
            }
            let entry = CachedEntry {
                user_id,
                search_term: search_term.to_string(),
                article_key: key,
                article,
                cached_at: now,
            };
            if self.cache.store(&entry).await? {
                batch.fetched.push(entry);
            }
        }

        if !batch.fetched.is_empty() {
            info!(user_id, search_term, count = batch.fetched.len(), "Cached newly fetched articles.");
        }
        Ok(batch)
    }

    async fn purge_expired(
        &self,
        user_id: i32,
        search_term: &str,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<(), DbErr> {
        let Some(cutoff) = cutoff else {
            return Ok(());
        };
        let purged = self.cache.purge_stale(user_id, search_term, cutoff).await?;
        if purged > 0 {
            debug!(user_id, search_term, purged, "Purged stale cached articles.");
        }
        Ok(())
    }

    fn fill_lock(&self, user_id: i32, search_term: &str) -> Arc<Mutex<()>> {
        self.fill_locks
            .entry((user_id, search_term.to_string()))
            .or_default()
            .clone()
    }
}
