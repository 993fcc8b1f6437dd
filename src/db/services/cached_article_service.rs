use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::OnConflict,
};

use crate::db::entities::cached_article;

/// Cached articles for (user, term), oldest first, optionally ignoring entries
/// cached before `not_before`.
pub async fn find_cached_articles<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    search_term: &str,
    not_before: Option<DateTime<Utc>>,
    limit: u64,
) -> Result<Vec<cached_article::Model>, DbErr> {
    let mut query = cached_article::Entity::find()
        .filter(cached_article::Column::UserId.eq(user_id))
        .filter(cached_article::Column::SearchTerm.eq(search_term));
    if let Some(cutoff) = not_before {
        query = query.filter(cached_article::Column::CachedAt.gte(cutoff));
    }
    query
        .order_by_asc(cached_article::Column::CachedAt)
        .order_by_asc(cached_article::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// Inserts one cache entry. Returns 0 when an entry with the same
/// (user, term, article key) already exists.
pub async fn insert_cached_article<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    search_term: &str,
    article_key: &str,
    article: serde_json::Value,
    cached_at: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let entry = cached_article::ActiveModel {
        user_id: Set(user_id),
        search_term: Set(search_term.to_owned()),
        article_key: Set(article_key.to_owned()),
        article: Set(article),
        cached_at: Set(cached_at),
        ..Default::default()
    };
    cached_article::Entity::insert(entry)
        .on_conflict(
            OnConflict::columns([
                cached_article::Column::UserId,
                cached_article::Column::SearchTerm,
                cached_article::Column::ArticleKey,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await
}

/// Deletes entries for (user, term) cached before `cutoff`.
pub async fn purge_stale_articles<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    search_term: &str,
    cutoff: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let result = cached_article::Entity::delete_many()
        .filter(cached_article::Column::UserId.eq(user_id))
        .filter(cached_article::Column::SearchTerm.eq(search_term))
        .filter(cached_article::Column::CachedAt.lt(cutoff))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
