use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};

use crate::db::entities::saved_article;

pub async fn find_saved_article<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    web_url: &str,
) -> Result<Option<saved_article::Model>, DbErr> {
    saved_article::Entity::find()
        .filter(saved_article::Column::UserId.eq(user_id))
        .filter(saved_article::Column::WebUrl.eq(web_url))
        .one(db)
        .await
}

/// Stores a saved article. Returns 0 if (user, url) is already saved.
pub async fn insert_saved_article<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    web_url: &str,
    article: serde_json::Value,
    saved_at: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let entry = saved_article::ActiveModel {
        user_id: Set(user_id),
        web_url: Set(web_url.to_owned()),
        article: Set(article),
        saved_at: Set(saved_at),
        ..Default::default()
    };
    saved_article::Entity::insert(entry)
        .on_conflict(
            OnConflict::columns([saved_article::Column::UserId, saved_article::Column::WebUrl])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
}

pub async fn list_saved_articles<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<saved_article::Model>, DbErr> {
    saved_article::Entity::find()
        .filter(saved_article::Column::UserId.eq(user_id))
        .order_by_asc(saved_article::Column::SavedAt)
        .order_by_asc(saved_article::Column::Id)
        .all(db)
        .await
}

/// Deletes the user's saved article with `web_url`, returning rows affected.
pub async fn delete_saved_article<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    web_url: &str,
) -> Result<u64, DbErr> {
    let result = saved_article::Entity::delete_many()
        .filter(saved_article::Column::UserId.eq(user_id))
        .filter(saved_article::Column::WebUrl.eq(web_url))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
