use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tracing::info;

use crate::db::entities::saved_article;
use crate::db::services::saved_article_service as store;
use crate::web::error::AppError;

#[derive(Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    AlreadySaved,
}

/// Saves `article` for the user unless one with the same `webUrl` is already saved.
pub async fn save_article(
    db: &DatabaseConnection,
    user_id: i32,
    article: Value,
) -> Result<SaveOutcome, AppError> {
    let web_url = article
        .get("webUrl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AppError::InvalidInput("Article is missing its webUrl.".to_string()))?;

    if store::find_saved_article(db, user_id, &web_url).await?.is_some() {
        return Ok(SaveOutcome::AlreadySaved);
    }

    // The unique index settles a concurrent save of the same url.
    let inserted = store::insert_saved_article(db, user_id, &web_url, article, Utc::now()).await?;
    if inserted == 0 {
        return Ok(SaveOutcome::AlreadySaved);
    }

    info!(user_id, web_url = %web_url, "Saved article.");
    Ok(SaveOutcome::Saved)
}

/// Saved article documents for the user with `saved_at` attached; storage ids
/// and the owner tag are not exposed.
pub async fn list_saved_articles(db: &DatabaseConnection, user_id: i32) -> Result<Vec<Value>, AppError> {
    Ok(store::list_saved_articles(db, user_id)
        .await?
        .into_iter()
        .map(to_document)
        .collect())
}

pub async fn delete_saved_article(db: &DatabaseConnection, user_id: i32, web_url: &str) -> Result<(), AppError> {
    let deleted = store::delete_saved_article(db, user_id, web_url).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Article not found or not deleted.".to_string()));
    }
    info!(user_id, web_url, "Deleted saved article.");
    Ok(())
}

fn to_document(row: saved_article::Model) -> Value {
    let mut document = match row.article {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    document.remove("_id");
    document.remove("user_id");
    document.insert("saved_at".to_string(), Value::String(row.saved_at.to_rfc3339()));
    Value::Object(document)
}
