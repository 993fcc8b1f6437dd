//! Idempotent schema bootstrap and reference-data seeding, run once at startup.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema, Set,
    sea_query::{Index, OnConflict},
};
use tracing::info;

use crate::db::entities::{cached_article, preference, saved_article, user, user_preference};

/// The fixed preference catalogue. Ids and names never change.
pub const DEFAULT_PREFERENCES: [(i32, &str); 3] = [(1, "Technology"), (2, "Sports"), (3, "Business")];

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Creates `users`, `preferences` and `users_preferences` if missing.
pub async fn ensure_relational_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, user::Entity).await?;
    create_table(db, preference::Entity).await?;
    create_table(db, user_preference::Entity).await?;
    info!("Relational schema is ready.");
    Ok(())
}

/// Creates the document tables and their uniqueness indexes if missing.
pub async fn ensure_document_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    create_table(db, cached_article::Entity).await?;
    create_table(db, saved_article::Entity).await?;

    let cached_key_index = Index::create()
        .if_not_exists()
        .name("idx_cached_articles_user_term_key")
        .table(cached_article::Entity)
        .col(cached_article::Column::UserId)
        .col(cached_article::Column::SearchTerm)
        .col(cached_article::Column::ArticleKey)
        .unique()
        .to_owned();
    db.execute(backend.build(&cached_key_index)).await?;

    let saved_url_index = Index::create()
        .if_not_exists()
        .name("idx_saved_articles_user_url")
        .table(saved_article::Entity)
        .col(saved_article::Column::UserId)
        .col(saved_article::Column::WebUrl)
        .unique()
        .to_owned();
    db.execute(backend.build(&saved_url_index)).await?;

    info!("Document schema is ready.");
    Ok(())
}

/// Inserts the fixed preference rows that are not present yet.
pub async fn seed_preferences(db: &DatabaseConnection) -> Result<u64, DbErr> {
    let mut inserted = 0;
    for (id, name) in DEFAULT_PREFERENCES {
        let row = preference::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
        };
        inserted += preference::Entity::insert(row)
            .on_conflict(
                OnConflict::column(preference::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }
    if inserted > 0 {
        info!(count = inserted, "Seeded preference catalogue.");
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preferences_are_unique() {
        let mut ids: Vec<i32> = DEFAULT_PREFERENCES.iter().map(|(id, _)| *id).collect();
        let mut names: Vec<&str> = DEFAULT_PREFERENCES.iter().map(|(_, name)| *name).collect();
        ids.dedup();
        names.sort();
        names.dedup();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(names.len(), 3);
    }
}
