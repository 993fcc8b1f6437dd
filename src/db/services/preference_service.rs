use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionError, TransactionTrait,
};
use sea_orm::sea_query::JoinType;

use crate::db::entities::{preference, user_preference};

/// Returns the whole preference catalogue ordered by id.
pub async fn list_preferences<C: ConnectionTrait>(db: &C) -> Result<Vec<preference::Model>, DbErr> {
    preference::Entity::find()
        .order_by_asc(preference::Column::Id)
        .all(db)
        .await
}

/// Returns the preferences a user has selected, ordered by preference id.
pub async fn get_user_preferences<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<preference::Model>, DbErr> {
    preference::Entity::find()
        .join(JoinType::InnerJoin, preference::Relation::UserPreferences.def())
        .filter(user_preference::Column::UserId.eq(user_id))
        .order_by_asc(preference::Column::Id)
        .all(db)
        .await
}

/// Names of the user's selected preferences; these double as provider search terms.
pub async fn get_user_preference_names<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<String>, DbErr> {
    Ok(get_user_preferences(db, user_id)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect())
}

pub async fn get_user_preference_ids<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<i32>, DbErr> {
    let mut ids: Vec<i32> = user_preference::Entity::find()
        .filter(user_preference::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.preference_id)
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

/// Links `preference_ids` to the user. Callers validate the selection first.
pub async fn insert_user_preferences<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    preference_ids: &[i32],
) -> Result<u64, DbErr> {
    let rows = preference_ids.iter().map(|&preference_id| user_preference::ActiveModel {
        user_id: Set(user_id),
        preference_id: Set(preference_id),
    });
    user_preference::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await
}

/// Replaces the user's selection wholesale: delete-all then insert-new, in one transaction.
pub async fn replace_user_preferences(
    db: &DatabaseConnection,
    user_id: i32,
    preference_ids: &[i32],
) -> Result<(), DbErr> {
    let preference_ids = preference_ids.to_vec();

    db.transaction::<_, (), DbErr>(|txn| {
        Box::pin(async move {
            user_preference::Entity::delete_many()
                .filter(user_preference::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
            insert_user_preferences(txn, user_id, &preference_ids).await?;
            Ok(())
        })
    })
    .await
    .map_err(|e| match e {
        TransactionError::Connection(err) => err,
        TransactionError::Transaction(err) => err,
    })
}
