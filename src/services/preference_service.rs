use sea_orm::DatabaseConnection;
use tracing::info;

use crate::db::schema::DEFAULT_PREFERENCES;
use crate::db::services::preference_service as store;
use crate::web::error::AppError;

pub const MIN_PREFERENCES: usize = 1;
pub const MAX_PREFERENCES: usize = 3;

/// Checks a preference selection: 1 to 3 distinct, known ids. Returns the ids sorted.
pub fn validate_preference_selection(preference_ids: &[i32]) -> Result<Vec<i32>, AppError> {
    if preference_ids.len() < MIN_PREFERENCES || preference_ids.len() > MAX_PREFERENCES {
        return Err(AppError::InvalidInput(
            "Please select at least 1 and at most 3 preferences.".to_string(),
        ));
    }

    let mut ids = preference_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.len() != preference_ids.len() {
        return Err(AppError::InvalidInput("Each preference may only be selected once.".to_string()));
    }

    if let Some(unknown) = ids
        .iter()
        .find(|id| !DEFAULT_PREFERENCES.iter().any(|(known, _)| known == *id))
    {
        return Err(AppError::InvalidInput(format!("Unknown preference id {unknown}.")));
    }

    Ok(ids)
}

/// Replaces the user's preferences with exactly `preference_ids`.
pub async fn change_preferences(
    db: &DatabaseConnection,
    user_id: i32,
    preference_ids: &[i32],
) -> Result<(), AppError> {
    let ids = validate_preference_selection(preference_ids)?;
    store::replace_user_preferences(db, user_id, &ids).await?;
    info!(user_id, preferences = ?ids, "Replaced user preferences.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_one_to_three_known_ids() {
        assert_eq!(validate_preference_selection(&[2]).unwrap(), vec![2]);
        assert_eq!(validate_preference_selection(&[3, 1]).unwrap(), vec![1, 3]);
        assert_eq!(validate_preference_selection(&[1, 2, 3]).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_rejects_empty_and_oversized_selections() {
        assert!(matches!(validate_preference_selection(&[]), Err(AppError::InvalidInput(_))));
        assert!(matches!(
            validate_preference_selection(&[1, 2, 3, 3]),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_unknown_ids() {
        assert!(matches!(validate_preference_selection(&[1, 1]), Err(AppError::InvalidInput(_))));
        assert!(matches!(validate_preference_selection(&[4]), Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_invalid_change_never_deletes_existing_rows() {
        let db = sea_orm::MockDatabase::new(sea_orm::DatabaseBackend::Postgres).into_connection();
        let result = change_preferences(&db, 9, &[]).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(db.into_transaction_log().is_empty());
    }
}
