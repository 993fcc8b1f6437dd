use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::get,
};
use std::sync::Arc;

use crate::{
    db::services::preference_service,
    services::preference_service::change_preferences,
    web::{
        AppError, AppState,
        extract::ActionJson,
        models::{ActionResponse, AuthenticatedUser, ChangePreferencesFormResponse, ChangePreferencesRequest},
    },
};

pub fn create_preference_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/change_preferences",
            get(change_preferences_form).post(change_preferences_handler),
        )
        .route("/get_user_preferences", get(get_user_preferences))
}

async fn change_preferences_form(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ChangePreferencesFormResponse>, AppError> {
    let all_preferences = preference_service::list_preferences(app_state.db_pool.as_ref()).await?;
    let current_preferences =
        preference_service::get_user_preference_ids(app_state.db_pool.as_ref(), auth_user.id).await?;

    Ok(Json(ChangePreferencesFormResponse {
        all_preferences,
        current_preferences,
    }))
}

async fn change_preferences_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ActionJson(payload): ActionJson<ChangePreferencesRequest>,
) -> Json<ActionResponse> {
    match change_preferences(&app_state.db_pool, auth_user.id, &payload.preferences).await {
        Ok(()) => Json(ActionResponse::ok()),
        Err(e) => e.into_action_response(),
    }
}

async fn get_user_preferences(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, AppError> {
    let names = preference_service::get_user_preference_names(app_state.db_pool.as_ref(), auth_user.id).await?;
    Ok(Json(names))
}
