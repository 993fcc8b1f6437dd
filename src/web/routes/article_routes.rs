use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::{get, post},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use crate::{
    services::saved_article_service::{self, SaveOutcome},
    web::{
        AppError, AppState,
        extract::ActionJson,
        models::{ActionResponse, AuthenticatedUser, DeleteArticleRequest},
    },
};

pub fn create_article_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fetch_articles", get(fetch_articles))
        .route("/save_article", post(save_article))
        .route("/get_saved_articles", get(get_saved_articles))
        .route("/delete_article", post(delete_article))
}

async fn fetch_articles(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, AppError> {
    match app_state.aggregator.fetch_for_user(auth_user.id).await {
        Ok(articles) => Ok(Json(articles)),
        Err(e) => {
            error!(user_id = auth_user.id, error = %e, "Failed to aggregate articles.");
            Err(AppError::InternalServerError(
                "An error occurred while fetching articles.".to_string(),
            ))
        }
    }
}

async fn save_article(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ActionJson(article): ActionJson<Value>,
) -> Json<ActionResponse> {
    match saved_article_service::save_article(&app_state.document_pool, auth_user.id, article).await {
        Ok(SaveOutcome::Saved) => Json(ActionResponse::ok_with_message("Article saved successfully!")),
        Ok(SaveOutcome::AlreadySaved) => Json(ActionResponse::failure("Article already saved.")),
        Err(e) => e.into_action_response(),
    }
}

async fn get_saved_articles(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<Value>>, AppError> {
    let articles = saved_article_service::list_saved_articles(&app_state.document_pool, auth_user.id).await?;
    Ok(Json(articles))
}

async fn delete_article(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    ActionJson(payload): ActionJson<DeleteArticleRequest>,
) -> Json<ActionResponse> {
    match saved_article_service::delete_saved_article(&app_state.document_pool, auth_user.id, &payload.url).await {
        Ok(()) => Json(ActionResponse::ok_with_message("Article deleted successfully!")),
        Err(e) => e.into_action_response(),
    }
}
