use axum::{
    Json, Router,
    extract::State,
    http::Method,
    middleware as axum_middleware,
    response::Redirect,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::services::preference_service;
use crate::server::config::ServerConfig;
use crate::services::aggregator::ArticleAggregator;
use crate::services::auth_service;
use crate::web::{
    error::AppError,
    extract::ActionJson,
    middleware::auth,
    models::{ActionResponse, LoginRequest, SignupFormResponse, SignupRequest},
    routes::*,
};

pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod middleware;

/// Name of the cookie carrying the JWT.
pub const AUTH_COOKIE: &str = "token";

#[derive(Clone)]
pub struct AppState {
    /// Users and preferences.
    pub db_pool: Arc<DatabaseConnection>,
    /// Cached and saved article documents.
    pub document_pool: Arc<DatabaseConnection>,
    pub aggregator: Arc<ArticleAggregator>,
    pub config: Arc<ServerConfig>,
}

async fn signup_form_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SignupFormResponse>, AppError> {
    let preferences = preference_service::list_preferences(app_state.db_pool.as_ref()).await?;
    Ok(Json(SignupFormResponse { preferences }))
}

async fn signup_handler(
    State(app_state): State<Arc<AppState>>,
    ActionJson(payload): ActionJson<SignupRequest>,
) -> Json<ActionResponse> {
    match auth_service::register_user(&app_state.db_pool, payload).await {
        Ok(_) => Json(ActionResponse::ok()),
        Err(e) => e.into_action_response(),
    }
}

async fn login_handler(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    ActionJson(payload): ActionJson<LoginRequest>,
) -> (CookieJar, Json<ActionResponse>) {
    let config = &app_state.config;
    let login_response = match auth_service::login_user(
        &app_state.db_pool,
        payload,
        &config.jwt_secret,
        config.token_ttl(),
    )
    .await
    {
        Ok(login_response) => login_response,
        Err(e) => return (jar, e.into_action_response()),
    };

    let auth_cookie = Cookie::build((AUTH_COOKIE, login_response.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .build();

    let body = ActionResponse {
        success: true,
        message: None,
        token: Some(login_response.token),
    };
    (jar.add(auth_cookie), Json(body))
}

async fn logout_handler(jar: CookieJar) -> (CookieJar, Redirect) {
    (jar.remove(Cookie::build(AUTH_COOKIE).path("/")), Redirect::to("/login"))
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(
    db_pool: Arc<DatabaseConnection>,
    document_pool: Arc<DatabaseConnection>,
    aggregator: Arc<ArticleAggregator>,
    config: Arc<ServerConfig>,
) -> Router {
    let app_state = Arc::new(AppState {
        db_pool,
        document_pool,
        aggregator,
        config,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .route("/signup", get(signup_form_handler).post(signup_handler))
        .route("/login", post(login_handler))
        .route("/logout", get(logout_handler))
        .merge(
            preference_routes::create_preference_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .merge(
            article_routes::create_article_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
