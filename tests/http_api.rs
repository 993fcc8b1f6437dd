//! Drives the HTTP router end to end over mock database connections.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use newsdesk::db::entities::{cached_article, preference, user};
use newsdesk::news::GuardianClient;
use newsdesk::server::config::ServerConfig;
use newsdesk::services::aggregator::{ArticleAggregator, SeaOrmArticleCache, SeaOrmPreferenceLookup};
use newsdesk::services::auth_service::create_jwt_for_user;
use newsdesk::web::create_axum_router;
use pretty_assertions::assert_eq;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "integration-secret";

fn test_config(provider_url: &str) -> Arc<ServerConfig> {
    let config = ServerConfig::from_toml_str(&format!(
        r#"
        jwt_secret = "{SECRET}"
        database_url = "postgres://test@localhost/test"
        guardian_api_key = "test-key"
        guardian_base_url = "{provider_url}"
        cookie_secure = false
        "#
    ))
    .unwrap();
    Arc::new(config)
}

fn build_app(db: Arc<DatabaseConnection>, documents: Arc<DatabaseConnection>, provider_url: &str) -> Router {
    let config = test_config(provider_url);
    let provider = GuardianClient::new(
        &config.guardian_base_url,
        &config.guardian_api_key,
        config.provider_timeout(),
    )
    .unwrap();
    let aggregator = Arc::new(ArticleAggregator::new(
        Arc::new(SeaOrmPreferenceLookup::new(db.clone())),
        Arc::new(SeaOrmArticleCache::new(documents.clone())),
        Arc::new(provider),
        config.cache_freshness(),
    ));
    create_axum_router(db, documents, aggregator, config)
}

fn empty_db() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

fn stored_user(password: &str) -> user::Model {
    user::Model {
        id: 11,
        username: "reader".to_string(),
        password_hash: bcrypt::hash(password, 4).unwrap(),
        created_at: Utc::now(),
    }
}

fn bearer_for(user: &user::Model) -> String {
    let issued = create_jwt_for_user(user, SECRET, Duration::hours(1)).unwrap();
    format!("Bearer {}", issued.token)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = build_app(empty_db(), empty_db(), "http://127.0.0.1:9");
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = build_app(empty_db(), empty_db(), "http://127.0.0.1:9");
    let routes = [
        (Method::GET, "/fetch_articles"),
        (Method::GET, "/get_user_preferences"),
        (Method::GET, "/get_saved_articles"),
        (Method::GET, "/change_preferences"),
        (Method::POST, "/change_preferences"),
        (Method::POST, "/save_article"),
        (Method::POST, "/delete_article"),
    ];

    for (verb, uri) in routes {
        let response = app
            .clone()
            .oneshot(json_request(verb.clone(), uri, json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{verb} {uri}");
        assert_eq!(body_json(response).await, json!([]));
    }
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let app = build_app(empty_db(), empty_db(), "http://127.0.0.1:9");
    let forged = create_jwt_for_user(&stored_user("pw"), "not-the-secret", Duration::hours(1)).unwrap();

    let response = app
        .oneshot(
            Request::get("/get_user_preferences")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged.token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_sets_cookie_and_token_authenticates() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![stored_user("hunter22")]])
        .append_query_results([vec![
            preference::Model { id: 1, name: "Technology".to_string() },
            preference::Model { id: 2, name: "Sports".to_string() },
        ]])
        .into_connection();
    let app = build_app(Arc::new(db), empty_db(), "http://127.0.0.1:9");

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/login",
            json!({ "username": "reader", "password": "hunter22" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    let token = body["token"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::get("/get_user_preferences")
                .header(header::COOKIE, format!("token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!(["Technology", "Sports"]));
}

#[tokio::test]
async fn test_login_with_wrong_password_reports_failure() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![stored_user("hunter22")]])
        .into_connection();
    let app = build_app(Arc::new(db), empty_db(), "http://127.0.0.1:9");

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/login",
            json!({ "username": "reader", "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "Invalid username or password." })
    );
}

#[tokio::test]
async fn test_signup_with_too_many_preferences_is_rejected() {
    let app = build_app(empty_db(), empty_db(), "http://127.0.0.1:9");
    let response = app
        .oneshot(json_request(
            Method::POST,
            "/signup",
            json!({ "username": "reader", "password": "pw", "preferences": ["1", "2", "3", "1"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "Please select at least 1 and at most 3 preferences." })
    );
}

#[tokio::test]
async fn test_fetch_articles_fills_from_provider_and_caches() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Technology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {
                "status": "ok",
                "results": [
                    { "id": "t/1", "webTitle": "One", "webUrl": "https://g.test/1" },
                    { "id": "t/2", "webTitle": "Two", "webUrl": "https://g.test/2" }
                ]
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let reader = stored_user("pw");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![preference::Model { id: 1, name: "Technology".to_string() }]])
        .into_connection();
    let documents = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<cached_article::Model>::new()])
        .append_exec_results([
            MockExecResult { last_insert_id: 0, rows_affected: 0 },
            MockExecResult { last_insert_id: 0, rows_affected: 1 },
            MockExecResult { last_insert_id: 0, rows_affected: 1 },
        ])
        .into_connection();
    let app = build_app(Arc::new(db), Arc::new(documents), &mock_server.uri());

    let response = app
        .oneshot(
            Request::get("/fetch_articles")
                .header(header::AUTHORIZATION, bearer_for(&reader))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let articles = body.as_array().unwrap();
    assert_eq!(articles.len(), 2);
    for article in articles {
        assert_eq!(article["is_cached"], false);
        assert_eq!(article["search_term"], "Technology");
        assert_eq!(article["user_id"], 11);
    }
    assert_eq!(articles[0]["webTitle"], "One");
}

#[tokio::test]
async fn test_delete_of_unknown_article_reports_not_found() {
    let documents = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
        .into_connection();
    let app = build_app(empty_db(), Arc::new(documents), "http://127.0.0.1:9");

    let mut request = json_request(Method::POST, "/delete_article", json!({ "url": "https://g.test/x" }));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, bearer_for(&stored_user("pw")).parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "Article not found or not deleted." })
    );
}

#[tokio::test]
async fn test_logout_clears_cookie_and_redirects() {
    let app = build_app(empty_db(), empty_db(), "http://127.0.0.1:9");
    let response = app
        .oneshot(Request::get("/logout").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
    let cookie = response.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("token="));
}

#[tokio::test]
async fn test_non_json_signup_gets_action_envelope() {
    let app = build_app(empty_db(), empty_db(), "http://127.0.0.1:9");
    let response = app
        .oneshot(
            Request::post("/signup")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("username=reader"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "Invalid request format. Please use JSON." })
    );
}

#[tokio::test]
async fn test_delete_without_url_gets_action_envelope() {
    let app = build_app(empty_db(), empty_db(), "http://127.0.0.1:9");
    let mut request = json_request(Method::POST, "/delete_article", json!({}));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, bearer_for(&stored_user("pw")).parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "success": false, "message": "Invalid request format. Please use JSON." })
    );
}

#[tokio::test]
async fn test_unreachable_provider_fails_fetch_with_generic_error() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![preference::Model { id: 2, name: "Sports".to_string() }]])
        .into_connection();
    let documents = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<cached_article::Model>::new()])
        .into_connection();
    let app = build_app(Arc::new(db), Arc::new(documents), "http://127.0.0.1:9");

    let response = app
        .oneshot(
            Request::get("/fetch_articles")
                .header(header::AUTHORIZATION, bearer_for(&stored_user("pw")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "An error occurred while fetching articles." })
    );
}
