use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ArticleDocument, NewsProvider, ProviderError};

pub const DEFAULT_BASE_URL: &str = "https://content.guardianapis.com";

#[derive(Debug, Default, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    response: SearchResponse,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(default)]
    results: Vec<ArticleDocument>,
}

/// Client for the Guardian content search endpoint.
pub struct GuardianClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GuardianClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl NewsProvider for GuardianClient {
    async fn search(&self, query: &str) -> Result<Vec<ArticleDocument>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query), ("api-key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        match envelope.response.status.as_deref() {
            None | Some("ok") => {}
            Some(other) => {
                let reason = envelope
                    .response
                    .message
                    .unwrap_or_else(|| format!("status '{other}'"));
                return Err(ProviderError::Rejected(reason));
            }
        }

        debug!(query, count = envelope.response.results.len(), "Provider search completed.");
        Ok(envelope.response.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GuardianClient {
        GuardianClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_results_in_order() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Technology"))
            .and(query_param("api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": {
                    "status": "ok",
                    "results": [
                        { "id": "tech/1", "webTitle": "First", "webUrl": "https://g.test/1" },
                        { "id": "tech/2", "webTitle": "Second", "webUrl": "https://g.test/2" }
                    ]
                }
            })))
            .mount(&mock_server)
            .await;

        let results = client_for(&mock_server).search("Technology").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["webTitle"], "First");
        assert_eq!(results[1]["id"], "tech/2");
    }

    #[tokio::test]
    async fn test_missing_results_decode_as_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&mock_server)
            .await;

        let results = client_for(&mock_server).search("Sports").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_a_soft_status_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).search("Business").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status(429)));
        assert!(err.is_soft());
    }

    #[tokio::test]
    async fn test_error_envelope_is_rejected() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": { "status": "error", "message": "The api-key provided is invalid" }
            })))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).search("Business").await.unwrap_err();
        match err {
            ProviderError::Rejected(msg) => assert!(msg.contains("api-key")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_garbage_body_is_a_hard_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).search("Business").await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
        assert!(!err.is_soft());
    }
}
