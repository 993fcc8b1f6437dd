use async_trait::async_trait;
use thiserror::Error;

pub mod guardian;

pub use guardian::GuardianClient;

/// A provider article: an opaque JSON object passed through untouched.
pub type ArticleDocument = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider returned non-success status: {0}")]
    Status(u16),
    #[error("Provider rejected the query: {0}")]
    Rejected(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Malformed provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Soft failures leave a preference under-filled for this call instead of
    /// failing the whole aggregation.
    pub fn is_soft(&self) -> bool {
        matches!(self, ProviderError::Status(_) | ProviderError::Rejected(_))
    }
}

/// A searchable source of news articles.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Runs one free-text search and returns the result documents in provider order.
    async fn search(&self, query: &str) -> Result<Vec<ArticleDocument>, ProviderError>;
}
