use serde::{Deserialize, Deserializer, Serialize, de};

use crate::db::entities::preference;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_preference_ids")]
    pub preferences: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePreferencesRequest {
    #[serde(deserialize_with = "deserialize_preference_ids")]
    pub preferences: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteArticleRequest {
    pub url: String,
}

/// The `{success, message?}` envelope returned by every action endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self { success: true, message: None, token: None }
    }

    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), token: None }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()), token: None }
    }
}

#[derive(Debug, Serialize)]
pub struct SignupFormResponse {
    pub preferences: Vec<preference::Model>,
}

#[derive(Debug, Serialize)]
pub struct ChangePreferencesFormResponse {
    pub all_preferences: Vec<preference::Model>,
    pub current_preferences: Vec<i32>,
}

/// Result of a successful password check.
#[derive(Debug)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i32,
    pub username: String,
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub user_id: i32,
    pub exp: usize,
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
}

/// Accepts preference ids as JSON numbers or numeric strings (`"1"`), which is
/// what HTML checkbox values post.
fn deserialize_preference_ids<'de, D>(deserializer: D) -> Result<Vec<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i32),
        Text(String),
    }

    Vec::<RawId>::deserialize(deserializer)?
        .into_iter()
        .map(|raw| match raw {
            RawId::Number(id) => Ok(id),
            RawId::Text(text) => text
                .trim()
                .parse::<i32>()
                .map_err(|_| de::Error::custom(format!("invalid preference id '{text}'"))),
        })
        .collect()
}
