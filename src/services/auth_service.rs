use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{DatabaseConnection, DbErr, RuntimeErr, TransactionTrait, sqlx};
use tracing::{info, warn};

use crate::db::entities::user;
use crate::db::services::{preference_service, user_service};
use crate::services::preference_service::validate_preference_selection;
use crate::web::error::AppError;
use crate::web::models::{AuthenticatedUser, Claims, LoginRequest, LoginResponse, SignupRequest};

pub const USERNAME_TAKEN_MESSAGE: &str = "Username already exists. Please choose a different one.";

fn is_unique_violation(err: &DbErr) -> bool {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => e.is_unique_violation(),
        _ => false,
    }
}

/// Usernames are stored and looked up without surrounding whitespace.
fn normalize_username(raw: &str) -> &str {
    raw.trim()
}

/// Creates the user and their initial preferences in one transaction.
pub async fn register_user(db: &DatabaseConnection, req: SignupRequest) -> Result<user::Model, AppError> {
    let username = normalize_username(&req.username);
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput("Username and password must not be empty.".to_string()));
    }
    let preference_ids = validate_preference_selection(&req.preferences)?;

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let txn = db.begin().await?;
    let user = match user_service::create_user(&txn, username, &password_hash).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::UserAlreadyExists(USERNAME_TAKEN_MESSAGE.to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    preference_service::insert_user_preferences(&txn, user.id, &preference_ids).await?;
    txn.commit().await?;

    info!(user_id = user.id, preferences = preference_ids.len(), "Registered new user.");
    Ok(user)
}

pub async fn login_user(
    db: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
    token_ttl: Duration,
) -> Result<LoginResponse, AppError> {
    let username = normalize_username(&req.username);
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user = user_service::get_user_by_username(db, username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;

    if !valid_password {
        warn!(user_id = user.id, "Rejected login with wrong password.");
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret, token_ttl)
}

pub fn create_jwt_for_user(
    user: &user::Model,
    jwt_secret: &str,
    token_ttl: Duration,
) -> Result<LoginResponse, AppError> {
    let expiration = Utc::now()
        .checked_add_signed(token_ttl)
        .ok_or_else(|| AppError::TokenCreationError("token lifetime out of range".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_ref()))
        .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user_id: user.id,
        username: user.username.clone(),
    })
}

/// Validates signature and expiry and returns the identity the token carries.
pub fn verify_token(token: &str, jwt_secret: &str) -> Result<AuthenticatedUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error.");
        AppError::Unauthorized
    })?;

    Ok(AuthenticatedUser {
        id: token_data.claims.user_id,
        username: token_data.claims.sub,
    })
}
