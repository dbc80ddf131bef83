/// Credential issue and verification: password hashing, bearer tokens and the request extractor
use crate::domain::{LoginRequest, LoginResponse};
use crate::errors::{ApiError, ApiResult};
use crate::repo::UserRepository;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Adaptive bcrypt password hashes in the standard `$2b$<cost>$...` form.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// `cost` is the bcrypt work factor (4..=31).
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> ApiResult<String> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
    }

    /// A malformed stored hash never verifies.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        bcrypt::verify(password, stored).unwrap_or(false)
    }
}

/// JWT claims carried by bearer tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: i64,
}

/// HS256 token signer/validator
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_days: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(ttl_days),
        }
    }

    pub fn issue(&self, user_id: i64, username: &str, now: DateTime<Utc>) -> ApiResult<(String, DateTime<Utc>)> {
        let expiration = now + self.ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            name: username.to_string(),
            exp: expiration.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))?;
        Ok((token, expiration))
    }

    pub fn validate(&self, token: &str) -> ApiResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(data.claims)
    }
}

/// Login flow over a user repository
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher, tokens: TokenIssuer) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// `None` for an unknown user or a wrong password.
    pub async fn authenticate(&self, request: &LoginRequest) -> ApiResult<Option<LoginResponse>> {
        let Some(user) = self.users.get_by_username(&request.username).await? else {
            warn!("login attempt for unknown user");
            return Ok(None);
        };
        if !self.hasher.verify(&request.password, &user.password_hash) {
            warn!(user = %user.username, "login rejected");
            return Ok(None);
        }

        let now = Utc::now();
        let (token, expiration) = self.tokens.issue(user.id, &user.username, now)?;
        self.users.record_login(user.id, now).await?;
        info!(user = %user.username, "login succeeded");

        Ok(Some(LoginResponse {
            token,
            username: user.username,
            expiration,
        }))
    }

    pub fn validate(&self, token: &str) -> ApiResult<Claims> {
        self.tokens.validate(token)
    }
}

/// Caller identity taken from `Authorization: Bearer <jwt>`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;

        let auth = Arc::<AuthService>::from_ref(state);
        let claims = auth.validate(token.trim())?;
        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.name,
        })
    }
}
