use bcrypt::{hash, verify};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use actix_web::web;
use actix_web::HttpMessage;
use validator::Validate;
use actix_web::{HttpRequest, dev::ServiceRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use std::sync::Arc;
use crate::error::{ApiError, ApiResult};
use crate::token_revocation;
use crate::AppState;

// ======== USER MODEL ========

/// Row of the `users` table; `password` holds the bcrypt hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredential {
    pub user_id: i64,
    pub username: String,
    pub password: String,
}

impl UserCredential {
    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> ApiResult<Option<UserCredential>> {
        let user = sqlx::query_as::<_, UserCredential>(
            "SELECT user_id, username, password FROM users WHERE username = ?",
        )
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn count(pool: &SqlitePool) -> ApiResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    pub async fn create(pool: &SqlitePool, username: &str, password_hash: &str) -> ApiResult<UserCredential> {
        let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
            .bind(username)
            .bind(password_hash)
            .execute(pool)
            .await?;

        Ok(UserCredential {
            user_id: result.last_insert_rowid(),
            username: username.to_string(),
            password: password_hash.to_string(),
        })
    }
}

// ======== REQUEST/RESPONSE STRUCTS ========

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub jwtoken: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub user_id: i64,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

// ======== AUTH SERVICE ========

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(jwt_secret: &str, expiration_hours: i64, bcrypt_cost: u32) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl: Duration::hours(expiration_hours),
            bcrypt_cost,
        }
    }

    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl.num_seconds()
    }

    pub fn hash_password(&self, password: &str) -> Result<String, bcrypt::BcryptError> {
        hash(password, self.bcrypt_cost)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
        verify(password, hash)
    }

    pub fn generate_token(&self, user: &UserCredential) -> ApiResult<String> {
        let now = Utc::now();
        let exp = now + self.token_ttl;

        let claims = Claims {
            sub: user.username.clone(),
            user_id: user.user_id,
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> ApiResult<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|_| ApiError::InternalServerError("Failed to generate token".to_string()))
    }

    fn decode_claims(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default()).map(|data| data.claims)
    }

    pub fn verify_token(&self, token: &str) -> ApiResult<Claims> {
        self.decode_claims(token).map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => ApiError::invalid_token("Token expired"),
            _ => ApiError::invalid_token("Invalid token"),
        })
    }

    /// True only for well-signed tokens past their expiry.
    pub fn is_token_expired(&self, token: &str) -> bool {
        matches!(
            self.decode_claims(token),
            Err(ref err) if matches!(err.kind(), ErrorKind::ExpiredSignature)
        )
    }

    pub fn username_from_token(&self, token: &str) -> ApiResult<String> {
        self.verify_token(token).map(|claims| claims.sub)
    }
}

// ======== HELPER FUNCTIONS ========

pub fn get_current_user(req: &HttpRequest) -> ApiResult<Claims> {
    req.extensions()
        .get::<Claims>().cloned()
        .ok_or_else(|| ApiError::Unauthorized("No user information found".to_string()))
}

// ======== JWT MIDDLEWARE ========

pub async fn jwt_middleware(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let token = credentials.token();

    let (auth_service, pool) = match (
        req.app_data::<web::Data<Arc<AuthService>>>(),
        req.app_data::<web::Data<Arc<AppState>>>(),
    ) {
        (Some(svc), Some(state)) => (svc.clone(), state.db_pool.clone()),
        _ => {
            log::error!("AuthService or AppState not found in app data");
            return Err((
                ApiError::InternalServerError("Auth service not available".to_string()).into(),
                req,
            ));
        }
    };

    let claims = match auth_service.verify_token(token) {
        Ok(claims) => claims,
        Err(err) => {
            if auth_service.is_token_expired(token) {
                log::debug!("Rejected expired token");
            } else {
                log::warn!("JWT verification failed: {}", err);
            }
            return Err((err.into(), req));
        }
    };

    match token_revocation::is_revoked(&pool, &claims.jti).await {
        Ok(false) => {
            req.extensions_mut().insert(claims);
            Ok(req)
        }
        Ok(true) => {
            log::warn!("Revoked token presented by {}", claims.sub);
            Err((ApiError::invalid_token("Token revoked").into(), req))
        }
        Err(err) => Err((err.into(), req)),
    }
}
