//! Authentication Service
//!
//! Handles registration, login and JWT issuance/verification.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::application::dto::{AuthResponse, ProfileResponse};
use crate::config::JwtSettings;
use crate::domain::{User, UserRepository, VirtualNumber, DEFAULT_STATUS_TEXT};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Attempts at finding an unused virtual number before giving up.
const MAX_NUMBER_ATTEMPTS: usize = 32;

/// Authentication service trait for dependency injection
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new identity and issue a token for it
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        avatar_url: Option<String>,
    ) -> Result<AuthResponse, AuthError>;

    /// Authenticate with email and password
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError>;

    /// Validate a token and return the user id it was issued for
    fn verify(&self, token: &str) -> Result<i64, AuthError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Virtual number at issue time
    pub vn: String,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse::<i64>().map_err(|_| AuthError::InvalidToken)
    }
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Email already registered")]
    EmailExists,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::TokenExpired | AuthError::InvalidToken => {
                AppError::Unauthorized(err.to_string())
            }
            AuthError::EmailExists => AppError::Conflict(err.to_string()),
            AuthError::Internal(msg) => AppError::Internal(msg),
            AuthError::Repository(inner) => inner,
        }
    }
}

/// Issue a signed token for `user`.
pub fn issue_token(settings: &JwtSettings, user: &User) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        vn: user.virtual_number.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::days(settings.token_expiry_days)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("Token generation failed: {}", e)))
}

/// Decode and validate a token.
pub fn verify_token(settings: &JwtSettings, token: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// AuthService implementation
pub struct AuthServiceImpl {
    users: Arc<dyn UserRepository>,
    id_generator: Arc<SnowflakeGenerator>,
    jwt_settings: JwtSettings,
    country_code: String,
}

impl AuthServiceImpl {
    /// Create a new AuthServiceImpl
    pub fn new(
        users: Arc<dyn UserRepository>,
        id_generator: Arc<SnowflakeGenerator>,
        jwt_settings: JwtSettings,
        country_code: String,
    ) -> Self {
        Self {
            users,
            id_generator,
            jwt_settings,
            country_code,
        }
    }

    /// Hash a password using Argon2id
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its hash
    fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AuthError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Draw virtual numbers until one is not taken.
    async fn unused_virtual_number(&self) -> Result<String, AuthError> {
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let candidate = {
                let mut rng = rand::rng();
                VirtualNumber::generate(&self.country_code, &mut rng)
            };

            if !self.users.virtual_number_exists(candidate.as_str()).await? {
                return Ok(candidate.into_inner());
            }
            tracing::debug!(number = %candidate, "Virtual number collision, retrying");
        }

        Err(AuthError::Internal(
            "Could not allocate a virtual number".to_string(),
        ))
    }

    fn respond(&self, user: &User) -> Result<AuthResponse, AuthError> {
        Ok(AuthResponse {
            token: issue_token(&self.jwt_settings, user)?,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_settings.token_expiry_days * 24 * 60 * 60,
            user: ProfileResponse::from(user),
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        avatar_url: Option<String>,
    ) -> Result<AuthResponse, AuthError> {
        let email = normalize_email(email);

        if self.users.email_exists(&email).await? {
            return Err(AuthError::EmailExists);
        }

        let password_hash = self.hash_password(password)?;
        let virtual_number = self.unused_virtual_number().await?;

        let now = Utc::now();
        let user = User {
            id: self.id_generator.generate(),
            name: name.trim().to_string(),
            email,
            password_hash,
            virtual_number,
            avatar_url,
            status_text: DEFAULT_STATUS_TEXT.to_string(),
            is_online: false,
            last_seen: now,
            created_at: now,
            updated_at: now,
        };

        let created = self.users.create(&user).await?;
        tracing::info!(user_id = created.id, "User registered");

        self.respond(&created)
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.respond(&user)
    }

    fn verify(&self, token: &str) -> Result<i64, AuthError> {
        verify_token(&self.jwt_settings, token)?.user_id()
    }
}
