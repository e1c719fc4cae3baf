use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::{header::AUTHORIZATION, request::Parts}};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

use crate::{error::AppError, models::User, routes::AppState};

type HmacSha256 = Hmac<Sha256>;

const PASSWORD_ROUNDS: u32 = 10_000;
const PASSWORD_SCHEME: &str = "pbkdf2-sha256";
const SALT_SIZE: usize = 16;
const KEY_SIZE: usize = 32;

fn keyed(key: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(key).expect("HMAC accepts any key length")
}

fn derive(password: &str, salt: &[u8]) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PASSWORD_ROUNDS, &mut key);
    key
}

/// PBKDF2-HMAC-SHA256 digest in the form `pbkdf2-sha256$<salt>$<digest>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = derive(password, &salt);
    format!("{}${}${}", PASSWORD_SCHEME, URL_SAFE_NO_PAD.encode(salt), URL_SAFE_NO_PAD.encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [PASSWORD_SCHEME, salt, digest] = parts.as_slice() else {
        return false;
    };
    let (Ok(salt), Ok(digest)) = (URL_SAFE_NO_PAD.decode(salt), URL_SAFE_NO_PAD.decode(digest)) else {
        return false;
    };
    // Both sides go through the same MAC so the final comparison is constant time.
    let mut expected = keyed(&salt);
    expected.update(&digest);
    let expected = expected.finalize().into_bytes();
    let mut candidate = keyed(&salt);
    candidate.update(&derive(password, &salt));
    candidate.verify_slice(&expected).is_ok()
}

/// Absolute expiry for a lifetime, saturating instead of overflowing.
pub fn expires_after(ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub kind: TokenKind,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    Signature,
    #[error("token expired")]
    Expired,
}

/// Issues and checks HMAC-signed bearer tokens (`<claims>.<signature>`, base64url).
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self { secret: secret.as_bytes().to_vec() }
    }

    pub fn issue(&self, sub: &str, kind: TokenKind, ttl: Duration) -> String {
        let claims = Claims { sub: sub.to_string(), kind, exp: expires_after(ttl).timestamp() };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());
        let mut mac = keyed(&self.secret);
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{payload}.{signature}")
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload, signature) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| TokenError::Malformed)?;
        let mut mac = keyed(&self.secret);
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::Signature)?;

        let raw = URL_SAFE_NO_PAD.decode(payload).map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The signed-in user, resolved from the bearer token.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::Auth("Not authorized, no token provided".into()))?;
        let claims = state
            .tokens
            .verify(token)
            .ok()
            .filter(|c| c.kind == TokenKind::User)
            .ok_or_else(|| AppError::Auth("Not authorized, token failed".into()))?;
        let user = state
            .store
            .find_user(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Auth("User not found".into()))?;
        Ok(AuthUser(user))
    }
}

/// An administrator with a live server-side session.
pub struct AdminAuth {
    pub admin_id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::Auth("Admin authentication required".into()))?;
        let claims = state
            .tokens
            .verify(token)
            .ok()
            .filter(|c| c.kind == TokenKind::Admin)
            .ok_or_else(|| AppError::Auth("Invalid admin token".into()))?;
        match state.store.find_admin_session(token).await? {
            Some(s) if s.expires_at <= Utc::now() => {
                state.store.delete_admin_session(token).await?;
                Err(AppError::Auth("Session expired".into()))
            }
            Some(s) if s.admin_id == claims.sub => Ok(AdminAuth { admin_id: claims.sub, token: token.to_string() }),
            _ => Err(AppError::Auth("Session expired".into())),
        }
    }
}
