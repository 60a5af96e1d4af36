//! JWT access tokens issued by the platform's OAuth provider.

use std::str::FromStr;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, JwtConfig};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("no access token was provided")]
    Missing,

    #[error("access token has expired")]
    Expired,

    #[error("access token is invalid: {0}")]
    Invalid(String),

    #[error("token version {found} is not supported (expected {supported})")]
    UnsupportedVersion { found: String, supported: String },
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(e.to_string()),
        }
    }
}

/// Claims carried by an access token. The optional ones only appear when the matching
/// scope was granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub aud: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub sub: String,
    pub preferred_username: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_restricted: Option<bool>,
}

/// The caller behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub anonymous_id: String,
    pub is_staff: bool,
}

impl From<AccessTokenClaims> for AuthenticatedUser {
    fn from(claims: AccessTokenClaims) -> Self {
        Self {
            username: claims.preferred_username,
            anonymous_id: claims.sub,
            is_staff: claims.administrator.unwrap_or(false),
        }
    }
}

pub struct TokenDecoder {
    key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    audience: String,
    supported_version: String,
}

impl TokenDecoder {
    pub fn new(config: &JwtConfig) -> Result<Self, ConfigError> {
        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|_| {
                ConfigError::Invalid(format!("unknown JWT algorithm {}", config.algorithm))
            })?;

        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::Invalid(format!(
                "JWT algorithm {} is not a shared-secret algorithm",
                config.algorithm
            )));
        }

        if config.secret_key.is_empty() {
            return Err(ConfigError::Invalid("JWT secret key is empty".into()));
        }

        Ok(Self {
            key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            algorithm,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            supported_version: config.supported_version.clone(),
        })
    }

    /// Verifies signature, audience and issuer, and the expiry too when
    /// `verify_expiration` is set, then deserializes the payload into `T`.
    pub fn decode<T: DeserializeOwned>(
        &self,
        token: &str,
        verify_expiration: bool,
    ) -> Result<T, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = verify_expiration;

        Ok(jsonwebtoken::decode::<T>(token, &self.key, &validation)?.claims)
    }

    pub fn decode_claims(
        &self,
        token: &str,
        verify_expiration: bool,
    ) -> Result<AccessTokenClaims, TokenError> {
        let claims: AccessTokenClaims = self.decode(token, verify_expiration)?;

        if major(&claims.version) != major(&self.supported_version) {
            return Err(TokenError::UnsupportedVersion {
                found: claims.version,
                supported: self.supported_version.clone(),
            });
        }

        Ok(claims)
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, TokenError> {
        self.decode_claims(token, true).map(Into::into)
    }
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Pulls the token out of an `Authorization: JWT <token>` or `Bearer <token>` header.
pub fn token_from_headers(headers: &HeaderMap) -> Result<&str, TokenError> {
    let value = headers
        .get(&AUTHORIZATION)
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::Invalid("authorization header is not ASCII".into()))?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| TokenError::Invalid("authorization header has no scheme".into()))?;

    if !scheme.eq_ignore_ascii_case("jwt") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::Invalid(format!("unsupported scheme {scheme}")));
    }

    Ok(token.trim())
}
