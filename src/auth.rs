//! OAuth access tokens for the Route Optimization API.
//!
//! Either a pre-issued bearer token, or a service-account key exchanged for
//! a short-lived token through the JWT bearer grant.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;
use crate::traits::AccessTokenSource;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Assertions may be valid for at most an hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A token obtained out of band, e.g. `gcloud auth print-access-token`.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl AccessTokenSource for StaticToken {
    fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// The fields of a Google service-account JSON key that signing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        serde_json::from_str(json).map_err(AuthError::ParseKey)
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path).map_err(|source| AuthError::ReadKey {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    client: reqwest::blocking::Client,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, timeout_secs: u64) -> Result<Self, AuthError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(AuthError::Exchange)?;
        Ok(Self { key, client })
    }

    /// Signed RS256 assertion for the JWT bearer grant.
    fn assertion(&self, now: i64) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let signing_key =
            EncodingKey::from_rsa_pem(self.key.private_key.as_bytes()).map_err(AuthError::Sign)?;
        encode(&header, &claims(&self.key, now), &signing_key).map_err(AuthError::Sign)
    }
}

fn claims(key: &ServiceAccountKey, now: i64) -> AssertionClaims {
    AssertionClaims {
        iss: key.client_email.clone(),
        scope: CLOUD_PLATFORM_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    }
}

impl AccessTokenSource for ServiceAccountTokenSource {
    fn access_token(&self) -> Result<String, AuthError> {
        let assertion = self.assertion(Utc::now().timestamp())?;
        debug!(account = %self.key.client_email, "exchanging service account assertion");

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<TokenResponse>())
            .map_err(AuthError::Exchange)?;

        Ok(response.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_JSON: &str = r#"{
        "type": "service_account",
        "project_id": "demo-project",
        "private_key_id": "abc123",
        "private_key": "not a pem",
        "client_email": "planner@demo-project.iam.gserviceaccount.com"
    }"#;

    #[test]
    fn test_parses_key_with_default_token_uri() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        assert_eq!(key.client_email, "planner@demo-project.iam.gserviceaccount.com");
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(key.private_key_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_rejects_invalid_key_json() {
        assert!(matches!(
            ServiceAccountKey::from_json("{\"client_email\": 1}"),
            Err(AuthError::ParseKey(_))
        ));
    }

    #[test]
    fn test_missing_key_file() {
        let result = ServiceAccountKey::from_file(Path::new("/nonexistent/key.json"));
        assert!(matches!(result, Err(AuthError::ReadKey { .. })));
    }

    #[test]
    fn test_claims_cover_one_hour() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let claims = claims(&key, 1_000);
        assert_eq!(claims.iss, key.client_email);
        assert_eq!(claims.aud, DEFAULT_TOKEN_URI);
        assert_eq!(claims.scope, CLOUD_PLATFORM_SCOPE);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_bad_private_key_fails_to_sign() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let source = ServiceAccountTokenSource::new(key, 5).unwrap();
        assert!(matches!(source.access_token(), Err(AuthError::Sign(_))));
    }

    #[test]
    fn test_static_token() {
        let token = StaticToken("ya29.token".to_string());
        assert_eq!(token.access_token().unwrap(), "ya29.token");
    }
}
