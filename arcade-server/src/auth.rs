use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use arcade_types::User;

pub const IDENTITY_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub aud: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksKey {
    pub kty: String,
    pub kid: String,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
    pub x5c: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<JwksKey>,
}

/// Verifies identity-provider ID tokens against the provider's JWKS.
pub struct AuthService {
    client: Client,
    jwks_cache: Arc<RwLock<HashMap<String, (DecodingKey, SystemTime)>>>,
    jwks_url: String,
    project_id: String,
    dev_mode: bool,
}

impl AuthService {
    pub fn new(project_id: String) -> Self {
        Self::with_jwks_url(project_id, IDENTITY_JWKS_URL.to_string())
    }

    pub fn with_jwks_url(project_id: String, jwks_url: String) -> Self {
        Self {
            client: Client::new(),
            jwks_cache: Arc::new(RwLock::new(HashMap::new())),
            jwks_url,
            project_id,
            dev_mode: false,
        }
    }

    pub fn new_dev_mode() -> Self {
        Self {
            client: Client::new(),
            jwks_cache: Arc::new(RwLock::new(HashMap::new())),
            jwks_url: String::new(),
            project_id: "dev".to_string(),
            dev_mode: true,
        }
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn expected_issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        if self.dev_mode {
            return self.validate_dev_token(token);
        }

        let header = decode_header(token).map_err(|e| {
            tracing::warn!("Failed to decode ID token header: {:?}", e);
            AuthError::InvalidToken
        })?;
        let kid = header.kid.ok_or_else(|| {
            tracing::warn!("ID token header missing 'kid'");
            AuthError::InvalidToken
        })?;

        let decoding_key = self.get_decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[self.expected_issuer()]);

        let token_data = decode::<IdentityClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::warn!("ID token validation failed: {:?}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
                ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
                _ => AuthError::InvalidToken,
            }
        })?;

        let claims = token_data.claims;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(user_from_claims(claims.sub, claims.email, claims.name))
    }

    async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some((key, cached_time)) = cache.get(kid) {
                let elapsed = cached_time.elapsed().unwrap_or(KEY_CACHE_TTL);
                if elapsed < KEY_CACHE_TTL {
                    tracing::debug!("Using cached key for kid '{}'", kid);
                    return Ok(key.clone());
                }
                tracing::debug!("Cached key for kid '{}' is stale, refetching", kid);
            }
        }

        tracing::debug!("Fetching JWKS from {}", self.jwks_url);
        let response = self.client.get(&self.jwks_url).send().await.map_err(|e| {
            tracing::warn!("Failed to fetch JWKS: {:?}", e);
            AuthError::JwksFetchError
        })?;

        if !response.status().is_success() {
            tracing::warn!("JWKS fetch returned status: {}", response.status());
            return Err(AuthError::JwksFetchError);
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse JWKS: {:?}", e);
            AuthError::JwksFetchError
        })?;

        let jwks_key = jwks.keys.iter().find(|key| key.kid == kid).ok_or_else(|| {
            tracing::warn!("Key '{}' not in JWKS; rotated or foreign token", kid);
            AuthError::KeyNotFound
        })?;

        let decoding_key = decoding_key_for(jwks_key)?;

        let mut cache = self.jwks_cache.write().await;
        cache.insert(kid.to_string(), (decoding_key.clone(), SystemTime::now()));

        Ok(decoding_key)
    }

    /// Dev tokens are read without verification: either a JWT whose payload
    /// is trusted as-is, or `user_id:email:name`.
    fn validate_dev_token(&self, token: &str) -> Result<User, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() == 3 {
            let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
                .decode(parts[1].trim_end_matches('='))
                .map_err(|e| {
                    tracing::warn!("Failed to decode dev token payload: {:?}", e);
                    AuthError::InvalidToken
                })?;

            #[derive(Deserialize)]
            struct DevClaims {
                sub: String,
                email: Option<String>,
                name: Option<String>,
            }

            let claims: DevClaims = serde_json::from_slice(&payload).map_err(|e| {
                tracing::warn!("Failed to parse dev token claims: {:?}", e);
                AuthError::InvalidToken
            })?;
            if claims.sub.is_empty() {
                return Err(AuthError::InvalidToken);
            }

            return Ok(user_from_claims(claims.sub, claims.email, claims.name));
        }

        let fields: Vec<&str> = token.splitn(3, ':').collect();
        match fields.as_slice() {
            [id, email, name] if !id.is_empty() => Ok(user_from_claims(
                id.to_string(),
                Some(email.to_string()).filter(|e| !e.is_empty()),
                Some(name.to_string()).filter(|n| !n.is_empty()),
            )),
            _ => Err(AuthError::InvalidToken),
        }
    }
}

fn decoding_key_for(jwks_key: &JwksKey) -> Result<DecodingKey, AuthError> {
    if let (Some(n), Some(e)) = (&jwks_key.n, &jwks_key.e) {
        return DecodingKey::from_rsa_components(n, e).map_err(|e| {
            tracing::warn!("Bad RSA components in JWKS: {:?}", e);
            AuthError::InvalidKey
        });
    }

    let cert = jwks_key
        .x5c
        .as_ref()
        .and_then(|chain| chain.first())
        .ok_or(AuthError::InvalidKey)?;
    let cert_der = base64::engine::general_purpose::STANDARD
        .decode(cert)
        .map_err(|_| AuthError::InvalidKey)?;
    Ok(DecodingKey::from_rsa_der(&cert_der))
}

fn user_from_claims(sub: String, email: Option<String>, name: Option<String>) -> User {
    let display_name = name
        .clone()
        .or_else(|| email.as_ref().and_then(|e| e.split('@').next().map(str::to_string)))
        .unwrap_or_else(|| "Player".to_string());

    User {
        id: sub,
        email,
        display_name,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to fetch JWKS")]
    JwksFetchError,
    #[error("Key not found")]
    KeyNotFound,
    #[error("Invalid key")]
    InvalidKey,
    #[error("Audience mismatch")]
    AudienceMismatch,
    #[error("Issuer mismatch")]
    IssuerMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev_jwt(payload: serde_json::Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            engine.encode(r#"{"alg":"none"}"#),
            engine.encode(payload.to_string())
        )
    }

    #[test]
    fn test_expected_issuer() {
        let auth_service = AuthService::new("pickle-prod".to_string());
        assert_eq!(
            auth_service.expected_issuer(),
            "https://securetoken.google.com/pickle-prod"
        );
        assert!(!auth_service.is_dev_mode());
    }

    #[tokio::test]
    async fn test_malformed_token_rejected_before_fetch() {
        let auth_service = AuthService::with_jwks_url(
            "pickle-prod".to_string(),
            "http://127.0.0.1:9/unreachable".to_string(),
        );

        let result = auth_service.validate_token("invalid-token").await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_dev_mode_reads_jwt_payload() {
        let auth_service = AuthService::new_dev_mode();
        let token = dev_jwt(serde_json::json!({
            "sub": "uid-123",
            "email": "dill@example.com",
            "name": "Dill"
        }));

        let user = auth_service.validate_token(&token).await.unwrap();
        assert_eq!(user.id, "uid-123");
        assert_eq!(user.email.as_deref(), Some("dill@example.com"));
        assert_eq!(user.display_name, "Dill");
    }

    #[tokio::test]
    async fn test_dev_mode_colon_format() {
        let auth_service = AuthService::new_dev_mode();

        let user = auth_service
            .validate_token("uid-7:gherkin@example.com:")
            .await
            .unwrap();
        assert_eq!(user.id, "uid-7");
        assert_eq!(user.display_name, "gherkin");

        assert!(auth_service.validate_token("just-a-string").await.is_err());
    }
}
