use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use warp::Filter;

use arcade_types::User;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_MAX_AGE_SECONDS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    email: Option<String>,
    name: String,
    iat: i64,
    exp: i64,
    #[serde(default)]
    dev: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to sign session: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("invalid session: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

/// Signs and verifies the `session` cookie the server hands out after an
/// ID token has been verified.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    secure: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            secure,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, SessionError> {
        self.sign(user, false)
    }

    /// Fallback session for local development when no real ID token is at hand.
    pub fn issue_dev(&self) -> Result<(User, String), SessionError> {
        let user = dev_user();
        let token = self.sign(&user, true)?;
        Ok((user, token))
    }

    fn sign(&self, user: &User, dev: bool) -> Result<String, SessionError> {
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            iat: now,
            exp: now + SESSION_MAX_AGE_SECONDS,
            dev,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(SessionError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<User, SessionError> {
        let validation = Validation::new(Algorithm::HS256);
        let data =
            decode::<SessionClaims>(token, &self.decoding, &validation).map_err(SessionError::Invalid)?;

        Ok(User {
            id: data.claims.sub,
            email: data.claims.email,
            display_name: data.claims.name,
        })
    }

    pub fn set_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            SESSION_COOKIE, token, SESSION_MAX_AGE_SECONDS
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Resolves the cookie to a user. Bad or expired cookies are logged and
    /// read as signed out.
    pub fn user_from_cookie(&self, cookie: Option<&str>) -> Option<User> {
        let token = cookie.filter(|value| !value.is_empty())?;
        match self.verify(token) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!("Ignoring session cookie: {}", e);
                None
            }
        }
    }
}

pub fn dev_user() -> User {
    User {
        id: "dev-user".to_string(),
        email: Some("dev@localhost".to_string()),
        display_name: "Dev Pickle".to_string(),
    }
}

/// Extracts the signed-in user, if any, from the session cookie.
pub fn with_optional_user(
    keys: Arc<SessionKeys>,
) -> impl Filter<Extract = (Option<User>,), Error = std::convert::Infallible> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .map(move |cookie: Option<String>| keys.user_from_cookie(cookie.as_deref()))
}
