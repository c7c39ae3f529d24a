use std::env;
use std::str::FromStr;

use arcade_types::ModelName;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SESSION_SECRET must be set when ENVIRONMENT=production")]
    MissingSessionSecret,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub production: bool,
    pub allow_dev_session: bool,
    pub auth_dev_mode: bool,
    pub identity_project_id: String,
    pub session_secret: String,
    pub words_file: Option<String>,
    pub static_dir: String,
    pub session_timeout_minutes: u64,
    pub connection_timeout_seconds: u64,
    pub api_keys: ApiKeys,
}

/// Provider credentials. A missing key only fails requests for that model.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub gemini: Option<String>,
    pub groq: Option<String>,
    pub mistral: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self {
            openai: non_empty_var("OPENAI_API_KEY"),
            anthropic: non_empty_var("ANTHROPIC_API_KEY"),
            gemini: non_empty_var("GEMINI_API_KEY"),
            groq: non_empty_var("GROQ_API_KEY"),
            mistral: non_empty_var("MISTRAL_API_KEY"),
        }
    }

    pub fn for_model(&self, model: ModelName) -> Option<&str> {
        let key = match model {
            ModelName::Gpt4oMini => &self.openai,
            ModelName::Claude35Haiku => &self.anthropic,
            ModelName::Gemini20Flash => &self.gemini,
            ModelName::Llama3370b => &self.groq,
            ModelName::MistralSmall => &self.mistral,
        };
        key.as_deref()
    }
}

const DEV_SESSION_SECRET: &str = "pickle-arcade-dev-session-secret";

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn flag(key: &str) -> bool {
    env::var(key)
        .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
        .unwrap_or(false)
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Production cookies must never be signed with the built-in dev secret.
fn resolve_session_secret(
    production: bool,
    configured: Option<String>,
) -> Result<String, ConfigError> {
    match configured {
        Some(secret) => Ok(secret),
        None if production => Err(ConfigError::MissingSessionSecret),
        None => Ok(DEV_SESSION_SECRET.to_string()),
    }
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        let production = env::var("ENVIRONMENT")
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let session_secret = resolve_session_secret(production, non_empty_var("SESSION_SECRET"))?;

        let auth_dev_mode = flag("AUTH_DEV_MODE");
        if auth_dev_mode && production {
            tracing::error!("AUTH_DEV_MODE is ignored in production; identity tokens are verified");
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed_or("PORT", 8080),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://pickle_arcade.db?mode=rwc".to_string()),
            production,
            allow_dev_session: flag("ALLOW_DEV_SESSION"),
            auth_dev_mode,
            identity_project_id: env::var("IDENTITY_PROJECT_ID")
                .unwrap_or_else(|_| "pickle-arcade".to_string()),
            session_secret,
            words_file: non_empty_var("WORDS_FILE"),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string()),
            session_timeout_minutes: parsed_or("SESSION_TIMEOUT_MINUTES", 60),
            connection_timeout_seconds: parsed_or("CONNECTION_TIMEOUT_SECONDS", 300),
            api_keys: ApiKeys::from_env(),
        })
    }

    /// Dev fallback sessions are never issued in production.
    pub fn dev_session_enabled(&self) -> bool {
        self.allow_dev_session && !self.production
    }

    /// Unverified identity tokens are never accepted in production.
    pub fn dev_auth_enabled(&self) -> bool {
        self.auth_dev_mode && !self.production
    }
}
