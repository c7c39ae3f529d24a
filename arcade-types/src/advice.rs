use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::UserId;

/// The fixed set of models the advice pipeline can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ModelName {
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "claude-3-5-haiku")]
    Claude35Haiku,
    #[serde(rename = "gemini-2.0-flash")]
    Gemini20Flash,
    #[serde(rename = "llama-3.3-70b")]
    Llama3370b,
    #[serde(rename = "mistral-small")]
    MistralSmall,
}

impl ModelName {
    pub const ALL: [ModelName; 5] = [
        ModelName::Gpt4oMini,
        ModelName::Claude35Haiku,
        ModelName::Gemini20Flash,
        ModelName::Llama3370b,
        ModelName::MistralSmall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Gpt4oMini => "gpt-4o-mini",
            ModelName::Claude35Haiku => "claude-3-5-haiku",
            ModelName::Gemini20Flash => "gemini-2.0-flash",
            ModelName::Llama3370b => "llama-3.3-70b",
            ModelName::MistralSmall => "mistral-small",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedModel(pub String);

impl fmt::Display for UnsupportedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported model '{}'", self.0)
    }
}

impl std::error::Error for UnsupportedModel {}

impl FromStr for ModelName {
    type Err = UnsupportedModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelName::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| UnsupportedModel(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AdviceRole {
    System,
    User,
    Assistant,
}

impl AdviceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdviceRole::System => "system",
            AdviceRole::User => "user",
            AdviceRole::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(AdviceRole::System),
            "user" => Some(AdviceRole::User),
            "assistant" => Some(AdviceRole::Assistant),
            _ => None,
        }
    }
}

/// One turn sent to a model provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatTurn {
    pub role: AdviceRole,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct AdviceRequest {
    pub dilemma: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdviceThread {
    pub id: Uuid,
    pub user_id: UserId,
    pub title: String,
    pub model: String,
    pub created_at: String, // ISO 8601
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdviceMessage {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub role: AdviceRole,
    pub content: String,
    pub created_at: String, // ISO 8601
}
