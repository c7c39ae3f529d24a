use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use arcade_types::ChatTurn;

use super::sse::{Delta, SseEvent, relay_text};
use super::{AdviceError, AdviceStream, ModelAdapter, ensure_success, request_failed, split_system};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
const MAX_TOKENS: u32 = 1024;

#[derive(Clone)]
pub struct AnthropicAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicAdapter {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: ANTHROPIC_MODEL.to_string(),
            max_tokens: MAX_TOKENS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: BlockDelta },
    MessageStop,
    Error { error: StreamError },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct BlockDelta {
    text: Option<String>,
}

#[derive(Deserialize)]
struct StreamError {
    message: String,
}

pub(crate) fn parse_event(event: &SseEvent) -> Delta {
    match serde_json::from_str::<StreamEvent>(&event.data) {
        Ok(StreamEvent::ContentBlockDelta { delta }) => {
            delta.text.map(Delta::Text).unwrap_or(Delta::Skip)
        }
        Ok(StreamEvent::MessageStop) => Delta::Done,
        Ok(StreamEvent::Error { error }) => Delta::Error(error.message),
        Ok(StreamEvent::Other) => Delta::Skip,
        Err(e) => Delta::Error(format!("unreadable event: {}", e)),
    }
}

#[async_trait]
impl ModelAdapter for AnthropicAdapter {
    fn provider(&self) -> &'static str {
        "Anthropic"
    }

    async fn stream(&self, turns: &[ChatTurn]) -> Result<AdviceStream, AdviceError> {
        let (system, conversation) = split_system(turns);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: conversation
                .into_iter()
                .map(|turn| Message {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_failed(self.provider(), e))?;

        let response = ensure_success(self.provider(), response).await?;
        Ok(relay_text(response, parse_event))
    }
}
