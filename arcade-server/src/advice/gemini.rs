use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use arcade_types::{AdviceRole, ChatTurn};

use super::sse::{Delta, SseEvent, relay_text};
use super::{AdviceError, AdviceStream, ModelAdapter, ensure_success, request_failed, split_system};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone)]
pub struct GeminiAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiAdapter {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.to_string(),
            model: GEMINI_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ChunkError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChunkError {
    message: String,
}

// Gemini calls the assistant side "model".
fn gemini_role(role: AdviceRole) -> &'static str {
    match role {
        AdviceRole::Assistant => "model",
        _ => "user",
    }
}

pub(crate) fn parse_event(event: &SseEvent) -> Delta {
    let chunk = match serde_json::from_str::<GenerateChunk>(&event.data) {
        Ok(chunk) => chunk,
        Err(e) => return Delta::Error(format!("unreadable chunk: {}", e)),
    };
    if let Some(error) = chunk.error {
        return Delta::Error(error.message);
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        Delta::Skip
    } else {
        Delta::Text(text)
    }
}

#[async_trait]
impl ModelAdapter for GeminiAdapter {
    fn provider(&self) -> &'static str {
        "Google"
    }

    async fn stream(&self, turns: &[ChatTurn]) -> Result<AdviceStream, AdviceError> {
        let (system, conversation) = split_system(turns);
        let request = GenerateRequest {
            system_instruction: system.as_deref().map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            contents: conversation
                .into_iter()
                .map(|turn| Content {
                    role: Some(gemini_role(turn.role)),
                    parts: vec![Part {
                        text: &turn.content,
                    }],
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| request_failed(self.provider(), e))?;

        let response = ensure_success(self.provider(), response).await?;
        Ok(relay_text(response, parse_event))
    }
}
