use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use arcade_types::ChatTurn;

use super::sse::{Delta, SseEvent, relay_text};
use super::{AdviceError, AdviceStream, ModelAdapter, ensure_success, request_failed};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";

const OPENAI_MODEL: &str = "gpt-4o-mini";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const MISTRAL_MODEL: &str = "mistral-small-latest";

/// Chat-completions adapter. OpenAI, Groq and Mistral all speak this API.
#[derive(Clone)]
pub struct OpenAiCompatibleAdapter {
    client: Client,
    provider: &'static str,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleAdapter {
    pub fn new(
        provider: &'static str,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            provider,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn openai(api_key: &str) -> Self {
        Self::new("OpenAI", OPENAI_BASE_URL, api_key, OPENAI_MODEL)
    }

    pub fn groq(api_key: &str) -> Self {
        Self::new("Groq", GROQ_BASE_URL, api_key, GROQ_MODEL)
    }

    pub fn mistral(api_key: &str) -> Self {
        Self::new("Mistral", MISTRAL_BASE_URL, api_key, MISTRAL_MODEL)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ChunkError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkError {
    message: String,
}

pub(crate) fn parse_event(event: &SseEvent) -> Delta {
    if event.data.trim() == "[DONE]" {
        return Delta::Done;
    }

    match serde_json::from_str::<ChunkResponse>(&event.data) {
        Ok(ChunkResponse {
            error: Some(error), ..
        }) => Delta::Error(error.message),
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .map(Delta::Text)
            .unwrap_or(Delta::Skip),
        Err(e) => Delta::Error(format!("unreadable chunk: {}", e)),
    }
}

#[async_trait]
impl ModelAdapter for OpenAiCompatibleAdapter {
    fn provider(&self) -> &'static str {
        self.provider
    }

    async fn stream(&self, turns: &[ChatTurn]) -> Result<AdviceStream, AdviceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: turns
                .iter()
                .map(|turn| ChatMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            stream: true,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_failed(self.provider, e))?;

        let response = ensure_success(self.provider, response).await?;
        Ok(relay_text(response, parse_event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::build_turns;
    use futures_util::StreamExt;
    use warp::Filter;

    fn event(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn test_parse_event() {
        assert_eq!(
            parse_event(&event(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#)),
            Delta::Text("Hi".to_string())
        );
        assert_eq!(
            parse_event(&event(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#)),
            Delta::Skip
        );
        assert_eq!(parse_event(&event("[DONE]")), Delta::Done);
        assert_eq!(
            parse_event(&event(r#"{"error":{"message":"rate limited"}}"#)),
            Delta::Error("rate limited".to_string())
        );
    }

    #[tokio::test]
    async fn test_streams_from_compatible_server() {
        let route = warp::path!("v1" / "chat" / "completions")
            .and(warp::post())
            .and(warp::header::<String>("authorization"))
            .and(warp::body::json())
            .map(|auth: String, body: serde_json::Value| {
                assert_eq!(auth, "Bearer test-key");
                assert_eq!(body["stream"], true);
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["role"], "user");
                let events = concat!(
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Pickle \"}}]}\n\n",
                    "data: {\"choices\":[{\"delta\":{\"content\":\"it.\"}}]}\n\n",
                    "data: [DONE]\n\n",
                );
                warp::reply::with_header(events, "content-type", "text/event-stream")
            });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let adapter = OpenAiCompatibleAdapter::groq("test-key")
            .with_base_url(format!("http://{}/v1", addr));
        let stream = adapter.stream(&build_turns("Sweet or dill?")).await.unwrap();
        let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks.concat(), "Pickle it.");
    }

    #[tokio::test]
    async fn test_rejected_request_fails_before_streaming() {
        let route = warp::any().map(|| {
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({"error": {"message": "bad key"}})),
                warp::http::StatusCode::UNAUTHORIZED,
            )
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let adapter = OpenAiCompatibleAdapter::openai("wrong")
            .with_base_url(format!("http://{}/v1", addr));
        let err = match adapter.stream(&build_turns("Help")).await {
            Ok(_) => panic!("expected provider error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("bad key"));
        assert!(err.to_string().contains("401"));
    }
}
