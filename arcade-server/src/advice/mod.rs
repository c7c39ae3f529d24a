pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod sse;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt, stream};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use arcade_persistence::AdviceRepository;
use arcade_types::{AdviceRole, ChatTurn, ModelName};

use crate::config::ApiKeys;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiCompatibleAdapter;

pub const SYSTEM_PROMPT: &str = "You are a warm, practical advisor. The user will describe a \
personal dilemma. Weigh the options honestly, point out what they may be overlooking, and \
finish with a clear recommendation. Keep it under 300 words.";

pub const STREAM_ERROR_TEXT: &str = "Error getting advice. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum AdviceError {
    #[error("unsupported model '{0}'")]
    UnsupportedModel(String),
    #[error("no API key configured for {0}")]
    MissingApiKey(ModelName),
    #[error("dilemma must not be empty")]
    EmptyDilemma,
    #[error("provider error: {0}")]
    Provider(String),
}

pub type AdviceStream = Pin<Box<dyn Stream<Item = Result<String, AdviceError>> + Send>>;

/// One model provider. `stream` fails before yielding anything when the
/// provider rejects the request outright.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn stream(&self, turns: &[ChatTurn]) -> Result<AdviceStream, AdviceError>;
}

pub fn build_turns(dilemma: &str) -> Vec<ChatTurn> {
    vec![
        ChatTurn {
            role: AdviceRole::System,
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatTurn {
            role: AdviceRole::User,
            content: dilemma.to_string(),
        },
    ]
}

/// System text and the conversation proper, for APIs that take them apart.
pub(crate) fn split_system(turns: &[ChatTurn]) -> (Option<String>, Vec<&ChatTurn>) {
    let system: Vec<&str> = turns
        .iter()
        .filter(|turn| turn.role == AdviceRole::System)
        .map(|turn| turn.content.as_str())
        .collect();
    let rest = turns
        .iter()
        .filter(|turn| turn.role != AdviceRole::System)
        .collect();

    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, rest)
}

#[derive(Deserialize)]
struct ProviderErrorResponse {
    error: ProviderErrorBody,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// Passes a successful response through; otherwise reads the provider's
/// error message out of the body.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, AdviceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| format!("Failed to read {} error body", provider));
    let message = serde_json::from_str::<ProviderErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    Err(AdviceError::Provider(describe_status(provider, status, &message)))
}

fn describe_status(provider: &str, status: StatusCode, message: &str) -> String {
    format!("{} returned {}: {}", provider, status.as_u16(), message)
}

pub(crate) fn request_failed(provider: &str, err: reqwest::Error) -> AdviceError {
    AdviceError::Provider(format!("{} request failed: {}", provider, err))
}

struct Relay {
    inner: AdviceStream,
    answer: String,
    record: Option<PendingRecord>,
    done: bool,
}

struct PendingRecord {
    repository: Arc<AdviceRepository>,
    user_id: String,
    model: ModelName,
    dilemma: String,
}

impl PendingRecord {
    fn spawn(self, answer: String) {
        tokio::spawn(async move {
            match self
                .repository
                .record_exchange(&self.user_id, self.model.as_str(), &self.dilemma, &answer)
                .await
            {
                Ok(thread) => info!("Recorded advice thread {} for {}", thread.id, self.user_id),
                Err(e) => warn!("Failed to record advice for {}: {}", self.user_id, e),
            }
        });
    }
}

/// Routes a dilemma to the adapter for the requested model and relays the
/// answer as it streams in.
pub struct AdvicePipeline {
    adapters: HashMap<ModelName, Arc<dyn ModelAdapter>>,
    repository: Option<Arc<AdviceRepository>>,
}

impl AdvicePipeline {
    pub fn new(repository: Option<Arc<AdviceRepository>>) -> Self {
        Self {
            adapters: HashMap::new(),
            repository,
        }
    }

    /// One adapter per model whose provider key is configured.
    pub fn from_keys(keys: &ApiKeys, repository: Option<Arc<AdviceRepository>>) -> Self {
        let mut pipeline = Self::new(repository);
        for model in ModelName::ALL {
            let Some(key) = keys.for_model(model) else {
                continue;
            };
            let adapter: Arc<dyn ModelAdapter> = match model {
                ModelName::Gpt4oMini => Arc::new(OpenAiCompatibleAdapter::openai(key)),
                ModelName::Llama3370b => Arc::new(OpenAiCompatibleAdapter::groq(key)),
                ModelName::MistralSmall => Arc::new(OpenAiCompatibleAdapter::mistral(key)),
                ModelName::Claude35Haiku => Arc::new(AnthropicAdapter::new(key)),
                ModelName::Gemini20Flash => Arc::new(GeminiAdapter::new(key)),
            };
            pipeline.adapters.insert(model, adapter);
        }
        info!(
            "Advice pipeline ready with {} of {} models",
            pipeline.adapters.len(),
            ModelName::ALL.len()
        );
        pipeline
    }

    pub fn with_adapter(mut self, model: ModelName, adapter: Arc<dyn ModelAdapter>) -> Self {
        self.adapters.insert(model, adapter);
        self
    }

    /// Resolves the model name without touching the network.
    pub fn resolve(&self, model_name: &str) -> Result<(ModelName, Arc<dyn ModelAdapter>), AdviceError> {
        let model = model_name
            .parse::<ModelName>()
            .map_err(|_| AdviceError::UnsupportedModel(model_name.to_string()))?;
        let adapter = self
            .adapters
            .get(&model)
            .cloned()
            .ok_or(AdviceError::MissingApiKey(model))?;
        Ok((model, adapter))
    }

    pub async fn advise(
        &self,
        dilemma: &str,
        user_id: Option<&str>,
        model_name: &str,
    ) -> Result<AdviceStream, AdviceError> {
        let (model, adapter) = self.resolve(model_name)?;
        let dilemma = dilemma.trim();
        if dilemma.is_empty() {
            return Err(AdviceError::EmptyDilemma);
        }

        info!("Requesting advice from {} ({})", model, adapter.provider());
        let inner = adapter.stream(&build_turns(dilemma)).await?;

        let record = match (user_id, &self.repository) {
            (Some(user_id), Some(repository)) => Some(PendingRecord {
                repository: repository.clone(),
                user_id: user_id.to_string(),
                model,
                dilemma: dilemma.to_string(),
            }),
            _ => None,
        };

        Ok(relay(inner, record))
    }
}

/// Forwards chunks as they arrive and records the full answer once the
/// provider finishes cleanly. An error is the last item.
fn relay(inner: AdviceStream, record: Option<PendingRecord>) -> AdviceStream {
    let state = Relay {
        inner,
        answer: String::new(),
        record,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        match state.inner.next().await {
            Some(Ok(chunk)) => {
                state.answer.push_str(&chunk);
                Some((Ok(chunk), state))
            }
            Some(Err(e)) => {
                warn!("Advice stream failed: {}", e);
                state.done = true;
                Some((Err(e), state))
            }
            None => {
                if let Some(record) = state.record.take() {
                    if !state.answer.is_empty() {
                        record.spawn(std::mem::take(&mut state.answer));
                    }
                }
                None
            }
        }
    }))
}
