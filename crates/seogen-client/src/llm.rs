use std::fmt;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use seogen_core::credentials::{Credentials, ProviderKeys};
use seogen_core::error::AppError;
use seogen_core::heuristic::HeuristicGenerator;
use seogen_core::models::{ExtractedSignals, FieldSelection, GeneratedFields, ModelKind};
use seogen_core::traits::{Generator, GeneratorFactory};

use crate::prompt::{SYSTEM_PROMPT, build_prompt, parse_reply};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const CLAUDE_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CLAUDE_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);

const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_TEMPERATURE: f64 = 0.3;
const CLAUDE_MAX_TOKENS: u32 = 2048;
const PROBE_PROMPT: &str = "Say \"OK\" only.";
const PROBE_MAX_TOKENS: u32 = 5;

const OPENAI: &str = "OpenAI";
const CLAUDE: &str = "Claude";

/// Endpoints, models, and timeout for the remote providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai_base_url: String,
    pub openai_model: String,
    pub claude_base_url: String,
    pub claude_model: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_base_url: OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            claude_base_url: CLAUDE_BASE_URL.to_string(),
            claude_model: DEFAULT_CLAUDE_MODEL.to_string(),
            timeout: DEFAULT_LLM_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    pub fn with_openai(mut self, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        self.openai_base_url = base_url.into();
        self.openai_model = model.into();
        self
    }

    pub fn with_claude(mut self, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        self.claude_base_url = base_url.into();
        self.claude_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn build_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::NetworkError(e.to_string()))
}

// ---- API types ----

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Raw HTTP outcome of a provider call, before interpretation.
struct RawReply {
    status: StatusCode,
    body: String,
}

async fn send(provider: &str, timeout_secs: u64, request: RequestBuilder) -> Result<RawReply, AppError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            AppError::Timeout {
                provider: provider.to_string(),
                secs: timeout_secs,
            }
        } else {
            AppError::NetworkError(format!("{provider} request failed: {e}"))
        }
    })?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::NetworkError(format!("{provider} response unreadable: {e}")))?;
    Ok(RawReply { status, body })
}

/// Pull the API-reported message out of an error body, if there is one.
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiError>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
}

fn api_error(provider: &str, reply: &RawReply) -> AppError {
    AppError::LlmError {
        provider: provider.to_string(),
        message: api_error_message(&reply.body).unwrap_or_else(|| "unknown error".to_string()),
        status_code: Some(reply.status.as_u16()),
    }
}

fn parse_body<T: for<'de> Deserialize<'de>>(provider: &str, body: &str) -> Result<T, AppError> {
    serde_json::from_str(body).map_err(|e| AppError::LlmError {
        provider: provider.to_string(),
        message: format!("unexpected response body: {e}"),
        status_code: None,
    })
}

fn empty_reply(provider: &str) -> AppError {
    AppError::ContentError(format!("{provider} returned an empty reply"))
}

/// Result of probing an API key with a minimal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    Valid { model: String },
    Invalid,
    RateLimited,
    ApiError { status: u16, message: String },
    Unreachable(String),
}

impl KeyStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, KeyStatus::Valid { .. })
    }

    fn from_reply(reply: RawReply, model: impl FnOnce(&str) -> Option<String>) -> Self {
        match reply.status {
            s if s.is_success() => KeyStatus::Valid {
                model: model(&reply.body).unwrap_or_default(),
            },
            StatusCode::UNAUTHORIZED => KeyStatus::Invalid,
            StatusCode::TOO_MANY_REQUESTS => KeyStatus::RateLimited,
            s => KeyStatus::ApiError {
                status: s.as_u16(),
                message: api_error_message(&reply.body).unwrap_or_else(|| "unknown error".into()),
            },
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStatus::Valid { model } if model.is_empty() => write!(f, "API key is valid"),
            KeyStatus::Valid { model } => write!(f, "API key is valid (model: {model})"),
            KeyStatus::Invalid => write!(f, "API key is invalid, check the key"),
            KeyStatus::RateLimited => write!(
                f,
                "rate limit exceeded, retry later or check billing details"
            ),
            KeyStatus::ApiError { status, message } => write!(f, "API error ({status}): {message}"),
            KeyStatus::Unreachable(e) => write!(f, "connection failed: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

/// OpenAI chat-completions generator.
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, config: &ProviderConfig) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.openai_model.clone(),
            timeout_secs: config.timeout.as_secs(),
        })
    }

    async fn chat(&self, request: &ChatRequest<'_>) -> Result<RawReply, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request);
        send(OPENAI, self.timeout_secs, builder).await
    }

    /// Send a tiny request to check the key.
    pub async fn verify_key(&self) -> KeyStatus {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: PROBE_PROMPT,
            }],
            temperature: None,
            max_tokens: Some(PROBE_MAX_TOKENS),
        };
        match self.chat(&request).await {
            Ok(reply) => KeyStatus::from_reply(reply, |body| {
                serde_json::from_str::<ChatResponse>(body).ok().map(|r| r.model)
            }),
            Err(e) => KeyStatus::Unreachable(e.to_string()),
        }
    }
}

impl Generator for OpenAiGenerator {
    fn model(&self) -> ModelKind {
        ModelKind::OpenAi
    }

    async fn generate(
        &self,
        signals: &ExtractedSignals,
        url: &str,
        fields: &FieldSelection,
    ) -> Result<GeneratedFields, AppError> {
        let prompt = build_prompt(signals, url, fields);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: Some(OPENAI_TEMPERATURE),
            max_tokens: None,
        };

        tracing::info!(model = %self.model, %url, "Requesting OpenAI generation");
        let reply = self.chat(&request).await?;
        if !reply.status.is_success() {
            return Err(api_error(OPENAI, &reply));
        }

        let response: ChatResponse = parse_body(OPENAI, &reply.body)?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| empty_reply(OPENAI))?;

        parse_reply(OPENAI, &content)
    }
}

// ---------------------------------------------------------------------------
// Claude
// ---------------------------------------------------------------------------

/// Anthropic messages-API generator.
#[derive(Clone)]
pub struct ClaudeGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl ClaudeGenerator {
    pub fn new(api_key: &str, config: &ProviderConfig) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.claude_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: config.claude_model.clone(),
            timeout_secs: config.timeout.as_secs(),
        })
    }

    async fn messages(&self, request: &MessagesRequest<'_>) -> Result<RawReply, AppError> {
        let url = format!("{}/messages", self.base_url);
        let builder = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request);
        send(CLAUDE, self.timeout_secs, builder).await
    }

    /// Send a tiny request to check the key.
    pub async fn verify_key(&self) -> KeyStatus {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: PROBE_MAX_TOKENS,
            system: None,
            messages: vec![Message {
                role: "user",
                content: PROBE_PROMPT,
            }],
        };
        match self.messages(&request).await {
            Ok(reply) => KeyStatus::from_reply(reply, |body| {
                serde_json::from_str::<MessagesResponse>(body)
                    .ok()
                    .map(|r| r.model)
            }),
            Err(e) => KeyStatus::Unreachable(e.to_string()),
        }
    }
}

impl Generator for ClaudeGenerator {
    fn model(&self) -> ModelKind {
        ModelKind::Claude
    }

    async fn generate(
        &self,
        signals: &ExtractedSignals,
        url: &str,
        fields: &FieldSelection,
    ) -> Result<GeneratedFields, AppError> {
        let prompt = build_prompt(signals, url, fields);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: CLAUDE_MAX_TOKENS,
            system: Some(SYSTEM_PROMPT),
            messages: vec![Message {
                role: "user",
                content: &prompt,
            }],
        };

        tracing::info!(model = %self.model, %url, "Requesting Claude generation");
        let reply = self.messages(&request).await?;
        if !reply.status.is_success() {
            return Err(api_error(CLAUDE, &reply));
        }

        let response: MessagesResponse = parse_body(CLAUDE, &reply.body)?;
        let content = response
            .content
            .into_iter()
            .next()
            .and_then(|b| b.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| empty_reply(CLAUDE))?;

        parse_reply(CLAUDE, &content)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// The generator chosen for a batch.
#[derive(Clone)]
pub enum AnyGenerator {
    Heuristic(HeuristicGenerator),
    OpenAi(OpenAiGenerator),
    Claude(ClaudeGenerator),
}

impl Generator for AnyGenerator {
    fn model(&self) -> ModelKind {
        match self {
            AnyGenerator::Heuristic(g) => g.model(),
            AnyGenerator::OpenAi(g) => g.model(),
            AnyGenerator::Claude(g) => g.model(),
        }
    }

    async fn generate(
        &self,
        signals: &ExtractedSignals,
        url: &str,
        fields: &FieldSelection,
    ) -> Result<GeneratedFields, AppError> {
        match self {
            AnyGenerator::Heuristic(g) => g.generate(signals, url, fields).await,
            AnyGenerator::OpenAi(g) => g.generate(signals, url, fields).await,
            AnyGenerator::Claude(g) => g.generate(signals, url, fields).await,
        }
    }
}

/// Builds the batch generator, resolving the key from request credentials
/// first and the environment defaults second.
///
/// Never substitutes the heuristic generator for a provider without a key.
#[derive(Clone, Default)]
pub struct ProviderFactory {
    keys: ProviderKeys,
    config: ProviderConfig,
}

impl ProviderFactory {
    pub fn new(keys: ProviderKeys, config: ProviderConfig) -> Self {
        Self { keys, config }
    }

    fn key_for<'a>(&'a self, model: ModelKind, credentials: &'a Credentials) -> Result<&'a str, AppError> {
        credentials
            .resolve(model, &self.keys)
            .ok_or_else(|| AppError::MissingCredential(provider_name(model).to_string()))
    }
}

impl GeneratorFactory for ProviderFactory {
    type Generator = AnyGenerator;

    fn create(&self, model: ModelKind, credentials: &Credentials) -> Result<AnyGenerator, AppError> {
        match model {
            ModelKind::Heuristic => Ok(AnyGenerator::Heuristic(HeuristicGenerator::new())),
            ModelKind::OpenAi => {
                let key = self.key_for(model, credentials)?;
                Ok(AnyGenerator::OpenAi(OpenAiGenerator::new(key, &self.config)?))
            }
            ModelKind::Claude => {
                let key = self.key_for(model, credentials)?;
                Ok(AnyGenerator::Claude(ClaudeGenerator::new(key, &self.config)?))
            }
        }
    }
}

pub fn provider_name(model: ModelKind) -> &'static str {
    match model {
        ModelKind::Heuristic => "heuristic",
        ModelKind::OpenAi => OPENAI,
        ModelKind::Claude => CLAUDE,
    }
}

/// Probe `api_key` against the provider behind `model`.
pub async fn verify_key(
    model: ModelKind,
    api_key: &str,
    config: &ProviderConfig,
) -> Result<KeyStatus, AppError> {
    match model {
        ModelKind::Heuristic => Err(AppError::ValidationError(
            "the heuristic model does not use an API key".into(),
        )),
        ModelKind::OpenAi => Ok(OpenAiGenerator::new(api_key, config)?.verify_key().await),
        ModelKind::Claude => Ok(ClaudeGenerator::new(api_key, config)?.verify_key().await),
    }
}
