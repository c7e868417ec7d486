//! AI-assisted analysis over third-party LLM providers.
//!
//! Anthropic speaks its own messages API; DeepSeek and Moonshot both
//! expose OpenAI-compatible chat completions, so they share a code path.
//! A provider counts as configured when its API key is present.

use crate::config::AiConfig;
use textlens_types::AnalysisKind;
use thiserror::Error;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEEPSEEK_URL: &str = "https://api.deepseek.com/chat/completions";
const MOONSHOT_URL: &str = "https://api.moonshot.cn/v1/chat/completions";

/// Upper bound on tokens requested from the provider.
const MAX_COMPLETION_TOKENS: u32 = 1024;

/// Errors from AI analysis.
#[derive(Debug, Error)]
pub enum AiError {
    /// The requested provider name is not recognized.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// No provider with an API key is available for the request.
    #[error("no AI provider configured")]
    NoProvider,

    /// The provider returned a non-success status.
    #[error("provider returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The provider response did not have the expected shape.
    #[error("malformed provider response")]
    MalformedResponse,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// The supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderId {
    Anthropic,
    DeepSeek,
    Moonshot,
}

impl ProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::DeepSeek => "deepseek",
            Self::Moonshot => "moonshot",
        }
    }

    /// Display name carried in API responses.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic Claude",
            Self::DeepSeek => "DeepSeek",
            Self::Moonshot => "Moonshot Kimi",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "anthropic" => Some(Self::Anthropic),
            "deepseek" => Some(Self::DeepSeek),
            "moonshot" => Some(Self::Moonshot),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Provider {
    id: ProviderId,
    api_key: String,
    model: String,
}

/// A completed AI analysis.
#[derive(Debug, Clone)]
pub struct AiAnswer {
    /// Display name of the provider that answered.
    pub provider: &'static str,
    /// Stable provider identifier.
    pub provider_id: &'static str,
    pub text: String,
}

/// Instruction prefix for each analysis kind. The analyzed text is
/// appended after a blank line.
pub fn prompt_for(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::General => {
            "Analyze the following text. Describe its topic, structure, tone, and intent."
        }
        AnalysisKind::Sentiment => {
            "Classify the sentiment of the following text as positive, negative, or neutral, \
             and briefly justify the classification."
        }
        AnalysisKind::Summary => "Summarize the following text in a few sentences.",
        AnalysisKind::Keywords => {
            "Extract the most important keywords and phrases from the following text, \
             ordered by relevance."
        }
        AnalysisKind::Translation => "Translate the following text into English.",
        AnalysisKind::CodeReview => {
            "Review the following code. Point out bugs, risky patterns, and concrete \
             improvements."
        }
    }
}

/// Routes analysis requests to configured providers.
#[derive(Clone)]
pub struct AiManager {
    client: reqwest::Client,
    providers: Vec<Provider>,
    default_provider: Option<String>,
}

impl AiManager {
    /// Builds the manager from configuration. Providers without an API
    /// key are skipped; declaration order decides `auto` selection.
    pub fn from_config(config: &AiConfig) -> Self {
        let mut providers = Vec::new();
        if let Some(key) = &config.anthropic_api_key {
            providers.push(Provider {
                id: ProviderId::Anthropic,
                api_key: key.clone(),
                model: config.anthropic_model.clone(),
            });
        }
        if let Some(key) = &config.deepseek_api_key {
            providers.push(Provider {
                id: ProviderId::DeepSeek,
                api_key: key.clone(),
                model: config.deepseek_model.clone(),
            });
        }
        if let Some(key) = &config.moonshot_api_key {
            providers.push(Provider {
                id: ProviderId::Moonshot,
                api_key: key.clone(),
                model: config.moonshot_model.clone(),
            });
        }

        Self {
            client: reqwest::Client::new(),
            providers,
            default_provider: config.default_provider.clone(),
        }
    }

    /// Whether at least one provider is configured.
    pub fn is_configured(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Stable identifiers of the configured providers.
    pub fn configured_providers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id.as_str()).collect()
    }

    /// Resolves a requested provider name to a configured provider.
    ///
    /// `None` and `"auto"` pick the configured default; when the default
    /// is unset, unknown, or has no API key, the first configured
    /// provider answers instead. An explicitly named provider never falls
    /// back.
    fn select(&self, requested: Option<&str>) -> Result<&Provider, AiError> {
        match requested {
            None | Some("auto") => {
                if let Some(name) = self.default_provider.as_deref() {
                    let preferred = ProviderId::parse(name)
                        .and_then(|id| self.providers.iter().find(|p| p.id == id));
                    if let Some(provider) = preferred {
                        return Ok(provider);
                    }
                    tracing::warn!(
                        provider = name,
                        "default provider is not configured, falling back"
                    );
                }
                self.providers.first().ok_or(AiError::NoProvider)
            }
            Some(name) => {
                let id = ProviderId::parse(name)
                    .ok_or_else(|| AiError::UnknownProvider(name.to_string()))?;
                self.providers
                    .iter()
                    .find(|p| p.id == id)
                    .ok_or(AiError::NoProvider)
            }
        }
    }

    /// Runs an AI analysis of `text` with the given kind.
    pub async fn analyze(
        &self,
        requested_provider: Option<&str>,
        kind: AnalysisKind,
        text: &str,
    ) -> Result<AiAnswer, AiError> {
        let provider = self.select(requested_provider)?;
        let prompt = format!("{}\n\n{}", prompt_for(kind), text);

        let answer = match provider.id {
            ProviderId::Anthropic => self.call_anthropic(provider, &prompt).await?,
            ProviderId::DeepSeek => {
                self.call_openai_compatible(provider, DEEPSEEK_URL, &prompt)
                    .await?
            }
            ProviderId::Moonshot => {
                self.call_openai_compatible(provider, MOONSHOT_URL, &prompt)
                    .await?
            }
        };

        Ok(AiAnswer {
            provider: provider.id.display_name(),
            provider_id: provider.id.as_str(),
            text: answer,
        })
    }

    async fn call_anthropic(&self, provider: &Provider, prompt: &str) -> Result<String, AiError> {
        let body = serde_json::json!({
            "model": provider.model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &provider.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream_error(status.as_u16(), response).await);
        }

        let payload: serde_json::Value = response.json().await?;
        payload["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or(AiError::MalformedResponse)
    }

    async fn call_openai_compatible(
        &self,
        provider: &Provider,
        url: &str,
        prompt: &str,
    ) -> Result<String, AiError> {
        let body = serde_json::json!({
            "model": provider.model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(&provider.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(upstream_error(status.as_u16(), response).await);
        }

        let payload: serde_json::Value = response.json().await?;
        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(AiError::MalformedResponse)
    }
}

/// Builds an [`AiError::Upstream`] from a failed response, truncating the
/// body so provider error pages cannot flood the logs.
async fn upstream_error(status: u16, response: reqwest::Response) -> AiError {
    let body = response.text().await.unwrap_or_default();
    let body = if body.len() > 512 {
        let end = body
            .char_indices()
            .nth(512)
            .map(|(idx, _)| idx)
            .unwrap_or(body.len());
        body[..end].to_string()
    } else {
        body
    };
    AiError::Upstream { status, body }
}
