//! CloudOptimizer implementation over the supported wire protocols.

use async_trait::async_trait;
use optimizer_core::{
    estimate_tokens, finalize_output, system_prompt, Optimization, OptimizeRequest, Optimizer,
    ProviderError, Tier,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::api_types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, GeminiContent,
    GenerateContentRequest, GenerateContentResponse, GenerationConfig, MessageRequest,
    MessageResponse,
};
use crate::config::ProviderConfig;
use crate::kind::Protocol;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// What a provider returned, before clean-up.
#[derive(Debug, Default)]
struct Completion {
    text: Option<String>,
    usage: Option<(u32, u32)>,
}

/// A backend that forwards prompts to a networked LLM.
///
/// No timeout is applied here beyond reqwest's defaults, and failures are
/// never retried; failover is the dispatcher's job.
pub struct CloudOptimizer {
    client: Client,
    config: ProviderConfig,
}

impl CloudOptimizer {
    /// Create a new CloudOptimizer with the given configuration.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let name = config.kind.display_name();

        if !config.kind.is_local() && config.api_key.is_none() {
            return Err(ProviderError::configuration(name, "API key not set"));
        }

        let client = Client::builder().build().map_err(|e| {
            ProviderError::configuration(name, format!("Failed to create HTTP client: {}", e))
        })?;

        info!(
            provider = name,
            base_url = %config.base_url,
            model_free = %config.model_free,
            model_pro = %config.model_pro,
            "Cloud optimizer initialized"
        );

        Ok(Self { client, config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn provider_name(&self) -> &'static str {
        self.config.kind.display_name()
    }

    async fn chat_completion(&self, request: &OptimizeRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = ChatCompletionRequest {
            model: self.config.model_for(request.tier).to_string(),
            messages: vec![
                ChatMessage::system(system_prompt(request.tier)),
                ChatMessage::user(request.prompt.clone()),
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let Some(response) = self.send::<ChatCompletionResponse>(builder).await? else {
            return Ok(Completion::default());
        };

        Ok(Completion {
            text: response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message)
                .and_then(|message| message.content),
            usage: response
                .usage
                .map(|usage| (usage.prompt_tokens, usage.completion_tokens)),
        })
    }

    async fn anthropic_message(&self, request: &OptimizeRequest) -> Result<Completion, ProviderError> {
        let url = format!("{}/v1/messages", self.config.base_url);
        let body = MessageRequest {
            model: self.config.model_for(request.tier).to_string(),
            system: system_prompt(request.tier).to_string(),
            messages: vec![ChatMessage::user(request.prompt.clone())],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let builder = self
            .client
            .post(&url)
            .header("x-api-key", self.config.api_key.as_deref().unwrap_or_default())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let Some(response) = self.send::<MessageResponse>(builder).await? else {
            return Ok(Completion::default());
        };

        let text: String = response
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        Ok(Completion {
            text: Some(text),
            usage: response
                .usage
                .map(|usage| (usage.input_tokens, usage.output_tokens)),
        })
    }

    async fn gemini_generate(&self, request: &OptimizeRequest) -> Result<Completion, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url,
            self.config.model_for(request.tier)
        );
        let body = GenerateContentRequest {
            system_instruction: GeminiContent::text(None, system_prompt(request.tier)),
            contents: vec![GeminiContent::text(Some("user"), request.prompt.clone())],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        };

        let builder = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.config.api_key.as_deref().unwrap_or_default())
            .json(&body);

        let Some(response) = self.send::<GenerateContentResponse>(builder).await? else {
            return Ok(Completion::default());
        };

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            });

        Ok(Completion {
            text,
            usage: response
                .usage_metadata
                .map(|usage| (usage.prompt_token_count, usage.candidates_token_count)),
        })
    }

    /// Send a request and decode a successful body.
    ///
    /// Non-success statuses become a [`ProviderError`]. A success body that
    /// does not decode yields `Ok(None)` so the caller can fall back to the
    /// original prompt.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>, ProviderError> {
        let name = self.provider_name();

        // Strip URLs from transport errors so they never carry credentials.
        let response = builder.send().await.map_err(|e| {
            ProviderError::unreachable(name, format!("Failed to send request: {}", e.without_url()))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::unreachable(name, format!("Failed to read response: {}", e.without_url()))
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(api_error) => api_error.error.message,
                Err(_) => body,
            };
            return Err(ProviderError::new(
                name,
                status.as_u16(),
                format!("API error: {}", message),
            ));
        }

        match serde_json::from_str::<T>(&body) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(e) => {
                warn!(provider = name, error = %e, "Malformed response body");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Optimizer for CloudOptimizer {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<Optimization, ProviderError> {
        debug!(
            provider = self.provider_name(),
            tier = %request.tier,
            chars = request.prompt.chars().count(),
            "Optimizing prompt"
        );

        let completion = match self.config.kind.protocol() {
            Protocol::OpenAiChat => self.chat_completion(request).await?,
            Protocol::AnthropicMessages => self.anthropic_message(request).await?,
            Protocol::GeminiGenerate => self.gemini_generate(request).await?,
        };

        if completion.text.as_deref().map_or(true, |t| t.trim().is_empty()) {
            warn!(
                provider = self.provider_name(),
                "No content in response, returning original prompt"
            );
        }

        let text = finalize_output(&request.prompt, completion.text.as_deref());
        let (tokens_in, tokens_out) = completion
            .usage
            .unwrap_or_else(|| (estimate_tokens(&request.prompt), estimate_tokens(&text)));

        Ok(Optimization::new(
            text,
            tokens_in,
            tokens_out,
            self.config.model_for(request.tier),
        ))
    }

    fn name(&self) -> &str {
        self.provider_name()
    }

    fn model_for(&self, tier: Tier) -> &str {
        self.config.model_for(tier)
    }
}
