//! Configuration for networked providers.

use std::env;

use optimizer_core::Tier;

use crate::kind::ProviderKind;

/// Default maximum tokens for a rewritten prompt.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Configuration for one networked provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Which provider this configures.
    pub kind: ProviderKind,

    /// API key. Always present for hosted providers, optional for local ones.
    pub api_key: Option<String>,

    /// API base URL, without a trailing slash.
    pub base_url: String,

    /// Model used for free-tier requests.
    pub model_free: String,

    /// Model used for pro-tier requests.
    pub model_pro: String,

    /// Maximum tokens for the response.
    pub max_tokens: u32,

    /// Temperature for generation (0.0 - 2.0).
    pub temperature: f32,
}

impl ProviderConfig {
    /// Defaults for a provider, with no credentials.
    pub fn defaults(kind: ProviderKind) -> Self {
        let (model_free, model_pro) = kind.default_models();
        Self {
            kind,
            api_key: None,
            base_url: kind.default_base_url().to_string(),
            model_free: model_free.to_string(),
            model_pro: model_pro.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Returns `None` when the provider is not configured: hosted providers
    /// need `<PREFIX>_API_KEY` (Google also accepts `GEMINI_API_KEY`), local
    /// providers need `<PREFIX>_BASE_URL`.
    ///
    /// Optional environment variables:
    /// - `<PREFIX>_BASE_URL` - API base URL
    /// - `<PREFIX>_MODEL` - Model for free-tier requests
    /// - `<PREFIX>_MODEL_PRO` - Model for pro-tier requests (defaults to `<PREFIX>_MODEL` when only that is set)
    /// - `<PREFIX>_MAX_TOKENS` - Max tokens (default: 1024)
    /// - `<PREFIX>_TEMPERATURE` - Temperature (default: 0.7)
    pub fn from_env(kind: ProviderKind) -> Option<Self> {
        let prefix = kind.env_prefix();
        let var = |name: &str| {
            env::var(format!("{}_{}", prefix, name))
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut api_key = var("API_KEY");
        if api_key.is_none() && kind == ProviderKind::Google {
            api_key = env::var("GEMINI_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty());
        }
        let base_url = var("BASE_URL");

        let configured = if kind.is_local() {
            base_url.is_some()
        } else {
            api_key.is_some()
        };
        if !configured {
            return None;
        }

        let mut config = Self::defaults(kind);
        config.api_key = api_key;
        if let Some(url) = base_url {
            config.base_url = url.trim_end_matches('/').to_string();
        }

        let model = var("MODEL");
        let model_pro = var("MODEL_PRO");
        if let Some(model) = model.clone() {
            config.model_free = model;
        }
        if let Some(model) = model_pro.or(model) {
            config.model_pro = model;
        }

        if let Some(tokens) = var("MAX_TOKENS").and_then(|v| v.parse().ok()) {
            config.max_tokens = tokens;
        }
        if let Some(temp) = var("TEMPERATURE").and_then(|v| v.parse().ok()) {
            config.temperature = temp;
        }

        Some(config)
    }

    /// Create a new config builder.
    pub fn builder(kind: ProviderKind) -> ProviderConfigBuilder {
        ProviderConfigBuilder {
            config: Self::defaults(kind),
        }
    }

    /// Model used for the given tier.
    pub fn model_for(&self, tier: Tier) -> &str {
        match tier {
            Tier::Free => &self.model_free,
            Tier::Pro => &self.model_pro,
        }
    }
}

/// Builder for ProviderConfig.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
    config: ProviderConfig,
}

impl ProviderConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the free-tier model.
    pub fn model_free(mut self, model: impl Into<String>) -> Self {
        self.config.model_free = model.into();
        self
    }

    /// Set the pro-tier model.
    pub fn model_pro(mut self, model: impl Into<String>) -> Self {
        self.config.model_pro = model.into();
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = tokens;
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.temperature = temp;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ProviderConfig {
        self.config
    }
}
