//! The closed set of supported providers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// `POST /v1/chat/completions`.
    OpenAiChat,
    /// `POST /v1/messages`.
    AnthropicMessages,
    /// `POST /v1beta/models/{model}:generateContent`.
    GeminiGenerate,
}

/// A networked optimizer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    DeepSeek,
    Ollama,
    LmStudio,
}

/// A provider name that does not match any [`ProviderKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl ProviderKind {
    /// Every supported provider.
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
        ProviderKind::DeepSeek,
        ProviderKind::Ollama,
        ProviderKind::LmStudio,
    ];

    /// Configuration key, as used in provider order lists.
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Ollama => "ollama",
            ProviderKind::LmStudio => "lmstudio",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Google => "Google",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::Ollama => "Ollama",
            ProviderKind::LmStudio => "LM Studio",
        }
    }

    /// Prefix of this provider's environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI",
            ProviderKind::Anthropic => "ANTHROPIC",
            ProviderKind::Google => "GOOGLE",
            ProviderKind::DeepSeek => "DEEPSEEK",
            ProviderKind::Ollama => "OLLAMA",
            ProviderKind::LmStudio => "LMSTUDIO",
        }
    }

    /// Whether the provider runs on the user's own machine.
    ///
    /// Local servers need no API key; they count as configured once a base
    /// URL is given.
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderKind::Ollama | ProviderKind::LmStudio)
    }

    /// Wire protocol for this provider.
    pub fn protocol(&self) -> Protocol {
        match self {
            ProviderKind::Anthropic => Protocol::AnthropicMessages,
            ProviderKind::Google => Protocol::GeminiGenerate,
            _ => Protocol::OpenAiChat,
        }
    }

    /// Default API base URL.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Google => "https://generativelanguage.googleapis.com",
            ProviderKind::DeepSeek => "https://api.deepseek.com",
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::LmStudio => "http://localhost:1234",
        }
    }

    /// Default models as `(free, pro)`.
    pub fn default_models(&self) -> (&'static str, &'static str) {
        match self {
            ProviderKind::OpenAi => ("gpt-4o-mini", "gpt-4o"),
            ProviderKind::Anthropic => ("claude-3-5-haiku-latest", "claude-3-5-sonnet-latest"),
            ProviderKind::Google => ("gemini-1.5-flash", "gemini-1.5-pro"),
            ProviderKind::DeepSeek => ("deepseek-chat", "deepseek-chat"),
            ProviderKind::Ollama => ("llama3.1", "llama3.1"),
            ProviderKind::LmStudio => ("local-model", "local-model"),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "google" | "gemini" => Ok(ProviderKind::Google),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "ollama" => Ok(ProviderKind::Ollama),
            "lmstudio" | "lm-studio" | "lm_studio" => Ok(ProviderKind::LmStudio),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}
