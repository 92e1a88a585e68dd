//! Error types for optimizer backends.

use thiserror::Error;

/// A backend failed to produce an optimization.
///
/// `status` mirrors an HTTP status code: upstream responses keep their own
/// status, transport failures use 503 and local misconfiguration uses 500.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} failed ({status}): {message}")]
pub struct ProviderError {
    /// Name of the backend that failed.
    pub provider: String,
    /// HTTP-like status code.
    pub status: u16,
    /// Human-readable detail.
    pub message: String,
}

impl ProviderError {
    /// Create a new provider error.
    pub fn new(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// The upstream could not be reached.
    pub fn unreachable(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, 503, message)
    }

    /// The backend is misconfigured locally.
    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, 500, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ProviderError::new("OpenAI", 429, "slow down");
        assert_eq!(err.to_string(), "OpenAI failed (429): slow down");
    }

    #[test]
    fn test_unreachable_status() {
        assert_eq!(ProviderError::unreachable("Ollama", "refused").status, 503);
        assert_eq!(ProviderError::configuration("Ollama", "bad url").status, 500);
    }
}
