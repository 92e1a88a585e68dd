//! The Optimizer trait definition.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::tier::Tier;

/// A prompt to be rewritten, along with the tier it is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizeRequest {
    /// The user's original prompt.
    pub prompt: String,
    /// Tier used to pick models and templates.
    pub tier: Tier,
}

impl OptimizeRequest {
    /// Create a new request.
    pub fn new(prompt: impl Into<String>, tier: Tier) -> Self {
        Self {
            prompt: prompt.into(),
            tier,
        }
    }
}

/// The result of a successful optimization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimization {
    /// The rewritten prompt.
    pub text: String,
    /// Tokens consumed by the input.
    pub tokens_in: u32,
    /// Tokens produced in the output.
    pub tokens_out: u32,
    /// Identifier of the model that produced the text.
    pub model: String,
}

impl Optimization {
    /// Create a new optimization result.
    pub fn new(
        text: impl Into<String>,
        tokens_in: u32,
        tokens_out: u32,
        model: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            tokens_in,
            tokens_out,
            model: model.into(),
        }
    }

    /// Total tokens billed for this optimization.
    pub fn tokens_used(&self) -> u32 {
        self.tokens_in.saturating_add(self.tokens_out)
    }
}

/// A backend capable of rewriting a prompt.
///
/// Implementations range from the deterministic template mock to networked
/// AI services. This trait is object-safe and can be used with
/// `Arc<dyn Optimizer>`.
#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Rewrite the request's prompt.
    ///
    /// # Returns
    ///
    /// An [`Optimization`] with the rewritten text, or a [`ProviderError`]
    /// if the backend could not serve the request.
    async fn optimize(&self, request: &OptimizeRequest) -> Result<Optimization, ProviderError>;

    /// Get a human-readable name for this backend.
    fn name(&self) -> &str;

    /// Model identifier this backend uses for the given tier.
    fn model_for(&self, tier: Tier) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_used() {
        let result = Optimization::new("text", 10, 32, "model");
        assert_eq!(result.tokens_used(), 42);
    }

    #[test]
    fn test_tokens_used_saturates() {
        let result = Optimization::new("text", u32::MAX, 1, "model");
        assert_eq!(result.tokens_used(), u32::MAX);
    }
}
