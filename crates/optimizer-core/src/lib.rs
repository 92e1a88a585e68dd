//! Core trait and types for prompt optimizer backends.
//!
//! This crate provides the shared interface for every backend that can turn a
//! user's prompt into an improved prompt. It defines:
//!
//! - [`Optimizer`] - The trait that all backends implement
//! - [`OptimizeRequest`] / [`Optimization`] - Input and output of a backend call
//! - [`Tier`] - Subscription tier that shapes limits and backend behaviour
//! - [`ProviderError`] - Failure reported by a backend
//!
//! # Example
//!
//! ```rust
//! use optimizer_core::{async_trait, Optimization, OptimizeRequest, Optimizer, ProviderError, Tier};
//!
//! struct Shouty;
//!
//! #[async_trait]
//! impl Optimizer for Shouty {
//!     async fn optimize(&self, request: &OptimizeRequest) -> Result<Optimization, ProviderError> {
//!         Ok(Optimization::new(request.prompt.to_uppercase(), 1, 1, "shouty"))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Shouty"
//!     }
//!
//!     fn model_for(&self, _tier: Tier) -> &str {
//!         "shouty"
//!     }
//! }
//! ```

mod error;
mod optimizer;
mod prompt;
mod tier;

pub use error::ProviderError;
pub use optimizer::{Optimization, OptimizeRequest, Optimizer};
pub use prompt::{
    estimate_tokens, finalize_output, system_prompt, validate_prompt, PromptRejection,
    MAX_PROMPT_CHARS,
};
pub use tier::{Tier, UnknownTier};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
