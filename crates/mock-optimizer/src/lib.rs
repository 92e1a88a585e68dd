//! Offline optimizer backends.
//!
//! This crate provides implementations of the `Optimizer` trait that never
//! touch the network:
//! - `TemplateOptimizer` - Deterministic template rewrite, the terminal fallback
//! - `ScriptedOptimizer` - Succeeds or fails on demand and counts its calls
//!
//! # Example
//!
//! ```rust
//! use mock_optimizer::{OptimizeRequest, Optimizer, TemplateOptimizer, Tier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_optimizer::ProviderError> {
//!     let optimizer = TemplateOptimizer::new();
//!     let request = OptimizeRequest::new("write a haiku about rust", Tier::Free);
//!
//!     let result = optimizer.optimize(&request).await?;
//!     assert!(result.text.contains("write a haiku about rust"));
//!     Ok(())
//! }
//! ```

mod scripted;
mod template;

// Re-export optimizer-core types for convenience
pub use optimizer_core::{
    async_trait, Optimization, OptimizeRequest, Optimizer, ProviderError, Tier,
};

pub use scripted::ScriptedOptimizer;
pub use template::{TemplateOptimizer, MOCK_MODEL_FREE, MOCK_MODEL_PRO};
