//! Networked optimizer backends.
//!
//! This crate provides [`CloudOptimizer`], an implementation of the
//! `Optimizer` trait that forwards prompts to a hosted or local LLM server.
//!
//! # Supported providers
//!
//! | Kind | Wire protocol | Available when |
//! |------|---------------|----------------|
//! | `openai` | OpenAI chat completions | `OPENAI_API_KEY` set |
//! | `deepseek` | OpenAI chat completions | `DEEPSEEK_API_KEY` set |
//! | `anthropic` | Anthropic Messages | `ANTHROPIC_API_KEY` set |
//! | `google` | Gemini `generateContent` | `GOOGLE_API_KEY` or `GEMINI_API_KEY` set |
//! | `ollama` | OpenAI chat completions | `OLLAMA_BASE_URL` set |
//! | `lmstudio` | OpenAI chat completions | `LMSTUDIO_BASE_URL` set |
//!
//! # Usage
//!
//! ```rust,no_run
//! use cloud_optimizer::{CloudOptimizer, ProviderConfig, ProviderKind};
//! use optimizer_core::{OptimizeRequest, Optimizer, Tier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     if let Some(config) = ProviderConfig::from_env(ProviderKind::OpenAi) {
//!         let optimizer = CloudOptimizer::new(config)?;
//!         let result = optimizer
//!             .optimize(&OptimizeRequest::new("write a cover letter", Tier::Pro))
//!             .await?;
//!         println!("{}", result.text);
//!     }
//!     Ok(())
//! }
//! ```

mod api_types;
mod config;
mod kind;
mod optimizer;

pub use config::{ProviderConfig, ProviderConfigBuilder};
pub use kind::{Protocol, ProviderKind, UnknownProvider};
pub use optimizer::CloudOptimizer;
