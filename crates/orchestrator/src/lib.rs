//! Provider dispatch and the admission pipeline for prompt optimization.
//!
//! This crate provides [`OptimizationService`], which takes a user's prompt
//! through every step between an authenticated request and a rewritten
//! prompt.
//!
//! # Architecture
//!
//! ```text
//! optimize(user, prompt, declared tier)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   OPTIMIZATION SERVICE                      │
//! │                                                             │
//! │  1. Validate prompt (non-empty, ≤ 10,000 chars)             │
//! │         ↓                                                   │
//! │  2. Rate limiter (declared tier, minute + month windows)    │
//! │         ↓                                                   │
//! │  3. Daily quota (stored tier, durable counter)              │
//! │         ↓                                                   │
//! │  4. Dispatcher: providers in tier order, each once          │
//! │     • PRO:  openai → deepseek → template                    │
//! │     • FREE: deepseek → openai → template                    │
//! │         ↓                                                   │
//! │  5. Count + log usage (failure reported, not raised)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orchestrator::{DispatchOrder, Dispatcher, OptimizationService, ProviderRegistry};
//! use quota_gate::{QuotaService, RateLimiter, SystemClock};
//!
//! let clock = Arc::new(SystemClock);
//! let registry = ProviderRegistry::from_env(DispatchOrder::from_env()?)?;
//! let service = OptimizationService::new(
//!     Arc::new(RateLimiter::new(clock.clone())),
//!     QuotaService::new(Arc::new(db)),
//!     Dispatcher::new(registry),
//!     clock,
//! );
//!
//! let outcome = service.optimize("user-id", "write a haiku", "free").await?;
//! println!("{}", outcome.optimization.text);
//! ```

mod dispatch;
mod error;
mod selection;
mod service;

pub use dispatch::{Dispatched, Dispatcher, ProviderFailure, ProviderRegistry, ServedBy};
pub use error::{OrchestratorError, ServiceError};
pub use selection::DispatchOrder;
pub use service::{OptimizationService, OptimizeOutcome, UsageLog};
