//! Scripted optimizer - a named backend with a fixed outcome.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use optimizer_core::{estimate_tokens, Optimization, OptimizeRequest, Optimizer, ProviderError, Tier};

#[derive(Debug, Clone)]
enum Script {
    Succeed(String),
    Fail(u16),
    Echo,
}

/// A backend whose outcome is fixed at construction.
///
/// Stands in for a networked provider when exercising dispatch order and
/// failover. Every call is counted.
#[derive(Debug)]
pub struct ScriptedOptimizer {
    name: String,
    model: String,
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedOptimizer {
    fn with_script(name: impl Into<String>, script: Script) -> Self {
        let name = name.into();
        Self {
            model: format!("{}-model", name.to_lowercase()),
            name,
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// A backend that always answers with `text`.
    pub fn succeeding(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_script(name, Script::Succeed(text.into()))
    }

    /// A backend that always fails with the given status.
    pub fn failing(name: impl Into<String>, status: u16) -> Self {
        Self::with_script(name, Script::Fail(status))
    }

    /// A backend that answers with the prompt it was given.
    pub fn echoing(name: impl Into<String>) -> Self {
        Self::with_script(name, Script::Echo)
    }

    /// Override the reported model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Number of times `optimize` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Optimizer for ScriptedOptimizer {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<Optimization, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let text = match &self.script {
            Script::Succeed(text) => text.clone(),
            Script::Echo => request.prompt.clone(),
            Script::Fail(status) => {
                return Err(ProviderError::new(
                    self.name.clone(),
                    *status,
                    "scripted failure",
                ));
            }
        };

        Ok(Optimization::new(
            text.clone(),
            estimate_tokens(&request.prompt),
            estimate_tokens(&text),
            self.model.clone(),
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_for(&self, _tier: Tier) -> &str {
        &self.model
    }
}
