//! Provider registry and single-hop failover.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cloud_optimizer::{CloudOptimizer, ProviderConfig, ProviderKind};
use mock_optimizer::TemplateOptimizer;
use optimizer_core::{Optimization, OptimizeRequest, Optimizer, ProviderError, Tier};
use tracing::{debug, info, warn};

use crate::error::OrchestratorError;
use crate::selection::DispatchOrder;

/// The backend that produced an optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServedBy {
    Provider(ProviderKind),
    Fallback,
}

impl fmt::Display for ServedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServedBy::Provider(kind) => f.write_str(kind.key()),
            ServedBy::Fallback => f.write_str("template"),
        }
    }
}

/// A provider that was tried and failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub kind: ProviderKind,
    pub error: ProviderError,
}

/// Result of [`Dispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub optimization: Optimization,
    pub served_by: ServedBy,
    /// Providers that failed before one succeeded, in the order tried.
    pub failures: Vec<ProviderFailure>,
}

/// The closed set of providers available to this process.
///
/// Fixed at construction; a provider missing here is never tried.
pub struct ProviderRegistry {
    order: DispatchOrder,
    providers: BTreeMap<ProviderKind, Arc<dyn Optimizer>>,
}

impl ProviderRegistry {
    /// Instantiate every provider the order names that has credentials in the
    /// environment.
    pub fn from_env(order: DispatchOrder) -> Result<Self, OrchestratorError> {
        let mut providers: BTreeMap<ProviderKind, Arc<dyn Optimizer>> = BTreeMap::new();

        for kind in order.referenced() {
            match ProviderConfig::from_env(kind) {
                Some(config) => {
                    let optimizer = CloudOptimizer::new(config)
                        .map_err(|e| OrchestratorError::Config(e.to_string()))?;
                    info!(provider = %kind, "Provider available");
                    providers.insert(kind, Arc::new(optimizer));
                }
                None => {
                    debug!(provider = %kind, "Provider not configured, skipping");
                }
            }
        }

        if providers.is_empty() {
            warn!("No providers configured, every request will use the template fallback");
        }

        Ok(Self { order, providers })
    }

    /// Build a registry from ready-made backends.
    pub fn with_providers<I>(order: DispatchOrder, providers: I) -> Self
    where
        I: IntoIterator<Item = (ProviderKind, Arc<dyn Optimizer>)>,
    {
        Self {
            order,
            providers: providers.into_iter().collect(),
        }
    }

    /// Available providers for a tier, in the order they should be tried.
    pub fn candidates(&self, tier: Tier) -> Vec<(ProviderKind, Arc<dyn Optimizer>)> {
        self.order
            .for_tier(tier)
            .iter()
            .filter_map(|kind| {
                self.providers
                    .get(kind)
                    .map(|optimizer| (*kind, Arc::clone(optimizer)))
            })
            .collect()
    }

    /// Kinds that were instantiated.
    pub fn available(&self) -> Vec<ProviderKind> {
        self.providers.keys().copied().collect()
    }

    pub fn order(&self) -> &DispatchOrder {
        &self.order
    }
}

/// Tries each candidate once, then falls back to the template.
pub struct Dispatcher {
    registry: ProviderRegistry,
}

impl Dispatcher {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Rewrite a prompt with the first provider that succeeds.
    ///
    /// Never fails: when every provider errors, or none is configured, the
    /// template fallback serves the request.
    pub async fn dispatch(&self, request: &OptimizeRequest) -> Dispatched {
        let mut failures = Vec::new();

        for (kind, optimizer) in self.registry.candidates(request.tier) {
            match optimizer.optimize(request).await {
                Ok(optimization) => {
                    info!(
                        provider = %kind,
                        model = %optimization.model,
                        tokens = optimization.tokens_used(),
                        "Optimization served"
                    );
                    return Dispatched {
                        optimization,
                        served_by: ServedBy::Provider(kind),
                        failures,
                    };
                }
                Err(error) => {
                    warn!(
                        provider = %kind,
                        status = error.status,
                        error = %error.message,
                        "Provider failed, trying next"
                    );
                    failures.push(ProviderFailure { kind, error });
                }
            }
        }

        info!(tier = %request.tier, failed = failures.len(), "Using template fallback");
        Dispatched {
            optimization: fallback(request),
            served_by: ServedBy::Fallback,
            failures,
        }
    }
}

fn fallback(request: &OptimizeRequest) -> Optimization {
    let text = TemplateOptimizer::render(&request.prompt, request.tier);
    let (tokens_in, tokens_out) = TemplateOptimizer::token_count(&request.prompt, request.tier);
    Optimization::new(
        text,
        tokens_in,
        tokens_out,
        TemplateOptimizer.model_for(request.tier),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_optimizer::{ScriptedOptimizer, MOCK_MODEL_FREE, MOCK_MODEL_PRO};

    fn dispatcher(providers: Vec<(ProviderKind, Arc<ScriptedOptimizer>)>) -> Dispatcher {
        let providers = providers
            .into_iter()
            .map(|(kind, optimizer)| (kind, optimizer as Arc<dyn Optimizer>));
        Dispatcher::new(ProviderRegistry::with_providers(
            DispatchOrder::default(),
            providers,
        ))
    }

    #[tokio::test]
    async fn test_primary_wins() {
        let openai = Arc::new(ScriptedOptimizer::succeeding("OpenAI", "Improved"));
        let deepseek = Arc::new(ScriptedOptimizer::succeeding("DeepSeek", "Other"));
        let dispatcher = dispatcher(vec![
            (ProviderKind::OpenAi, openai.clone()),
            (ProviderKind::DeepSeek, deepseek.clone()),
        ]);

        let result = dispatcher
            .dispatch(&OptimizeRequest::new("draft an email", Tier::Pro))
            .await;

        assert_eq!(result.served_by, ServedBy::Provider(ProviderKind::OpenAi));
        assert_eq!(result.optimization.text, "Improved");
        assert!(result.failures.is_empty());
        assert_eq!(openai.calls(), 1);
        assert_eq!(deepseek.calls(), 0);
    }

    #[tokio::test]
    async fn test_free_order_starts_with_deepseek() {
        let openai = Arc::new(ScriptedOptimizer::succeeding("OpenAI", "from openai"));
        let deepseek = Arc::new(ScriptedOptimizer::succeeding("DeepSeek", "from deepseek"));
        let dispatcher = dispatcher(vec![
            (ProviderKind::OpenAi, openai.clone()),
            (ProviderKind::DeepSeek, deepseek.clone()),
        ]);

        let result = dispatcher
            .dispatch(&OptimizeRequest::new("draft an email", Tier::Free))
            .await;

        assert_eq!(result.served_by, ServedBy::Provider(ProviderKind::DeepSeek));
        assert_eq!(openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_failover_to_secondary() {
        let openai = Arc::new(ScriptedOptimizer::failing("OpenAI", 500));
        let deepseek = Arc::new(ScriptedOptimizer::succeeding("DeepSeek", "Rescued"));
        let dispatcher = dispatcher(vec![
            (ProviderKind::OpenAi, openai.clone()),
            (ProviderKind::DeepSeek, deepseek.clone()),
        ]);

        let result = dispatcher
            .dispatch(&OptimizeRequest::new("draft an email", Tier::Pro))
            .await;

        assert_eq!(result.served_by, ServedBy::Provider(ProviderKind::DeepSeek));
        assert_eq!(result.optimization.text, "Rescued");
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].kind, ProviderKind::OpenAi);
        assert_eq!(result.failures[0].error.status, 500);
        assert_eq!(openai.calls(), 1);
        assert_eq!(deepseek.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_fail_falls_back_once_each() {
        let openai = Arc::new(ScriptedOptimizer::failing("OpenAI", 429));
        let deepseek = Arc::new(ScriptedOptimizer::failing("DeepSeek", 503));
        let dispatcher = dispatcher(vec![
            (ProviderKind::OpenAi, openai.clone()),
            (ProviderKind::DeepSeek, deepseek.clone()),
        ]);

        let result = dispatcher
            .dispatch(&OptimizeRequest::new("draft an email", Tier::Pro))
            .await;

        assert_eq!(result.served_by, ServedBy::Fallback);
        assert_eq!(result.optimization.model, MOCK_MODEL_PRO);
        let tried: Vec<_> = result.failures.iter().map(|f| f.kind).collect();
        assert_eq!(tried, vec![ProviderKind::OpenAi, ProviderKind::DeepSeek]);
        assert_eq!(openai.calls(), 1);
        assert_eq!(deepseek.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_providers_pro_uses_template() {
        let dispatcher = dispatcher(Vec::new());
        let prompt = "explain ownership in rust";

        let result = dispatcher
            .dispatch(&OptimizeRequest::new(prompt, Tier::Pro))
            .await;

        assert_eq!(result.served_by, ServedBy::Fallback);
        assert_eq!(result.optimization.model, MOCK_MODEL_PRO);
        assert!(result.optimization.text.contains(prompt));
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let dispatcher = dispatcher(Vec::new());
        let request = OptimizeRequest::new("list three colors", Tier::Free);

        let first = dispatcher.dispatch(&request).await;
        let second = dispatcher.dispatch(&request).await;

        assert_eq!(first.optimization, second.optimization);
        assert_eq!(first.optimization.model, MOCK_MODEL_FREE);
    }

    #[tokio::test]
    async fn test_fallback_matches_template_optimizer() {
        let dispatcher = dispatcher(Vec::new());

        for tier in [Tier::Free, Tier::Pro] {
            let request = OptimizeRequest::new("summarize the meeting", tier);
            let expected = TemplateOptimizer.optimize(&request).await.unwrap();

            let result = dispatcher.dispatch(&request).await;
            assert_eq!(result.optimization, expected);
        }
    }

    #[test]
    fn test_candidates_skip_unconfigured() {
        let deepseek: Arc<dyn Optimizer> = Arc::new(ScriptedOptimizer::echoing("DeepSeek"));
        let registry = ProviderRegistry::with_providers(
            DispatchOrder::default(),
            vec![(ProviderKind::DeepSeek, deepseek)],
        );

        let kinds: Vec<_> = registry
            .candidates(Tier::Pro)
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();
        assert_eq!(kinds, vec![ProviderKind::DeepSeek]);
        assert_eq!(registry.available(), vec![ProviderKind::DeepSeek]);
    }
}
