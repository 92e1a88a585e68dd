//! Provider ordering per tier.

use cloud_optimizer::ProviderKind;
use optimizer_core::Tier;

use crate::error::OrchestratorError;

/// Which providers to try, in order, for each tier.
///
/// The template fallback is always appended after these and is not listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOrder {
    pub pro: Vec<ProviderKind>,
    pub free: Vec<ProviderKind>,
}

impl Default for DispatchOrder {
    fn default() -> Self {
        Self {
            pro: vec![ProviderKind::OpenAi, ProviderKind::DeepSeek],
            free: vec![ProviderKind::DeepSeek, ProviderKind::OpenAi],
        }
    }
}

impl DispatchOrder {
    /// Order for the given tier.
    pub fn for_tier(&self, tier: Tier) -> &[ProviderKind] {
        match tier {
            Tier::Free => &self.free,
            Tier::Pro => &self.pro,
        }
    }

    /// Every provider named by either tier, without repeats.
    pub fn referenced(&self) -> Vec<ProviderKind> {
        let mut kinds = Vec::new();
        for kind in self.pro.iter().chain(self.free.iter()) {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }

    /// Parse a comma-separated provider list such as `openai,deepseek`.
    ///
    /// Unknown and repeated names are rejected.
    pub fn parse_list(value: &str) -> Result<Vec<ProviderKind>, OrchestratorError> {
        let mut kinds = Vec::new();
        for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind: ProviderKind = name
                .parse()
                .map_err(|e: cloud_optimizer::UnknownProvider| OrchestratorError::Config(e.to_string()))?;
            if kinds.contains(&kind) {
                return Err(OrchestratorError::Config(format!(
                    "provider listed twice: {}",
                    name
                )));
            }
            kinds.push(kind);
        }
        Ok(kinds)
    }

    /// Create from environment variables.
    ///
    /// Environment variables:
    /// - `PROMPTLY_PRO_PROVIDERS` - Order for pro requests (default: `openai,deepseek`)
    /// - `PROMPTLY_FREE_PROVIDERS` - Order for free requests (default: `deepseek,openai`)
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let defaults = Self::default();
        let read = |name: &str, default: Vec<ProviderKind>| match std::env::var(name) {
            Ok(value) => Self::parse_list(&value),
            Err(_) => Ok(default),
        };

        Ok(Self {
            pro: read("PROMPTLY_PRO_PROVIDERS", defaults.pro)?,
            free: read("PROMPTLY_FREE_PROVIDERS", defaults.free)?,
        })
    }
}
