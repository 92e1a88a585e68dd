//! Template optimizer - wraps the prompt in tier-specific scaffolding.

use async_trait::async_trait;
use optimizer_core::{estimate_tokens, Optimization, OptimizeRequest, Optimizer, ProviderError, Tier};

/// Model identifier reported for free-tier mock output.
pub const MOCK_MODEL_FREE: &str = "promptly-mock-free";

/// Model identifier reported for pro-tier mock output.
pub const MOCK_MODEL_PRO: &str = "promptly-mock-pro";

const FREE_LEAD: &str = "Please help me with the following task. Be clear and specific.\n\n";
const FREE_CLOSE: &str = "\n\nGive a concise, well-structured answer.";

const PRO_LEAD: &str = "You are an expert assistant. Work through the task below carefully.\n\n## Task\n";
const PRO_CLOSE: &str = "\n\n## Requirements\n\
- Be specific and thorough\n\
- State any assumptions you make\n\
- Include examples where they help\n\
- Point out missing information instead of guessing\n\
\n\
## Output format\n\
Answer with clear headings and bullet points where appropriate, \
and finish with a short summary.";

/// A backend that rewrites prompts with a fixed template.
///
/// Output depends only on the prompt and tier, so offline and test
/// environments get stable, reproducible results. It never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateOptimizer;

impl TemplateOptimizer {
    /// Create a new TemplateOptimizer.
    pub fn new() -> Self {
        Self
    }

    /// Render the template for a prompt.
    pub fn render(prompt: &str, tier: Tier) -> String {
        let (lead, close) = match tier {
            Tier::Free => (FREE_LEAD, FREE_CLOSE),
            Tier::Pro => (PRO_LEAD, PRO_CLOSE),
        };

        let mut out = String::with_capacity(lead.len() + prompt.len() + close.len());
        out.push_str(lead);
        out.push_str(prompt);
        out.push_str(close);
        out
    }

    /// Pseudo-token count for a prompt of the given tier.
    ///
    /// Input tokens plus the tokens of the rendered template; a pure function
    /// of the prompt's character count and the tier.
    pub fn token_count(prompt: &str, tier: Tier) -> (u32, u32) {
        let tokens_in = estimate_tokens(prompt);
        let tokens_out = estimate_tokens(&Self::render(prompt, tier));
        (tokens_in, tokens_out)
    }
}

#[async_trait]
impl Optimizer for TemplateOptimizer {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<Optimization, ProviderError> {
        let text = Self::render(&request.prompt, request.tier);
        let (tokens_in, tokens_out) = Self::token_count(&request.prompt, request.tier);

        Ok(Optimization::new(
            text,
            tokens_in,
            tokens_out,
            self.model_for(request.tier),
        ))
    }

    fn name(&self) -> &str {
        "TemplateOptimizer"
    }

    fn model_for(&self, tier: Tier) -> &str {
        match tier {
            Tier::Free => MOCK_MODEL_FREE,
            Tier::Pro => MOCK_MODEL_PRO,
        }
    }
}
