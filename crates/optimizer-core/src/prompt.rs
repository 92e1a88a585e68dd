//! Prompt validation, system prompts and output clean-up shared by all backends.

use thiserror::Error;

use crate::tier::Tier;

/// Longest prompt accepted, counted in characters.
pub const MAX_PROMPT_CHARS: usize = 10_000;

const FREE_SYSTEM_PROMPT: &str = "You are a prompt engineering assistant. \
Rewrite the user's prompt so that it is clear, specific and easy for an AI model to follow. \
Keep the user's intent and language. \
Return ONLY the rewritten prompt text, with no explanation, preamble or surrounding quotes.";

const PRO_SYSTEM_PROMPT: &str = "You are an expert prompt engineer. \
Rewrite the user's prompt into a well-structured prompt for a large language model: \
state the role the model should take, the task, relevant context, explicit constraints \
and the expected output format. Preserve the user's intent, facts and language. \
Return ONLY the rewritten prompt text, with no explanation, preamble or surrounding quotes.";

/// Why a prompt was refused before reaching any backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptRejection {
    /// Prompt is empty or whitespace only.
    #[error("prompt must not be empty")]
    Empty,

    /// Prompt exceeds [`MAX_PROMPT_CHARS`].
    #[error("prompt is too long ({chars} characters, maximum {max})")]
    TooLong { chars: usize, max: usize },
}

/// Check a prompt before it is admitted.
pub fn validate_prompt(prompt: &str) -> Result<(), PromptRejection> {
    if prompt.trim().is_empty() {
        return Err(PromptRejection::Empty);
    }

    let chars = prompt.chars().count();
    if chars > MAX_PROMPT_CHARS {
        return Err(PromptRejection::TooLong {
            chars,
            max: MAX_PROMPT_CHARS,
        });
    }

    Ok(())
}

/// System prompt sent to networked backends for the given tier.
pub fn system_prompt(tier: Tier) -> &'static str {
    match tier {
        Tier::Free => FREE_SYSTEM_PROMPT,
        Tier::Pro => PRO_SYSTEM_PROMPT,
    }
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

/// Clean a backend's answer, falling back to the original prompt when empty.
///
/// Models occasionally wrap the answer in quotes or a code fence despite the
/// instructions; one such wrapper is removed.
pub fn finalize_output(original: &str, candidate: Option<&str>) -> String {
    let cleaned = candidate.map(strip_wrappers).unwrap_or_default();

    if cleaned.is_empty() {
        original.to_string()
    } else {
        cleaned
    }
}

fn strip_wrappers(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    {
        // Drop an optional language tag on the opening fence line.
        let body = match inner.split_once('\n') {
            Some((first, rest)) if !first.trim().contains(' ') => rest,
            _ => inner,
        };
        return body.trim().to_string();
    }

    for (open, close) in [('"', '"'), ('\u{201c}', '\u{201d}')] {
        if let Some(inner) = trimmed
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim().to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_boundary() {
        let exact = "a".repeat(MAX_PROMPT_CHARS);
        assert!(validate_prompt(&exact).is_ok());

        let over = "a".repeat(MAX_PROMPT_CHARS + 1);
        assert_eq!(
            validate_prompt(&over),
            Err(PromptRejection::TooLong {
                chars: 10_001,
                max: 10_000
            })
        );
    }

    #[test]
    fn test_validate_counts_characters_not_bytes() {
        let prompt = "é".repeat(MAX_PROMPT_CHARS);
        assert!(prompt.len() > MAX_PROMPT_CHARS);
        assert!(validate_prompt(&prompt).is_ok());
    }

    #[test]
    fn test_validate_empty() {
        assert_eq!(validate_prompt(""), Err(PromptRejection::Empty));
        assert_eq!(validate_prompt("   \n"), Err(PromptRejection::Empty));
    }

    #[test]
    fn test_system_prompts_demand_bare_output() {
        for tier in [Tier::Free, Tier::Pro] {
            assert!(system_prompt(tier).contains("Return ONLY the rewritten prompt"));
        }
        assert!(system_prompt(Tier::Pro).len() > system_prompt(Tier::Free).len());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_finalize_falls_back_to_original() {
        assert_eq!(finalize_output("orig", None), "orig");
        assert_eq!(finalize_output("orig", Some("")), "orig");
        assert_eq!(finalize_output("orig", Some("  \n ")), "orig");
    }

    #[test]
    fn test_finalize_strips_wrappers() {
        assert_eq!(finalize_output("o", Some("  better  ")), "better");
        assert_eq!(finalize_output("o", Some("\"better\"")), "better");
        assert_eq!(finalize_output("o", Some("```text\nbetter\n```")), "better");
        assert_eq!(finalize_output("o", Some("```\nbetter\n```")), "better");
        assert_eq!(finalize_output("o", Some("```\n```")), "o");
    }
}
