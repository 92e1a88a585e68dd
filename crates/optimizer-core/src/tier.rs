//! Subscription tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription level of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free plan.
    #[default]
    Free,
    /// Paid plan.
    Pro,
}

/// A tier name that is neither `free` nor `pro`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

impl Tier {
    /// Parse a tier name, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Tier::Free),
            "pro" => Some(Tier::Pro),
            _ => None,
        }
    }

    /// Parse a client-declared tier, treating anything unrecognized as free.
    pub fn from_declared(value: &str) -> Self {
        Self::parse(value).unwrap_or(Tier::Free)
    }

    /// Lowercase wire name (`free` / `pro`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }

    /// Uppercase storage code (`FREE` / `PRO`).
    pub fn code(&self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Pro => "PRO",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownTier(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(Tier::parse("PRO"), Some(Tier::Pro));
        assert_eq!(Tier::parse(" free "), Some(Tier::Free));
        assert_eq!(Tier::parse("enterprise"), None);
    }

    #[test]
    fn test_from_declared_falls_back_to_free() {
        assert_eq!(Tier::from_declared("pro"), Tier::Pro);
        assert_eq!(Tier::from_declared("platinum"), Tier::Free);
        assert_eq!(Tier::from_declared(""), Tier::Free);
    }

    #[test]
    fn test_from_str_error() {
        let err = "gold".parse::<Tier>().unwrap_err();
        assert_eq!(err, UnknownTier("gold".to_string()));
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Tier::Pro).unwrap(), "\"pro\"");
        let tier: Tier = serde_json::from_str("\"free\"").unwrap();
        assert_eq!(tier, Tier::Free);
    }

    #[test]
    fn test_codes() {
        assert_eq!(Tier::Free.code(), "FREE");
        assert_eq!(Tier::Pro.code(), "PRO");
        assert_eq!(Tier::Pro.to_string(), "pro");
    }
}
