//! Per-tier ceilings.

use optimizer_core::Tier;

/// Request ceilings for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    /// Requests per clock minute.
    pub per_minute: u32,
    /// Requests per calendar month.
    pub per_month: u32,
    /// Optimizations per calendar day.
    pub per_day: u32,
}

impl TierLimits {
    pub const FREE: TierLimits = TierLimits {
        per_minute: 5,
        per_month: 50,
        per_day: 50,
    };

    pub const PRO: TierLimits = TierLimits {
        per_minute: 20,
        per_month: 1000,
        per_day: 1000,
    };

    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self::FREE,
            Tier::Pro => Self::PRO,
        }
    }

    /// Limits for a tier name sent by a client. Unrecognized names get free limits.
    pub fn for_declared(declared: &str) -> Self {
        Self::for_tier(Tier::from_declared(declared))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_tiers() {
        assert_eq!(TierLimits::for_declared("pro"), TierLimits::PRO);
        assert_eq!(TierLimits::for_declared("PRO"), TierLimits::PRO);
        assert_eq!(TierLimits::for_declared("free"), TierLimits::FREE);
        assert_eq!(TierLimits::for_declared("platinum"), TierLimits::FREE);
        assert_eq!(TierLimits::for_declared(""), TierLimits::FREE);
    }
}
