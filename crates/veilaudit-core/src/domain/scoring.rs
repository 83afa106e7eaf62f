//! Compliance score adjustment
//!
//! Pure arithmetic; the delta is capped so the subtraction that follows can
//! never underflow.

use super::audit::RiskTier;

/// Deducts score points for audit findings
pub struct ComplianceScoreAdjuster;

impl ComplianceScoreAdjuster {
    /// Highest compliance score an entity can hold
    pub const MAX_SCORE: u32 = 100;

    /// Points to deduct: `findings × tier weight`, capped at [`Self::MAX_SCORE`]
    pub fn reduction(findings: u32, tier: RiskTier) -> u32 {
        findings
            .saturating_mul(tier.weight())
            .min(Self::MAX_SCORE)
    }

    /// Applies the reduction to `current`, bottoming out at zero
    pub fn adjusted(current: u32, findings: u32, tier: RiskTier) -> u32 {
        current - Self::reduction(findings, tier).min(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_uses_tier_weight() {
        assert_eq!(ComplianceScoreAdjuster::reduction(5, RiskTier::Medium), 25);
        assert_eq!(ComplianceScoreAdjuster::reduction(3, RiskTier::Low), 6);
        assert_eq!(ComplianceScoreAdjuster::reduction(9, RiskTier::High), 90);
    }

    #[test]
    fn test_reduction_is_capped() {
        assert_eq!(ComplianceScoreAdjuster::reduction(50, RiskTier::Critical), 100);
        assert_eq!(
            ComplianceScoreAdjuster::reduction(u32::MAX, RiskTier::Critical),
            ComplianceScoreAdjuster::MAX_SCORE
        );
    }

    #[test]
    fn test_adjusted_never_underflows() {
        assert_eq!(ComplianceScoreAdjuster::adjusted(10, 50, RiskTier::Critical), 0);
        assert_eq!(ComplianceScoreAdjuster::adjusted(0, 1, RiskTier::Low), 0);
    }

    #[test]
    fn test_adjusted_scenario() {
        assert_eq!(ComplianceScoreAdjuster::adjusted(90, 5, RiskTier::Medium), 65);
        assert_eq!(ComplianceScoreAdjuster::adjusted(90, 0, RiskTier::Low), 90);
    }
}
