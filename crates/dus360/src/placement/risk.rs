use serde::Serialize;

use super::domain::{ListOwner, PreferenceEntry, RiskLevel};
use super::error::PlacementError;
use super::repository::{
    PreferenceRepository, ProgramCatalog, ScenarioRepository, VerificationProvider,
};
use super::service::PlacementService;

const MIN_LIST_FOR_VERDICT: usize = 10;
const BALANCED_SAFE_PCT: usize = 40;
const RISKY_LOW_PCT: usize = 50;

/// Count of entries per risk tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub safe: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskDistribution {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a PreferenceEntry>,
    {
        entries
            .into_iter()
            .fold(Self::default(), |mut distribution, entry| {
                distribution.record(entry.risk_level);
                distribution
            })
    }

    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Safe => self.safe += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Safe => self.safe,
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.safe + self.high + self.medium + self.low
    }

    /// First matching rule wins.
    pub fn verdict(&self) -> StrategyVerdict {
        let total = self.total();
        if total == 0 {
            StrategyVerdict::NoPreferences
        } else if total < MIN_LIST_FOR_VERDICT {
            StrategyVerdict::AddMorePreferences
        } else if self.safe * 100 >= total * BALANCED_SAFE_PCT {
            StrategyVerdict::Balanced
        } else if self.low * 100 >= total * RISKY_LOW_PCT {
            StrategyVerdict::TooManyRisky
        } else {
            StrategyVerdict::AddMoreSafe
        }
    }
}

/// Qualitative reading of a risk distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyVerdict {
    NoPreferences,
    AddMorePreferences,
    Balanced,
    TooManyRisky,
    AddMoreSafe,
}

impl StrategyVerdict {
    pub const fn message(self) -> &'static str {
        match self {
            StrategyVerdict::NoPreferences => "no preferences yet",
            StrategyVerdict::AddMorePreferences => "add more preferences",
            StrategyVerdict::Balanced => "balanced strategy",
            StrategyVerdict::TooManyRisky => "too many risky picks",
            StrategyVerdict::AddMoreSafe => "add more safe options",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
    pub distribution: RiskDistribution,
    pub total: usize,
    pub verdict: StrategyVerdict,
    pub message: &'static str,
}

impl From<RiskDistribution> for RiskSummary {
    fn from(distribution: RiskDistribution) -> Self {
        let verdict = distribution.verdict();
        Self {
            distribution,
            total: distribution.total(),
            verdict,
            message: verdict.message(),
        }
    }
}

impl<R, C, V> PlacementService<R, C, V>
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    pub fn risk_distribution(&self, owner: &ListOwner) -> Result<RiskDistribution, PlacementError> {
        let entries = self.repository.preferences(owner)?;
        Ok(RiskDistribution::from_entries(&entries))
    }

    pub fn risk_summary(&self, owner: &ListOwner) -> Result<RiskSummary, PlacementError> {
        self.risk_distribution(owner).map(RiskSummary::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution(safe: usize, high: usize, medium: usize, low: usize) -> RiskDistribution {
        RiskDistribution {
            safe,
            high,
            medium,
            low,
        }
    }

    #[test]
    fn short_lists_ask_for_more_preferences_before_balance() {
        let summary = RiskSummary::from(distribution(1, 1, 0, 0));
        assert_eq!(summary.total, 2);
        assert_eq!(summary.verdict, StrategyVerdict::AddMorePreferences);
        assert_eq!(summary.message, "add more preferences");
    }

    #[test]
    fn verdict_rules_apply_in_order() {
        assert_eq!(
            distribution(0, 0, 0, 0).verdict(),
            StrategyVerdict::NoPreferences
        );
        assert_eq!(
            distribution(4, 2, 2, 2).verdict(),
            StrategyVerdict::Balanced
        );
        assert_eq!(
            distribution(4, 0, 0, 5).verdict(),
            StrategyVerdict::AddMorePreferences
        );
        // safe at 40% wins even though low is also at 50%
        assert_eq!(
            distribution(4, 0, 1, 5).verdict(),
            StrategyVerdict::Balanced
        );
        assert_eq!(
            distribution(3, 1, 1, 5).verdict(),
            StrategyVerdict::TooManyRisky
        );
        assert_eq!(
            distribution(3, 3, 2, 2).verdict(),
            StrategyVerdict::AddMoreSafe
        );
    }

    #[test]
    fn record_keeps_total_in_sync() {
        let mut distribution = RiskDistribution::default();
        for level in RiskLevel::ordered() {
            distribution.record(level);
        }
        distribution.record(RiskLevel::Low);
        assert_eq!(distribution.total(), 5);
        assert_eq!(distribution.count(RiskLevel::Low), 2);
    }
}
