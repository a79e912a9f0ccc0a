use serde::{Deserialize, Serialize};

/// Hard ceiling on preference list length.
pub const MAX_PREFERENCES: usize = 30;

/// What `apply_scenario` does when a snapshotted program is no longer in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingProgramPolicy {
    /// Rebuild the list without the missing programs and report them back.
    #[default]
    Skip,
    /// Fail the whole apply and leave the live list untouched.
    Reject,
}

impl MissingProgramPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(Self::Skip),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Tunable limits for the placement service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPolicy {
    pub max_preferences: usize,
    pub missing_programs: MissingProgramPolicy,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            max_preferences: MAX_PREFERENCES,
            missing_programs: MissingProgramPolicy::default(),
        }
    }
}

impl PlacementPolicy {
    /// Clamps the list limit into `1..=MAX_PREFERENCES`.
    pub fn sanitized(self) -> Self {
        Self {
            max_preferences: self.max_preferences.clamp(1, MAX_PREFERENCES),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_policy_accepts_only_documented_names() {
        assert_eq!(MissingProgramPolicy::parse(" Skip "), Some(MissingProgramPolicy::Skip));
        assert_eq!(MissingProgramPolicy::parse("REJECT"), Some(MissingProgramPolicy::Reject));
        assert_eq!(MissingProgramPolicy::parse("warn"), None);
        assert_eq!(MissingProgramPolicy::parse("fail"), None);
    }

    #[test]
    fn sanitized_clamps_the_list_limit() {
        let policy = PlacementPolicy {
            max_preferences: 99,
            ..PlacementPolicy::default()
        };
        assert_eq!(policy.sanitized().max_preferences, MAX_PREFERENCES);
        let policy = PlacementPolicy {
            max_preferences: 0,
            ..PlacementPolicy::default()
        };
        assert_eq!(policy.sanitized().max_preferences, 1);
    }
}
