use std::cmp::Reverse;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    ListOwner, PreferenceEntry, PreferenceSnapshot, PreferenceView, ProgramId, ScenarioId,
    ScenarioSnapshot, UserId,
};
use super::error::{PlacementError, Resource};
use super::estimator::Estimate;
use super::policy::MissingProgramPolicy;
use super::preferences::{entry_ids, renumber};
use super::repository::{
    PreferenceRepository, ProgramCatalog, ScenarioRepository, VerificationProvider,
};
use super::service::{next_entry_id, next_scenario_id, PlacementService};

const COPY_SUFFIX: &str = " (copy)";

/// Result of restoring a live list from a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioApplication {
    pub scenario_id: ScenarioId,
    pub preferences: Vec<PreferenceView>,
    /// Snapshotted programs that no longer exist in the catalog and were left out.
    pub skipped: Vec<ProgramId>,
}

/// Best candidate among estimated picks: highest probability, then earliest position.
pub(super) fn strongest<T>(
    candidates: impl IntoIterator<Item = (usize, Estimate, T)>,
) -> Option<(Estimate, T)> {
    candidates
        .into_iter()
        .max_by_key(|(position, estimate, _)| (estimate.probability, Reverse(*position)))
        .map(|(_, estimate, value)| (estimate, value))
}

impl<R, C, V> PlacementService<R, C, V>
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    /// Snapshot the owner's current list under a name.
    pub fn create_scenario(
        &self,
        owner: &ListOwner,
        name: &str,
        description: Option<String>,
    ) -> Result<ScenarioSnapshot, PlacementError> {
        let entries = self.repository.preferences(owner)?;
        if entries.is_empty() {
            return Err(PlacementError::EmptyPreferenceList);
        }
        let verification = self.require_verification(owner)?;
        let programs = self.programs_by_id(&owner.period_id)?;

        let snapshot: PreferenceSnapshot = entries
            .iter()
            .map(|entry| entry.program_id.clone())
            .collect();

        let expected = strongest(snapshot.iter().enumerate().filter_map(|(position, id)| {
            programs.get(id).map(|program| {
                let estimate = self
                    .estimator
                    .estimate(verification.dus_score, program.estimated_cutoff);
                (position, estimate, program.label())
            })
        }));

        let name = match name.trim() {
            "" => {
                let existing = self.repository.scenarios(owner)?.len();
                format!("Scenario {}", existing + 1)
            }
            trimmed => trimmed.to_string(),
        };

        let scenario = ScenarioSnapshot {
            id: next_scenario_id(),
            user_id: owner.user_id.clone(),
            period_id: owner.period_id.clone(),
            name,
            description: description.filter(|text| !text.trim().is_empty()),
            preference_count: snapshot.len(),
            preference_snapshot: snapshot,
            expected_probability: expected.as_ref().map(|(estimate, _)| estimate.probability),
            expected_placement: expected.map(|(_, label)| label),
            created_at: Utc::now(),
        };

        let stored = self.repository.insert_scenario(scenario)?;
        info!(%owner, scenario = %stored.id, count = stored.preference_count, "scenario created");
        Ok(stored)
    }

    /// Replace the owner's live list with the scenario's programs, re-estimated against
    /// current cutoffs. The scenario itself is never modified.
    pub fn apply_scenario(
        &self,
        requester: &UserId,
        scenario_id: &ScenarioId,
    ) -> Result<ScenarioApplication, PlacementError> {
        let scenario = self.owned_scenario(requester, scenario_id)?;
        let owner = scenario.owner();
        let verification = self.require_verification(&owner)?;
        let programs = self.programs_by_id(&owner.period_id)?;

        let mut skipped = Vec::new();
        let mut rebuilt = Vec::with_capacity(scenario.preference_snapshot.len());
        for program_id in &scenario.preference_snapshot {
            let Some(program) = programs.get(program_id) else {
                skipped.push(program_id.clone());
                continue;
            };
            let estimate = self
                .estimator
                .estimate(verification.dus_score, program.estimated_cutoff);
            rebuilt.push(PreferenceEntry {
                id: next_entry_id(),
                user_id: owner.user_id.clone(),
                period_id: owner.period_id.clone(),
                program_id: program_id.clone(),
                rank: 0,
                placement_probability: estimate.probability,
                risk_level: estimate.risk_level,
                created_at: Utc::now(),
            });
        }

        if !skipped.is_empty() {
            if self.policy.missing_programs == MissingProgramPolicy::Reject {
                return Err(PlacementError::MissingPrograms(skipped));
            }
            warn!(
                %owner,
                scenario = %scenario_id,
                skipped = ?skipped,
                "scenario references programs missing from the catalog; skipping them"
            );
        }

        if rebuilt.len() > self.policy.max_preferences {
            return Err(PlacementError::QuotaExceeded {
                limit: self.policy.max_preferences,
            });
        }

        let current = self.repository.preferences(&owner)?;
        let rebuilt = renumber(rebuilt);
        self.repository
            .replace_preferences(&owner, &entry_ids(&current), rebuilt.clone())?;

        info!(
            %owner,
            scenario = %scenario_id,
            restored = rebuilt.len(),
            skipped = skipped.len(),
            "scenario applied"
        );

        Ok(ScenarioApplication {
            scenario_id: scenario_id.clone(),
            preferences: rebuilt
                .into_iter()
                .map(|entry| Self::view(entry, &programs))
                .collect(),
            skipped,
        })
    }

    /// Copy a scenario under a suffixed name; the copy has its own lifecycle.
    pub fn duplicate_scenario(
        &self,
        requester: &UserId,
        scenario_id: &ScenarioId,
    ) -> Result<ScenarioSnapshot, PlacementError> {
        let original = self.owned_scenario(requester, scenario_id)?;
        let copy = ScenarioSnapshot {
            id: next_scenario_id(),
            name: format!("{}{COPY_SUFFIX}", original.name),
            created_at: Utc::now(),
            ..original
        };

        let stored = self.repository.insert_scenario(copy)?;
        info!(source = %scenario_id, scenario = %stored.id, "scenario duplicated");
        Ok(stored)
    }

    pub fn delete_scenario(
        &self,
        requester: &UserId,
        scenario_id: &ScenarioId,
    ) -> Result<(), PlacementError> {
        self.owned_scenario(requester, scenario_id)?;
        self.repository.delete_scenario(scenario_id)?;
        info!(scenario = %scenario_id, "scenario deleted");
        Ok(())
    }

    pub fn scenarios(&self, owner: &ListOwner) -> Result<Vec<ScenarioSnapshot>, PlacementError> {
        Ok(self.repository.scenarios(owner)?)
    }

    pub fn scenario(
        &self,
        requester: &UserId,
        scenario_id: &ScenarioId,
    ) -> Result<ScenarioSnapshot, PlacementError> {
        self.owned_scenario(requester, scenario_id)
    }

    fn owned_scenario(
        &self,
        requester: &UserId,
        scenario_id: &ScenarioId,
    ) -> Result<ScenarioSnapshot, PlacementError> {
        let scenario = self
            .repository
            .scenario(scenario_id)?
            .ok_or_else(|| PlacementError::NotFound(Resource::Scenario(scenario_id.clone())))?;
        if &scenario.user_id != requester {
            return Err(PlacementError::Forbidden(Resource::Scenario(
                scenario_id.clone(),
            )));
        }
        Ok(scenario)
    }
}
