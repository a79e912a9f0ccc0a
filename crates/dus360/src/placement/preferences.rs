use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{EntryId, ListOwner, PreferenceEntry, PreferenceView, ProgramId, UserId};
use super::error::{PlacementError, Resource};
use super::repository::{
    PreferenceRepository, ProgramCatalog, RepositoryError, ScenarioRepository,
    VerificationProvider,
};
use super::service::{next_entry_id, PlacementService};

impl<R, C, V> PlacementService<R, C, V>
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    /// Ranked list for the owner with program detail.
    pub fn preferences(&self, owner: &ListOwner) -> Result<Vec<PreferenceView>, PlacementError> {
        let entries = self.repository.preferences(owner)?;
        let programs = self.programs_by_id(&owner.period_id)?;
        Ok(entries
            .into_iter()
            .map(|entry| Self::view(entry, &programs))
            .collect())
    }

    /// Append a program to the end of the owner's list.
    pub fn add_preference(
        &self,
        owner: &ListOwner,
        program_id: &ProgramId,
    ) -> Result<PreferenceView, PlacementError> {
        let verification = self.require_verification(owner)?;
        let current = self.repository.preferences(owner)?;

        if current.len() >= self.policy.max_preferences {
            return Err(PlacementError::QuotaExceeded {
                limit: self.policy.max_preferences,
            });
        }
        if current.iter().any(|entry| &entry.program_id == program_id) {
            return Err(PlacementError::DuplicateProgram(program_id.clone()));
        }

        let program = self.program_in_period(program_id, &owner.period_id)?;
        let estimate = self
            .estimator
            .estimate(verification.dus_score, program.estimated_cutoff);

        let entry = PreferenceEntry {
            id: next_entry_id(),
            user_id: owner.user_id.clone(),
            period_id: owner.period_id.clone(),
            program_id: program_id.clone(),
            rank: next_rank(current.len()),
            placement_probability: estimate.probability,
            risk_level: estimate.risk_level,
            created_at: Utc::now(),
        };

        let stored = match self.repository.insert_preference(entry) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                // Lost a race with another add for the same owner.
                let latest = self.repository.preferences(owner)?;
                if latest.iter().any(|entry| &entry.program_id == program_id) {
                    return Err(PlacementError::DuplicateProgram(program_id.clone()));
                }
                return Err(RepositoryError::Conflict.into());
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            %owner,
            program = %program_id,
            rank = stored.rank,
            probability = stored.placement_probability,
            risk = stored.risk_level.label(),
            "preference added"
        );

        Ok(PreferenceView {
            entry: stored,
            program: Some(program.summary()),
        })
    }

    /// Delete an entry and close the rank gap it leaves behind.
    pub fn remove_preference(
        &self,
        requester: &UserId,
        entry_id: &EntryId,
    ) -> Result<(), PlacementError> {
        let target = self
            .repository
            .preference(entry_id)?
            .ok_or_else(|| PlacementError::NotFound(Resource::Preference(entry_id.clone())))?;
        if &target.user_id != requester {
            return Err(PlacementError::Forbidden(Resource::Preference(
                entry_id.clone(),
            )));
        }

        let owner = target.owner();
        let current = self.repository.preferences(&owner)?;
        if !current.iter().any(|entry| &entry.id == entry_id) {
            return Err(PlacementError::NotFound(Resource::Preference(
                entry_id.clone(),
            )));
        }

        let expected = entry_ids(&current);
        let remaining = renumber(current.into_iter().filter(|entry| &entry.id != entry_id));
        let count = remaining.len();
        self.repository
            .replace_preferences(&owner, &expected, remaining)?;

        info!(%owner, entry = %entry_id, remaining = count, "preference removed");
        Ok(())
    }

    /// Assign `rank = position + 1` following `ordered`, which must list every entry exactly once.
    pub fn reorder_preferences(
        &self,
        owner: &ListOwner,
        ordered: &[EntryId],
    ) -> Result<Vec<PreferenceView>, PlacementError> {
        let current = self.repository.preferences(owner)?;
        let expected = entry_ids(&current);
        let mut by_id: HashMap<EntryId, PreferenceEntry> = current
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();

        let mut seen = HashSet::new();
        for id in ordered {
            if !seen.insert(id) {
                return Err(PlacementError::InvalidOrdering(format!(
                    "entry {id} listed more than once"
                )));
            }
            if !by_id.contains_key(id) {
                return Err(PlacementError::NotFound(Resource::Preference(id.clone())));
            }
        }
        if ordered.len() != by_id.len() {
            return Err(PlacementError::InvalidOrdering(format!(
                "expected {} entries, received {}",
                by_id.len(),
                ordered.len()
            )));
        }

        let reordered = renumber(ordered.iter().filter_map(|id| by_id.remove(id)));
        self.repository
            .replace_preferences(owner, &expected, reordered)?;

        debug!(%owner, count = ordered.len(), "preferences reordered");
        self.preferences(owner)
    }
}

fn next_rank(count: usize) -> u16 {
    u16::try_from(count + 1).unwrap_or(u16::MAX)
}

pub(super) fn entry_ids(entries: &[PreferenceEntry]) -> Vec<EntryId> {
    entries.iter().map(|entry| entry.id.clone()).collect()
}

/// Re-index entries `1..=n` in iteration order.
pub(super) fn renumber<I>(entries: I) -> Vec<PreferenceEntry>
where
    I: IntoIterator<Item = PreferenceEntry>,
{
    entries
        .into_iter()
        .enumerate()
        .map(|(index, mut entry)| {
            entry.rank = next_rank(index);
            entry
        })
        .collect()
}
