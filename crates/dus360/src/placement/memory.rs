use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    EntryId, ListOwner, PeriodId, PreferenceEntry, Program, ProgramId, ScenarioId,
    ScenarioSnapshot, Score, UserId, VerificationRecord,
};
use super::repository::{
    PreferenceRepository, ProgramCatalog, RepositoryError, ScenarioRepository,
    VerificationProvider,
};

/// Process-local store backing the demo service and tests.
///
/// Every operation takes the single state lock, so `replace_preferences` is atomic with respect
/// to every other call.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPlacementStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Default)]
struct StoreState {
    programs: BTreeMap<ProgramId, Program>,
    verifications: HashMap<ListOwner, VerificationRecord>,
    preferences: BTreeMap<EntryId, PreferenceEntry>,
    scenarios: BTreeMap<ScenarioId, ScenarioSnapshot>,
}

impl StoreState {
    fn owned_entries<'a>(
        &'a self,
        owner: &'a ListOwner,
    ) -> impl Iterator<Item = &'a PreferenceEntry> + 'a {
        self.preferences
            .values()
            .filter(move |entry| entry.is_owned_by(owner))
    }
}

impl InMemoryPlacementStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl ProgramCatalog for InMemoryPlacementStore {
    fn program(&self, id: &ProgramId) -> Result<Option<Program>, RepositoryError> {
        Ok(self.lock()?.programs.get(id).cloned())
    }

    fn programs_in_period(&self, period_id: &PeriodId) -> Result<Vec<Program>, RepositoryError> {
        Ok(self
            .lock()?
            .programs
            .values()
            .filter(|program| &program.period_id == period_id)
            .cloned()
            .collect())
    }

    fn upsert_programs(&self, programs: Vec<Program>) -> Result<usize, RepositoryError> {
        if let Some(program) = programs.iter().find(|program| program.spots == 0) {
            return Err(RepositoryError::Constraint(format!(
                "program {} must have at least one spot",
                program.id
            )));
        }

        let mut guard = self.lock()?;
        let moved = programs.iter().find(|program| {
            guard
                .programs
                .get(&program.id)
                .is_some_and(|existing| existing.period_id != program.period_id)
        });
        if let Some(program) = moved {
            return Err(RepositoryError::Constraint(format!(
                "program {} already belongs to another period",
                program.id
            )));
        }

        let written = programs.len();
        for program in programs {
            guard.programs.insert(program.id.clone(), program);
        }
        Ok(written)
    }
}

impl VerificationProvider for InMemoryPlacementStore {
    fn verification(
        &self,
        user_id: &UserId,
        period_id: &PeriodId,
    ) -> Result<Option<VerificationRecord>, RepositoryError> {
        let owner = ListOwner {
            user_id: user_id.clone(),
            period_id: period_id.clone(),
        };
        Ok(self.lock()?.verifications.get(&owner).cloned())
    }

    fn period_scores(&self, period_id: &PeriodId) -> Result<Vec<Score>, RepositoryError> {
        Ok(self
            .lock()?
            .verifications
            .values()
            .filter(|record| &record.period_id == period_id)
            .map(|record| record.dus_score)
            .collect())
    }

    fn record_verification(&self, record: VerificationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let owner = record.owner();
        if guard.verifications.contains_key(&owner) {
            return Err(RepositoryError::Conflict);
        }
        guard.verifications.insert(owner, record);
        Ok(())
    }
}

impl PreferenceRepository for InMemoryPlacementStore {
    fn preferences(&self, owner: &ListOwner) -> Result<Vec<PreferenceEntry>, RepositoryError> {
        let guard = self.lock()?;
        let mut entries: Vec<PreferenceEntry> = guard.owned_entries(owner).cloned().collect();
        entries.sort_by_key(|entry| entry.rank);
        Ok(entries)
    }

    fn preference(&self, id: &EntryId) -> Result<Option<PreferenceEntry>, RepositoryError> {
        Ok(self.lock()?.preferences.get(id).cloned())
    }

    fn insert_preference(
        &self,
        entry: PreferenceEntry,
    ) -> Result<PreferenceEntry, RepositoryError> {
        if entry.rank == 0 {
            return Err(RepositoryError::Constraint(
                "rank must start at 1".to_string(),
            ));
        }

        let mut guard = self.lock()?;
        let owner = entry.owner();
        let collides = guard.preferences.contains_key(&entry.id)
            || guard.owned_entries(&owner).any(|existing| {
                existing.rank == entry.rank || existing.program_id == entry.program_id
            });
        if collides {
            return Err(RepositoryError::Conflict);
        }

        guard.preferences.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    fn replace_preferences(
        &self,
        owner: &ListOwner,
        expected: &[EntryId],
        entries: Vec<PreferenceEntry>,
    ) -> Result<(), RepositoryError> {
        validate_list(owner, &entries)?;

        let mut guard = self.lock()?;
        let current: BTreeSet<EntryId> = guard
            .owned_entries(owner)
            .map(|entry| entry.id.clone())
            .collect();
        let expected: BTreeSet<EntryId> = expected.iter().cloned().collect();
        if current != expected {
            return Err(RepositoryError::Conflict);
        }

        let foreign_id = entries.iter().any(|entry| {
            !current.contains(&entry.id) && guard.preferences.contains_key(&entry.id)
        });
        if foreign_id {
            return Err(RepositoryError::Conflict);
        }

        for id in &current {
            guard.preferences.remove(id);
        }
        for entry in entries {
            guard.preferences.insert(entry.id.clone(), entry);
        }
        Ok(())
    }
}

fn validate_list(owner: &ListOwner, entries: &[PreferenceEntry]) -> Result<(), RepositoryError> {
    let mut ranks = BTreeSet::new();
    let mut programs = BTreeSet::new();

    for entry in entries {
        if !entry.is_owned_by(owner) {
            return Err(RepositoryError::Constraint(format!(
                "entry {} does not belong to {owner}",
                entry.id
            )));
        }
        if !programs.insert(&entry.program_id) {
            return Err(RepositoryError::Constraint(format!(
                "program {} appears twice",
                entry.program_id
            )));
        }
        ranks.insert(entry.rank);
    }

    let contiguous = ranks.len() == entries.len()
        && ranks
            .iter()
            .enumerate()
            .all(|(index, rank)| usize::from(*rank) == index + 1);
    if !contiguous {
        return Err(RepositoryError::Constraint(
            "ranks must be exactly 1..=count".to_string(),
        ));
    }

    Ok(())
}

impl ScenarioRepository for InMemoryPlacementStore {
    fn insert_scenario(
        &self,
        scenario: ScenarioSnapshot,
    ) -> Result<ScenarioSnapshot, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.scenarios.contains_key(&scenario.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.scenarios.insert(scenario.id.clone(), scenario.clone());
        Ok(scenario)
    }

    fn scenario(&self, id: &ScenarioId) -> Result<Option<ScenarioSnapshot>, RepositoryError> {
        Ok(self.lock()?.scenarios.get(id).cloned())
    }

    fn scenarios(&self, owner: &ListOwner) -> Result<Vec<ScenarioSnapshot>, RepositoryError> {
        let guard = self.lock()?;
        let mut scenarios: Vec<ScenarioSnapshot> = guard
            .scenarios
            .values()
            .filter(|scenario| {
                scenario.user_id == owner.user_id && scenario.period_id == owner.period_id
            })
            .cloned()
            .collect();
        scenarios.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(scenarios)
    }

    fn delete_scenario(&self, id: &ScenarioId) -> Result<(), RepositoryError> {
        self.lock()?
            .scenarios
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}
