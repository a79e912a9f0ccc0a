use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::domain::{
    EntryId, ListOwner, PeriodId, PreferenceEntry, PreferenceView, Program, ProgramId,
    ScenarioId, Score, VerificationRecord,
};
use super::error::{PlacementError, Resource};
use super::estimator::{Estimate, PlacementEstimator};
use super::policy::PlacementPolicy;
use super::repository::{
    PreferenceRepository, ProgramCatalog, ScenarioRepository, VerificationProvider,
};

/// Service composing the estimator with the candidate store, program catalog, and
/// verification source.
pub struct PlacementService<R, C, V> {
    pub(super) repository: Arc<R>,
    pub(super) catalog: Arc<C>,
    pub(super) verifications: Arc<V>,
    pub(super) estimator: PlacementEstimator,
    pub(super) policy: PlacementPolicy,
}

static ENTRY_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static SCENARIO_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(super) fn next_entry_id() -> EntryId {
    let id = ENTRY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EntryId(format!("pref-{id:06}"))
}

pub(super) fn next_scenario_id() -> ScenarioId {
    let id = SCENARIO_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ScenarioId(format!("scn-{id:06}"))
}

/// Case-insensitive substring filters for catalog search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProgramFilter {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub university: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
}

impl ProgramFilter {
    fn matches(&self, program: &Program) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle.as_deref().map(str::trim) {
                Some(needle) if !needle.is_empty() => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => true,
            }
        }

        contains(&program.city, &self.city)
            && contains(&program.university, &self.university)
            && contains(&program.specialty, &self.specialty)
    }
}

impl<R, C, V> PlacementService<R, C, V>
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    pub fn new(
        repository: Arc<R>,
        catalog: Arc<C>,
        verifications: Arc<V>,
        policy: PlacementPolicy,
    ) -> Self {
        Self::with_estimator(
            repository,
            catalog,
            verifications,
            policy,
            PlacementEstimator::standard(),
        )
    }

    pub fn with_estimator(
        repository: Arc<R>,
        catalog: Arc<C>,
        verifications: Arc<V>,
        policy: PlacementPolicy,
        estimator: PlacementEstimator,
    ) -> Self {
        Self {
            repository,
            catalog,
            verifications,
            estimator,
            policy: policy.sanitized(),
        }
    }

    pub fn policy(&self) -> PlacementPolicy {
        self.policy
    }

    pub fn estimate(&self, user_score: Score, program_cutoff: Score) -> Estimate {
        self.estimator.estimate(user_score, program_cutoff)
    }

    /// Programs in the period matching the filter, most competitive cutoff first.
    pub fn search_programs(
        &self,
        period_id: &PeriodId,
        filter: &ProgramFilter,
    ) -> Result<Vec<Program>, PlacementError> {
        let mut programs: Vec<Program> = self
            .catalog
            .programs_in_period(period_id)?
            .into_iter()
            .filter(|program| filter.matches(program))
            .collect();
        programs.sort_by(|a, b| {
            b.estimated_cutoff
                .cmp(&a.estimated_cutoff)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(programs)
    }

    /// Bulk refresh of catalog rows (applicants, cutoffs, new programs).
    pub fn refresh_catalog(&self, programs: Vec<Program>) -> Result<usize, PlacementError> {
        let written = self.catalog.upsert_programs(programs)?;
        info!(written, "program catalog refreshed");
        Ok(written)
    }

    pub(super) fn require_verification(
        &self,
        owner: &ListOwner,
    ) -> Result<VerificationRecord, PlacementError> {
        self.verifications
            .verification(&owner.user_id, &owner.period_id)?
            .ok_or_else(|| PlacementError::NotVerified(owner.period_id.clone()))
    }

    pub(super) fn program_in_period(
        &self,
        program_id: &ProgramId,
        period_id: &PeriodId,
    ) -> Result<Program, PlacementError> {
        self.catalog
            .program(program_id)?
            .filter(|program| &program.period_id == period_id)
            .ok_or_else(|| PlacementError::NotFound(Resource::Program(program_id.clone())))
    }

    pub(super) fn programs_by_id(
        &self,
        period_id: &PeriodId,
    ) -> Result<HashMap<ProgramId, Program>, PlacementError> {
        Ok(self
            .catalog
            .programs_in_period(period_id)?
            .into_iter()
            .map(|program| (program.id.clone(), program))
            .collect())
    }

    pub(super) fn view(
        entry: PreferenceEntry,
        programs: &HashMap<ProgramId, Program>,
    ) -> PreferenceView {
        let program = programs.get(&entry.program_id).map(Program::summary);
        PreferenceView { entry, program }
    }
}
