use super::domain::{
    EntryId, ListOwner, PeriodId, PreferenceEntry, Program, ProgramId, ScenarioId,
    ScenarioSnapshot, Score, UserId, VerificationRecord,
};

/// Read access to the reference program rows plus the bulk refresh hook used by catalog imports.
pub trait ProgramCatalog: Send + Sync {
    fn program(&self, id: &ProgramId) -> Result<Option<Program>, RepositoryError>;
    fn programs_in_period(&self, period_id: &PeriodId) -> Result<Vec<Program>, RepositoryError>;
    /// Insert or replace rows by id, returning how many rows were written.
    ///
    /// A program belongs to one period: a row whose id is already stored under another period
    /// fails the whole batch with `Constraint`.
    fn upsert_programs(&self, programs: Vec<Program>) -> Result<usize, RepositoryError>;
}

/// Verified exam results produced by the external verification flow.
pub trait VerificationProvider: Send + Sync {
    fn verification(
        &self,
        user_id: &UserId,
        period_id: &PeriodId,
    ) -> Result<Option<VerificationRecord>, RepositoryError>;
    /// Every verified score recorded for the period.
    fn period_scores(&self, period_id: &PeriodId) -> Result<Vec<Score>, RepositoryError>;
    /// Fails with `Conflict` when the (user, period) pair already has a record.
    fn record_verification(&self, record: VerificationRecord) -> Result<(), RepositoryError>;
}

/// Storage for candidate preference lists.
///
/// Implementations must reject inserts that would duplicate a rank or program for the same
/// owner, and must apply `replace_preferences` as a single atomic unit.
pub trait PreferenceRepository: Send + Sync {
    /// Entries for the owner sorted by ascending rank.
    fn preferences(&self, owner: &ListOwner) -> Result<Vec<PreferenceEntry>, RepositoryError>;
    fn preference(&self, id: &EntryId) -> Result<Option<PreferenceEntry>, RepositoryError>;
    fn insert_preference(&self, entry: PreferenceEntry)
        -> Result<PreferenceEntry, RepositoryError>;
    /// Swap the owner's whole list for `entries`.
    ///
    /// Fails with `Conflict` if the stored ids no longer equal `expected`, leaving the list
    /// untouched.
    fn replace_preferences(
        &self,
        owner: &ListOwner,
        expected: &[EntryId],
        entries: Vec<PreferenceEntry>,
    ) -> Result<(), RepositoryError>;
}

/// Storage for immutable scenario snapshots.
pub trait ScenarioRepository: Send + Sync {
    fn insert_scenario(
        &self,
        scenario: ScenarioSnapshot,
    ) -> Result<ScenarioSnapshot, RepositoryError>;
    fn scenario(&self, id: &ScenarioId) -> Result<Option<ScenarioSnapshot>, RepositoryError>;
    /// Scenarios for the owner, oldest first.
    fn scenarios(&self, owner: &ListOwner) -> Result<Vec<ScenarioSnapshot>, RepositoryError>;
    fn delete_scenario(&self, id: &ScenarioId) -> Result<(), RepositoryError>;
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
