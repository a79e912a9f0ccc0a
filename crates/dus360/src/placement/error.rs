use std::fmt;

use super::domain::{EntryId, PeriodId, ProgramId, ScenarioId};
use super::repository::RepositoryError;

/// Entity referenced by a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Program(ProgramId),
    Preference(EntryId),
    Scenario(ScenarioId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Program(id) => write!(f, "program {id}"),
            Resource::Preference(id) => write!(f, "preference {id}"),
            Resource::Scenario(id) => write!(f, "scenario {id}"),
        }
    }
}

/// Error raised by placement operations. Every variant except `Repository` is
/// user-correctable.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error("no verified exam score for period {0}")]
    NotVerified(PeriodId),
    #[error("preference list already holds the maximum of {limit} programs")]
    QuotaExceeded { limit: usize },
    #[error("program {0} is already in the preference list")]
    DuplicateProgram(ProgramId),
    #[error("{0} not found")]
    NotFound(Resource),
    #[error("{0} belongs to another candidate")]
    Forbidden(Resource),
    #[error("cannot create a scenario from an empty preference list")]
    EmptyPreferenceList,
    #[error("invalid ordering: {0}")]
    InvalidOrdering(String),
    #[error("scenario references programs that no longer exist: {}", join_ids(.0))]
    MissingPrograms(Vec<ProgramId>),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn join_ids(ids: &[ProgramId]) -> String {
    ids.iter()
        .map(|id| id.0.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
