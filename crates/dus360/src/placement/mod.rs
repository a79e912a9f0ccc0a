//! Placement probability estimation, ranked preference lists, what-if scenarios, and
//! competitive analytics for DUS candidates.
//!
//! Storage, verification, and catalog data are reached through the traits in
//! [`repository`]; [`memory::InMemoryPlacementStore`] implements all of them for the demo
//! service and tests.

pub mod analytics;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod estimator;
pub mod memory;
pub mod policy;
mod preferences;
pub mod repository;
pub mod risk;
pub mod router;
pub mod scenarios;
pub mod service;

#[cfg(test)]
mod tests;

pub use analytics::{
    AnalyticsData, CandidateStanding, ExpectedPlacement, PreferenceAnalytics, ScoreBandCount,
};
pub use catalog::{CatalogImportError, ProgramCatalogImporter};
pub use domain::{
    EntryId, ListOwner, PeriodId, PreferenceEntry, PreferenceSnapshot, PreferenceView, Program,
    ProgramId, ProgramSummary, RiskLevel, ScenarioId, ScenarioSnapshot, Score, UserId,
    VerificationRecord,
};
pub use error::{PlacementError, Resource};
pub use estimator::{estimate, BandTableError, Estimate, PlacementBand, PlacementEstimator};
pub use memory::InMemoryPlacementStore;
pub use policy::{MissingProgramPolicy, PlacementPolicy, MAX_PREFERENCES};
pub use repository::{
    PreferenceRepository, ProgramCatalog, RepositoryError, ScenarioRepository,
    VerificationProvider,
};
pub use risk::{RiskDistribution, RiskSummary, StrategyVerdict};
pub use router::placement_router;
pub use scenarios::ScenarioApplication;
pub use service::{PlacementService, ProgramFilter};
