use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::placement::domain::{
    EntryId, ListOwner, PeriodId, PreferenceEntry, Program, ProgramId, RiskLevel, ScenarioId,
    ScenarioSnapshot, Score, UserId, VerificationRecord,
};
use crate::placement::memory::InMemoryPlacementStore;
use crate::placement::policy::PlacementPolicy;
use crate::placement::repository::{
    PreferenceRepository, ProgramCatalog, RepositoryError, ScenarioRepository,
    VerificationProvider,
};
use crate::placement::router::placement_router;
use crate::placement::service::PlacementService;

pub(super) type MemoryService =
    PlacementService<InMemoryPlacementStore, InMemoryPlacementStore, InMemoryPlacementStore>;

pub(super) const PERIOD: &str = "2025-spring";
pub(super) const CANDIDATE: &str = "cand-1";
pub(super) const RIVAL: &str = "cand-2";
pub(super) const UNVERIFIED: &str = "cand-unverified";

pub(super) fn period() -> PeriodId {
    PeriodId(PERIOD.to_string())
}

pub(super) fn owner() -> ListOwner {
    ListOwner::new(CANDIDATE, PERIOD)
}

pub(super) fn rival() -> ListOwner {
    ListOwner::new(RIVAL, PERIOD)
}

pub(super) fn candidate() -> UserId {
    UserId(CANDIDATE.to_string())
}

pub(super) fn program_id(id: &str) -> ProgramId {
    ProgramId(id.to_string())
}

pub(super) fn program(id: &str, university: &str, specialty: &str, cutoff: i32) -> Program {
    Program {
        id: program_id(id),
        period_id: period(),
        city: "Ankara".to_string(),
        university: university.to_string(),
        specialty: specialty.to_string(),
        spots: 4,
        applicants: 36,
        estimated_cutoff: Score::from_hundredths(cutoff),
        historical_cutoff: None,
    }
}

/// Against the 67.50 candidate: hac-orto 85/high, ank-endo 85/high, ege-perio 95/safe,
/// ist-cerr 65/medium, mar-pedo 35/low.
pub(super) fn catalog() -> Vec<Program> {
    let mut programs = vec![
        program("hac-orto", "Hacettepe Üniversitesi", "Ortodonti", 6520),
        program("ank-endo", "Ankara Üniversitesi", "Endodonti", 6280),
        program("ege-perio", "Ege Üniversitesi", "Periodontoloji", 6000),
        program("ist-cerr", "İstanbul Üniversitesi", "Ağız Cerrahisi", 6800),
        program("mar-pedo", "Marmara Üniversitesi", "Pedodonti", 7100),
    ];
    programs.extend(
        (1..=31).map(|index| program(&format!("bulk-{index:02}"), "Bulk", "Protez", 5500)),
    );
    programs.push(Program {
        period_id: PeriodId("2024-autumn".to_string()),
        ..program("old-orto", "Gazi Üniversitesi", "Ortodonti", 6400)
    });
    programs
}

pub(super) fn verification(user: &str, score: i32) -> VerificationRecord {
    VerificationRecord {
        user_id: UserId(user.to_string()),
        period_id: period(),
        dus_score: Score::from_hundredths(score),
        exam_date: NaiveDate::from_ymd_opt(2025, 3, 16).expect("valid date"),
        ranking: None,
        total_candidates: None,
    }
}

pub(super) fn seeded_store() -> InMemoryPlacementStore {
    let store = InMemoryPlacementStore::default();
    store.upsert_programs(catalog()).expect("catalog seeds");
    for (user, score) in [
        (CANDIDATE, 6750),
        (RIVAL, 7200),
        ("cand-3", 6100),
        ("cand-4", 5825),
    ] {
        store
            .record_verification(verification(user, score))
            .expect("verification seeds");
    }
    store
}

pub(super) fn build_service_with_policy(
    policy: PlacementPolicy,
) -> (MemoryService, Arc<InMemoryPlacementStore>) {
    let store = Arc::new(seeded_store());
    let service = PlacementService::new(store.clone(), store.clone(), store.clone(), policy);
    (service, store)
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryPlacementStore>) {
    build_service_with_policy(PlacementPolicy::default())
}

/// Adds the given programs to the candidate's list in order.
pub(super) fn add_all(service: &MemoryService, owner: &ListOwner, ids: &[&str]) -> Vec<EntryId> {
    ids.iter()
        .map(|id| {
            service
                .add_preference(owner, &program_id(id))
                .expect("preference added")
                .entry
                .id
        })
        .collect()
}

pub(super) fn ranked_programs(service: &MemoryService, owner: &ListOwner) -> Vec<(u16, String)> {
    service
        .preferences(owner)
        .expect("list")
        .into_iter()
        .map(|view| (view.entry.rank, view.entry.program_id.0))
        .collect()
}

pub(super) fn placement_router_with_service(service: MemoryService) -> axum::Router {
    placement_router(Arc::new(service))
}

/// Preference and scenario storage that is always offline.
pub(super) struct UnavailableStore;

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl PreferenceRepository for UnavailableStore {
    fn preferences(&self, _owner: &ListOwner) -> Result<Vec<PreferenceEntry>, RepositoryError> {
        Err(offline())
    }

    fn preference(&self, _id: &EntryId) -> Result<Option<PreferenceEntry>, RepositoryError> {
        Err(offline())
    }

    fn insert_preference(
        &self,
        _entry: PreferenceEntry,
    ) -> Result<PreferenceEntry, RepositoryError> {
        Err(offline())
    }

    fn replace_preferences(
        &self,
        _owner: &ListOwner,
        _expected: &[EntryId],
        _entries: Vec<PreferenceEntry>,
    ) -> Result<(), RepositoryError> {
        Err(offline())
    }
}

impl ScenarioRepository for UnavailableStore {
    fn insert_scenario(
        &self,
        _scenario: ScenarioSnapshot,
    ) -> Result<ScenarioSnapshot, RepositoryError> {
        Err(offline())
    }

    fn scenario(&self, _id: &ScenarioId) -> Result<Option<ScenarioSnapshot>, RepositoryError> {
        Err(offline())
    }

    fn scenarios(&self, _owner: &ListOwner) -> Result<Vec<ScenarioSnapshot>, RepositoryError> {
        Err(offline())
    }

    fn delete_scenario(&self, _id: &ScenarioId) -> Result<(), RepositoryError> {
        Err(offline())
    }
}

pub(super) fn unavailable_service(
) -> PlacementService<UnavailableStore, InMemoryPlacementStore, InMemoryPlacementStore> {
    let store = Arc::new(seeded_store());
    PlacementService::new(
        Arc::new(UnavailableStore),
        store.clone(),
        store,
        PlacementPolicy::default(),
    )
}

/// Preference storage where another writer commits `pending` just before this service's next
/// insert or replace lands.
pub(super) struct RacingStore {
    inner: Arc<InMemoryPlacementStore>,
    pending: Mutex<Option<PreferenceEntry>>,
}

impl RacingStore {
    pub(super) fn arm(&self, entry: PreferenceEntry) {
        *self.pending.lock().expect("pending mutex") = Some(entry);
    }

    fn commit_pending(&self) {
        let pending = self.pending.lock().expect("pending mutex").take();
        if let Some(entry) = pending {
            self.inner
                .insert_preference(entry)
                .expect("competing write lands");
        }
    }
}

impl PreferenceRepository for RacingStore {
    fn preferences(&self, owner: &ListOwner) -> Result<Vec<PreferenceEntry>, RepositoryError> {
        self.inner.preferences(owner)
    }

    fn preference(&self, id: &EntryId) -> Result<Option<PreferenceEntry>, RepositoryError> {
        self.inner.preference(id)
    }

    fn insert_preference(
        &self,
        entry: PreferenceEntry,
    ) -> Result<PreferenceEntry, RepositoryError> {
        self.commit_pending();
        self.inner.insert_preference(entry)
    }

    fn replace_preferences(
        &self,
        owner: &ListOwner,
        expected: &[EntryId],
        entries: Vec<PreferenceEntry>,
    ) -> Result<(), RepositoryError> {
        self.commit_pending();
        self.inner.replace_preferences(owner, expected, entries)
    }
}

impl ScenarioRepository for RacingStore {
    fn insert_scenario(
        &self,
        scenario: ScenarioSnapshot,
    ) -> Result<ScenarioSnapshot, RepositoryError> {
        self.inner.insert_scenario(scenario)
    }

    fn scenario(&self, id: &ScenarioId) -> Result<Option<ScenarioSnapshot>, RepositoryError> {
        self.inner.scenario(id)
    }

    fn scenarios(&self, owner: &ListOwner) -> Result<Vec<ScenarioSnapshot>, RepositoryError> {
        self.inner.scenarios(owner)
    }

    fn delete_scenario(&self, id: &ScenarioId) -> Result<(), RepositoryError> {
        self.inner.delete_scenario(id)
    }
}

pub(super) type RacingService =
    PlacementService<RacingStore, InMemoryPlacementStore, InMemoryPlacementStore>;

pub(super) fn racing_service() -> (RacingService, Arc<RacingStore>) {
    let store = Arc::new(seeded_store());
    let racing = Arc::new(RacingStore {
        inner: store.clone(),
        pending: Mutex::new(None),
    });
    let service = PlacementService::new(
        racing.clone(),
        store.clone(),
        store,
        PlacementPolicy::default(),
    );
    (service, racing)
}

/// Entry for the default candidate as another writer would store it.
pub(super) fn competing_entry(id: &str, program: &str, rank: u16) -> PreferenceEntry {
    PreferenceEntry {
        id: EntryId(id.to_string()),
        user_id: candidate(),
        period_id: period(),
        program_id: program_id(program),
        rank,
        placement_probability: 85,
        risk_level: RiskLevel::High,
        created_at: Utc::now(),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
