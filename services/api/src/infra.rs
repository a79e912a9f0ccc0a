use chrono::NaiveDate;
use dus360::config::PlacementConfig;
use dus360::error::AppError;
use dus360::placement::{
    InMemoryPlacementStore, PeriodId, PlacementError, PlacementService, Program, ProgramCatalog,
    ProgramCatalogImporter, ProgramId, Score, UserId, VerificationProvider, VerificationRecord,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

pub(crate) type ApiService =
    PlacementService<InMemoryPlacementStore, InMemoryPlacementStore, InMemoryPlacementStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) placement: Arc<ApiService>,
}

const SAMPLE_PROGRAMS: [(&str, &str, &str, &str, u32, u32, i32); 8] = [
    ("hac-orto", "Ankara", "Hacettepe Üniversitesi", "Ortodonti", 4, 37, 6840),
    ("ank-endo", "Ankara", "Ankara Üniversitesi", "Endodonti", 6, 41, 6520),
    ("gazi-pro", "Ankara", "Gazi Üniversitesi", "Protetik Diş Tedavisi", 5, 29, 6280),
    ("ist-cerr", "İstanbul", "İstanbul Üniversitesi", "Ağız, Diş ve Çene Cerrahisi", 3, 44, 7010),
    ("mar-pedo", "İstanbul", "Marmara Üniversitesi", "Pedodonti", 4, 33, 6650),
    ("ege-perio", "İzmir", "Ege Üniversitesi", "Periodontoloji", 5, 18, 6010),
    ("ataturk-rest", "Erzurum", "Atatürk Üniversitesi", "Restoratif Diş Tedavisi", 6, 15, 5760),
    ("ondokuz-rad", "Samsun", "Ondokuz Mayıs Üniversitesi", "Ağız, Diş ve Çene Radyolojisi", 3, 12, 5890),
];

const SAMPLE_SCORES: [i32; 12] = [
    7640, 7325, 7110, 6975, 6890, 6715, 6580, 6405, 6230, 6120, 5870, 5540,
];

pub(crate) fn sample_catalog(period: &PeriodId) -> Vec<Program> {
    SAMPLE_PROGRAMS
        .iter()
        .map(
            |&(id, city, university, specialty, spots, applicants, cutoff)| Program {
                id: ProgramId(id.to_string()),
                period_id: period.clone(),
                city: city.to_string(),
                university: university.to_string(),
                specialty: specialty.to_string(),
                spots,
                applicants,
                estimated_cutoff: Score::from_hundredths(cutoff),
                historical_cutoff: Some(Score::from_hundredths(cutoff - 35)),
            },
        )
        .collect()
}

/// Verified population used by the demo and the development server.
pub(crate) fn sample_population(period: &PeriodId, exam_date: NaiveDate) -> Vec<VerificationRecord> {
    let total = SAMPLE_SCORES.len() as u32;
    SAMPLE_SCORES
        .iter()
        .enumerate()
        .map(|(index, score)| VerificationRecord {
            user_id: UserId(format!("sample-{:02}", index + 1)),
            period_id: period.clone(),
            dus_score: Score::from_hundredths(*score),
            exam_date,
            ranking: Some(index as u32 + 1),
            total_candidates: Some(total),
        })
        .collect()
}

pub(crate) fn default_exam_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 16).unwrap_or_default()
}

/// Seeds an in-memory store from configuration: the CSV catalog when configured, the sample
/// catalog otherwise, plus the sample verified population.
pub(crate) fn build_store(config: &PlacementConfig) -> Result<InMemoryPlacementStore, AppError> {
    let store = InMemoryPlacementStore::default();

    let programs = match &config.catalog_csv {
        Some(path) => {
            let programs = ProgramCatalogImporter::from_path(path, &config.period)?;
            info!(path = %path.display(), count = programs.len(), "catalog imported");
            programs
        }
        None => sample_catalog(&config.period),
    };
    store
        .upsert_programs(programs)
        .map_err(PlacementError::from)?;

    for record in sample_population(&config.period, default_exam_date()) {
        store
            .record_verification(record)
            .map_err(PlacementError::from)?;
    }

    Ok(store)
}

pub(crate) fn build_service(config: &PlacementConfig) -> Result<Arc<ApiService>, AppError> {
    let store = Arc::new(build_store(config)?);
    Ok(Arc::new(PlacementService::new(
        store.clone(),
        store.clone(),
        store,
        config.policy,
    )))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_score(raw: &str) -> Result<Score, String> {
    Score::parse(raw).ok_or_else(|| format!("'{raw}' is not a score like 67.50"))
}

pub(crate) fn parse_period(raw: &str) -> Result<PeriodId, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("period must not be empty".to_string());
    }
    Ok(PeriodId(trimmed.to_string()))
}
