use super::common::*;

use crate::placement::domain::{ListOwner, PeriodId, RiskLevel, Score};
use crate::placement::error::PlacementError;
use crate::placement::estimator::estimate;
use crate::placement::risk::StrategyVerdict;
use crate::placement::service::ProgramFilter;

#[test]
fn standing_places_candidate_within_verified_population() {
    let (service, _) = build_service();

    let standing = service.candidate_standing(&owner()).expect("standing");
    assert_eq!(standing.score, Score::from_hundredths(6750));
    assert_eq!(standing.rank, 2);
    assert_eq!(standing.total_candidates, 4);
    assert_eq!(standing.percentile, 50.0);
}

#[test]
fn analytics_bundles_every_view() {
    let (service, _) = build_service();
    add_all(&service, &owner(), &["mar-pedo", "hac-orto", "ege-perio"]);

    let data = service.analytics(&owner()).expect("analytics");

    assert_eq!(data.standing.rank, 2);
    let counts: Vec<usize> = data
        .score_distribution
        .iter()
        .map(|band| band.count)
        .collect();
    assert_eq!(counts, vec![0, 1, 1, 1, 1]);
    assert_eq!(data.score_distribution[1].percentage, 25.0);

    assert_eq!(data.preferences.len(), 3);
    let pedo = &data.preferences[0];
    assert_eq!(pedo.rank, 1);
    assert_eq!(pedo.score_gap, -3.5);
    assert_eq!(pedo.higher_scored_applicants, 1);
    assert_eq!(pedo.competition_ratio, 9.0);
    let perio = &data.preferences[2];
    assert_eq!(perio.score_gap, 7.5);
    assert_eq!(perio.higher_scored_applicants, 3);

    assert_eq!(data.risk.total, 3);
    assert_eq!(data.risk.verdict, StrategyVerdict::AddMorePreferences);

    let expected = data.expected_placement.expect("expected placement");
    assert_eq!(expected.program_id, program_id("ege-perio"));
    assert_eq!(expected.probability, 95);
    assert_eq!(expected.risk_level, RiskLevel::Safe);
    assert_eq!(
        expected.program_label.as_deref(),
        Some("Ege Üniversitesi - Periodontoloji")
    );
}

#[test]
fn expected_placement_prefers_lowest_rank_on_ties() {
    let (service, _) = build_service();
    add_all(&service, &owner(), &["ist-cerr", "hac-orto", "ank-endo"]);

    let expected = service
        .expected_placement(&owner())
        .expect("expected placement")
        .expect("non-empty list");
    assert_eq!(expected.rank, 2);
    assert_eq!(expected.program_id, program_id("hac-orto"));
}

#[test]
fn expected_placement_is_absent_for_empty_lists() {
    let (service, _) = build_service();
    assert!(service
        .expected_placement(&owner())
        .expect("expected placement")
        .is_none());
}

#[test]
fn analytics_requires_a_verified_score() {
    let (service, _) = build_service();
    let error = service
        .analytics(&ListOwner::new(UNVERIFIED, PERIOD))
        .expect_err("unverified candidate rejected");
    assert!(matches!(error, PlacementError::NotVerified(_)));
}

#[test]
fn score_distribution_is_empty_for_unknown_periods() {
    let (service, _) = build_service();
    let bands = service
        .score_distribution(&PeriodId("1999-spring".to_string()))
        .expect("distribution");
    assert_eq!(bands.len(), 5);
    assert!(bands.iter().all(|band| band.count == 0 && band.percentage == 0.0));
}

#[test]
fn estimator_reference_cases() {
    let candidate = Score::parse("67.50").expect("score");
    for (cutoff, probability, risk) in [
        ("65.20", 85, RiskLevel::High),
        ("62.80", 85, RiskLevel::High),
        ("62.50", 95, RiskLevel::Safe),
        ("62.51", 85, RiskLevel::High),
        ("68.50", 65, RiskLevel::Medium),
        ("68.51", 35, RiskLevel::Low),
    ] {
        let result = estimate(candidate, Score::parse(cutoff).expect("cutoff"));
        assert_eq!(
            (result.probability, result.risk_level),
            (probability, risk),
            "cutoff {cutoff}"
        );
    }
}

#[test]
fn search_filters_case_insensitively_and_sorts_by_cutoff() {
    let (service, _) = build_service();
    let filter = ProgramFilter {
        university: Some("üniversitesi".to_string()),
        specialty: Some("DONTI".to_string()),
        ..ProgramFilter::default()
    };

    let ids: Vec<String> = service
        .search_programs(&period(), &filter)
        .expect("search")
        .into_iter()
        .map(|program| program.id.0)
        .collect();
    assert_eq!(ids, vec!["mar-pedo", "hac-orto", "ank-endo"]);
}
