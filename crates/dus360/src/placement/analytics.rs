//! Read-only analytics over the verified population and a candidate's list.
//!
//! Everything is recomputed from the store on each call; there is no cache to invalidate.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::domain::{
    round_one_decimal, EntryId, ListOwner, PeriodId, PreferenceEntry, Program, ProgramId,
    ProgramSummary, RiskLevel, Score, UserId,
};
use super::error::PlacementError;
use super::estimator::Estimate;
use super::repository::{
    PreferenceRepository, ProgramCatalog, ScenarioRepository, VerificationProvider,
};
use super::risk::{RiskDistribution, RiskSummary};
use super::scenarios::strongest;
use super::service::PlacementService;

struct BandSpec {
    label: &'static str,
    min: i32,
    max: Option<i32>,
}

const SCORE_BANDS: [BandSpec; 5] = [
    BandSpec {
        label: "75+",
        min: 7500,
        max: None,
    },
    BandSpec {
        label: "70-74",
        min: 7000,
        max: Some(7499),
    },
    BandSpec {
        label: "65-69",
        min: 6500,
        max: Some(6999),
    },
    BandSpec {
        label: "60-64",
        min: 6000,
        max: Some(6499),
    },
    BandSpec {
        label: "55-59",
        min: 5500,
        max: Some(5999),
    },
];

/// Candidate position within the period's verified population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateStanding {
    pub score: Score,
    pub rank: usize,
    pub total_candidates: usize,
    pub percentile: f64,
}

/// Histogram bucket over verified scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBandCount {
    pub label: &'static str,
    pub min: Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Score>,
    pub count: usize,
    pub percentage: f64,
}

/// Competitive detail for one preference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceAnalytics {
    pub entry_id: EntryId,
    pub rank: u16,
    pub program: ProgramSummary,
    pub placement_probability: u8,
    pub risk_level: RiskLevel,
    /// Candidate score minus the program's estimated cutoff.
    pub score_gap: f64,
    /// Verified candidates in the period at or above this program's cutoff. This is a
    /// population-wide count, not the program's actual applicant pool.
    pub higher_scored_applicants: usize,
    pub competition_ratio: f64,
}

/// Entry most likely to result in a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectedPlacement {
    pub entry_id: EntryId,
    pub rank: u16,
    pub program_id: ProgramId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_label: Option<String>,
    pub probability: u8,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsData {
    pub user_id: UserId,
    pub period_id: PeriodId,
    pub standing: CandidateStanding,
    pub score_distribution: Vec<ScoreBandCount>,
    pub preferences: Vec<PreferenceAnalytics>,
    pub risk: RiskSummary,
    pub expected_placement: Option<ExpectedPlacement>,
}

/// `rank` is one more than the number of strictly higher scores.
pub fn candidate_standing(score: Score, population: &[Score]) -> CandidateStanding {
    let total = population.len();
    let rank = population.iter().filter(|other| **other > score).count() + 1;
    let percentile = if total == 0 {
        0.0
    } else {
        round_one_decimal(total.saturating_sub(rank) as f64 / total as f64 * 100.0)
    };

    CandidateStanding {
        score,
        rank,
        total_candidates: total,
        percentile,
    }
}

pub fn score_distribution(population: &[Score]) -> Vec<ScoreBandCount> {
    let total = population.len();
    SCORE_BANDS
        .iter()
        .map(|band| {
            let count = population
                .iter()
                .map(|score| score.hundredths())
                .filter(|value| {
                    *value >= band.min && band.max.map_or(true, |max| *value <= max)
                })
                .count();
            let percentage = if total == 0 {
                0.0
            } else {
                round_one_decimal(count as f64 / total as f64 * 100.0)
            };
            ScoreBandCount {
                label: band.label,
                min: Score::from_hundredths(band.min),
                max: band.max.map(Score::from_hundredths),
                count,
                percentage,
            }
        })
        .collect()
}

/// Highest probability wins; the lowest rank breaks ties.
pub fn expected_entry(entries: &[PreferenceEntry]) -> Option<&PreferenceEntry> {
    strongest(entries.iter().map(|entry| {
        let estimate = Estimate {
            probability: entry.placement_probability,
            risk_level: entry.risk_level,
        };
        (usize::from(entry.rank), estimate, entry)
    }))
    .map(|(_, entry)| entry)
}

fn preference_detail(
    candidate: Score,
    entry: &PreferenceEntry,
    program: &Program,
    population: &[Score],
) -> PreferenceAnalytics {
    let gap = Score::from_hundredths(candidate.margin_over(program.estimated_cutoff));
    PreferenceAnalytics {
        entry_id: entry.id.clone(),
        rank: entry.rank,
        program: program.summary(),
        placement_probability: entry.placement_probability,
        risk_level: entry.risk_level,
        score_gap: round_one_decimal(gap.as_decimal()),
        higher_scored_applicants: population
            .iter()
            .filter(|score| **score >= program.estimated_cutoff)
            .count(),
        competition_ratio: program.competition_ratio(),
    }
}

fn detail_rows(
    candidate: Score,
    entries: &[PreferenceEntry],
    programs: &HashMap<ProgramId, Program>,
    population: &[Score],
) -> Vec<PreferenceAnalytics> {
    entries
        .iter()
        .filter_map(|entry| match programs.get(&entry.program_id) {
            Some(program) => Some(preference_detail(candidate, entry, program, population)),
            None => {
                debug!(
                    entry = %entry.id,
                    program = %entry.program_id,
                    "program missing from catalog"
                );
                None
            }
        })
        .collect()
}

fn expected_placement_view(
    entries: &[PreferenceEntry],
    programs: &HashMap<ProgramId, Program>,
) -> Option<ExpectedPlacement> {
    expected_entry(entries).map(|entry| ExpectedPlacement {
        entry_id: entry.id.clone(),
        rank: entry.rank,
        program_id: entry.program_id.clone(),
        program_label: programs.get(&entry.program_id).map(Program::label),
        probability: entry.placement_probability,
        risk_level: entry.risk_level,
    })
}

impl<R, C, V> PlacementService<R, C, V>
where
    R: PreferenceRepository + ScenarioRepository + 'static,
    C: ProgramCatalog + 'static,
    V: VerificationProvider + 'static,
{
    pub fn candidate_standing(
        &self,
        owner: &ListOwner,
    ) -> Result<CandidateStanding, PlacementError> {
        let verification = self.require_verification(owner)?;
        let population = self.verifications.period_scores(&owner.period_id)?;
        Ok(candidate_standing(verification.dus_score, &population))
    }

    pub fn score_distribution(
        &self,
        period_id: &PeriodId,
    ) -> Result<Vec<ScoreBandCount>, PlacementError> {
        let population = self.verifications.period_scores(period_id)?;
        Ok(score_distribution(&population))
    }

    /// Per-entry competitive detail. Entries whose program has left the catalog are omitted.
    pub fn preference_analytics(
        &self,
        owner: &ListOwner,
    ) -> Result<Vec<PreferenceAnalytics>, PlacementError> {
        let verification = self.require_verification(owner)?;
        let population = self.verifications.period_scores(&owner.period_id)?;
        let entries = self.repository.preferences(owner)?;
        let programs = self.programs_by_id(&owner.period_id)?;
        Ok(detail_rows(
            verification.dus_score,
            &entries,
            &programs,
            &population,
        ))
    }

    pub fn expected_placement(
        &self,
        owner: &ListOwner,
    ) -> Result<Option<ExpectedPlacement>, PlacementError> {
        let entries = self.repository.preferences(owner)?;
        let programs = self.programs_by_id(&owner.period_id)?;
        Ok(expected_placement_view(&entries, &programs))
    }

    /// Full dashboard payload for one candidate and period.
    pub fn analytics(&self, owner: &ListOwner) -> Result<AnalyticsData, PlacementError> {
        let verification = self.require_verification(owner)?;
        let population = self.verifications.period_scores(&owner.period_id)?;
        let entries = self.repository.preferences(owner)?;
        let programs = self.programs_by_id(&owner.period_id)?;

        let standing = candidate_standing(verification.dus_score, &population);
        debug!(
            %owner,
            rank = standing.rank,
            total = standing.total_candidates,
            "analytics computed"
        );

        Ok(AnalyticsData {
            user_id: owner.user_id.clone(),
            period_id: owner.period_id.clone(),
            standing,
            score_distribution: score_distribution(&population),
            preferences: detail_rows(
                verification.dus_score,
                &entries,
                &programs,
                &population,
            ),
            risk: RiskSummary::from(RiskDistribution::from_entries(&entries)),
            expected_placement: expected_placement_view(&entries, &programs),
        })
    }
}
