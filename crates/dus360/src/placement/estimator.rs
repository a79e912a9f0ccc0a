//! Four-tier placement banding.
//!
//! The candidate's margin over a program cutoff is matched against an ordered band table,
//! top-down. Margins are compared in hundredths so boundaries are exact: a margin of exactly
//! 5.00 lands in the safe band while 4.99 does not.

use serde::{Deserialize, Serialize};

use super::domain::{RiskLevel, Score};

/// Probability and risk tier for one (candidate score, cutoff) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub probability: u8,
    pub risk_level: RiskLevel,
}

/// One row of the band table. `floor` is the minimum margin in hundredths; `None` matches
/// everything and must terminate the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementBand {
    pub floor: Option<i32>,
    pub probability: u8,
    pub risk_level: RiskLevel,
}

const STANDARD_BANDS: [PlacementBand; 4] = [
    PlacementBand {
        floor: Some(500),
        probability: 95,
        risk_level: RiskLevel::Safe,
    },
    PlacementBand {
        floor: Some(200),
        probability: 85,
        risk_level: RiskLevel::High,
    },
    PlacementBand {
        floor: Some(-100),
        probability: 65,
        risk_level: RiskLevel::Medium,
    },
    PlacementBand {
        floor: None,
        probability: 35,
        risk_level: RiskLevel::Low,
    },
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BandTableError {
    #[error("band table must not be empty")]
    Empty,
    #[error("band table must end with exactly one catch-all band")]
    MissingCatchAll,
    #[error("band floors must be strictly descending (band {index})")]
    UnorderedFloors { index: usize },
    #[error("band probability {probability} exceeds 100")]
    ProbabilityOutOfRange { probability: u8 },
}

/// Stateless estimator backed by a validated band table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementEstimator {
    bands: Vec<PlacementBand>,
}

impl Default for PlacementEstimator {
    fn default() -> Self {
        Self::standard()
    }
}

impl PlacementEstimator {
    pub fn standard() -> Self {
        Self {
            bands: STANDARD_BANDS.to_vec(),
        }
    }

    pub fn with_bands(bands: Vec<PlacementBand>) -> Result<Self, BandTableError> {
        let (last, leading) = bands.split_last().ok_or(BandTableError::Empty)?;
        if last.floor.is_some() || leading.iter().any(|band| band.floor.is_none()) {
            return Err(BandTableError::MissingCatchAll);
        }

        let mut previous: Option<i32> = None;
        for (index, band) in leading.iter().enumerate() {
            let floor = band.floor.unwrap_or(i32::MIN);
            if previous.is_some_and(|prev| floor >= prev) {
                return Err(BandTableError::UnorderedFloors { index });
            }
            previous = Some(floor);
        }

        if let Some(band) = bands.iter().find(|band| band.probability > 100) {
            return Err(BandTableError::ProbabilityOutOfRange {
                probability: band.probability,
            });
        }

        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[PlacementBand] {
        &self.bands
    }

    pub fn estimate(&self, user_score: Score, program_cutoff: Score) -> Estimate {
        let margin = user_score.margin_over(program_cutoff);
        let band = self
            .bands
            .iter()
            .find(|band| band.floor.map_or(true, |floor| margin >= floor))
            .or(self.bands.last());

        match band {
            Some(band) => Estimate {
                probability: band.probability,
                risk_level: band.risk_level,
            },
            // unreachable: tables always end with a catch-all band
            None => Estimate {
                probability: 0,
                risk_level: RiskLevel::Low,
            },
        }
    }
}

/// Estimate with the standard band table.
pub fn estimate(user_score: Score, program_cutoff: Score) -> Estimate {
    PlacementEstimator::standard().estimate(user_score, program_cutoff)
}
