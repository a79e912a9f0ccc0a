use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Candidate account identifier supplied by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Exam cycle identifier, e.g. `2025-spring`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodId(pub String);

/// Catalog program identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub String);

/// Identifier wrapper for persisted preference entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(pub String);

/// Identifier wrapper for scenario snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioId(pub String);

macro_rules! display_id {
    ($($name:ident),*) => {
        $(
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

display_id!(UserId, PeriodId, ProgramId, EntryId, ScenarioId);

/// The (candidate, period) pair that exclusively owns a preference list and its scenarios.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListOwner {
    pub user_id: UserId,
    pub period_id: PeriodId,
}

impl ListOwner {
    pub fn new(user_id: impl Into<String>, period_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            period_id: PeriodId(period_id.into()),
        }
    }
}

impl fmt::Display for ListOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user_id, self.period_id)
    }
}

/// Exam score stored in hundredths (67.50 is `Score(6750)`). Serialized as a decimal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(i32);

impl Score {
    /// Largest magnitude accepted from decimal input, in hundredths (10 000.00).
    pub const MAX_ABS_HUNDREDTHS: i32 = 1_000_000;

    pub const fn from_hundredths(hundredths: i32) -> Self {
        Self(hundredths)
    }

    /// Converts a decimal score, rounding to the nearest hundredth. Values outside
    /// `±MAX_ABS_HUNDREDTHS` are clamped.
    pub fn from_decimal(value: f64) -> Self {
        let bound = f64::from(Self::MAX_ABS_HUNDREDTHS);
        Self((value * 100.0).round().clamp(-bound, bound) as i32)
    }

    /// Like [`Score::from_decimal`] but `None` for non-finite or out-of-range input.
    pub fn checked_from_decimal(value: f64) -> Option<Self> {
        let hundredths = (value * 100.0).round();
        if !hundredths.is_finite() || hundredths.abs() > f64::from(Self::MAX_ABS_HUNDREDTHS) {
            return None;
        }
        Some(Self(hundredths as i32))
    }

    pub const fn hundredths(self) -> i32 {
        self.0
    }

    pub fn as_decimal(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    /// Signed difference `self - other` in hundredths.
    pub const fn margin_over(self, other: Score) -> i32 {
        self.0.saturating_sub(other.0)
    }

    /// Parses decimal text such as `65.2`, `65.20` or `65`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = match digits.split_once(['.', ',']) {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() || fraction.len() > 2 {
            return None;
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let whole: i32 = whole.parse().ok()?;
        let fraction: i32 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i32>().ok()? * 10,
            _ => fraction.parse().ok()?,
        };

        let magnitude = whole.checked_mul(100)?.checked_add(fraction)?;
        if magnitude > Self::MAX_ABS_HUNDREDTHS {
            return None;
        }
        Some(Self(if negative { -magnitude } else { magnitude }))
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::checked_from_decimal(value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "score {value} is outside the supported range of ±{}",
                Score::from_hundredths(Score::MAX_ABS_HUNDREDTHS)
            ))
        })
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Qualitative placement bucket, ordered from safest to riskiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub const fn ordered() -> [RiskLevel; 4] {
        [
            RiskLevel::Safe,
            RiskLevel::High,
            RiskLevel::Medium,
            RiskLevel::Low,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }

    /// Larger is safer.
    pub const fn safety(self) -> u8 {
        match self {
            RiskLevel::Safe => 3,
            RiskLevel::High => 2,
            RiskLevel::Medium => 1,
            RiskLevel::Low => 0,
        }
    }
}

/// Catalog row for one university program within a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: ProgramId,
    pub period_id: PeriodId,
    pub city: String,
    pub university: String,
    pub specialty: String,
    pub spots: u32,
    pub applicants: u32,
    pub estimated_cutoff: Score,
    pub historical_cutoff: Option<Score>,
}

impl Program {
    pub fn label(&self) -> String {
        format!("{} - {}", self.university, self.specialty)
    }

    /// Applicants per available spot, one decimal.
    pub fn competition_ratio(&self) -> f64 {
        if self.spots == 0 {
            return 0.0;
        }
        round_one_decimal(f64::from(self.applicants) / f64::from(self.spots))
    }

    pub fn summary(&self) -> ProgramSummary {
        ProgramSummary {
            id: self.id.clone(),
            label: self.label(),
            city: self.city.clone(),
            university: self.university.clone(),
            specialty: self.specialty.clone(),
            spots: self.spots,
            applicants: self.applicants,
            estimated_cutoff: self.estimated_cutoff,
            historical_cutoff: self.historical_cutoff,
        }
    }
}

/// Program detail embedded in preference responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramSummary {
    pub id: ProgramId,
    pub label: String,
    pub city: String,
    pub university: String,
    pub specialty: String,
    pub spots: u32,
    pub applicants: u32,
    pub estimated_cutoff: Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_cutoff: Option<Score>,
}

/// Confirmed exam result for one candidate and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub user_id: UserId,
    pub period_id: PeriodId,
    pub dus_score: Score,
    pub exam_date: NaiveDate,
    pub ranking: Option<u32>,
    pub total_candidates: Option<u32>,
}

impl VerificationRecord {
    pub fn owner(&self) -> ListOwner {
        ListOwner {
            user_id: self.user_id.clone(),
            period_id: self.period_id.clone(),
        }
    }
}

/// One ranked program choice in a candidate's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub period_id: PeriodId,
    pub program_id: ProgramId,
    pub rank: u16,
    pub placement_probability: u8,
    pub risk_level: RiskLevel,
    pub created_at: DateTime<Utc>,
}

impl PreferenceEntry {
    pub fn owner(&self) -> ListOwner {
        ListOwner {
            user_id: self.user_id.clone(),
            period_id: self.period_id.clone(),
        }
    }

    pub fn is_owned_by(&self, owner: &ListOwner) -> bool {
        self.user_id == owner.user_id && self.period_id == owner.period_id
    }
}

/// Preference entry joined with its program for API responses. `program` is `None` when the
/// catalog row has since been removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceView {
    #[serde(flatten)]
    pub entry: PreferenceEntry,
    pub program: Option<ProgramSummary>,
}

/// Frozen, ordered list of program ids captured by a scenario.
///
/// Cloning shares the underlying slice; there is no way to mutate it after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceSnapshot(Arc<[ProgramId]>);

impl PreferenceSnapshot {
    pub fn new(program_ids: Vec<ProgramId>) -> Self {
        Self(program_ids.into())
    }

    pub fn as_slice(&self) -> &[ProgramId] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProgramId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a PreferenceSnapshot {
    type Item = &'a ProgramId;
    type IntoIter = std::slice::Iter<'a, ProgramId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<ProgramId> for PreferenceSnapshot {
    fn from_iter<T: IntoIterator<Item = ProgramId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for PreferenceSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for PreferenceSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<ProgramId>::deserialize(deserializer).map(Self::new)
    }
}

/// Named what-if snapshot of an entire preference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSnapshot {
    pub id: ScenarioId,
    pub user_id: UserId,
    pub period_id: PeriodId,
    pub name: String,
    pub description: Option<String>,
    pub preference_snapshot: PreferenceSnapshot,
    pub expected_placement: Option<String>,
    pub expected_probability: Option<u8>,
    pub preference_count: usize,
    pub created_at: DateTime<Utc>,
}

impl ScenarioSnapshot {
    pub fn owner(&self) -> ListOwner {
        ListOwner {
            user_id: self.user_id.clone(),
            period_id: self.period_id.clone(),
        }
    }
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
