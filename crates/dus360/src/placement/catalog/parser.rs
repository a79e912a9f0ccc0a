use super::normalizer::normalize_label;
use super::CatalogImportError;
use crate::placement::domain::{PeriodId, Program, ProgramId, Score};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Program ID")]
    program_id: String,
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "University")]
    university: String,
    #[serde(rename = "Specialty")]
    specialty: String,
    #[serde(rename = "Spots")]
    spots: String,
    #[serde(rename = "Applicants", default, deserialize_with = "empty_string_as_none")]
    applicants: Option<String>,
    #[serde(rename = "Estimated Cutoff")]
    estimated_cutoff: String,
    #[serde(
        rename = "Historical Cutoff",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    historical_cutoff: Option<String>,
}

impl CatalogRow {
    fn into_program(self, period_id: &PeriodId) -> Result<Program, String> {
        let id = normalize_label(&self.program_id);
        if id.is_empty() {
            return Err("missing program id".to_string());
        }

        let spots: u32 = self
            .spots
            .trim()
            .parse()
            .map_err(|_| format!("invalid spots '{}'", self.spots.trim()))?;
        if spots == 0 {
            return Err("spots must be greater than zero".to_string());
        }

        let applicants: u32 = match self.applicants.as_deref().map(str::trim) {
            Some(raw) => raw
                .parse()
                .map_err(|_| format!("invalid applicants '{raw}'"))?,
            None => 0,
        };

        let estimated_cutoff = parse_cutoff(&self.estimated_cutoff)?;
        let historical_cutoff = self
            .historical_cutoff
            .as_deref()
            .map(parse_cutoff)
            .transpose()?;

        Ok(Program {
            id: ProgramId(id),
            period_id: period_id.clone(),
            city: normalize_label(&self.city),
            university: normalize_label(&self.university),
            specialty: normalize_label(&self.specialty),
            spots,
            applicants,
            estimated_cutoff,
            historical_cutoff,
        })
    }
}

fn parse_cutoff(raw: &str) -> Result<Score, String> {
    match Score::parse(raw) {
        Some(score) if score.hundredths() >= 0 => Ok(score),
        _ => Err(format!("invalid cutoff '{}'", raw.trim())),
    }
}

pub(crate) fn parse_programs<R: Read>(
    reader: R,
    period_id: &PeriodId,
) -> Result<Vec<Program>, CatalogImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut programs: Vec<Program> = Vec::new();
    let mut positions: HashMap<ProgramId, usize> = HashMap::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let row: CatalogRow = record.deserialize(Some(&headers))?;
        let program = row
            .into_program(period_id)
            .map_err(|reason| CatalogImportError::InvalidRow { line, reason })?;

        match positions.get(&program.id) {
            Some(&index) => programs[index] = program,
            None => {
                positions.insert(program.id.clone(), programs.len());
                programs.push(program);
            }
        }
    }

    Ok(programs)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
