//! CSV import for the periodic program catalog refresh.

mod normalizer;
mod parser;

use crate::placement::domain::{PeriodId, Program};
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, reason: String },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read program catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::InvalidRow { line, reason } => {
                write!(f, "catalog row on line {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads program rows for one period. Later rows replace earlier rows with the same id.
pub struct ProgramCatalogImporter;

impl ProgramCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        period_id: &PeriodId,
    ) -> Result<Vec<Program>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, period_id)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        period_id: &PeriodId,
    ) -> Result<Vec<Program>, CatalogImportError> {
        parser::parse_programs(reader, period_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::domain::{ProgramId, Score};
    use std::io::Cursor;

    const HEADER: &str = "Program ID,City,University,Specialty,Spots,Applicants,Estimated Cutoff,Historical Cutoff\n";

    fn period() -> PeriodId {
        PeriodId("2025-spring".to_string())
    }

    #[test]
    fn parses_rows_and_converts_cutoffs_to_hundredths() {
        let csv = format!(
            "{HEADER}hac-orto,Ankara,Hacettepe  Üniversitesi,Ortodonti,4,37,68.40,67.95\n\
             ege-endo,İzmir,Ege Üniversitesi,Endodonti,6,,61.2,\n"
        );
        let programs =
            ProgramCatalogImporter::from_reader(Cursor::new(csv), &period()).expect("parses");

        assert_eq!(programs.len(), 2);
        let first = &programs[0];
        assert_eq!(first.id, ProgramId("hac-orto".to_string()));
        assert_eq!(first.university, "Hacettepe Üniversitesi");
        assert_eq!(first.estimated_cutoff, Score::from_hundredths(6840));
        assert_eq!(first.historical_cutoff, Some(Score::from_hundredths(6795)));
        assert_eq!(first.period_id, period());

        let second = &programs[1];
        assert_eq!(second.applicants, 0);
        assert_eq!(second.estimated_cutoff, Score::from_hundredths(6120));
        assert!(second.historical_cutoff.is_none());
    }

    #[test]
    fn later_rows_replace_earlier_rows_with_the_same_id() {
        let csv = format!(
            "{HEADER}hac-orto,Ankara,Hacettepe,Ortodonti,4,37,68.40,\n\
             hac-orto,Ankara,Hacettepe,Ortodonti,4,41,69.10,\n"
        );
        let programs =
            ProgramCatalogImporter::from_reader(Cursor::new(csv), &period()).expect("parses");
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].applicants, 41);
        assert_eq!(programs[0].estimated_cutoff, Score::from_hundredths(6910));
    }

    #[test]
    fn replaced_rows_keep_their_first_position() {
        let csv = format!(
            "{HEADER}hac-orto,Ankara,Hacettepe,Ortodonti,4,37,68.40,\n\
             ank-endo,Ankara,Ankara,Endodonti,6,51,63.10,\n\
             hac-orto,Ankara,Hacettepe,Ortodonti,4,41,69.10,\n\
             ege-perio,İzmir,Ege,Periodontoloji,3,12,59.50,\n"
        );
        let programs =
            ProgramCatalogImporter::from_reader(Cursor::new(csv), &period()).expect("parses");
        let ids: Vec<&str> = programs.iter().map(|program| program.id.0.as_str()).collect();
        assert_eq!(ids, vec!["hac-orto", "ank-endo", "ege-perio"]);
        assert_eq!(programs[0].applicants, 41);
    }

    #[test]
    fn rejects_rows_without_spots() {
        let csv = format!("{HEADER}hac-orto,Ankara,Hacettepe,Ortodonti,0,37,68.40,\n");
        let error = ProgramCatalogImporter::from_reader(Cursor::new(csv), &period())
            .expect_err("zero spots rejected");
        match error {
            CatalogImportError::InvalidRow { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("spots"));
            }
            other => panic!("expected invalid row, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unparsable_cutoffs() {
        let csv = format!("{HEADER}hac-orto,Ankara,Hacettepe,Ortodonti,3,37,sixty,\n");
        let error = ProgramCatalogImporter::from_reader(Cursor::new(csv), &period())
            .expect_err("bad cutoff rejected");
        assert!(error.to_string().contains("invalid cutoff 'sixty'"));
    }

    #[test]
    fn from_path_propagates_io_errors() {
        let error = ProgramCatalogImporter::from_path("./does-not-exist.csv", &period())
            .expect_err("expected io error");
        match error {
            CatalogImportError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
