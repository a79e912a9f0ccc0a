use std::sync::Arc;

use dus360::placement::{
    CatalogImportError, InMemoryPlacementStore, PeriodId, PlacementPolicy, PlacementService,
    ProgramCatalog, ProgramCatalogImporter, ProgramFilter, Score,
};

fn period() -> PeriodId {
    PeriodId("2025-spring".to_string())
}

#[test]
fn imported_catalog_refreshes_the_service() {
    let csv = "Program ID,City,University,Specialty,Spots,Applicants,Estimated Cutoff,Historical Cutoff\n\
hac-orto, Ankara ,Hacettepe Üniversitesi,Ortodonti,4,37,68.40,67.95\n\
ank-endo,Ankara,Ankara  Üniversitesi,Endodonti,6,51,\"63,10\",\n\
ege-perio,İzmir,Ege Üniversitesi,Periodontoloji,3,12,59.5,58.75\n";

    let programs =
        ProgramCatalogImporter::from_reader(csv.as_bytes(), &period()).expect("import succeeds");
    assert_eq!(programs.len(), 3);
    assert_eq!(programs[0].city, "Ankara");
    assert_eq!(programs[1].university, "Ankara Üniversitesi");
    assert_eq!(programs[1].estimated_cutoff, Score::from_hundredths(6310));

    let store = Arc::new(InMemoryPlacementStore::default());
    let service = PlacementService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        PlacementPolicy::default(),
    );
    let written = service.refresh_catalog(programs).expect("refresh");
    assert_eq!(written, 3);

    let ankara: Vec<String> = service
        .search_programs(
            &period(),
            &ProgramFilter {
                city: Some("ankara".to_string()),
                ..ProgramFilter::default()
            },
        )
        .expect("search")
        .into_iter()
        .map(|program| program.id.0)
        .collect();
    assert_eq!(ankara, vec!["hac-orto", "ank-endo"]);
    assert_eq!(store.programs_in_period(&period()).expect("catalog").len(), 3);
}

#[test]
fn invalid_rows_report_their_line() {
    let csv = "Program ID,City,University,Specialty,Spots,Applicants,Estimated Cutoff,Historical Cutoff\n\
hac-orto,Ankara,Hacettepe,Ortodonti,4,37,68.40,\n\
ank-endo,Ankara,Ankara,Endodonti,6,51,-2.00,\n";

    let error = ProgramCatalogImporter::from_reader(csv.as_bytes(), &period())
        .expect_err("negative cutoff rejected");
    match error {
        CatalogImportError::InvalidRow { line, reason } => {
            assert_eq!(line, 3);
            assert!(reason.contains("-2.00"));
        }
        other => panic!("expected invalid row, got {other:?}"),
    }
}

#[test]
fn missing_columns_surface_as_csv_errors() {
    let csv = "Program ID,City\nhac-orto,Ankara\n";
    let error = ProgramCatalogImporter::from_reader(csv.as_bytes(), &period())
        .expect_err("missing headers rejected");
    assert!(matches!(error, CatalogImportError::Csv(_)));
}
