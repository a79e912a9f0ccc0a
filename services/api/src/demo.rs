use crate::infra::{build_store, default_exam_date, parse_date, parse_period, parse_score};
use chrono::NaiveDate;
use clap::Args;
use dus360::config::PlacementConfig;
use dus360::error::AppError;
use dus360::placement::{
    estimate, ListOwner, PeriodId, PlacementError, PlacementPolicy, PlacementService,
    PreferenceView, Program, ProgramCatalogImporter, ProgramFilter, Score, UserId,
    VerificationProvider, VerificationRecord,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_CANDIDATE: &str = "demo-candidate";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Candidate DUS score used for the walkthrough.
    #[arg(long, default_value = "67.50", value_parser = parse_score)]
    pub(crate) score: Score,
    /// Exam period to plan against.
    #[arg(long, default_value = "2025-spring", value_parser = parse_period)]
    pub(crate) period: PeriodId,
    /// Exam date recorded on the demo verification (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    pub(crate) exam_date: Option<NaiveDate>,
    /// Optional catalog CSV replacing the built-in sample programs.
    #[arg(long)]
    pub(crate) catalog_csv: Option<PathBuf>,
    /// Number of programs to add to the demo preference list.
    #[arg(long, default_value_t = 5)]
    pub(crate) picks: usize,
}

#[derive(Args, Debug)]
pub(crate) struct EstimateArgs {
    /// Candidate DUS score, for example 67.50
    #[arg(long, value_parser = parse_score)]
    pub(crate) score: Score,
    /// Program cutoff score, for example 65.20
    #[arg(long, value_parser = parse_score)]
    pub(crate) cutoff: Score,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogArgs {
    /// Catalog CSV export to validate and summarize
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Period the rows belong to
    #[arg(long, default_value = "2025-spring", value_parser = parse_period)]
    pub(crate) period: PeriodId,
}

pub(crate) fn run_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let result = estimate(args.score, args.cutoff);
    println!(
        "Score {} against cutoff {}: {}% placement probability ({} risk)",
        args.score,
        args.cutoff,
        result.probability,
        result.risk_level.label()
    );
    Ok(())
}

pub(crate) fn run_catalog_summary(args: CatalogArgs) -> Result<(), AppError> {
    let mut programs = ProgramCatalogImporter::from_path(&args.csv, &args.period)?;
    programs.sort_by(|left, right| right.estimated_cutoff.cmp(&left.estimated_cutoff));

    println!(
        "Catalog {} for period {}: {} programs",
        args.csv.display(),
        args.period.0,
        programs.len()
    );

    let mut by_city: BTreeMap<&str, usize> = BTreeMap::new();
    for program in &programs {
        *by_city.entry(program.city.as_str()).or_default() += 1;
    }
    println!("\nPrograms per city");
    for (city, count) in by_city {
        println!("  - {city}: {count}");
    }

    println!("\nPrograms by estimated cutoff");
    for program in &programs {
        println!(
            "  - {} | cutoff {} | {} spots, {} applicants",
            program.label(),
            program.estimated_cutoff,
            program.spots,
            program.applicants
        );
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        score,
        period,
        exam_date,
        catalog_csv,
        picks,
    } = args;

    let config = PlacementConfig {
        policy: PlacementPolicy::default(),
        catalog_csv,
        period: period.clone(),
    };
    let store = Arc::new(build_store(&config)?);
    store
        .record_verification(VerificationRecord {
            user_id: UserId(DEMO_CANDIDATE.to_string()),
            period_id: period.clone(),
            dus_score: score,
            exam_date: exam_date.unwrap_or_else(default_exam_date),
            ranking: None,
            total_candidates: None,
        })
        .map_err(PlacementError::from)?;
    let service = PlacementService::new(store.clone(), store.clone(), store, config.policy);
    let owner = ListOwner::new(DEMO_CANDIDATE, period.0.clone());

    println!("DUS360 placement demo");
    println!("Candidate score {} in period {}", score, period.0);

    let mut programs: Vec<Program> = service.search_programs(&period, &ProgramFilter::default())?;
    programs.truncate(picks.min(config.policy.max_preferences));
    if programs.is_empty() {
        println!("No programs available for period {}", period.0);
        return Ok(());
    }

    for program in &programs {
        service.add_preference(&owner, &program.id)?;
    }
    println!("\nPreference list (most ambitious first)");
    render_preferences(&service.preferences(&owner)?);

    let risk = service.risk_summary(&owner)?;
    println!(
        "\nRisk mix: {} safe, {} high, {} medium, {} low ({})",
        risk.distribution.safe,
        risk.distribution.high,
        risk.distribution.medium,
        risk.distribution.low,
        risk.message
    );

    let ambitious = service.create_scenario(&owner, "Ambitious first", None)?;
    println!(
        "\nSaved scenario '{}' with {} picks, expected placement: {}",
        ambitious.name,
        ambitious.preference_count,
        ambitious.expected_placement.as_deref().unwrap_or("none"),
    );

    let reversed: Vec<_> = service
        .preferences(&owner)?
        .into_iter()
        .rev()
        .map(|view| view.entry.id)
        .collect();
    service.reorder_preferences(&owner, &reversed)?;
    let cautious = service.create_scenario(
        &owner,
        "Safety first",
        Some("Safest programs at the top".to_string()),
    )?;
    println!("\nReordered safest first and saved '{}'", cautious.name);
    render_preferences(&service.preferences(&owner)?);

    let applied = service.apply_scenario(&owner.user_id, &ambitious.id)?;
    println!("\nRestored '{}'", ambitious.name);
    render_preferences(&applied.preferences);
    if !applied.skipped.is_empty() {
        let skipped: Vec<&str> = applied.skipped.iter().map(|id| id.0.as_str()).collect();
        println!("  Skipped missing programs: {}", skipped.join(", "));
    }

    let analytics = service.analytics(&owner)?;
    println!(
        "\nStanding: rank {} of {} (top {:.1}%)",
        analytics.standing.rank,
        analytics.standing.total_candidates,
        100.0 - analytics.standing.percentile
    );
    println!("Score distribution");
    for band in &analytics.score_distribution {
        println!(
            "  - {}: {} candidates ({:.1}%)",
            band.label, band.count, band.percentage
        );
    }
    match &analytics.expected_placement {
        Some(expected) => println!(
            "Expected placement: #{} {} ({}%)",
            expected.rank,
            expected
                .program_label
                .as_deref()
                .unwrap_or(expected.program_id.0.as_str()),
            expected.probability
        ),
        None => println!("Expected placement: none"),
    }

    Ok(())
}

fn render_preferences(views: &[PreferenceView]) {
    if views.is_empty() {
        println!("  (empty)");
        return;
    }
    for view in views {
        let label = view
            .program
            .as_ref()
            .map(|program| program.label.clone())
            .unwrap_or_else(|| view.entry.program_id.0.clone());
        println!(
            "  {:>2}. {} | {}% | {}",
            view.entry.rank,
            label,
            view.entry.placement_probability,
            view.entry.risk_level.label()
        );
    }
}
