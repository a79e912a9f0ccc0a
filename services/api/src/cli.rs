use crate::demo::{run_catalog_summary, run_demo, run_estimate, CatalogArgs, DemoArgs, EstimateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use dus360::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "DUS360",
    about = "Estimate placement chances and plan DUS preference lists from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Estimate placement probability for a score and a program cutoff
    Estimate(EstimateArgs),
    /// Validate and summarize a program catalog CSV export
    Catalog(CatalogArgs),
    /// Run an end-to-end walkthrough of preferences, scenarios, and analytics
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Estimate(args) => run_estimate(args),
        Command::Catalog(args) => run_catalog_summary(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dus360::placement::Score;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["dus360"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn estimate_parses_decimal_scores() {
        let cli = Cli::try_parse_from(["dus360", "estimate", "--score", "67.5", "--cutoff", "65.20"])
            .expect("parses");
        match cli.command {
            Some(Command::Estimate(args)) => {
                assert_eq!(args.score, Score::from_hundredths(6750));
                assert_eq!(args.cutoff, Score::from_hundredths(6520));
            }
            other => panic!("expected estimate command, got {other:?}"),
        }
    }

    #[test]
    fn estimate_rejects_non_numeric_scores() {
        let result = Cli::try_parse_from(["dus360", "estimate", "--score", "high", "--cutoff", "60"]);
        assert!(result.is_err());
    }
}
