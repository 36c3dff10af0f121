mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

use commands::reports::{BucketArgs, RecommendArgs, TopArgs, TrendArgs};
use commands::resolve::ResolveArgs;
use commands::run::RunArgs;

/// Risk-Adjusted Import Value calculations
#[derive(Parser)]
#[command(
    name = "raiv",
    version,
    about = "Risk-Adjusted Import Value calculations",
    long_about = "Joins import values, logistics timeliness scores and country risk \
                  premiums on a reconciled country key, computes \
                  RAIV = ImportValue x Timeliness / (1 + RiskPremium)^t, and reports \
                  per-year statistics, rankings, growth and recommendations."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print the RAIV table with its summary
    Run(RunArgs),
    /// Resolve raw country labels to canonical identities
    Resolve(ResolveArgs),
    /// Top-N countries by RAIV for each year
    Top(TopArgs),
    /// RAIV growth between two years
    Trend(TrendArgs),
    /// Risk premium and timeliness bucketed summaries
    Buckets(BucketArgs),
    /// Weighted composite-score country recommendations
    Recommend(RecommendArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Run(args) => commands::run::run_raiv(args),
        Commands::Resolve(args) => commands::resolve::run_resolve(args),
        Commands::Top(args) => commands::reports::run_top(args),
        Commands::Trend(args) => commands::reports::run_trend(args),
        Commands::Buckets(args) => commands::reports::run_buckets(args),
        Commands::Recommend(args) => commands::reports::run_recommend(args),
        Commands::Version => {
            println!("raiv {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
