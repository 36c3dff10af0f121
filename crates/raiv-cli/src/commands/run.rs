use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

use raiv_core::pipeline::{self, RaivReport, RaivRunInput};
use raiv_core::ComputationOutput;

use crate::input;

/// Where a run's tables come from
#[derive(Args)]
pub struct SourceArgs {
    /// Path to a run config (YAML) naming the CSV tables and alias file
    #[arg(long, conflicts_with = "input")]
    pub config: Option<PathBuf>,

    /// Path to a JSON run input with inline tables
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Extra alias file (YAML or JSON) merged on top of the run's aliases
    #[arg(long)]
    pub aliases: Option<PathBuf>,

    /// Override the summary years (comma-separated, e.g. "2022,2024")
    #[arg(long, value_delimiter = ',')]
    pub years: Option<Vec<i32>>,
}

/// Arguments for a full RAIV run
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of top rows per year in the summary
    #[arg(long)]
    pub top: Option<usize>,

    /// Omit the exclusion list from the output (counts are kept)
    #[arg(long)]
    pub no_exclusions: bool,
}

/// Assemble a run input from --config, --input or stdin.
pub fn load_source(args: &SourceArgs) -> Result<RaivRunInput, Box<dyn std::error::Error>> {
    let mut run_input: RaivRunInput = if let Some(ref path) = args.config {
        input::config::load_run_config(path)?
    } else if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--config <raiv.yaml>, --input <file.json> or stdin required".into());
    };

    if let Some(ref path) = args.aliases {
        run_input
            .aliases
            .extend(input::config::read_aliases(path)?);
    }
    if let Some(ref years) = args.years {
        run_input.options.years = Some(years.clone());
    }
    Ok(run_input)
}

/// Load and execute a run.
pub fn execute(args: &SourceArgs) -> Result<ComputationOutput<RaivReport>, Box<dyn std::error::Error>> {
    let run_input = load_source(args)?;
    Ok(pipeline::run_raiv(&run_input)?)
}

pub fn run_raiv(args: RunArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut run_input = load_source(&args.source)?;
    if let Some(top) = args.top {
        run_input.options.top_n = top;
    }
    let mut output = pipeline::run_raiv(&run_input)?;
    if args.no_exclusions {
        output.result.exclusions.clear();
    }
    Ok(serde_json::to_value(output)?)
}
