use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use raiv_core::aggregator;
use raiv_core::buckets::{self, DEFAULT_RISK_BOUNDS, DEFAULT_TIMELINESS_BOUNDS};
use raiv_core::recommend::{self, RecommendationWeights};

use super::run::{execute, SourceArgs};

/// Arguments for per-year top-N rankings
#[derive(Args)]
pub struct TopArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Rows per year
    #[arg(long, short = 'n', default_value = "10")]
    pub n: usize,

    /// Only show this year
    #[arg(long)]
    pub year: Option<i32>,
}

/// Arguments for RAIV growth between two years
#[derive(Args)]
pub struct TrendArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Base year
    #[arg(long, default_value = "2022")]
    pub base_year: i32,

    /// Comparison year
    #[arg(long, default_value = "2024")]
    pub compare_year: i32,

    /// Order by growth (undefined growth last) instead of country
    #[arg(long)]
    pub by_growth: bool,
}

/// Arguments for risk and timeliness bucketed summaries
#[derive(Args)]
pub struct BucketArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Risk premium band lower bounds (comma-separated fractions)
    #[arg(long, value_delimiter = ',')]
    pub risk_bounds: Option<Vec<Decimal>>,

    /// Timeliness band lower bounds (comma-separated scores)
    #[arg(long, value_delimiter = ',')]
    pub timeliness_bounds: Option<Vec<Decimal>>,

    /// Only bucket rows from this year
    #[arg(long)]
    pub year: Option<i32>,
}

/// Arguments for weighted country recommendations
#[derive(Args)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Weight on summed RAIV
    #[arg(long, default_value = "0.1")]
    pub raiv_weight: Decimal,

    /// Weight on mean timeliness score
    #[arg(long, default_value = "0.45")]
    pub timeliness_weight: Decimal,

    /// Weight on (inverted) mean risk premium
    #[arg(long, default_value = "0.45")]
    pub risk_weight: Decimal,

    /// Years to include (comma-separated); all years when omitted
    #[arg(long = "select-years", value_delimiter = ',')]
    pub select_years: Option<Vec<i32>>,

    /// Number of countries to return
    #[arg(long, default_value = "10")]
    pub top: usize,
}

pub fn run_top(args: TopArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let output = execute(&args.source)?;
    let rankings = aggregator::top_n_by_year(&output.result.rows, args.n);
    match args.year {
        Some(year) => {
            let ranking = rankings
                .into_iter()
                .find(|r| r.year == year)
                .ok_or_else(|| format!("No RAIV rows for year {year}"))?;
            Ok(serde_json::to_value(ranking.rows)?)
        }
        None => Ok(serde_json::to_value(rankings)?),
    }
}

pub fn run_trend(args: TrendArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let output = execute(&args.source)?;
    let mut trends =
        aggregator::country_trends(&output.result.rows, args.base_year, args.compare_year)?;
    if args.by_growth {
        // Defined growth first, highest first.
        trends.sort_by(|a, b| match (a.pct_change, b.pct_change) {
            (Some(x), Some(y)) => y.cmp(&x).then_with(|| a.country.cmp(&b.country)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.country.cmp(&b.country),
        });
    }
    Ok(serde_json::to_value(trends)?)
}

pub fn run_buckets(args: BucketArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let output = execute(&args.source)?;
    let rows: Vec<_> = output
        .result
        .rows
        .into_iter()
        .filter(|r| args.year.map_or(true, |y| r.year == y))
        .collect();

    let risk_bounds = args
        .risk_bounds
        .unwrap_or_else(|| DEFAULT_RISK_BOUNDS.to_vec());
    let timeliness_bounds = args
        .timeliness_bounds
        .unwrap_or_else(|| DEFAULT_TIMELINESS_BOUNDS.to_vec());

    let risk = buckets::risk_buckets(&rows, &risk_bounds)?;
    let timeliness = buckets::timeliness_buckets(&rows, &timeliness_bounds)?;
    Ok(serde_json::to_value(vec![risk, timeliness])?)
}

pub fn run_recommend(args: RecommendArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let output = execute(&args.source)?;
    let weights = RecommendationWeights {
        raiv: args.raiv_weight,
        timeliness: args.timeliness_weight,
        risk: args.risk_weight,
    };
    let years = args.select_years.unwrap_or_default();
    let recs = recommend::recommend(&output.result.rows, &weights, &years, args.top)?;
    Ok(serde_json::to_value(recs)?)
}
