use serde::Deserialize;
use std::path::{Path, PathBuf};

use raiv_core::pipeline::{PipelineOptions, RaivRunInput};
use raiv_core::CountryAlias;

use super::{csv_in, file};

fn default_true() -> bool {
    true
}

/// Run configuration file (`raiv.yaml`).
///
/// ```yaml
/// imports: data/imports.csv        # Country,Year,ImportValue
/// timeliness: data/lpi_2023.csv    # Country,TimelinessScore
/// risk: data/risk_premium.csv      # Country,RiskPremium
/// aliases: aliases.yaml            # optional [{raw_label, canonical_id}]
/// aggregate_labels: ["Other Asia, nes"]
/// options:
///   years: [2022, 2023, 2024]
///   top_n: 10
/// ```
///
/// Relative paths are resolved against the directory holding the config.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub imports: PathBuf,
    pub timeliness: PathBuf,
    pub risk: PathBuf,
    #[serde(default)]
    pub aliases: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub use_builtin_aliases: bool,
    #[serde(default)]
    pub aggregate_labels: Vec<String>,
    #[serde(default)]
    pub options: PipelineOptions,
}

fn relative_to(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Read an alias list from YAML or JSON.
pub fn read_aliases(path: &Path) -> Result<Vec<CountryAlias>, Box<dyn std::error::Error>> {
    file::read_structured(path)
}

/// Load the config file and every table it names.
pub fn load_run_config(path: &Path) -> Result<RaivRunInput, Box<dyn std::error::Error>> {
    let config: RunConfig = file::read_structured(path)?;
    let base = file::resolve_path(path)?
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let imports = csv_in::read_imports(&relative_to(&base, &config.imports))?;
    let timeliness = csv_in::read_timeliness(&relative_to(&base, &config.timeliness))?;
    let risk = csv_in::read_risk(&relative_to(&base, &config.risk))?;
    let aliases = match &config.aliases {
        Some(p) => read_aliases(&relative_to(&base, p))?,
        None => Vec::new(),
    };

    Ok(RaivRunInput {
        aliases,
        use_builtin_aliases: config.use_builtin_aliases,
        aggregate_labels: config.aggregate_labels,
        imports,
        timeliness,
        risk,
        options: config.options,
    })
}
