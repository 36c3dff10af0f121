use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use raiv_core::resolver::AliasTable;

use crate::input;

/// Arguments for country label resolution
#[derive(Args)]
pub struct ResolveArgs {
    /// Raw country labels to resolve
    pub labels: Vec<String>,

    /// Alias file (YAML or JSON list of {raw_label, canonical_id})
    #[arg(long)]
    pub aliases: Option<PathBuf>,

    /// Skip the curated alias set
    #[arg(long)]
    pub no_builtin: bool,

    /// Only validate the alias configuration and list it
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Serialize)]
struct Resolution {
    raw_label: String,
    canonical_id: Option<String>,
    via_alias: bool,
}

pub fn run_resolve(args: ResolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let base = if args.no_builtin {
        AliasTable::new(&[])?
    } else {
        AliasTable::builtin()?
    };
    let table = match args.aliases {
        Some(ref path) => base.with_aliases(&input::config::read_aliases(path)?)?,
        None => base,
    };

    if args.check {
        return Ok(serde_json::to_value(table.aliases())?);
    }
    if args.labels.is_empty() {
        return Err("at least one label, or --check, required".into());
    }

    let resolutions: Vec<Resolution> = args
        .labels
        .iter()
        .map(|label| {
            let canonical_id = table.resolve(label);
            let via_alias = canonical_id
                .as_deref()
                .map(|c| c != label.trim())
                .unwrap_or(false);
            Resolution {
                raw_label: label.clone(),
                canonical_id,
                via_alias,
            }
        })
        .collect();
    Ok(serde_json::to_value(resolutions)?)
}
