//! Config command - merge override files and runtime values

use console::style;
use preflight_core::{ConfigLoader, RuntimeValues};
use std::path::PathBuf;

use crate::display::print_configurations;
use crate::error::Result;

pub fn run(overrides: &[PathBuf], runtime: RuntimeValues, json: bool, show_secrets: bool) -> Result<()> {
    let configurations = ConfigLoader::new()
        .sources(overrides.iter().cloned())
        .runtime(runtime)
        .load()?;

    if json {
        let encoded = if show_secrets {
            serde_json::to_string_pretty(&configurations.revealed())?
        } else {
            serde_json::to_string_pretty(&configurations)?
        };
        println!("{}", encoded);
        return Ok(());
    }

    if !overrides.is_empty() {
        eprintln!(
            "{} Merged {} override file(s)",
            style("→").blue(),
            overrides.len()
        );
    }
    print_configurations(&configurations, show_secrets);

    Ok(())
}
