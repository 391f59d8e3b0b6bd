//! Components command - list a components declaration

use console::style;
use preflight_core::components::sniff_components;
use std::path::Path;

use crate::display::print_components;
use crate::error::Result;

pub fn run(file: &Path, default_namespace: &str, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let (shape, components) = sniff_components(&content, &file.display().to_string())?;
    tracing::debug!(?shape, file = %file.display(), "components declaration loaded");

    if json {
        println!("{}", serde_json::to_string_pretty(&components)?);
        return Ok(());
    }

    eprintln!(
        "{} {} component(s) in {}",
        style("→").blue(),
        components.len(),
        style(file.display()).cyan()
    );
    print_components(&components, default_namespace);

    Ok(())
}
