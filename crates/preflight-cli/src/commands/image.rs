//! Image command - read or replace the installer image

use console::style;
use preflight_core::{ImagePatcher, ManifestDocument, parse_manifests, to_yaml_stream};
use std::path::Path;

use crate::error::Result;

fn load(manifest: &Path) -> Result<Vec<ManifestDocument>> {
    let content = std::fs::read_to_string(manifest)?;
    Ok(parse_manifests(&content)?)
}

pub fn get(manifest: &Path, container: &str) -> Result<()> {
    let documents = load(manifest)?;
    let image = ImagePatcher::new(container).image(&documents)?;
    println!("{}", image);
    Ok(())
}

pub fn set(manifest: &Path, image: &str, container: &str, output: Option<&Path>) -> Result<()> {
    let mut documents = load(manifest)?;
    let patcher = ImagePatcher::new(container);

    let previous = patcher.image(&documents).ok().map(str::to_string);
    patcher.replace_image(&mut documents, image)?;
    let yaml = to_yaml_stream(&documents)?;

    match output {
        Some(path) => {
            std::fs::write(path, yaml)?;
            eprintln!(
                "{} Installer image {} → {} written to {}",
                style("✓").green().bold(),
                style(previous.as_deref().unwrap_or("(none)")).dim(),
                style(image).cyan(),
                path.display()
            );
        }
        None => print!("{}", yaml),
    }

    Ok(())
}
