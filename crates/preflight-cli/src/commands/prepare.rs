//! Prepare command - run every upgrade preparation step

use console::style;
use preflight_core::{
    ConfigLoader, InstallationState, ManifestDocument, RuntimeValues, UpgradeAction,
    UpgradePreparation, parse_manifests, to_yaml_stream,
};
use std::path::PathBuf;

use crate::display::{ConsoleReporter, print_components, print_configurations};
use crate::error::Result;

/// Arguments of the prepare command
pub struct PrepareArgs {
    pub state: String,
    pub installed: String,
    pub target: String,
    pub manifest: Option<PathBuf>,
    pub components: Option<PathBuf>,
    pub overrides: Vec<PathBuf>,
    pub image: Option<String>,
    pub output: Option<PathBuf>,
    pub runtime: RuntimeValues,
    pub json: bool,
}

pub fn run(args: PrepareArgs) -> Result<()> {
    let manifests: Vec<ManifestDocument> = match &args.manifest {
        Some(path) => parse_manifests(&std::fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let mut preparation = UpgradePreparation::new(
        InstallationState::parse(&args.state),
        &args.installed,
        &args.target,
    )
    .config(
        ConfigLoader::new()
            .sources(args.overrides.iter().cloned())
            .runtime(args.runtime),
    )
    .manifests(manifests);

    if let Some(path) = &args.components {
        preparation = preparation.components_file(path);
    }
    if let Some(image) = &args.image {
        preparation = preparation.image(image);
    }

    let prepared = preparation.prepare(&mut ConsoleReporter::new())?;

    if let Some(path) = &args.output {
        if matches!(prepared.action, UpgradeAction::Reattach { .. }) {
            eprintln!(
                "{} Manifest not written to {}: the running installation is left unchanged",
                style("!").yellow().bold(),
                path.display()
            );
        } else if !prepared.manifests.is_empty() {
            std::fs::write(path, to_yaml_stream(&prepared.manifests)?)?;
            eprintln!("{} Manifest written to {}", style("✓").green().bold(), path.display());
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prepared)?);
        return Ok(());
    }

    if let UpgradeAction::Reattach { .. } = prepared.action {
        return Ok(());
    }

    println!();
    print_configurations(&prepared.configurations, false);
    if !prepared.components.is_empty() {
        println!();
        print_components(&prepared.components, "");
    }
    if let Some(image) = &prepared.installer_image {
        println!();
        println!("{} {}", style("installer image:").bold(), image);
    }

    Ok(())
}
