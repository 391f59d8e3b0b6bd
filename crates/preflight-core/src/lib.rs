//! Preflight Core - inputs a cluster installation or upgrade needs before it runs
//!
//! This crate provides:
//! - `Configurations`: layered global and per-component configuration
//! - `ComponentDescriptor`: the ordered list of installable components
//! - `ImagePatcher`: installer image lookup and replacement in manifests
//! - `check_upgrade`: the version compatibility gate
//! - `UpgradePreparation`: the above composed, reporting through a `Reporter`

pub mod components;
pub mod config;
pub mod error;
pub mod installer;
pub mod manifest;
pub mod overrides;
pub mod report;
pub mod upgrade;
pub mod version;

pub use components::{ComponentDescriptor, ComponentsShape, load_components, parse_components};
pub use config::{
    ComponentConfiguration, ConfigEntry, ConfigLoader, ConfigurationSet, Configurations,
    OverrideSource, Revealed, RuntimeValues, load_configurations,
};
pub use error::{CoreError, Result};
pub use installer::{ImagePatcher, installer_image, replace_installer_image};
pub use manifest::{ManifestDocument, parse_manifests, to_yaml_stream};
pub use overrides::OverrideDocument;
pub use report::{NoopReporter, RecordingReporter, Reporter};
pub use upgrade::{
    InstallationState, PreparedUpgrade, UpgradeAction, UpgradePreparation, assess_installation,
};
pub use version::{DenyReason, SemVersion, UpgradeDecision, check_upgrade, migration_guide_url};
