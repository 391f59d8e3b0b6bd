//! Upgrade preparation
//!
//! Composes the version gate, configuration loader, component loader and
//! installer image patcher into the sequence an upgrade command runs before
//! it touches the cluster. Progress goes to the [`Reporter`] the caller
//! passes in.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::components::{ComponentDescriptor, load_components, parse_components};
use crate::config::{ConfigLoader, Configurations};
use crate::error::{CoreError, Result};
use crate::installer::ImagePatcher;
use crate::manifest::ManifestDocument;
use crate::report::Reporter;
use crate::version::{SemVersion, UpgradeDecision, decide, migration_guide_url};

/// Installation status as reported by the installer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstallationState {
    Installed,
    InProgress,
    Error,
    NoInstallation,
    Unknown,
}

impl InstallationState {
    /// Parse the installer's status string; unrecognized values are `Unknown`
    pub fn parse(status: &str) -> Self {
        match status.trim() {
            "Installed" => Self::Installed,
            "InProgress" => Self::InProgress,
            "Error" => Self::Error,
            "NoInstallation" => Self::NoInstallation,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for InstallationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Installed => "Installed",
            Self::InProgress => "InProgress",
            Self::Error => "Error",
            Self::NoInstallation => "NoInstallation",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// What an upgrade command should do given the current installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum UpgradeAction {
    /// Run the upgrade
    Upgrade,
    /// An installation is already running; attach to it instead
    Reattach { message: String },
}

/// Map the installation state to an action
///
/// An `Error` state may still recover, so it is treated like `InProgress`.
pub fn assess_installation(state: InstallationState, version: &str) -> Result<UpgradeAction> {
    match state {
        InstallationState::Installed => Ok(UpgradeAction::Upgrade),
        InstallationState::InProgress | InstallationState::Error => Ok(UpgradeAction::Reattach {
            message: format!("Installation in version {} is already in progress", version),
        }),
        InstallationState::NoInstallation => Err(CoreError::NotInstalled),
        InstallationState::Unknown => Err(CoreError::StatusUnavailable),
    }
}

#[derive(Debug, Clone)]
enum ComponentsInput {
    None,
    File(PathBuf),
    Inline { name: String, content: String },
    Loaded(Vec<ComponentDescriptor>),
}

/// Everything an upgrade needs, resolved
#[derive(Debug, Clone, Serialize)]
pub struct PreparedUpgrade {
    pub action: UpgradeAction,
    pub decision: Option<UpgradeDecision>,
    pub migration_guide: Option<String>,
    pub configurations: Configurations,
    pub components: Vec<ComponentDescriptor>,
    #[serde(skip)]
    pub manifests: Vec<ManifestDocument>,
    pub installer_image: Option<String>,
}

impl PreparedUpgrade {
    fn reattach(action: UpgradeAction, manifests: Vec<ManifestDocument>) -> Self {
        Self {
            action,
            decision: None,
            migration_guide: None,
            configurations: Configurations::new(),
            components: Vec::new(),
            manifests,
            installer_image: None,
        }
    }
}

/// Builder for an upgrade preparation run
#[derive(Debug, Clone)]
pub struct UpgradePreparation {
    state: InstallationState,
    installed_version: String,
    target_version: String,
    config: ConfigLoader,
    components: ComponentsInput,
    manifests: Vec<ManifestDocument>,
    image: Option<String>,
    patcher: ImagePatcher,
}

impl UpgradePreparation {
    pub fn new(
        state: InstallationState,
        installed_version: impl Into<String>,
        target_version: impl Into<String>,
    ) -> Self {
        Self {
            state,
            installed_version: installed_version.into(),
            target_version: target_version.into(),
            config: ConfigLoader::new(),
            components: ComponentsInput::None,
            manifests: Vec::new(),
            image: None,
            patcher: ImagePatcher::default(),
        }
    }

    pub fn config(mut self, loader: ConfigLoader) -> Self {
        self.config = loader;
        self
    }

    pub fn components_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.components = ComponentsInput::File(path.into());
        self
    }

    pub fn components_yaml(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.components = ComponentsInput::Inline {
            name: name.into(),
            content: content.into(),
        };
        self
    }

    pub fn components(mut self, components: Vec<ComponentDescriptor>) -> Self {
        self.components = ComponentsInput::Loaded(components);
        self
    }

    pub fn manifests(mut self, manifests: Vec<ManifestDocument>) -> Self {
        self.manifests = manifests;
        self
    }

    /// Replace the installer image with this reference
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn patcher(mut self, patcher: ImagePatcher) -> Self {
        self.patcher = patcher;
        self
    }

    /// Run every preparation step
    pub fn prepare(self, reporter: &mut dyn Reporter) -> Result<PreparedUpgrade> {
        reporter.step("Preparing upgrade");

        let action = reported(reporter, assess_installation(self.state, &self.installed_version))?;
        if let UpgradeAction::Reattach { message } = &action {
            reporter.success(message);
            return Ok(PreparedUpgrade::reattach(action, self.manifests));
        }

        let decision = reported(reporter, self.check_compatibility())?;
        reported(reporter, decision.clone().into_result())?;
        reporter.info(&format!(
            "Upgrading from version {} to version {}",
            decision.installed, decision.target
        ));

        let migration_guide = reported(reporter, self.migration_guide())?;
        reporter.info(&format!("Migration guide: {}", migration_guide));

        let configurations = reported(reporter, self.config.load())?;
        reporter.info(&format!(
            "Loaded {} global and {} component configuration(s)",
            configurations.global.len(),
            configurations.component_count()
        ));

        let components = reported(reporter, self.load_components())?;
        if !components.is_empty() {
            reporter.info(&format!("Loaded {} component(s)", components.len()));
        }

        let mut manifests = self.manifests;
        let installer_image = if manifests.is_empty() {
            None
        } else {
            if let Some(image) = &self.image {
                reported(reporter, self.patcher.replace_image(&mut manifests, image))?;
                reporter.info(&format!("Installer image set to {}", image));
            }
            let current = reported(reporter, self.patcher.image(&manifests))?;
            Some(current.to_string())
        };

        reporter.success("Upgrade is ready");

        Ok(PreparedUpgrade {
            action,
            decision: Some(decision),
            migration_guide: Some(migration_guide),
            configurations,
            components,
            manifests,
            installer_image,
        })
    }

    fn check_compatibility(&self) -> Result<UpgradeDecision> {
        let installed = SemVersion::parse(&self.installed_version)?;
        let target = SemVersion::parse(&self.target_version)?;
        Ok(decide(&installed, &target))
    }

    fn migration_guide(&self) -> Result<String> {
        let installed = SemVersion::parse(&self.installed_version)?;
        let target = SemVersion::parse(&self.target_version)?;
        Ok(migration_guide_url(&installed, &target))
    }

    fn load_components(&self) -> Result<Vec<ComponentDescriptor>> {
        match &self.components {
            ComponentsInput::None => Ok(Vec::new()),
            ComponentsInput::File(path) => load_components(path),
            ComponentsInput::Inline { name, content } => parse_components(content, name),
            ComponentsInput::Loaded(components) => Ok(components.clone()),
        }
    }
}

/// Report a failure on the current step before handing the error back
fn reported<T>(reporter: &mut dyn Reporter, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        reporter.failure(&err.to_string());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DOMAIN_KEY, OverrideSource, RuntimeValues};
    use crate::manifest::parse_manifests;
    use crate::report::{RecordingReporter, ReportEvent};

    const MANIFESTS: &str = r#"
kind: Deployment
metadata:
  name: kyma-installer
spec:
  template:
    spec:
      containers:
        - name: kyma-installer-container
          image: eu.gcr.io/kyma-project/kyma-installer:1.2.0
"#;

    #[test]
    fn test_installation_state_parse() {
        assert_eq!(InstallationState::parse("Installed"), InstallationState::Installed);
        assert_eq!(InstallationState::parse("InProgress"), InstallationState::InProgress);
        assert_eq!(InstallationState::parse(""), InstallationState::Unknown);
        assert_eq!(InstallationState::parse("NoInstallation").to_string(), "NoInstallation");
    }

    #[test]
    fn test_assess_installation() {
        assert_eq!(
            assess_installation(InstallationState::Installed, "1.2.0").unwrap(),
            UpgradeAction::Upgrade
        );
        assert_eq!(
            assess_installation(InstallationState::Error, "1.2.0").unwrap(),
            UpgradeAction::Reattach {
                message: "Installation in version 1.2.0 is already in progress".to_string()
            }
        );
        assert!(matches!(
            assess_installation(InstallationState::NoInstallation, "").unwrap_err(),
            CoreError::NotInstalled
        ));
        assert!(matches!(
            assess_installation(InstallationState::Unknown, "").unwrap_err(),
            CoreError::StatusUnavailable
        ));
    }

    #[test]
    fn test_prepare_full_upgrade() {
        let mut reporter = RecordingReporter::new();

        let prepared = UpgradePreparation::new(InstallationState::Installed, "1.2.0", "1.3.0")
            .config(
                ConfigLoader::new()
                    .source(OverrideSource::inline("overrides", "global.domainName: file.org\n"))
                    .runtime(RuntimeValues {
                        domain: "runtime.org".into(),
                        ..Default::default()
                    }),
            )
            .components_yaml("components.yaml", "- name: istio\n  namespace: istio-system\n")
            .manifests(parse_manifests(MANIFESTS).unwrap())
            .image("eu.gcr.io/kyma-project/kyma-installer:1.3.0")
            .prepare(&mut reporter)
            .unwrap();

        assert_eq!(prepared.action, UpgradeAction::Upgrade);
        assert_eq!(
            prepared.decision.as_ref().and_then(|d| d.resolved_version.as_deref()),
            Some("1.3.0")
        );
        assert_eq!(prepared.configurations.global.get(DOMAIN_KEY).unwrap().value, "runtime.org");
        assert_eq!(prepared.components.len(), 1);
        assert_eq!(
            prepared.installer_image.as_deref(),
            Some("eu.gcr.io/kyma-project/kyma-installer:1.3.0")
        );
        assert!(prepared.migration_guide.unwrap().ends_with("1.2-1.3.md"));
        assert_eq!(reporter.steps(), vec!["Preparing upgrade"]);
        assert_eq!(
            reporter.events.last(),
            Some(&ReportEvent::Success("Upgrade is ready".to_string()))
        );
    }

    #[test]
    fn test_prepare_reattaches_running_installation() {
        let mut reporter = RecordingReporter::new();

        let prepared = UpgradePreparation::new(InstallationState::InProgress, "1.2.0", "1.3.0")
            .prepare(&mut reporter)
            .unwrap();

        assert!(matches!(prepared.action, UpgradeAction::Reattach { .. }));
        assert!(prepared.decision.is_none());
        assert!(!reporter.has_failure());
    }

    #[test]
    fn test_prepare_denied_upgrade_reports_failure() {
        let mut reporter = RecordingReporter::new();

        let err = UpgradePreparation::new(InstallationState::Installed, "1.2.0", "1.4.0")
            .prepare(&mut reporter)
            .unwrap_err();

        assert!(matches!(err, CoreError::UpgradeDenied { .. }));
        assert!(reporter.has_failure());
    }

    #[test]
    fn test_prepare_missing_installer_leaves_no_success() {
        let mut reporter = RecordingReporter::new();

        let err = UpgradePreparation::new(InstallationState::Installed, "1.2.0", "1.3.0")
            .manifests(parse_manifests("kind: ConfigMap\n").unwrap())
            .image("new")
            .prepare(&mut reporter)
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(reporter.has_failure());
        assert!(!reporter.events.iter().any(|e| matches!(e, ReportEvent::Success(_))));
    }
}
