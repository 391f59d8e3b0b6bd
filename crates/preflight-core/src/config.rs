//! Layered configuration with global and per-component scopes
//!
//! Override sources are merged strictly in order, later keys replacing
//! earlier ones. The reserved runtime keys are applied last so they always
//! win over anything declared in a file.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::overrides::OverrideDocument;

/// Reserved key for the cluster domain
pub const DOMAIN_KEY: &str = "global.domainName";
/// Reserved key for the TLS certificate
pub const TLS_CERT_KEY: &str = "global.tlsCrt";
/// Reserved key for the TLS private key
pub const TLS_KEY_KEY: &str = "global.tlsKey";
/// Reserved key for the base64-encoded admin password
pub const ADMIN_PASSWORD_KEY: &str = "global.adminPassword";

const MASK: &str = "********";

/// A single dot-path configuration value
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub secret: bool,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            secret: false,
        }
    }

    /// An entry whose value must never be displayed
    pub fn secret(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            secret: true,
        }
    }

    /// The value as it may be shown to a user
    pub fn display_value(&self) -> &str {
        if self.secret { MASK } else { &self.value }
    }
}

impl fmt::Debug for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("key", &self.key)
            .field("value", &self.display_value())
            .field("secret", &self.secret)
            .finish()
    }
}

impl fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.display_value())
    }
}

/// Dot-path keyed configuration values with last-write-wins semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationSet(BTreeMap<String, ConfigEntry>);

impl ConfigurationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any previous entry with the same key
    pub fn set(&mut self, entry: ConfigEntry) {
        self.0.insert(entry.key.clone(), entry);
    }

    /// Insert a plain value
    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(ConfigEntry::new(key, value));
    }

    /// Insert a secret value
    pub fn set_secret(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(ConfigEntry::secret(key, value));
    }

    pub fn get(&self, key: &str) -> Option<&ConfigEntry> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries sorted by key
    pub fn iter(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.0.values()
    }

    /// Key/value pairs; secrets are masked unless `reveal` is set
    pub fn to_map(&self, reveal: bool) -> BTreeMap<&str, &str> {
        self.iter()
            .map(|e| {
                let value = if reveal { e.value.as_str() } else { e.display_value() };
                (e.key.as_str(), value)
            })
            .collect()
    }

    /// Merge another set on top of this one
    pub fn merge(&mut self, overlay: &ConfigurationSet) {
        for entry in overlay.iter() {
            self.set(entry.clone());
        }
    }
}

impl Extend<ConfigEntry> for ConfigurationSet {
    fn extend<I: IntoIterator<Item = ConfigEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.set(entry);
        }
    }
}

impl FromIterator<ConfigEntry> for ConfigurationSet {
    fn from_iter<I: IntoIterator<Item = ConfigEntry>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Serialize for ConfigurationSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.to_map(false))
    }
}

/// Configuration scoped to one component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentConfiguration {
    pub component: String,
    pub configuration: ConfigurationSet,
}

/// Global configuration plus per-component configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configurations {
    pub global: ConfigurationSet,
    components: IndexMap<String, ConfigurationSet>,
}

impl Configurations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration of one component, if any was declared
    pub fn component(&self, name: &str) -> Option<&ConfigurationSet> {
        self.components.get(name)
    }

    /// Configuration of one component, created empty on first use
    pub fn component_mut(&mut self, name: &str) -> &mut ConfigurationSet {
        self.components.entry(name.to_string()).or_default()
    }

    /// Component configurations in first-seen order
    pub fn components(&self) -> impl Iterator<Item = (&str, &ConfigurationSet)> {
        self.components.iter().map(|(name, set)| (name.as_str(), set))
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Component configurations as owned blocks, in first-seen order
    pub fn component_configurations(&self) -> Vec<ComponentConfiguration> {
        self.components
            .iter()
            .map(|(name, set)| ComponentConfiguration {
                component: name.clone(),
                configuration: set.clone(),
            })
            .collect()
    }

    /// Merge one decoded override document
    pub fn apply(&mut self, document: OverrideDocument) {
        self.global.extend(document.global);
        for block in document.components {
            self.component_mut(&block.component).extend(block.entries);
        }
    }

    /// Apply the reserved runtime keys; empty values are skipped
    pub fn apply_runtime(&mut self, runtime: &RuntimeValues) {
        if !runtime.domain.is_empty() {
            self.global.set_value(DOMAIN_KEY, runtime.domain.as_str());
        }
        if !runtime.tls_cert.is_empty() {
            self.global.set_secret(TLS_CERT_KEY, runtime.tls_cert.as_str());
        }
        if !runtime.tls_key.is_empty() {
            self.global.set_secret(TLS_KEY_KEY, runtime.tls_key.as_str());
        }
        if !runtime.password.is_empty() {
            self.global
                .set_secret(ADMIN_PASSWORD_KEY, STANDARD.encode(runtime.password.as_bytes()));
        }
    }
}

impl Serialize for Configurations {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Configurations", 2)?;
        state.serialize_field("global", &self.global)?;
        state.serialize_field("components", &self.component_configurations())?;
        state.end()
    }
}

/// Serializes [`Configurations`] with secret values in clear text
///
/// Same layout as the masked serialization of [`Configurations`].
#[derive(Debug, Clone, Copy)]
pub struct Revealed<'a>(&'a Configurations);

impl Configurations {
    /// View that serializes secrets unmasked
    pub fn revealed(&self) -> Revealed<'_> {
        Revealed(self)
    }
}

impl Serialize for Revealed<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        #[derive(Serialize)]
        struct Component<'a> {
            component: &'a str,
            configuration: BTreeMap<&'a str, &'a str>,
        }

        let components: Vec<Component<'_>> = self
            .0
            .components
            .iter()
            .map(|(name, set)| Component {
                component: name,
                configuration: set.to_map(true),
            })
            .collect();

        let mut state = serializer.serialize_struct("Configurations", 2)?;
        state.serialize_field("global", &self.0.global.to_map(true))?;
        state.serialize_field("components", &components)?;
        state.end()
    }
}

/// Values supplied directly by the caller; an empty string means "do not set"
#[derive(Clone, Default)]
pub struct RuntimeValues {
    pub domain: String,
    pub tls_cert: String,
    pub tls_key: String,
    pub password: String,
}

impl fmt::Debug for RuntimeValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &str| if v.is_empty() { "" } else { MASK };
        f.debug_struct("RuntimeValues")
            .field("domain", &self.domain)
            .field("tls_cert", &mask(&self.tls_cert))
            .field("tls_key", &mask(&self.tls_key))
            .field("password", &mask(&self.password))
            .finish()
    }
}

/// Where an override document stream comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideSource {
    /// A YAML file on disk
    File(PathBuf),
    /// YAML text already in memory
    Inline { name: String, content: String },
}

impl OverrideSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn inline(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Inline {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Name used in error messages
    pub fn name(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Inline { name, .. } => name.clone(),
        }
    }

    /// Read and decode every document of this source
    pub fn documents(&self) -> Result<Vec<OverrideDocument>> {
        match self {
            Self::File(path) => {
                let content = std::fs::read_to_string(path)?;
                OverrideDocument::parse_all(&content, &path.display().to_string())
            }
            Self::Inline { name, content } => OverrideDocument::parse_all(content, name),
        }
    }
}

impl From<&Path> for OverrideSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<PathBuf> for OverrideSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// Builds a [`Configurations`] from override sources and runtime values
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    sources: Vec<OverrideSource>,
    named: BTreeMap<String, String>,
    runtime: RuntimeValues,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an override source; sources merge in the order they are added
    pub fn source(mut self, source: impl Into<OverrideSource>) -> Self {
        self.sources.push(source.into());
        self
    }

    /// Append several override sources
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OverrideSource>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Previously loaded documents, merged in name order before the sources
    pub fn named_documents(mut self, documents: BTreeMap<String, String>) -> Self {
        self.named = documents;
        self
    }

    pub fn runtime(mut self, runtime: RuntimeValues) -> Self {
        self.runtime = runtime;
        self
    }

    /// Read every source and merge the result
    pub fn load(&self) -> Result<Configurations> {
        let mut configurations = Configurations::new();

        for (name, content) in &self.named {
            for document in OverrideDocument::parse_all(content, name)? {
                configurations.apply(document);
            }
            tracing::debug!(source = %name, "merged named override document");
        }

        for source in &self.sources {
            let documents = source.documents()?;
            tracing::debug!(source = %source.name(), documents = documents.len(), "merged override source");
            for document in documents {
                configurations.apply(document);
            }
        }

        configurations.apply_runtime(&self.runtime);

        Ok(configurations)
    }
}

/// Merge override sources, named documents and runtime values in one call
pub fn load_configurations(
    sources: &[OverrideSource],
    named: Option<&BTreeMap<String, String>>,
    runtime: &RuntimeValues,
) -> Result<Configurations> {
    ConfigLoader::new()
        .sources(sources.iter().cloned())
        .named_documents(named.cloned().unwrap_or_default())
        .runtime(runtime.clone())
        .load()
}
