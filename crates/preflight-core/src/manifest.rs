//! Generic manifest documents
//!
//! A manifest document is one decoded YAML document of an installation
//! payload. No schema is assumed: every level of the tree is a mapping, a
//! sequence or a scalar, and callers navigate it with the helpers below.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{CoreError, Result};

/// One decoded structured-text document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ManifestDocument(pub Value);

impl ManifestDocument {
    /// Wrap an already decoded value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse a single YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| CoreError::parse("manifest", e))?;
        Ok(Self(value))
    }

    /// The declared `kind`, if it is a string
    pub fn kind(&self) -> Option<&str> {
        self.get_str(&["kind"])
    }

    /// The `metadata.name`, if present
    pub fn name(&self) -> Option<&str> {
        self.get_str(&["metadata", "name"])
    }

    /// Follow a path of mapping keys
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        get_path(&self.0, path)
    }

    /// Follow a path of mapping keys, mutably
    pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut Value> {
        get_path_mut(&mut self.0, path)
    }

    /// Follow a path and read a string scalar
    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get_path(path).and_then(Value::as_str)
    }

    /// Follow a path and read a sequence
    pub fn get_sequence(&self, path: &[&str]) -> Option<&[Value]> {
        self.get_path(path)
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
    }

    /// Follow a path and read a mapping
    pub fn get_mapping(&self, path: &[&str]) -> Option<&Mapping> {
        self.get_path(path).and_then(Value::as_mapping)
    }

    /// Whether the document carries no content (an empty `---` section)
    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }

    /// Get the inner value
    pub fn inner(&self) -> &Value {
        &self.0
    }

    /// Convert into the inner value
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for ManifestDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Follow a path of mapping keys through a value tree
///
/// Any level that is not a mapping, or lacks the key, ends the walk with `None`.
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.as_mapping()?.get(*key))
}

/// Mutable counterpart of [`get_path`]
pub fn get_path_mut<'a>(value: &'a mut Value, path: &[&str]) -> Option<&'a mut Value> {
    path.iter()
        .try_fold(value, |current, key| current.as_mapping_mut()?.get_mut(*key))
}

/// Decode a multi-document YAML stream
///
/// Empty documents (for example a trailing `---`) are dropped.
pub fn parse_manifests(content: &str) -> Result<Vec<ManifestDocument>> {
    parse_stream(content, "manifest")
        .map(|docs| docs.into_iter().map(ManifestDocument).collect())
}

/// Encode documents back into a single YAML stream
pub fn to_yaml_stream(documents: &[ManifestDocument]) -> Result<String> {
    let mut out = String::new();
    for (i, doc) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        let yaml = serde_yaml::to_string(&doc.0).map_err(|e| CoreError::parse("manifest", e))?;
        out.push_str(&yaml);
    }
    Ok(out)
}

/// Decode every non-empty document of a YAML stream into a value tree
pub(crate) fn parse_stream(content: &str, source_name: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document).map_err(|e| CoreError::parse(source_name, e))?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}
