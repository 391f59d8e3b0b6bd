//! Component list loading
//!
//! Two declaration shapes are accepted. The flat shape is a plain list:
//!
//! ```yaml
//! - name: cluster-essentials
//!   namespace: kyma-system
//! - name: istio
//! ```
//!
//! The nested shape embeds the same list in an installation resource under
//! `spec.components`. The loader tries the flat shape first and only falls
//! back to the nested one when the top level is not a list.

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::manifest::{get_path, parse_stream};

/// Path of the embedded component list in the nested shape
const NESTED_COMPONENTS_PATH: &[&str] = &["spec", "components"];

/// One installable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    /// Empty means the installer's default namespace
    #[serde(default, deserialize_with = "null_as_empty")]
    pub namespace: String,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Namespace, falling back to `default` when none was declared
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.namespace.is_empty() {
            default
        } else {
            &self.namespace
        }
    }
}

/// Which declaration shape a source matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentsShape {
    Flat,
    Nested,
}

/// Load a components declaration from a file
pub fn load_components<P: AsRef<Path>>(path: P) -> Result<Vec<ComponentDescriptor>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse_components(&content, &path.display().to_string())
}

/// Parse a components declaration
pub fn parse_components(content: &str, source_name: &str) -> Result<Vec<ComponentDescriptor>> {
    sniff_components(content, source_name).map(|(_, components)| components)
}

/// Parse a components declaration and report which shape matched
pub fn sniff_components(
    content: &str,
    source_name: &str,
) -> Result<(ComponentsShape, Vec<ComponentDescriptor>)> {
    let documents = parse_stream(content, source_name)?;

    if let Some(components) = try_flat(&documents, source_name)? {
        tracing::debug!(source = source_name, count = components.len(), "flat components list");
        return Ok((ComponentsShape::Flat, components));
    }

    if let Some(components) = try_nested(&documents, source_name)? {
        tracing::debug!(source = source_name, count = components.len(), "nested components list");
        return Ok((ComponentsShape::Nested, components));
    }

    Err(CoreError::format(
        source_name,
        "expected a list of components or a document with 'spec.components'",
    ))
}

/// Flat shape: `None` when the top level is not a list
fn try_flat(documents: &[Value], source_name: &str) -> Result<Option<Vec<ComponentDescriptor>>> {
    match documents.first() {
        Some(Value::Sequence(items)) => descriptors(items, source_name).map(Some),
        _ => Ok(None),
    }
}

/// Nested shape: the first document holding a list at `spec.components`
fn try_nested(documents: &[Value], source_name: &str) -> Result<Option<Vec<ComponentDescriptor>>> {
    documents
        .iter()
        .find_map(|doc| get_path(doc, NESTED_COMPONENTS_PATH).and_then(Value::as_sequence))
        .map(|items| descriptors(items, source_name))
        .transpose()
}

fn descriptors(items: &[Value], source_name: &str) -> Result<Vec<ComponentDescriptor>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| descriptor(item, index, source_name))
        .collect()
}

fn descriptor(item: &Value, index: usize, source_name: &str) -> Result<ComponentDescriptor> {
    let component: ComponentDescriptor = serde_yaml::from_value(item.clone()).map_err(|e| {
        CoreError::format(source_name, format!("component #{} is invalid: {}", index, e))
    })?;

    if component.name.is_empty() {
        return Err(CoreError::format(
            source_name,
            format!("component #{} has an empty 'name'", index),
        ));
    }
    Ok(component)
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}
