//! Override document decoding
//!
//! An override source is a YAML stream. Each document is sniffed into one of
//! two shapes:
//!
//! Native shape, dot-path keys at the top level plus optional component blocks:
//!
//! ```yaml
//! global.domainName: example.org
//! components:
//!   - name: istio
//!     configuration:
//!       global.proxy.resources.requests.cpu: 490m
//! ```
//!
//! ConfigMap/Secret shape, where a `component` label scopes the `data` entries:
//!
//! ```yaml
//! apiVersion: v1
//! kind: ConfigMap
//! metadata:
//!   labels:
//!     component: istio
//! data:
//!   global.proxy.resources.requests.cpu: 490m
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use indexmap::IndexMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fmt;

use crate::config::ConfigEntry;
use crate::error::{CoreError, Result};
use crate::manifest::get_path;

/// Key holding component blocks in the native shape
const COMPONENTS_KEY: &str = "components";

/// Label that scopes a ConfigMap/Secret to one component
const COMPONENT_LABEL: &str = "component";

/// Entries contributed to one component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentOverrides {
    pub component: String,
    pub entries: Vec<ConfigEntry>,
}

/// One decoded override unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideDocument {
    /// Entries for the global scope
    pub global: Vec<ConfigEntry>,
    /// Component-scoped blocks, in declaration order
    pub components: Vec<ComponentOverrides>,
}

impl OverrideDocument {
    /// Decode every document of a YAML stream
    ///
    /// The shape of each document is checked on its value tree first. Entry
    /// values are then read a second time as strings, so `1.10` or `0x1F`
    /// keep the exact text they were written with.
    pub fn parse_all(content: &str, source_name: &str) -> Result<Vec<Self>> {
        let trees = serde_yaml::Deserializer::from_str(content)
            .map(|document| Value::deserialize(document).map_err(|e| CoreError::parse(source_name, e)))
            .collect::<Result<Vec<_>>>()?;

        let mut documents = Vec::new();
        for (tree, document) in trees.iter().zip(serde_yaml::Deserializer::from_str(content)) {
            if tree.is_null() {
                continue;
            }
            let shape = Shape::detect(tree, source_name)?;
            documents.push(shape.decode(document, source_name)?);
        }
        Ok(documents)
    }

    /// Whether the document contributes nothing
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.components.is_empty()
    }
}

/// Document layout, detected on the value tree
#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Native,
    Resource { secret: bool, component: Option<String> },
}

impl Shape {
    fn detect(value: &Value, source_name: &str) -> Result<Self> {
        let map = value.as_mapping().ok_or_else(|| {
            CoreError::schema(source_name, "override document must be a mapping")
        })?;

        match map.get("kind").and_then(Value::as_str) {
            Some(kind @ ("ConfigMap" | "Secret")) => {
                tracing::debug!(source = source_name, kind, "decoding resource-shaped overrides");
                let secret = kind == "Secret";
                if let Some(data) = mapping_field(value, "data", source_name)? {
                    check_scalars(data, source_name)?;
                }
                if secret {
                    if let Some(string_data) = mapping_field(value, "stringData", source_name)? {
                        check_scalars(string_data, source_name)?;
                    }
                }
                let component = get_path(value, &["metadata", "labels", COMPONENT_LABEL])
                    .and_then(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string);
                Ok(Self::Resource { secret, component })
            }
            _ => {
                check_native(map, source_name)?;
                Ok(Self::Native)
            }
        }
    }

    fn decode<'de, D>(&self, document: D, source_name: &str) -> Result<OverrideDocument>
    where
        D: Deserializer<'de, Error = serde_yaml::Error>,
    {
        match self {
            Self::Native => {
                let native = NativeText::deserialize(document).map_err(|e| CoreError::parse(source_name, e))?;
                Ok(OverrideDocument {
                    global: entries(native.global, false),
                    components: native
                        .blocks
                        .into_iter()
                        .map(|block| ComponentOverrides {
                            component: block.name,
                            entries: entries(block.configuration.unwrap_or_default(), false),
                        })
                        .collect(),
                })
            }
            Self::Resource { secret, component } => {
                let resource =
                    ResourceText::deserialize(document).map_err(|e| CoreError::parse(source_name, e))?;
                let entries = resource.entries(*secret, source_name)?;
                Ok(match component {
                    Some(component) => OverrideDocument {
                        global: Vec::new(),
                        components: vec![ComponentOverrides {
                            component: component.clone(),
                            entries,
                        }],
                    },
                    None => OverrideDocument {
                        global: entries,
                        components: Vec::new(),
                    },
                })
            }
        }
    }
}

fn check_native(map: &Mapping, source_name: &str) -> Result<()> {
    for (key, value) in map {
        let key = key_name(key, source_name)?;
        if key == COMPONENTS_KEY {
            check_component_blocks(value, source_name)?;
        } else {
            check_scalar(&key, value, source_name)?;
        }
    }
    Ok(())
}

fn check_component_blocks(value: &Value, source_name: &str) -> Result<()> {
    let blocks = value.as_sequence().ok_or_else(|| {
        CoreError::schema(source_name, "'components' must be a list of component blocks")
    })?;

    for (index, block) in blocks.iter().enumerate() {
        let component = block.get("name").and_then(Value::as_str).ok_or_else(|| {
            CoreError::schema(
                source_name,
                format!("component block #{} has no string 'name'", index),
            )
        })?;

        match block.get("configuration") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(config)) => check_scalars(config, source_name)?,
            Some(_) => {
                return Err(CoreError::schema(
                    source_name,
                    format!("configuration of component '{}' must be a mapping", component),
                ));
            }
        }
    }
    Ok(())
}

fn mapping_field<'a>(value: &'a Value, field: &str, source_name: &str) -> Result<Option<&'a Mapping>> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(map)) => Ok(Some(map)),
        Some(_) => Err(CoreError::schema(source_name, format!("'{}' must be a mapping", field))),
    }
}

fn check_scalars(map: &Mapping, source_name: &str) -> Result<()> {
    map.iter()
        .try_for_each(|(key, value)| check_scalar(&key_name(key, source_name)?, value, source_name))
}

fn check_scalar(key: &str, value: &Value, source_name: &str) -> Result<()> {
    let nested = match value {
        Value::Sequence(_) | Value::Mapping(_) => true,
        Value::Tagged(tagged) => matches!(tagged.value, Value::Sequence(_) | Value::Mapping(_)),
        _ => false,
    };
    if nested {
        return Err(CoreError::schema(
            source_name,
            format!("value of '{}' must be a scalar, found a list or mapping", key),
        ));
    }
    Ok(())
}

/// Key text for error messages; lists and mappings are rejected as keys
fn key_name(key: &Value, source_name: &str) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => Err(CoreError::schema(
            source_name,
            "configuration keys must be scalars",
        )),
    }
}

/// Scalar values as written; YAML null reads as `None`
type TextMap = IndexMap<String, Option<String>>;

fn entries(map: TextMap, secret: bool) -> Vec<ConfigEntry> {
    map.into_iter()
        .map(|(key, value)| ConfigEntry {
            key,
            value: value.unwrap_or_default(),
            secret,
        })
        .collect()
}

/// Native document text: top-level entries plus component blocks
#[derive(Debug, Default)]
struct NativeText {
    global: TextMap,
    blocks: Vec<BlockText>,
}

#[derive(Debug, Deserialize)]
struct BlockText {
    name: String,
    #[serde(default)]
    configuration: Option<TextMap>,
}

impl<'de> Deserialize<'de> for NativeText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct NativeVisitor;

        impl<'de> Visitor<'de> for NativeVisitor {
            type Value = NativeText;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of configuration entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<NativeText, A::Error> {
                let mut native = NativeText::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == COMPONENTS_KEY {
                        native.blocks = map.next_value()?;
                    } else {
                        native.global.insert(key, map.next_value()?);
                    }
                }
                Ok(native)
            }
        }

        deserializer.deserialize_map(NativeVisitor)
    }
}

/// ConfigMap/Secret document text; other fields are ignored
#[derive(Debug, Deserialize)]
struct ResourceText {
    #[serde(default)]
    data: Option<TextMap>,
    #[serde(default, rename = "stringData")]
    string_data: Option<TextMap>,
}

impl ResourceText {
    fn entries(self, secret: bool, source_name: &str) -> Result<Vec<ConfigEntry>> {
        let data = self.data.unwrap_or_default();
        if !secret {
            return Ok(entries(data, false));
        }

        let mut decoded = data
            .into_iter()
            .map(|(key, encoded)| {
                let value = decode_base64(&key, encoded.as_deref().unwrap_or_default(), source_name)?;
                Ok(ConfigEntry::secret(key, value))
            })
            .collect::<Result<Vec<_>>>()?;
        decoded.extend(entries(self.string_data.unwrap_or_default(), true));
        Ok(decoded)
    }
}

fn decode_base64(key: &str, encoded: &str, source_name: &str) -> Result<String> {
    STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| {
            CoreError::schema(
                source_name,
                format!("secret value of '{}' is not valid base64 text", key),
            )
        })
}
