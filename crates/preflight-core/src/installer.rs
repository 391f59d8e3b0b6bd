//! Installer image lookup and replacement
//!
//! The installer ships as a `Deployment` among the installation manifests.
//! Its image reference lives at
//! `spec.template.spec.containers[name == <container>].image`.

use serde_yaml::Value;

use crate::error::{CoreError, Result};
use crate::manifest::ManifestDocument;

/// Container name the installer deployment uses by default
pub const DEFAULT_INSTALLER_CONTAINER: &str = "kyma-installer-container";

const DEPLOYMENT_KIND: &str = "Deployment";
const CONTAINERS_PATH: &[&str] = &["spec", "template", "spec", "containers"];
const IMAGE_FIELD: &str = "image";

/// Position of the installer container inside a document set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLocation {
    pub document: usize,
    pub container: usize,
}

/// Reads and rewrites the image of a named container in a Deployment
#[derive(Debug, Clone)]
pub struct ImagePatcher {
    container: String,
}

impl Default for ImagePatcher {
    fn default() -> Self {
        Self::new(DEFAULT_INSTALLER_CONTAINER)
    }
}

impl ImagePatcher {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Find the first Deployment holding the container; later documents are not scanned
    pub fn locate(&self, documents: &[ManifestDocument]) -> Option<ContainerLocation> {
        documents.iter().enumerate().find_map(|(document, doc)| {
            if doc.kind() != Some(DEPLOYMENT_KIND) {
                return None;
            }
            doc.get_sequence(CONTAINERS_PATH)?
                .iter()
                .position(|c| self.is_target(c))
                .map(|container| ContainerLocation { document, container })
        })
    }

    /// Read the container's image reference
    pub fn image<'a>(&self, documents: &'a [ManifestDocument]) -> Result<&'a str> {
        let location = self.locate(documents).ok_or_else(|| self.container_not_found())?;

        documents[location.document]
            .get_sequence(CONTAINERS_PATH)
            .and_then(|containers| containers.get(location.container))
            .and_then(|c| c.get(IMAGE_FIELD))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CoreError::not_found(
                    "installer image",
                    format!("container '{}' declares no image", self.container),
                )
            })
    }

    /// Overwrite the container's image reference in place
    ///
    /// The container is located before anything is touched, so a failed call
    /// leaves every document as it was. The `image` field is created when the
    /// container lacks one.
    pub fn replace_image(&self, documents: &mut [ManifestDocument], image: &str) -> Result<()> {
        let location = self.locate(documents).ok_or_else(|| self.container_not_found())?;

        let container = documents[location.document]
            .get_path_mut(CONTAINERS_PATH)
            .and_then(Value::as_sequence_mut)
            .and_then(|containers| containers.get_mut(location.container))
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| self.container_not_found())?;

        container.insert(
            Value::String(IMAGE_FIELD.to_string()),
            Value::String(image.to_string()),
        );
        tracing::debug!(container = %self.container, image, "replaced installer image");
        Ok(())
    }

    fn is_target(&self, container: &Value) -> bool {
        container.is_mapping()
            && container.get("name").and_then(Value::as_str) == Some(self.container.as_str())
    }

    fn container_not_found(&self) -> CoreError {
        CoreError::not_found(
            "installer container",
            format!(
                "no Deployment declares a container named '{}'",
                self.container
            ),
        )
    }
}

/// Read the installer image using the default container name
pub fn installer_image(documents: &[ManifestDocument]) -> Result<&str> {
    ImagePatcher::default().image(documents)
}

/// Replace the installer image using the default container name
pub fn replace_installer_image(documents: &mut [ManifestDocument], image: &str) -> Result<()> {
    ImagePatcher::default().replace_image(documents, image)
}
