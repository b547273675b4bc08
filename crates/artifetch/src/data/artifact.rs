use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Storage backend an artifact lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendType {
    /// Hierarchical file container addressed as `#/{container id}/{root}`.
    Container,
    /// Content-addressable (deduplicated) store addressed by manifest id.
    ContentAddressable,
    /// A directory on a file share.
    FileShare,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Container => "Container",
            BackendType::ContentAddressable => "PipelineArtifact",
            BackendType::FileShare => "FilePath",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "container" | "filecontainer" => Ok(BackendType::Container),
            "pipelineartifact" | "contentaddressable" | "dedup" => Ok(BackendType::ContentAddressable),
            "filepath" | "fileshare" => Ok(BackendType::FileShare),
            _ => Err(Error::UnknownBackend(tag.to_string())),
        }
    }
}

/// An artifact as published by a build: its name, where it lives and how
/// to find it there.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ArtifactDescriptor {
    pub name: String,
    /// Backend tag, parsed with [`BackendType::from_str`].
    #[serde(rename = "type")]
    pub backend_type: String,
    /// Backend-specific locator string.
    pub resource_data: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl ArtifactDescriptor {
    pub fn new(name: impl Into<String>, backend: BackendType, resource_data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend_type: backend.as_str().to_string(),
            resource_data: resource_data.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn backend(&self) -> Result<BackendType> {
        self.backend_type.parse()
    }

    /// Case-insensitive property lookup.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    fn invalid(&self, reason: &'static str) -> Error {
        Error::InvalidLocator {
            artifact: self.name.clone(),
            locator: self.resource_data.clone(),
            reason,
        }
    }
}

/// Parsed `#/{container id}/{root path}` locator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerLocator {
    pub container_id: u64,
    /// Root folder inside the container; empty for the whole container.
    pub root: String,
}

impl ContainerLocator {
    pub fn parse(artifact: &ArtifactDescriptor) -> Result<Self> {
        let data = artifact.resource_data.trim();
        let rest = data
            .strip_prefix("#/")
            .ok_or_else(|| artifact.invalid("expected '#/{container id}/{path}'"))?;
        let (id, root) = rest.split_once('/').unwrap_or((rest, ""));
        let container_id = id
            .parse::<u64>()
            .map_err(|_| artifact.invalid("container id is not a number"))?;
        Ok(Self {
            container_id,
            root: root.trim_matches('/').to_string(),
        })
    }
}

/// Partition of the content-addressable store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(String);

impl DomainId {
    pub const DEFAULT: &'static str = "default";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for DomainId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ManifestId(String);

impl ManifestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ManifestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Manifest id plus the domain holding it. The domain comes from the
/// artifact's `domain` property and falls back to [`DomainId::DEFAULT`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DedupLocator {
    pub manifest: ManifestId,
    pub domain: DomainId,
}

impl DedupLocator {
    pub fn parse(artifact: &ArtifactDescriptor) -> Result<Self> {
        let manifest = artifact.resource_data.trim();
        if manifest.is_empty() {
            return Err(artifact.invalid("missing manifest id"));
        }
        let domain = artifact
            .property("domain")
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(DomainId::new)
            .unwrap_or_default();
        Ok(Self {
            manifest: ManifestId::new(manifest),
            domain,
        })
    }
}

/// Source directory of a file-share artifact.
pub fn share_path(artifact: &ArtifactDescriptor) -> Result<PathBuf> {
    let data = artifact.resource_data.trim();
    if data.is_empty() {
        return Err(artifact.invalid("missing share path"));
    }
    Ok(PathBuf::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_tags() {
        assert_eq!("Container".parse::<BackendType>().unwrap(), BackendType::Container);
        assert_eq!("filepath".parse::<BackendType>().unwrap(), BackendType::FileShare);
        assert_eq!(
            "PipelineArtifact".parse::<BackendType>().unwrap(),
            BackendType::ContentAddressable
        );
        assert!(matches!(
            "GitRef".parse::<BackendType>(),
            Err(Error::UnknownBackend(tag)) if tag == "GitRef"
        ));
    }

    #[test]
    fn test_container_locator() {
        let artifact = ArtifactDescriptor::new("drop", BackendType::Container, "#/1234/drop");
        let locator = ContainerLocator::parse(&artifact).unwrap();
        assert_eq!(locator.container_id, 1234);
        assert_eq!(locator.root, "drop");

        let nested = ArtifactDescriptor::new("d", BackendType::Container, "#/7/a/b/");
        assert_eq!(ContainerLocator::parse(&nested).unwrap().root, "a/b");

        let whole = ArtifactDescriptor::new("d", BackendType::Container, "#/7");
        assert_eq!(ContainerLocator::parse(&whole).unwrap().root, "");
    }

    #[test]
    fn test_container_locator_rejects_garbage() {
        for data in ["1234/drop", "#/abc/drop", ""] {
            let artifact = ArtifactDescriptor::new("drop", BackendType::Container, data);
            assert!(matches!(
                ContainerLocator::parse(&artifact),
                Err(Error::InvalidLocator { .. })
            ));
        }
    }

    #[test]
    fn test_dedup_locator_domain() {
        let plain = ArtifactDescriptor::new("a", BackendType::ContentAddressable, "m1");
        assert_eq!(DedupLocator::parse(&plain).unwrap().domain, DomainId::default());

        let scoped = plain.clone().with_property("Domain", "eu");
        let locator = DedupLocator::parse(&scoped).unwrap();
        assert_eq!(locator.domain.as_str(), "eu");
        assert_eq!(locator.manifest.as_str(), "m1");
    }
}
