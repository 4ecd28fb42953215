//! Package metadata and compose configuration.
//!
//! [`ProviderMetadata`] carries every package field a host cannot infer from
//! contributors. [`ComposeManifest`] extends it with the fragment files to
//! load, for composing a package from disk.
//!
//! # Example YAML
//!
//! ```yaml
//! display_name: Galaxy
//! description: Manage Galaxy clusters
//! keywords:
//!   - category/cloud
//! license: Apache-2.0
//! module_map:
//!   galaxy: index
//! languages:
//!   nodejs:
//!     packageName: "@example/galaxy"
//! resources:
//!   - fragments/cluster.json
//! functions:
//!   - fragments/get_region.json
//! provider: fragments/provider.json
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use provider_schema_core::{FunctionSpec, ModuleMap, PackageSpec, ResourceSpec};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::contributor::StaticContributor;
use crate::error::{RegistryError, Result};
use crate::registry::SchemaRegistryBuilder;

/// Package fields supplied by configuration rather than by contributors.
///
/// # Examples
///
/// ```
/// use provider_schema_registry::ProviderMetadata;
///
/// let yaml = "description: Demo\nkeywords: [demo]\nmodule_map: { vpc: networking }\n";
/// let metadata: ProviderMetadata = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(metadata.description.as_deref(), Some("Demo"));
/// assert_eq!(metadata.module_map.resolve("vpc"), "networking");
/// assert!(metadata.license.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_download_url: Option<String>,
    /// Module remapping applied to every token and internal reference.
    #[serde(skip_serializing_if = "ModuleMap::is_empty")]
    pub module_map: ModuleMap,
    /// Per-language settings, passed through to the package verbatim.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub languages: BTreeMap<String, serde_json::Value>,
}

impl ProviderMetadata {
    /// Loads metadata from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](RegistryError::Io) if the file cannot be read, or
    /// [`Yaml`](RegistryError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Saves the metadata as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Merges `other` into `self`.
    ///
    /// Scalar fields set in `other` replace ours, keywords are appended, and
    /// module and language maps are merged with `other` winning.
    pub fn merge(&mut self, other: ProviderMetadata) {
        fn take(slot: &mut Option<String>, incoming: Option<String>) {
            if incoming.is_some() {
                *slot = incoming;
            }
        }

        take(&mut self.display_name, other.display_name);
        take(&mut self.description, other.description);
        take(&mut self.homepage, other.homepage);
        take(&mut self.repository, other.repository);
        take(&mut self.publisher, other.publisher);
        take(&mut self.logo_url, other.logo_url);
        take(&mut self.license, other.license);
        take(&mut self.plugin_download_url, other.plugin_download_url);
        self.keywords.extend(other.keywords);
        self.module_map.merge(other.module_map);
        self.languages.extend(other.languages);
    }

    /// Copies the scalar fields and keywords onto `package`.
    pub fn apply_to(&self, package: &mut PackageSpec) {
        package.display_name = self.display_name.clone();
        package.description = self.description.clone();
        package.keywords = self.keywords.clone();
        package.homepage = self.homepage.clone();
        package.repository = self.repository.clone();
        package.publisher = self.publisher.clone();
        package.logo_url = self.logo_url.clone();
        package.license = self.license.clone();
        package.plugin_download_url = self.plugin_download_url.clone();
    }

    /// Serializes each language entry into an opaque JSON blob.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Language`] naming the first entry that fails.
    pub fn language_blobs(&self) -> Result<BTreeMap<String, Box<RawValue>>> {
        self.languages
            .iter()
            .map(|(language, value)| {
                serde_json::value::to_raw_value(value)
                    .map(|raw| (language.clone(), raw))
                    .map_err(|source| RegistryError::Language {
                        language: language.clone(),
                        source,
                    })
            })
            .collect()
    }
}

/// A compose configuration: package metadata plus fragment files.
///
/// Fragment paths are resolved relative to the directory containing the
/// configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeManifest {
    #[serde(flatten)]
    pub metadata: ProviderMetadata,
    /// Resource fragment files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<PathBuf>,
    /// Function fragment files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<PathBuf>,
    /// Provider fragment file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<PathBuf>,
}

impl ComposeManifest {
    /// Loads a compose configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](RegistryError::Io) if the file cannot be read, or
    /// [`Yaml`](RegistryError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Loads every fragment file and returns a builder configured with them
    /// and with this manifest's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](RegistryError::Io) or [`Json`](RegistryError::Json) for
    /// the first fragment file that cannot be loaded.
    pub fn into_builder(self, base_dir: &Path) -> Result<SchemaRegistryBuilder> {
        let mut builder = SchemaRegistryBuilder::new().with_metadata(self.metadata);

        for path in &self.resources {
            let contributor: StaticContributor<ResourceSpec> =
                StaticContributor::load(base_dir.join(path))?;
            builder = builder.with_resource(contributor);
        }
        for path in &self.functions {
            let contributor: StaticContributor<FunctionSpec> =
                StaticContributor::load(base_dir.join(path))?;
            builder = builder.with_function(contributor);
        }
        if let Some(path) = &self.provider {
            let contributor: StaticContributor<ResourceSpec> =
                StaticContributor::load(base_dir.join(path))?;
            builder = builder.with_provider_resource(contributor);
        }

        Ok(builder)
    }
}
