//! The schema registry and its builder.
//!
//! A [`SchemaRegistry`] owns the contributors and package metadata, and
//! generates the package schema on demand. The generated document is cached
//! until the next configuration change.
//!
//! # Example
//!
//! ```
//! use provider_schema_core::{ModuleMap, ResourceSpec};
//! use provider_schema_registry::{RuntimeInformation, SchemaRegistry, StaticContributor};
//!
//! let registry = SchemaRegistry::builder()
//!     .with_resource(StaticContributor::new("aws:vpc:Subnet", ResourceSpec::new("A subnet")))
//!     .with_module_map([("vpc", "networking")].into_iter().collect::<ModuleMap>())
//!     .with_description("Demo provider")
//!     .build();
//!
//! let info = RuntimeInformation::new("demo", "1.0.0");
//! let schema = registry.get_schema(&info).unwrap();
//! assert!(schema.contains("\"demo:networking:Subnet\""));
//! assert!(registry.is_cached());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use provider_schema_core::{
    Collection, Diagnostic, FunctionSpec, ModuleMap, PackageSpec, ResourceSpec,
    dangling_references,
};
use tracing::{debug, info, warn};

use crate::config::ProviderMetadata;
use crate::contributor::{Contributor, FunctionContributor, ResourceContributor};
use crate::error::{ContributionErrors, Result};
use crate::harvest::{harvest, harvest_one};
use crate::registrar::TypeRegistrar;
use crate::runtime::{RuntimeContext, RuntimeInformation};

/// Everything a registry generates from: contributors and metadata.
#[derive(Default)]
pub struct RegistryConfig {
    resources: Vec<ResourceContributor>,
    functions: Vec<FunctionContributor>,
    provider: Option<ResourceContributor>,
    metadata: ProviderMetadata,
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("resources", &self.resources.len())
            .field("functions", &self.functions.len())
            .field("provider", &self.provider.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl RegistryConfig {
    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ProviderMetadata {
        &mut self.metadata
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn add_resource(&mut self, contributor: impl Contributor<Fragment = ResourceSpec> + Send + 'static) {
        self.resources.push(Box::new(contributor));
    }

    /// Appends resource contributors; order is preserved and later
    /// contributors win on token collisions.
    pub fn add_resources(&mut self, contributors: impl IntoIterator<Item = ResourceContributor>) {
        self.resources.extend(contributors);
    }

    pub fn add_function(&mut self, contributor: impl Contributor<Fragment = FunctionSpec> + Send + 'static) {
        self.functions.push(Box::new(contributor));
    }

    pub fn add_functions(&mut self, contributors: impl IntoIterator<Item = FunctionContributor>) {
        self.functions.extend(contributors);
    }

    /// Replaces the provider contributor.
    pub fn set_provider_resource(
        &mut self,
        contributor: impl Contributor<Fragment = ResourceSpec> + Send + 'static,
    ) {
        self.provider = Some(Box::new(contributor));
    }

    pub fn merge_module_map(&mut self, modules: ModuleMap) {
        self.metadata.module_map.merge(modules);
    }

    pub fn merge_language_map(&mut self, languages: BTreeMap<String, serde_json::Value>) {
        self.metadata.languages.extend(languages);
    }

    pub fn merge_metadata(&mut self, metadata: ProviderMetadata) {
        self.metadata.merge(metadata);
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.metadata.description = Some(description.into());
    }

    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.metadata.display_name = Some(display_name.into());
    }

    pub fn add_keywords<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.keywords.extend(keywords.into_iter().map(Into::into));
    }

    pub fn set_homepage(&mut self, homepage: impl Into<String>) {
        self.metadata.homepage = Some(homepage.into());
    }

    pub fn set_repository(&mut self, repository: impl Into<String>) {
        self.metadata.repository = Some(repository.into());
    }

    pub fn set_publisher(&mut self, publisher: impl Into<String>) {
        self.metadata.publisher = Some(publisher.into());
    }

    pub fn set_logo_url(&mut self, logo_url: impl Into<String>) {
        self.metadata.logo_url = Some(logo_url.into());
    }

    pub fn set_license(&mut self, license: impl Into<String>) {
        self.metadata.license = Some(license.into());
    }

    pub fn set_plugin_download_url(&mut self, url: impl Into<String>) {
        self.metadata.plugin_download_url = Some(url.into());
    }
}

/// Builder for [`SchemaRegistry`].
///
/// Every method consumes and returns the builder. Map-valued options merge
/// into what was set before; keywords append.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    config: RegistryConfig,
}

impl SchemaRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(
        mut self,
        contributor: impl Contributor<Fragment = ResourceSpec> + Send + 'static,
    ) -> Self {
        self.config.add_resource(contributor);
        self
    }

    pub fn with_resources(mut self, contributors: impl IntoIterator<Item = ResourceContributor>) -> Self {
        self.config.add_resources(contributors);
        self
    }

    pub fn with_function(
        mut self,
        contributor: impl Contributor<Fragment = FunctionSpec> + Send + 'static,
    ) -> Self {
        self.config.add_function(contributor);
        self
    }

    pub fn with_functions(mut self, contributors: impl IntoIterator<Item = FunctionContributor>) -> Self {
        self.config.add_functions(contributors);
        self
    }

    pub fn with_provider_resource(
        mut self,
        contributor: impl Contributor<Fragment = ResourceSpec> + Send + 'static,
    ) -> Self {
        self.config.set_provider_resource(contributor);
        self
    }

    pub fn with_module_map(mut self, modules: ModuleMap) -> Self {
        self.config.merge_module_map(modules);
        self
    }

    pub fn with_language_map(mut self, languages: BTreeMap<String, serde_json::Value>) -> Self {
        self.config.merge_language_map(languages);
        self
    }

    /// Applies loaded metadata on top of what the builder already holds.
    pub fn with_metadata(mut self, metadata: ProviderMetadata) -> Self {
        self.config.merge_metadata(metadata);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.config.set_description(description);
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.config.set_display_name(display_name);
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.add_keywords(keywords);
        self
    }

    pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
        self.config.set_homepage(homepage);
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.config.set_repository(repository);
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.config.set_publisher(publisher);
        self
    }

    pub fn with_logo_url(mut self, logo_url: impl Into<String>) -> Self {
        self.config.set_logo_url(logo_url);
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.config.set_license(license);
        self
    }

    pub fn with_plugin_download_url(mut self, url: impl Into<String>) -> Self {
        self.config.set_plugin_download_url(url);
        self
    }

    pub fn build(self) -> SchemaRegistry {
        debug!(
            resources = self.config.resource_count(),
            functions = self.config.function_count(),
            provider = self.config.has_provider(),
            "Built schema registry"
        );
        SchemaRegistry {
            state: Mutex::new(RegistryState {
                config: self.config,
                cache: CacheSlot::Empty,
            }),
        }
    }
}

/// A successful generation.
#[derive(Debug)]
struct Generated {
    schema: Arc<str>,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
enum CacheSlot {
    Empty,
    Ready(Generated),
}

#[derive(Debug)]
struct RegistryState {
    config: RegistryConfig,
    cache: CacheSlot,
}

impl RegistryState {
    fn invalidate(&mut self) {
        if matches!(self.cache, CacheSlot::Ready(_)) {
            debug!("Schema cache invalidated");
        }
        self.cache = CacheSlot::Empty;
    }
}

/// Composes contributor fragments into a package schema.
///
/// Safe to share between threads: configuration changes and schema requests
/// are serialized, and a request never observes a cache built from an older
/// configuration.
#[derive(Debug)]
pub struct SchemaRegistry {
    state: Mutex<RegistryState>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        SchemaRegistryBuilder::new().build()
    }
}

impl SchemaRegistry {
    /// Returns a new [`SchemaRegistryBuilder`].
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    /// Applies `f` to the configuration and invalidates the cached schema.
    ///
    /// ```
    /// use provider_schema_registry::SchemaRegistry;
    ///
    /// let registry = SchemaRegistry::default();
    /// registry.configure(|config| {
    ///     config.set_description("Demo");
    ///     config.add_keywords(["demo"]);
    /// });
    /// ```
    pub fn configure<R>(&self, f: impl FnOnce(&mut RegistryConfig) -> R) -> R {
        let mut state = self.state.lock();
        let result = f(&mut state.config);
        state.invalidate();
        result
    }

    pub fn add_resources(&self, contributors: impl IntoIterator<Item = ResourceContributor>) {
        self.configure(|config| config.add_resources(contributors));
    }

    pub fn add_functions(&self, contributors: impl IntoIterator<Item = FunctionContributor>) {
        self.configure(|config| config.add_functions(contributors));
    }

    pub fn set_provider_resource(
        &self,
        contributor: impl Contributor<Fragment = ResourceSpec> + Send + 'static,
    ) {
        self.configure(|config| config.set_provider_resource(contributor));
    }

    pub fn merge_module_map(&self, modules: ModuleMap) {
        self.configure(|config| config.merge_module_map(modules));
    }

    pub fn merge_language_map(&self, languages: BTreeMap<String, serde_json::Value>) {
        self.configure(|config| config.merge_language_map(languages));
    }

    pub fn merge_metadata(&self, metadata: ProviderMetadata) {
        self.configure(|config| config.merge_metadata(metadata));
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.configure(|config| config.set_description(description));
    }

    pub fn set_display_name(&self, display_name: impl Into<String>) {
        self.configure(|config| config.set_display_name(display_name));
    }

    pub fn add_keywords<I, S>(&self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configure(|config| config.add_keywords(keywords));
    }

    pub fn set_homepage(&self, homepage: impl Into<String>) {
        self.configure(|config| config.set_homepage(homepage));
    }

    pub fn set_repository(&self, repository: impl Into<String>) {
        self.configure(|config| config.set_repository(repository));
    }

    pub fn set_publisher(&self, publisher: impl Into<String>) {
        self.configure(|config| config.set_publisher(publisher));
    }

    pub fn set_logo_url(&self, logo_url: impl Into<String>) {
        self.configure(|config| config.set_logo_url(logo_url));
    }

    pub fn set_license(&self, license: impl Into<String>) {
        self.configure(|config| config.set_license(license));
    }

    pub fn set_plugin_download_url(&self, url: impl Into<String>) {
        self.configure(|config| config.set_plugin_download_url(url));
    }

    /// Drops the cached schema without changing the configuration.
    pub fn invalidate(&self) {
        self.state.lock().invalidate();
    }

    /// Returns `true` if a generated schema is cached.
    pub fn is_cached(&self) -> bool {
        matches!(self.state.lock().cache, CacheSlot::Ready(_))
    }

    /// Diagnostics from the cached generation, or an empty list when nothing
    /// is cached.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match &self.state.lock().cache {
            CacheSlot::Ready(generated) => generated.diagnostics.clone(),
            CacheSlot::Empty => Vec::new(),
        }
    }

    /// Returns the serialized package schema, generating it on a cache miss.
    ///
    /// The package name and version come from `ctx` at generation time; a
    /// cached schema is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns [`Contributions`](crate::RegistryError::Contributions) listing
    /// every contributor that failed, or
    /// [`Language`](crate::RegistryError::Language) if a language entry
    /// cannot be serialized. The cache stays empty on failure.
    pub fn get_schema<C: RuntimeContext + ?Sized>(&self, ctx: &C) -> Result<Arc<str>> {
        let mut state = self.state.lock();
        if let CacheSlot::Ready(generated) = &state.cache {
            return Ok(Arc::clone(&generated.schema));
        }

        let info = ctx.runtime_information();
        let generated = generate(&state.config, &info)?;
        let schema = Arc::clone(&generated.schema);
        state.cache = CacheSlot::Ready(generated);
        Ok(schema)
    }
}

fn generate(config: &RegistryConfig, info: &RuntimeInformation) -> Result<Generated> {
    let metadata = &config.metadata;
    let mut package = PackageSpec::new(info.package_name.as_str(), info.version.as_str());
    metadata.apply_to(&mut package);
    package.language = metadata.language_blobs()?;

    let mut diagnostics = Vec::new();
    let mut errors = ContributionErrors::default();
    {
        let PackageSpec {
            types,
            resources,
            functions,
            provider,
            ..
        } = &mut package;
        let mut registrar = TypeRegistrar::new(
            &info.package_name,
            &metadata.module_map,
            types,
            &mut diagnostics,
        );

        harvest(
            &config.resources,
            Collection::Resources,
            &mut registrar,
            resources,
            &mut errors,
        );
        harvest(
            &config.functions,
            Collection::Functions,
            &mut registrar,
            functions,
            &mut errors,
        );
        if let Some(contributor) = &config.provider {
            match harvest_one(&**contributor, &mut registrar) {
                Ok((_, spec)) => *provider = Some(spec),
                Err(err) => errors.push(err),
            }
        }
    }

    errors.into_result()?;

    diagnostics.extend(
        dangling_references(&package)
            .into_iter()
            .map(|reference| Diagnostic::DanglingReference { reference }),
    );

    let schema = serde_json::to_string(&package)?;
    for diagnostic in &diagnostics {
        warn!(package = %package.name, %diagnostic, "Schema diagnostic");
    }
    info!(
        package = %package.name,
        version = %package.version,
        resources = package.resources.len(),
        functions = package.functions.len(),
        types = package.types.len(),
        "Generated package schema"
    );

    Ok(Generated {
        schema: Arc::from(schema),
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contributor::StaticContributor;
    use crate::error::RegistryError;
    use provider_schema_core::{PropertySpec, TypeSpec};
    use serde_json::Value;

    fn info() -> RuntimeInformation {
        RuntimeInformation::new("pkg", "1.2.3")
    }

    fn parse(schema: &str) -> Value {
        serde_json::from_str(schema).unwrap()
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaRegistry>();
    }

    #[test]
    fn test_empty_registry_generates_minimal_package() {
        let registry = SchemaRegistry::default();
        let schema = parse(&registry.get_schema(&info()).unwrap());
        assert_eq!(schema["name"], "pkg");
        assert_eq!(schema["version"], "1.2.3");
        assert!(schema.get("resources").is_none());
        assert!(schema.get("provider").is_none());
    }

    #[test]
    fn test_metadata_is_applied() {
        let registry = SchemaRegistry::builder()
            .with_display_name("Package")
            .with_description("Demo")
            .with_keywords(["a", "b"])
            .with_keywords(["c"])
            .with_homepage("https://example.com")
            .with_repository("https://example.com/repo")
            .with_publisher("Example")
            .with_logo_url("https://example.com/logo.png")
            .with_license("Apache-2.0")
            .with_plugin_download_url("https://example.com/plugins")
            .build();

        let schema = parse(&registry.get_schema(&info()).unwrap());
        assert_eq!(schema["displayName"], "Package");
        assert_eq!(schema["description"], "Demo");
        assert_eq!(schema["keywords"], serde_json::json!(["a", "b", "c"]));
        assert_eq!(schema["license"], "Apache-2.0");
        assert_eq!(schema["logoUrl"], "https://example.com/logo.png");
        assert_eq!(schema["pluginDownloadURL"], "https://example.com/plugins");
    }

    #[test]
    fn test_cached_schema_is_shared() {
        let registry = SchemaRegistry::builder()
            .with_resource(StaticContributor::new("pkg:index:Thing", ResourceSpec::new("t")))
            .build();
        assert!(!registry.is_cached());

        let first = registry.get_schema(&info()).unwrap();
        let second = registry.get_schema(&info()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_every_mutation_invalidates() {
        let registry = SchemaRegistry::default();
        let mutations: Vec<Box<dyn Fn(&SchemaRegistry)>> = vec![
            Box::new(|r: &SchemaRegistry| r.merge_module_map(ModuleMap::new())),
            Box::new(|r: &SchemaRegistry| r.merge_language_map(BTreeMap::new())),
            Box::new(|r: &SchemaRegistry| r.set_description("d")),
            Box::new(|r: &SchemaRegistry| r.add_keywords(Vec::<String>::new())),
            Box::new(|r: &SchemaRegistry| r.add_resources(Vec::<ResourceContributor>::new())),
            Box::new(|r: &SchemaRegistry| r.add_functions(Vec::<FunctionContributor>::new())),
            Box::new(|r: &SchemaRegistry| r.set_license("MIT")),
            Box::new(|r: &SchemaRegistry| r.invalidate()),
        ];

        for mutate in mutations {
            registry.get_schema(&info()).unwrap();
            assert!(registry.is_cached());
            mutate(&registry);
            assert!(!registry.is_cached());
        }
    }

    #[test]
    fn test_language_entries_pass_through() {
        let mut languages = BTreeMap::new();
        languages.insert(
            "go".to_string(),
            serde_json::json!({ "importBasePath": "example.com/pkg", "generics": true }),
        );
        let registry = SchemaRegistry::builder().with_language_map(languages).build();

        let schema = parse(&registry.get_schema(&info()).unwrap());
        assert_eq!(schema["language"]["go"]["importBasePath"], "example.com/pkg");
        assert_eq!(schema["language"]["go"]["generics"], true);
    }

    #[test]
    fn test_provider_failure_is_reported() {
        let registry = SchemaRegistry::builder()
            .with_provider_resource(StaticContributor::new("provider", ResourceSpec::default()))
            .build();

        let err = registry.get_schema(&info()).unwrap_err();
        match err {
            RegistryError::Contributions(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!registry.is_cached());
    }

    #[test]
    fn test_diagnostics_follow_cache() {
        let registry = SchemaRegistry::builder()
            .with_function(StaticContributor::new("pkg:index:getA", FunctionSpec::new("a")))
            .with_function(StaticContributor::new("pkg:index:getA", FunctionSpec::new("b")))
            .build();
        assert!(registry.diagnostics().is_empty());

        registry.get_schema(&info()).unwrap();
        assert_eq!(
            registry.diagnostics(),
            vec![Diagnostic::DuplicateToken {
                collection: Collection::Functions,
                token: "pkg:index:getA".into(),
            }]
        );

        registry.invalidate();
        assert!(registry.diagnostics().is_empty());
    }

    #[test]
    fn test_unregistered_type_is_reported_as_dangling() {
        let subnet = ResourceSpec::new("subnet").with_input(
            "net",
            PropertySpec::new(TypeSpec::reference("#/types/upstream:vpc:Net")),
            true,
        );
        let registry = SchemaRegistry::builder()
            .with_resource(StaticContributor::new("upstream:vpc:Subnet", subnet))
            .build();

        let schema = parse(&registry.get_schema(&info()).unwrap());
        assert_eq!(
            schema["resources"]["pkg:vpc:Subnet"]["inputProperties"]["net"]["$ref"],
            "#/types/pkg:vpc:Net"
        );
        assert_eq!(
            registry.diagnostics(),
            vec![Diagnostic::DanglingReference {
                reference: "#/types/pkg:vpc:Net".into(),
            }]
        );
    }
}
