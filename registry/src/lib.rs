//! Composition of provider package schemas from independent contributors.
//!
//! This crate turns a set of resource, function, and provider contributors
//! into one package schema document. Contributor tokens and every internal
//! reference inside their fragments are re-homed under the host's package
//! name, with module segments renamed through a [`ModuleMap`].
//!
//! # Quick start
//!
//! ```
//! use provider_schema_core::*;
//! use provider_schema_registry::{RuntimeInformation, SchemaRegistry, StaticContributor};
//!
//! let subnet = StaticContributor::new(
//!     "upstream:vpc:Subnet",
//!     ResourceSpec::new("A subnet").with_input(
//!         "cidr",
//!         PropertySpec::new(TypeSpec::reference("#/types/upstream:vpc:CidrBlock")),
//!         true,
//!     ),
//! )
//! .with_type("upstream:vpc:CidrBlock", ComplexTypeSpec::object(ObjectTypeSpec::new()));
//!
//! let registry = SchemaRegistry::builder()
//!     .with_resource(subnet)
//!     .with_module_map([("vpc", "networking")].into_iter().collect::<ModuleMap>())
//!     .build();
//!
//! let schema = registry
//!     .get_schema(&RuntimeInformation::new("cloud", "1.0.0"))
//!     .unwrap();
//! assert!(schema.contains("\"cloud:networking:Subnet\""));
//! assert!(schema.contains("#/types/cloud:networking:CidrBlock"));
//! ```
//!
//! # Composing from files
//!
//! [`ComposeManifest`] reads package metadata and fragment file lists from
//! YAML and produces a [`SchemaRegistryBuilder`].
//!
//! [`ModuleMap`]: provider_schema_core::ModuleMap

mod config;
mod contributor;
mod error;
mod harvest;
mod registrar;
mod registry;
mod runtime;

pub use config::{ComposeManifest, ProviderMetadata};
pub use contributor::{Contributor, FunctionContributor, ResourceContributor, StaticContributor};
pub use error::{BoxError, ContributionError, ContributionErrors, RegistryError, Result};
pub use registrar::TypeRegistrar;
pub use registry::{RegistryConfig, SchemaRegistry, SchemaRegistryBuilder};
pub use runtime::{RuntimeContext, RuntimeInformation};
