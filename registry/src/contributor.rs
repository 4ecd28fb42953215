//! Schema contributors.
//!
//! A contributor owns one entry of the composed package: it reports the token
//! the entry is keyed by and builds the fragment, registering any complex
//! types the fragment refers to along the way.
//!
//! # Example
//!
//! ```
//! use provider_schema_core::*;
//! use provider_schema_registry::{BoxError, Contributor, TypeRegistrar};
//!
//! struct Subnet;
//!
//! impl Contributor for Subnet {
//!     type Fragment = ResourceSpec;
//!
//!     fn token(&self) -> Result<Token, BoxError> {
//!         Ok(Token::parse("pkg:vpc:Subnet")?)
//!     }
//!
//!     fn schema(&self, registrar: &mut TypeRegistrar<'_>) -> Result<ResourceSpec, BoxError> {
//!         let cidr = Token::parse("pkg:vpc:CidrBlock")?;
//!         if !registrar.register(&cidr, ComplexTypeSpec::object(ObjectTypeSpec::new())) {
//!             // first sighting: register whatever CidrBlock depends on here
//!         }
//!         Ok(ResourceSpec::new("A subnet").with_input(
//!             "cidr",
//!             PropertySpec::new(TypeSpec::reference_to(&cidr)),
//!             true,
//!         ))
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::Path;

use provider_schema_core::{ComplexTypeSpec, FunctionSpec, ResourceSpec, Token};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{BoxError, Result};
use crate::registrar::TypeRegistrar;

/// One independently authored entry of the package schema.
pub trait Contributor {
    /// The fragment kind this contributor produces.
    type Fragment;

    /// Token the fragment is keyed by, before module remapping.
    fn token(&self) -> std::result::Result<Token, BoxError>;

    /// Builds the fragment, registering derivative types with `registrar`.
    fn schema(
        &self,
        registrar: &mut TypeRegistrar<'_>,
    ) -> std::result::Result<Self::Fragment, BoxError>;
}

/// A boxed resource-like contributor.
pub type ResourceContributor = Box<dyn Contributor<Fragment = ResourceSpec> + Send>;

/// A boxed function-like contributor.
pub type FunctionContributor = Box<dyn Contributor<Fragment = FunctionSpec> + Send>;

/// A contributor whose token, fragment, and derivative types are fixed data,
/// typically loaded from a JSON fragment file:
///
/// ```json
/// {
///   "token": "pkg:vpc:Subnet",
///   "schema": { "description": "A subnet" },
///   "types": { "pkg:vpc:CidrBlock": { "type": "object" } }
/// }
/// ```
///
/// The token is kept as text so that a malformed token surfaces as a
/// contributor failure during generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticContributor<S> {
    pub token: String,
    pub schema: S,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, ComplexTypeSpec>,
}

impl<S> StaticContributor<S> {
    pub fn new(token: impl Into<String>, schema: S) -> Self {
        Self {
            token: token.into(),
            schema,
            types: BTreeMap::new(),
        }
    }

    /// Adds a derivative type registered when the schema is requested.
    pub fn with_type(mut self, token: impl Into<String>, spec: ComplexTypeSpec) -> Self {
        self.types.insert(token.into(), spec);
        self
    }
}

impl<S: DeserializeOwned> StaticContributor<S> {
    /// Loads a fragment file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::RegistryError::Io) if the file cannot be read,
    /// or [`Json`](crate::RegistryError::Json) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl<S: Clone> Contributor for StaticContributor<S> {
    type Fragment = S;

    fn token(&self) -> std::result::Result<Token, BoxError> {
        Ok(Token::parse(&self.token)?)
    }

    fn schema(&self, registrar: &mut TypeRegistrar<'_>) -> std::result::Result<S, BoxError> {
        for (token, spec) in &self.types {
            let token = Token::parse(token)?;
            registrar.register(&token, spec.clone());
        }
        Ok(self.schema.clone())
    }
}
