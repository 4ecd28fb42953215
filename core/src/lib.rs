//! Core types for composing provider package schemas.
//!
//! This crate defines the pieces that do not depend on how contributors are
//! registered or how the document is served:
//!
//! - [`Token`]: a `package:module:name` qualified symbol, and [`ModuleMap`]
//!   with [`assign_to`] for re-qualifying tokens under a package.
//! - [`PackageSpec`] and its node kinds ([`ResourceSpec`], [`FunctionSpec`],
//!   [`ComplexTypeSpec`], [`ObjectTypeSpec`], [`PropertySpec`],
//!   [`TypeSpec`]).
//! - [`ReferenceRewriter`] walks any [`SchemaNode`] and rewrites internal
//!   `#/<kind>/<token>` references, reporting malformed ones as
//!   [`Diagnostic`]s.
//! - [`validate_package`] checks that keys and references in a composed
//!   package are consistent.
//!
//! # Example
//!
//! ```
//! use provider_schema_core::*;
//!
//! let modules: ModuleMap = [("vpc", "networking")].into_iter().collect();
//! let subnet = Token::parse("pkg:vpc:Subnet").unwrap();
//! let cidr = Token::parse("pkg:vpc:CidrBlock").unwrap();
//!
//! let mut resource = ResourceSpec::new("A subnet")
//!     .with_input("cidr", PropertySpec::new(TypeSpec::reference_to(&cidr)), true);
//! ReferenceRewriter::new("pkg", &modules).rewrite(&mut resource);
//!
//! let mut package = PackageSpec::new("pkg", "1.0.0");
//! package.types.insert(
//!     assign_to(&cidr, "pkg", &modules).to_string(),
//!     ComplexTypeSpec::object(ObjectTypeSpec::new()),
//! );
//! package
//!     .resources
//!     .insert(assign_to(&subnet, "pkg", &modules).to_string(), resource);
//!
//! assert!(package.resources.contains_key("pkg:networking:Subnet"));
//! assert!(validate_package(&package).is_empty());
//! ```

mod diagnostic;
mod rewrite;
mod spec;
mod token;
mod validate;

pub use diagnostic::{Collection, Diagnostic};
pub use rewrite::{
    MalformedReference, ReferenceRewrite, ReferenceRewriter, SchemaNode, VisitRefs,
    rewrite_reference,
};
pub use spec::*;
pub use token::{ModuleMap, TOKEN_DELIMITER, Token, TokenError, assign_to};
pub use validate::{ValidationError, dangling_references, validate_package};
