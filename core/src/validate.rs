//! Package consistency checks.
//!
//! Verifies the structural invariants of a composed [`PackageSpec`]: every
//! map key is a token qualified under the package name, and every internal
//! reference points at an entry that exists in the document.
//!
//! # Examples
//!
//! ```
//! use provider_schema_core::*;
//!
//! let mut package = PackageSpec::new("pkg", "1.0.0");
//! package.resources.insert(
//!     "pkg:index:Bucket".into(),
//!     ResourceSpec::new("A bucket").with_input(
//!         "policy",
//!         PropertySpec::new(TypeSpec::reference("#/types/pkg:index:Policy")),
//!         false,
//!     ),
//! );
//!
//! let errors = validate_package(&package);
//! assert_eq!(
//!     errors,
//!     vec![ValidationError::DanglingReference("#/types/pkg:index:Policy".into())],
//! );
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::rewrite::{SchemaNode, VisitRefs};
use crate::spec::INTERNAL_REF_PREFIX;
use crate::{Collection, PackageSpec, Token};

const PROVIDER_REFERENCE: &str = "#/provider";

/// Package validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Package name is empty or whitespace-only.
    #[error("package name cannot be empty")]
    EmptyPackageName,
    /// A map key is not a `package:module:name` token.
    #[error("invalid token key in {collection}: {key}")]
    InvalidKey { collection: Collection, key: String },
    /// A map key is qualified under a different package.
    #[error("token {key} in {collection} does not belong to package {package}")]
    ForeignKey {
        collection: Collection,
        key: String,
        package: String,
    },
    /// An internal reference names an entry that does not exist.
    #[error("dangling reference: {0}")]
    DanglingReference(String),
    /// An internal reference uses a kind other than types, resources, or
    /// functions.
    #[error("unknown reference kind in {0}")]
    UnknownReferenceKind(String),
    /// An internal reference target is not a token.
    #[error("malformed reference: {0}")]
    MalformedReference(String),
}

/// Validates a composed package.
///
/// Unlike composition itself, which tolerates malformed references, this
/// reports every problem it finds.
pub fn validate_package(package: &PackageSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if package.name.trim().is_empty() {
        errors.push(ValidationError::EmptyPackageName);
        return errors;
    }

    errors.extend(validate_keys(&package.name, Collection::Types, &package.types));
    errors.extend(validate_keys(
        &package.name,
        Collection::Resources,
        &package.resources,
    ));
    errors.extend(validate_keys(
        &package.name,
        Collection::Functions,
        &package.functions,
    ));

    for reference in collect_references(package) {
        if let Some(error) = check_reference(package, &reference) {
            errors.push(error);
        }
    }

    errors
}

/// Token-targeted internal references in `package` that name an entry it
/// does not contain, each listed once in walk order.
///
/// Malformed references, unknown kinds, and `#/provider` are not included.
pub fn dangling_references(package: &PackageSpec) -> Vec<String> {
    collect_references(package)
        .into_iter()
        .filter(|reference| reference != PROVIDER_REFERENCE)
        .filter(|reference| {
            matches!(
                check_reference(package, reference),
                Some(ValidationError::DanglingReference(_))
            )
        })
        .collect()
}

fn collect_references(package: &PackageSpec) -> Vec<String> {
    let mut walked = package.clone();
    let mut collector = RefCollector::default();
    walked.walk_refs(&mut collector);
    collector.references
}

fn validate_keys<T>(
    package: &str,
    collection: Collection,
    entries: &BTreeMap<String, T>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for key in entries.keys() {
        match Token::parse(key) {
            Ok(token) if token.package() != package => {
                errors.push(ValidationError::ForeignKey {
                    collection,
                    key: key.clone(),
                    package: package.to_string(),
                });
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::InvalidKey {
                collection,
                key: key.clone(),
            }),
        }
    }

    errors
}

fn check_reference(package: &PackageSpec, reference: &str) -> Option<ValidationError> {
    let rest = reference.strip_prefix(INTERNAL_REF_PREFIX)?;
    let Some((kind, target)) = rest.split_once('/') else {
        return match rest {
            "provider" if package.provider.is_some() => None,
            "provider" => Some(ValidationError::DanglingReference(reference.to_string())),
            "types" | "resources" | "functions" => {
                Some(ValidationError::MalformedReference(reference.to_string()))
            }
            _ => Some(ValidationError::UnknownReferenceKind(reference.to_string())),
        };
    };

    if Token::parse(target).is_err() {
        return Some(ValidationError::MalformedReference(reference.to_string()));
    }

    let exists = match kind {
        "types" => package.types.contains_key(target),
        "resources" => package.resources.contains_key(target),
        "functions" => package.functions.contains_key(target),
        _ => return Some(ValidationError::UnknownReferenceKind(reference.to_string())),
    };

    if exists {
        None
    } else {
        Some(ValidationError::DanglingReference(reference.to_string()))
    }
}

#[derive(Default)]
struct RefCollector {
    references: Vec<String>,
}

impl VisitRefs for RefCollector {
    fn visit_ref(&mut self, reference: &mut String) {
        if !self.references.contains(reference) {
            self.references.push(reference.clone());
        }
    }
}
