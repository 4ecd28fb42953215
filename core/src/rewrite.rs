//! Internal reference rewriting.
//!
//! When contributor tokens are re-qualified under the composed package, every
//! `$ref` that points inside the document has to follow. [`SchemaNode`] is
//! implemented for each node kind of the schema model and walks every
//! reference it contains; [`ReferenceRewriter`] is the visitor that applies
//! the module remapping.
//!
//! # Example
//!
//! ```
//! use provider_schema_core::*;
//!
//! let modules: ModuleMap = [("vpc", "networking")].into_iter().collect();
//! let mut resource = ResourceSpec::new("A subnet").with_input(
//!     "cidr",
//!     PropertySpec::new(TypeSpec::reference("#/types/other:vpc:CidrBlock")),
//!     true,
//! );
//!
//! let mut rewriter = ReferenceRewriter::new("pkg", &modules);
//! rewriter.rewrite(&mut resource);
//! assert_eq!(
//!     resource.input_properties["cidr"].type_spec.reference.as_deref(),
//!     Some("#/types/pkg:networking:CidrBlock"),
//! );
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

use crate::spec::INTERNAL_REF_PREFIX;
use crate::{
    AliasSpec, ComplexTypeSpec, Diagnostic, EnumValueSpec, FunctionSpec, ModuleMap,
    ObjectTypeSpec, PackageSpec, PropertySpec, ResourceSpec, Token, TokenError, TypeSpec,
    assign_to,
};

/// Why an internal reference could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReference {
    /// The target after the kind segment is not a valid token.
    #[error("invalid target token: {0}")]
    Token(#[from] TokenError),
    /// Nothing follows the kind segment, as in `#/types`.
    #[error("no target after '{0}'")]
    MissingTarget(String),
}

/// Outcome of [`rewrite_reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceRewrite {
    /// Not an internal reference; left untouched.
    External,
    /// `#/provider`, the one internal reference without a token target.
    Untargeted,
    /// Internal reference rewritten to the given string.
    Internal(String),
    /// Internal reference whose target could not be parsed; left untouched.
    Malformed(MalformedReference),
}

/// Rewrites one `$ref` string under `package` and `modules`.
///
/// Internal references have the form `#/<kind>/<token>`; the kind segment is
/// preserved and the token is passed through [`assign_to`]. `#/provider` is
/// the only internal reference allowed to omit the token.
///
/// # Examples
///
/// ```
/// use provider_schema_core::{ModuleMap, ReferenceRewrite, rewrite_reference};
///
/// let modules: ModuleMap = [("vpc", "networking")].into_iter().collect();
///
/// assert_eq!(
///     rewrite_reference("#/types/aws:vpc:Cidr", "pkg", &modules),
///     ReferenceRewrite::Internal("#/types/pkg:networking:Cidr".into()),
/// );
/// assert_eq!(
///     rewrite_reference("/aws/v6.0.0/schema.json#/types/aws:vpc:Cidr", "pkg", &modules),
///     ReferenceRewrite::External,
/// );
/// assert!(matches!(
///     rewrite_reference("#/types/not-a-token", "pkg", &modules),
///     ReferenceRewrite::Malformed(_),
/// ));
/// ```
pub fn rewrite_reference(reference: &str, package: &str, modules: &ModuleMap) -> ReferenceRewrite {
    let Some(rest) = reference.strip_prefix(INTERNAL_REF_PREFIX) else {
        return ReferenceRewrite::External;
    };
    let Some((kind, target)) = rest.split_once('/') else {
        if rest == "provider" {
            return ReferenceRewrite::Untargeted;
        }
        return ReferenceRewrite::Malformed(MalformedReference::MissingTarget(rest.to_string()));
    };

    match Token::parse(target) {
        Ok(token) => ReferenceRewrite::Internal(format!(
            "{INTERNAL_REF_PREFIX}{kind}/{}",
            assign_to(&token, package, modules)
        )),
        Err(err) => ReferenceRewrite::Malformed(err.into()),
    }
}

/// Receives every `$ref` found while walking a [`SchemaNode`].
pub trait VisitRefs {
    fn visit_ref(&mut self, reference: &mut String);
}

/// A node of the schema model that may contain references.
pub trait SchemaNode {
    /// Calls `visitor` for every `$ref` reachable from this node, in
    /// declaration order.
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V);
}

impl SchemaNode for TypeSpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        if let Some(reference) = self.reference.as_mut() {
            visitor.visit_ref(reference);
        }
        self.items.walk_refs(visitor);
        self.additional_properties.walk_refs(visitor);
        self.one_of.walk_refs(visitor);
        if let Some(discriminator) = self.discriminator.as_mut() {
            for reference in discriminator.mapping.values_mut() {
                visitor.visit_ref(reference);
            }
        }
    }
}

impl SchemaNode for PropertySpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        self.type_spec.walk_refs(visitor);
    }
}

impl SchemaNode for ObjectTypeSpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        self.properties.walk_refs(visitor);
    }
}

impl SchemaNode for EnumValueSpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, _visitor: &mut V) {}
}

impl SchemaNode for AliasSpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, _visitor: &mut V) {}
}

impl SchemaNode for ComplexTypeSpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        self.object.walk_refs(visitor);
        self.enum_values.walk_refs(visitor);
    }
}

impl SchemaNode for ResourceSpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        self.object.walk_refs(visitor);
        self.input_properties.walk_refs(visitor);
        self.state_inputs.walk_refs(visitor);
        self.aliases.walk_refs(visitor);
    }
}

impl SchemaNode for FunctionSpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        self.inputs.walk_refs(visitor);
        self.outputs.walk_refs(visitor);
    }
}

/// Walks every entry; `language` settings are opaque and skipped.
impl SchemaNode for PackageSpec {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        self.types.walk_refs(visitor);
        self.provider.walk_refs(visitor);
        self.resources.walk_refs(visitor);
        self.functions.walk_refs(visitor);
    }
}

impl<T: SchemaNode> SchemaNode for Option<T> {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        if let Some(node) = self {
            node.walk_refs(visitor);
        }
    }
}

impl<T: SchemaNode> SchemaNode for Box<T> {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        (**self).walk_refs(visitor);
    }
}

impl<T: SchemaNode> SchemaNode for Vec<T> {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        for node in self.iter_mut() {
            node.walk_refs(visitor);
        }
    }
}

/// Keys are never rewritten.
impl<K, T: SchemaNode> SchemaNode for BTreeMap<K, T> {
    fn walk_refs<V: VisitRefs + ?Sized>(&mut self, visitor: &mut V) {
        for node in self.values_mut() {
            node.walk_refs(visitor);
        }
    }
}

/// Rewrites internal references under one package and module map,
/// collecting one [`Diagnostic`] per distinct malformed reference it leaves
/// untouched.
#[derive(Debug)]
pub struct ReferenceRewriter<'a> {
    package: &'a str,
    modules: &'a ModuleMap,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ReferenceRewriter<'a> {
    pub fn new(package: &'a str, modules: &'a ModuleMap) -> Self {
        Self {
            package,
            modules,
            diagnostics: Vec::new(),
        }
    }

    /// Rewrites every internal reference inside `node` in place.
    pub fn rewrite<T: SchemaNode>(&mut self, node: &mut T) {
        node.walk_refs(self);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl VisitRefs for ReferenceRewriter<'_> {
    fn visit_ref(&mut self, reference: &mut String) {
        match rewrite_reference(reference, self.package, self.modules) {
            ReferenceRewrite::Internal(rewritten) => *reference = rewritten,
            ReferenceRewrite::External | ReferenceRewrite::Untargeted => {}
            ReferenceRewrite::Malformed(reason) => {
                let diagnostic = Diagnostic::MalformedReference {
                    reference: reference.clone(),
                    reason: reason.to_string(),
                };
                if !self.diagnostics.contains(&diagnostic) {
                    self.diagnostics.push(diagnostic);
                }
            }
        }
    }
}
