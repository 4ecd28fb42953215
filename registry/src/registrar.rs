//! Registration of types discovered while contributors build their schemas.
//!
//! Contributors receive a [`TypeRegistrar`] and register every complex type
//! their fragment refers to. A `false` return means the type is new and its
//! own dependencies should be registered next; `true` means it is already
//! known and recursion can stop, which also terminates cyclic type graphs.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use provider_schema_core::{ComplexTypeSpec, ModuleMap, ObjectTypeSpec, Token};
//! use provider_schema_registry::TypeRegistrar;
//!
//! let modules = ModuleMap::new();
//! let mut types = BTreeMap::new();
//! let mut diagnostics = Vec::new();
//! let mut registrar = TypeRegistrar::new("pkg", &modules, &mut types, &mut diagnostics);
//!
//! let token = Token::parse("pkg:index:Settings").unwrap();
//! let spec = ComplexTypeSpec::object(ObjectTypeSpec::new());
//! assert!(!registrar.register(&token, spec.clone()));
//! assert!(registrar.register(&token, spec));
//! assert_eq!(types.len(), 1);
//! ```

use std::collections::BTreeMap;

use provider_schema_core::{
    ComplexTypeSpec, Diagnostic, ModuleMap, ReferenceRewriter, SchemaNode, Token, assign_to,
};
use tracing::debug;

/// Collects derivative types into the package's `types` map.
#[derive(Debug)]
pub struct TypeRegistrar<'a> {
    package: &'a str,
    modules: &'a ModuleMap,
    types: &'a mut BTreeMap<String, ComplexTypeSpec>,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> TypeRegistrar<'a> {
    pub fn new(
        package: &'a str,
        modules: &'a ModuleMap,
        types: &'a mut BTreeMap<String, ComplexTypeSpec>,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            package,
            modules,
            types,
            diagnostics,
        }
    }

    /// Name of the package being composed.
    pub fn package(&self) -> &str {
        self.package
    }

    /// The token `token` will be stored under.
    pub fn namespaced(&self, token: &Token) -> Token {
        assign_to(token, self.package, self.modules)
    }

    /// Registers `spec` under `token`, returning whether the type was
    /// already known.
    ///
    /// On first registration the type's references are rewritten and it is
    /// inserted. Repeat registrations are ignored.
    pub fn register(&mut self, token: &Token, mut spec: ComplexTypeSpec) -> bool {
        let key = self.namespaced(token).to_string();
        if self.types.contains_key(&key) {
            debug!(token = %key, "Type already registered");
            return true;
        }

        self.rewrite(&mut spec);
        debug!(token = %key, "Registered type");
        self.types.insert(key, spec);
        false
    }

    /// Returns `true` if a type is registered under the namespaced `token`.
    pub fn is_registered(&self, token: &Token) -> bool {
        self.types.contains_key(&self.namespaced(token).to_string())
    }

    /// Rewrites the internal references of `node` under this package.
    ///
    /// A malformed reference already reported by an earlier node is not
    /// reported again.
    pub(crate) fn rewrite<T: SchemaNode>(&mut self, node: &mut T) {
        let mut rewriter = ReferenceRewriter::new(self.package, self.modules);
        rewriter.rewrite(node);
        for diagnostic in rewriter.into_diagnostics() {
            if !self.diagnostics.contains(&diagnostic) {
                self.diagnostics.push(diagnostic);
            }
        }
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
