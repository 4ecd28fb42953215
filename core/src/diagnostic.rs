//! Non-fatal findings collected while composing a package.

use std::fmt;

use serde::Serialize;

/// Top-level map of a [`PackageSpec`](crate::PackageSpec) that an entry
/// lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Resources,
    Functions,
    Types,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Resources => "resources",
            Collection::Functions => "functions",
            Collection::Types => "types",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning that does not stop composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An internal reference could not be parsed and was left as written.
    MalformedReference { reference: String, reason: String },
    /// An internal reference names an entry the composed package does not
    /// contain.
    DanglingReference { reference: String },
    /// Two contributors produced the same token; the later one replaced the
    /// earlier entry.
    DuplicateToken {
        collection: Collection,
        token: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedReference { reference, reason } => {
                write!(f, "left malformed reference '{reference}' unchanged: {reason}")
            }
            Diagnostic::DanglingReference { reference } => {
                write!(f, "reference '{reference}' does not resolve to any entry")
            }
            Diagnostic::DuplicateToken { collection, token } => {
                write!(f, "duplicate token '{token}' in {collection}; later entry replaced earlier one")
            }
        }
    }
}
