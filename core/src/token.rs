//! Qualified tokens and module remapping.
//!
//! Every resource, function, and type in a package schema is identified by a
//! [`Token`] of the form `package:module:name`. When contributors are
//! composed into one package, each token is re-qualified under the package
//! being built and its module segment is passed through a [`ModuleMap`].
//!
//! # Example
//!
//! ```
//! use provider_schema_core::{ModuleMap, Token, assign_to};
//!
//! let mut modules = ModuleMap::new();
//! modules.insert("vpc", "networking");
//!
//! let token: Token = "aws:vpc:Subnet".parse().unwrap();
//! let assigned = assign_to(&token, "cloud", &modules);
//! assert_eq!(assigned.to_string(), "cloud:networking:Subnet");
//! ```

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Separator between the segments of a [`Token`].
pub const TOKEN_DELIMITER: char = ':';

/// Errors produced when parsing a [`Token`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The text does not have exactly three segments.
    #[error("malformed token '{0}': expected format 'package:module:name'")]
    WrongSegmentCount(String),
    /// One of the three segments is empty.
    #[error("malformed token '{token}': {segment} segment is empty")]
    EmptySegment {
        token: String,
        segment: &'static str,
    },
}

/// A qualified symbol: `package:module:name`.
///
/// Tokens are immutable. Remapping produces a new token and never edits an
/// existing one.
///
/// # Examples
///
/// ```
/// use provider_schema_core::Token;
///
/// let token = Token::parse("pkg:vpc:Subnet").unwrap();
/// assert_eq!(token.package(), "pkg");
/// assert_eq!(token.module(), "vpc");
/// assert_eq!(token.name(), "Subnet");
///
/// assert!(Token::parse("pkg:Subnet").is_err());
/// assert!(Token::parse("pkg::Subnet").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token {
    package: String,
    module: String,
    name: String,
}

impl Token {
    /// Creates a token from its three segments without validation.
    pub fn new(
        package: impl Into<String>,
        module: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            module: module.into(),
            name: name.into(),
        }
    }

    /// Parses `package:module:name`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the text does not split into exactly three
    /// non-empty segments.
    pub fn parse(text: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = text.split(TOKEN_DELIMITER).collect();
        let [package, module, name] = segments.as_slice() else {
            return Err(TokenError::WrongSegmentCount(text.to_string()));
        };

        for (segment, label) in [(package, "package"), (module, "module"), (name, "name")] {
            if segment.is_empty() {
                return Err(TokenError::EmptySegment {
                    token: text.to_string(),
                    segment: label,
                });
            }
        }

        Ok(Self::new(*package, *module, *name))
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a new token with the same name under `package` and `module`.
    pub fn requalified(&self, package: &str, module: &str) -> Self {
        Self::new(package, module, self.name.as_str())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{TOKEN_DELIMITER}{}{TOKEN_DELIMITER}{}",
            self.package, self.module, self.name
        )
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Token {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Remapping table from an original module segment to its replacement.
///
/// Modules without an entry keep their original name.
///
/// # Examples
///
/// ```
/// use provider_schema_core::ModuleMap;
///
/// let modules: ModuleMap = [("vpc", "networking")].into_iter().collect();
/// assert_eq!(modules.resolve("vpc"), "networking");
/// assert_eq!(modules.resolve("iam"), "iam");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleMap(BTreeMap<String, String>);

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the mapping for `from`.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    /// Merges every entry of `other` into this map. Entries in `other` win.
    pub fn merge(&mut self, other: ModuleMap) {
        self.0.extend(other.0);
    }

    /// Returns the replacement for `module`, or `module` itself when unmapped.
    pub fn resolve<'a>(&'a self, module: &'a str) -> &'a str {
        self.0.get(module).map(String::as_str).unwrap_or(module)
    }

    pub fn get(&self, module: &str) -> Option<&str> {
        self.0.get(module).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ModuleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for ModuleMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (from, to) in iter {
            self.insert(from, to);
        }
    }
}

/// Re-qualifies `token` under `package`, remapping its module through
/// `modules`. The name segment is left untouched.
pub fn assign_to(token: &Token, package: &str, modules: &ModuleMap) -> Token {
    token.requalified(package, modules.resolve(token.module()))
}
