//! Error types for schema composition.
//!
//! Per-contributor failures are collected into [`ContributionErrors`] so a
//! single pass reports every failing contributor. Serialization and
//! configuration failures are fatal and surface directly as
//! [`RegistryError`] variants.

use std::fmt;

use provider_schema_core::Token;
use thiserror::Error;

/// Error type returned by contributor implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single contributor during harvesting.
#[derive(Debug, Error)]
pub enum ContributionError {
    /// The contributor could not report its token.
    #[error("failed to resolve token: {0}")]
    Token(#[source] BoxError),

    /// The contributor could not produce its schema fragment.
    #[error("failed to get schema for '{token}': {source}")]
    Schema {
        token: Token,
        #[source]
        source: BoxError,
    },
}

/// Every contributor failure from one generation pass.
#[derive(Debug, Default)]
pub struct ContributionErrors {
    errors: Vec<ContributionError>,
}

impl ContributionErrors {
    pub fn push(&mut self, error: ContributionError) {
        self.errors.push(error);
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContributionError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ContributionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            1 => writeln!(f, "1 error occurred:")?,
            n => writeln!(f, "{n} errors occurred:")?,
        }
        for error in &self.errors {
            writeln!(f, "\t* {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ContributionErrors {}

impl IntoIterator for ContributionErrors {
    type Item = ContributionError;
    type IntoIter = std::vec::IntoIter<ContributionError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Errors that can occur while configuring or generating a package schema.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// One or more contributors failed.
    #[error(transparent)]
    Contributions(#[from] ContributionErrors),

    /// A per-language settings blob could not be serialized.
    #[error("failed to serialize language settings for '{language}': {source}")]
    Language {
        language: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_every_error() {
        let mut errors = ContributionErrors::default();
        errors.push(ContributionError::Token("no token".into()));
        errors.push(ContributionError::Schema {
            token: Token::new("pkg", "index", "Cluster"),
            source: "api unavailable".into(),
        });

        let text = errors.to_string();
        assert!(text.starts_with("2 errors occurred:"));
        assert!(text.contains("\t* failed to resolve token: no token"));
        assert!(text.contains("\t* failed to get schema for 'pkg:index:Cluster': api unavailable"));
    }

    #[test]
    fn test_into_result() {
        assert!(ContributionErrors::default().into_result().is_ok());

        let mut errors = ContributionErrors::default();
        errors.push(ContributionError::Token("boom".into()));
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.len(), 1);
    }
}
