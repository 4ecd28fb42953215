//! Harvesting contributor fragments into the package maps.
//!
//! Each contributor is resolved to its namespaced token, asked for its
//! fragment, and the fragment's references are rewritten before insertion.
//! Failures are recorded and the pass moves on to the next contributor, so a
//! single run reports every broken contributor at once.

use std::collections::BTreeMap;

use provider_schema_core::{Collection, Diagnostic, SchemaNode, Token};
use tracing::debug;

use crate::contributor::Contributor;
use crate::error::{ContributionError, ContributionErrors};
use crate::registrar::TypeRegistrar;

/// Resolves, extracts, and rewrites a single contributor's fragment.
pub(crate) fn harvest_one<S: SchemaNode>(
    contributor: &(dyn Contributor<Fragment = S> + Send),
    registrar: &mut TypeRegistrar<'_>,
) -> Result<(Token, S), ContributionError> {
    let token = contributor.token().map_err(ContributionError::Token)?;
    let token = registrar.namespaced(&token);

    let mut fragment = contributor
        .schema(registrar)
        .map_err(|source| ContributionError::Schema {
            token: token.clone(),
            source,
        })?;

    registrar.rewrite(&mut fragment);
    Ok((token, fragment))
}

/// Harvests every contributor into `entries`.
///
/// A later contributor resolving to an existing key replaces the earlier
/// fragment; the collision is reported as a [`Diagnostic::DuplicateToken`].
pub(crate) fn harvest<S: SchemaNode>(
    contributors: &[Box<dyn Contributor<Fragment = S> + Send>],
    collection: Collection,
    registrar: &mut TypeRegistrar<'_>,
    entries: &mut BTreeMap<String, S>,
    errors: &mut ContributionErrors,
) {
    for contributor in contributors {
        let (token, fragment) = match harvest_one(&**contributor, registrar) {
            Ok(harvested) => harvested,
            Err(err) => {
                debug!(%collection, error = %err, "Contributor failed");
                errors.push(err);
                continue;
            }
        };

        let key = token.to_string();
        debug!(%collection, token = %key, "Harvested fragment");
        if entries.insert(key.clone(), fragment).is_some() {
            registrar.report(Diagnostic::DuplicateToken {
                collection,
                token: key,
            });
        }
    }
}
