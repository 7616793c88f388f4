//! Composite resource IDs.
//!
//! Objects nested under a database are identified by their scope and name
//! joined with `|`, e.g. `analytics|raw` for schema `raw` in database
//! `analytics`. Names containing `|` cannot be represented; that is not
//! checked here.

use crate::error::ProviderError;

/// The reserved delimiter between ID components.
pub const DELIMITER: char = '|';

/// Join ID components with the delimiter.
pub fn encode<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Split an ID into exactly `arity` components.
pub fn decode(id: &str, arity: usize) -> Result<Vec<String>, ProviderError> {
    let parts: Vec<String> = id.split(DELIMITER).map(str::to_string).collect();
    if parts.len() != arity {
        return Err(ProviderError::InvalidId(id.to_string()));
    }
    Ok(parts)
}

/// Split a `<scope>|<name>` ID.
pub fn decode_pair(id: &str) -> Result<(String, String), ProviderError> {
    let mut parts = decode(id, 2)?.into_iter();
    match (parts.next(), parts.next()) {
        (Some(scope), Some(name)) => Ok((scope, name)),
        _ => Err(ProviderError::InvalidId(id.to_string())),
    }
}
