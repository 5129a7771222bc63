//! Identifier - Encoding and decoding of stored resource identifiers
//!
//! A resource is re-addressed only through the identifier proposed at creation:
//! either a single remote id, several component ids joined with
//! [`FIELD_SEPARATOR`], or a hash over a data source's result ids.

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::provider::{ErrorKind, ProviderError};

/// Separator between components of a composite identifier
pub const FIELD_SEPARATOR: &str = "#";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("id is broken, id is {raw}")]
    Broken { raw: String },

    #[error("identifier component {index} must not be empty")]
    EmptyComponent { index: usize },

    #[error("identifier component '{part}' contains the separator '#'")]
    SeparatorInComponent { part: String },
}

impl From<IdentifierError> for ProviderError {
    fn from(err: IdentifierError) -> Self {
        ProviderError::new(ErrorKind::BrokenId, err.to_string()).with_cause(err)
    }
}

/// Identifier made of one or more ordered components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeId {
    parts: Vec<String>,
}

impl CompositeId {
    /// Build from components; each must be non-empty and free of the separator
    pub fn new<I, S>(parts: I) -> Result<Self, IdentifierError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        for (index, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(IdentifierError::EmptyComponent { index });
            }
            if part.contains(FIELD_SEPARATOR) {
                return Err(IdentifierError::SeparatorInComponent { part: part.clone() });
            }
        }
        if parts.is_empty() {
            return Err(IdentifierError::EmptyComponent { index: 0 });
        }
        Ok(Self { parts })
    }

    /// Single-component identifier
    pub fn single(id: impl Into<String>) -> Result<Self, IdentifierError> {
        Self::new([id.into()])
    }

    /// Split a stored identifier, requiring exactly `arity` non-empty components
    pub fn decode(raw: &str, arity: usize) -> Result<Self, IdentifierError> {
        let parts: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
        if parts.len() != arity || parts.iter().any(|p| p.is_empty()) {
            return Err(IdentifierError::Broken {
                raw: raw.to_string(),
            });
        }
        Ok(Self {
            parts: parts.into_iter().map(str::to_string).collect(),
        })
    }

    pub fn encode(&self) -> String {
        self.parts.join(FIELD_SEPARATOR)
    }

    pub fn arity(&self) -> usize {
        self.parts.len()
    }

    /// Component at `index`; callers index within the arity they decoded with
    pub fn part(&self, index: usize) -> &str {
        &self.parts[index]
    }
}

impl std::fmt::Display for CompositeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Deterministic identifier for a list of ids (data source results)
pub fn ids_hash<S: AsRef<str>>(ids: &[S]) -> String {
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_ref().as_bytes());
        hasher.update(b"-");
    }
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_round_trip() {
        let id = CompositeId::new(["proj-1", "abc123"]).unwrap();
        assert_eq!(id.encode(), "proj-1#abc123");

        let decoded = CompositeId::decode(&id.encode(), 2).unwrap();
        assert_eq!(decoded, id);
        assert_eq!(decoded.part(0), "proj-1");
        assert_eq!(decoded.part(1), "abc123");
    }

    #[test]
    fn decode_rejects_wrong_arity() {
        for (raw, arity) in [("proj-1", 2), ("a#b#c", 2), ("a#b", 1), ("", 1), ("a#", 2)] {
            let err = CompositeId::decode(raw, arity).unwrap_err();
            assert_eq!(err.to_string(), format!("id is broken, id is {}", raw));
        }
    }

    #[test]
    fn components_are_validated() {
        assert!(matches!(
            CompositeId::new(["gw", ""]),
            Err(IdentifierError::EmptyComponent { index: 1 })
        ));
        assert!(matches!(
            CompositeId::new(["a#b"]),
            Err(IdentifierError::SeparatorInComponent { .. })
        ));
        assert!(CompositeId::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn broken_id_maps_to_provider_error() {
        let err: ProviderError = CompositeId::decode("x", 2).unwrap_err().into();
        assert_eq!(err.kind, ErrorKind::BrokenId);
    }

    #[test]
    fn ids_hash_is_deterministic() {
        let a = ids_hash(&["cluster-1", "cluster-2"]);
        assert_eq!(a, ids_hash(&["cluster-1".to_string(), "cluster-2".to_string()]));
        assert_ne!(a, ids_hash(&["cluster-2", "cluster-1"]));
        assert_ne!(ids_hash::<&str>(&[]), a);
    }
}
