//! Path translation between the caller host and the worker host.
//!
//! Both hosts mount the same storage under different prefixes. A
//! [`PathTranslator`] maps paths across that boundary by prefix substitution.
//! Translation is applied exactly once per hop: a path that is not under a
//! prefix of the expected side is an error, never passed through.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which namespace a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Caller-side mount
    Local,
    /// Worker-side mount
    Remote,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Local => f.write_str("local"),
            Namespace::Remote => f.write_str("remote"),
        }
    }
}

/// Errors from path translation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("{path} is not under any {namespace} prefix")]
    Unmapped { namespace: Namespace, path: String },

    #[error("invalid {namespace} prefix: {prefix:?}")]
    InvalidPrefix { namespace: Namespace, prefix: String },

    #[error("{namespace} prefixes overlap: {first} and {second}")]
    Overlapping {
        namespace: Namespace,
        first: String,
        second: String,
    },
}

pub type PathResult<T> = Result<T, PathError>;

/// One local/remote prefix pair referring to the same physical storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    pub local: String,
    pub remote: String,
}

impl PathMapping {
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    fn is_identity(&self) -> bool {
        self.local == self.remote
    }
}

/// True if `path` equals `prefix` or lies below it on a component boundary.
pub fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn normalize_prefix(prefix: &str, namespace: Namespace) -> PathResult<String> {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() || !trimmed.starts_with('/') {
        return Err(PathError::InvalidPrefix {
            namespace,
            prefix: prefix.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn check_disjoint<'a>(
    prefixes: impl Iterator<Item = &'a str> + Clone,
    namespace: Namespace,
) -> PathResult<()> {
    for (i, a) in prefixes.clone().enumerate() {
        for b in prefixes.clone().skip(i + 1) {
            if is_under(a, b) || is_under(b, a) {
                return Err(PathError::Overlapping {
                    namespace,
                    first: a.to_string(),
                    second: b.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Bidirectional prefix substitution.
///
/// For every path `p` under a configured local prefix,
/// `reverse_translate(translate(p)) == p`, and symmetrically for remote
/// paths. Construction rejects mappings that would break that law.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTranslator {
    mappings: Vec<PathMapping>,
}

impl PathTranslator {
    pub fn new(mappings: impl IntoIterator<Item = PathMapping>) -> PathResult<Self> {
        let mappings = mappings
            .into_iter()
            .map(|m| {
                Ok(PathMapping {
                    local: normalize_prefix(&m.local, Namespace::Local)?,
                    remote: normalize_prefix(&m.remote, Namespace::Remote)?,
                })
            })
            .collect::<PathResult<Vec<_>>>()?;

        check_disjoint(mappings.iter().map(|m| m.local.as_str()), Namespace::Local)?;
        check_disjoint(mappings.iter().map(|m| m.remote.as_str()), Namespace::Remote)?;

        // A remote prefix inside a local one (or the reverse) would let a
        // double translation succeed silently.
        for a in &mappings {
            for b in mappings.iter().filter(|b| !b.is_identity()) {
                if is_under(&b.remote, &a.local) || is_under(&a.local, &b.remote) {
                    return Err(PathError::Overlapping {
                        namespace: Namespace::Remote,
                        first: a.local.clone(),
                        second: b.remote.clone(),
                    });
                }
            }
        }

        Ok(Self { mappings })
    }

    pub fn mappings(&self) -> &[PathMapping] {
        &self.mappings
    }

    /// Map a caller-side path into the worker namespace.
    pub fn translate(&self, path: &str) -> PathResult<String> {
        self.mappings
            .iter()
            .find(|m| is_under(path, &m.local))
            .map(|m| format!("{}{}", m.remote, &path[m.local.len()..]))
            .ok_or_else(|| PathError::Unmapped {
                namespace: Namespace::Local,
                path: path.to_string(),
            })
    }

    /// Map a worker-side path back into the caller namespace.
    pub fn reverse_translate(&self, path: &str) -> PathResult<String> {
        self.mappings
            .iter()
            .find(|m| is_under(path, &m.remote))
            .map(|m| format!("{}{}", m.local, &path[m.remote.len()..]))
            .ok_or_else(|| PathError::Unmapped {
                namespace: Namespace::Remote,
                path: path.to_string(),
            })
    }

    pub fn is_local(&self, path: &str) -> bool {
        self.mappings.iter().any(|m| is_under(path, &m.local))
    }

    pub fn is_remote(&self, path: &str) -> bool {
        self.mappings.iter().any(|m| is_under(path, &m.remote))
    }
}
