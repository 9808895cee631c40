//! Session identity accessor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_protocol::user_ref;

/// Authenticated subject resolved from the ambient session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    /// Stable subject id.
    pub id: String,
    /// Email claim, when present.
    #[serde(default)]
    pub email: Option<String>,
    /// Remaining identity claims.
    #[serde(default)]
    pub claims: Value,
}

impl Subject {
    /// Build a subject with no extra claims.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            claims: Value::Null,
        }
    }

    /// Namespaced `"user:<id>"` reference for tuples.
    pub fn user_ref(&self) -> String {
        user_ref(&self.id)
    }
}

/// Resolves the current subject from the ambient session, if any.
///
/// A missing session is an expected state, not a fault: callers treat it as
/// denial-worthy and must not panic.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Return the current subject, or `None` when no session exists.
    async fn current_subject(&self) -> Option<Subject>;
}

#[cfg(test)]
mod tests {
    use super::Subject;
    use pretty_assertions::assert_eq;

    #[test]
    fn subject_user_ref_is_namespaced() {
        let subject = Subject::new("alice");
        assert_eq!(subject.user_ref(), "user:alice");
    }
}
