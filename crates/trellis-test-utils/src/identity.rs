//! Identity resolver stubs.

use async_trait::async_trait;
use trellis_policy::{IdentityResolver, Subject};

/// Resolver returning one fixed subject.
pub struct StaticIdentity {
    subject: Subject,
}

impl StaticIdentity {
    /// Build a resolver for the given subject id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            subject: Subject::new(id),
        }
    }

    /// Build a resolver for a full subject.
    pub fn with_subject(subject: Subject) -> Self {
        Self { subject }
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn current_subject(&self) -> Option<Subject> {
        Some(self.subject.clone())
    }
}

/// Resolver simulating a missing session.
pub struct NoIdentity;

#[async_trait]
impl IdentityResolver for NoIdentity {
    async fn current_subject(&self) -> Option<Subject> {
        None
    }
}
