//! Per-call context handed to tools.

use std::sync::Arc;
use trellis_core::ChatHistory;
use trellis_policy::{IdentityResolver, PolicyClient};
use trellis_protocol::SessionId;

/// Explicit handle bag for one gated call.
///
/// The policy client and identity resolver are process-wide singletons
/// shared by `Arc`; the history handle belongs to the session being served.
#[derive(Clone)]
pub struct ActionContext {
    /// Session the call belongs to.
    pub session_id: SessionId,
    /// Ambient session identity accessor.
    pub identity: Arc<dyn IdentityResolver>,
    /// Relationship store client.
    pub policy: Arc<dyn PolicyClient>,
    /// Conversation history for the session.
    pub history: ChatHistory,
}

impl ActionContext {
    /// Assemble a context for one session.
    pub fn new(
        session_id: SessionId,
        identity: Arc<dyn IdentityResolver>,
        policy: Arc<dyn PolicyClient>,
        history: ChatHistory,
    ) -> Self {
        Self {
            session_id,
            identity,
            policy,
            history,
        }
    }
}
