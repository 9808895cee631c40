//! Shared types for Trellis: access tuples, chat messages, renderable views,
//! and the tool error taxonomy.

mod chat;
mod document;
mod error;
mod tuple;
mod view;

pub use chat::{ChatMessage, Role};
pub use document::Document;
pub use error::ToolError;
pub use tuple::{AccessTuple, RelationSpec, TupleCondition, object_ref, user_ref};
pub use view::{UiEvent, ViewContent};

use uuid::Uuid;

/// Unique identifier for a chat session.
pub type SessionId = Uuid;
