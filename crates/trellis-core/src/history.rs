//! Conversation history: the ordered message sequence gate fallbacks
//! mutate, with JSONL rollout persistence per session.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use trellis_protocol::{ChatMessage, Role, SessionId};
use uuid::Uuid;

/// Errors returned by history persistence.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(u32),
    #[error("missing session metadata")]
    MissingMetadata,
    #[error("session already exists: {0}")]
    SessionExists(SessionId),
}

/// Summary record used for listing sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Total number of messages.
    pub message_count: usize,
    /// Session creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent message.
    pub updated_at: DateTime<Utc>,
}

/// Persistent store abstraction for session transcripts.
pub trait HistoryStore: Send + Sync {
    /// Record a new session creation.
    fn record_session(
        &self,
        session_id: SessionId,
        created_at: DateTime<Utc>,
    ) -> Result<(), HistoryError>;
    /// Append a message to a session.
    fn append_message(
        &self,
        session_id: SessionId,
        message: &ChatMessage,
    ) -> Result<(), HistoryError>;
    /// Load the messages of a session.
    fn load_session(&self, session_id: SessionId) -> Result<Option<Vec<ChatMessage>>, HistoryError>;
    /// List all session summaries.
    fn list_sessions(&self) -> Result<Vec<SessionSummary>, HistoryError>;
    /// Delete a session and its backing storage.
    fn delete_session(&self, session_id: SessionId) -> Result<bool, HistoryError>;
}

/// Shared handle to one session's ordered message sequence.
///
/// The in-memory sequence is authoritative within a request; persistence is
/// best-effort and append-only. Denial pairs are appended under one lock so
/// the sequence is never left partially written.
#[derive(Clone)]
pub struct ChatHistory {
    session_id: SessionId,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    store: Option<Arc<dyn HistoryStore>>,
}

impl ChatHistory {
    /// Build an unpersisted history.
    pub fn in_memory(session_id: SessionId) -> Self {
        Self {
            session_id,
            messages: Arc::new(Mutex::new(Vec::new())),
            store: None,
        }
    }

    /// Build a history backed by a store, loading any existing transcript.
    pub fn with_store(
        session_id: SessionId,
        store: Arc<dyn HistoryStore>,
    ) -> Result<Self, HistoryError> {
        let messages = match store.load_session(session_id)? {
            Some(messages) => messages,
            None => {
                store.record_session(session_id, Utc::now())?;
                Vec::new()
            }
        };
        Ok(Self {
            session_id,
            messages: Arc::new(Mutex::new(messages)),
            store: Some(store),
        })
    }

    /// Session this history belongs to.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Append one message.
    pub fn append(&self, message: ChatMessage) {
        let mut messages = self.messages.lock();
        self.persist(&message);
        messages.push(message);
    }

    /// Append the denial message pair atomically: a system message
    /// documenting the denied tuple and the user-visible assistant notice.
    pub fn append_denial_pair(&self, system: impl Into<String>, assistant: impl Into<String>) {
        let system = ChatMessage::system(system.into());
        let assistant = ChatMessage::assistant(assistant.into());
        let mut messages = self.messages.lock();
        self.persist(&system);
        self.persist(&assistant);
        messages.push(system);
        messages.push(assistant);
    }

    /// Replace the whole sequence through a transform.
    ///
    /// Affects the in-memory sequence only; the persisted rollout is an
    /// append-only journal.
    pub fn replace_all<F>(&self, transform: F)
    where
        F: FnOnce(Vec<ChatMessage>) -> Vec<ChatMessage>,
    {
        let mut messages = self.messages.lock();
        let next = transform(std::mem::take(&mut *messages));
        *messages = next;
    }

    /// Copy of the current sequence.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    fn persist(&self, message: &ChatMessage) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.append_message(self.session_id, message) {
            warn!(
                "failed to persist message (session_id={}, error={err})",
                self.session_id
            );
        }
    }
}

/// Internal JSONL event representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RolloutEvent {
    SchemaVersion {
        version: u32,
    },
    SessionCreated {
        session_id: SessionId,
        created_at: DateTime<Utc>,
    },
    Message {
        session_id: SessionId,
        role: Role,
        content: String,
        created_at: DateTime<Utc>,
    },
}

#[derive(Default)]
struct RolloutState {
    version: Option<u32>,
    created_at: Option<DateTime<Utc>>,
    messages: Vec<ChatMessage>,
}

impl RolloutState {
    fn apply(&mut self, event: RolloutEvent) -> Result<(), HistoryError> {
        match event {
            RolloutEvent::SchemaVersion { version } => {
                self.version = Some(version);
                if version > 1 {
                    return Err(HistoryError::UnsupportedSchema(version));
                }
            }
            RolloutEvent::SessionCreated { created_at, .. } => {
                self.created_at = Some(created_at);
            }
            RolloutEvent::Message {
                role,
                content,
                created_at,
                ..
            } => {
                self.messages.push(ChatMessage {
                    role,
                    content,
                    created_at,
                });
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<(DateTime<Utc>, Vec<ChatMessage>), HistoryError> {
        let _ = self.version.ok_or(HistoryError::MissingMetadata)?;
        let created_at = self.created_at.ok_or(HistoryError::MissingMetadata)?;
        Ok((created_at, self.messages))
    }
}

/// JSONL-backed history store, one rollout file per session.
pub struct JsonlHistoryStore {
    /// Root directory for session rollouts.
    root: PathBuf,
    /// Serialize write access to rollout files.
    write_lock: Mutex<()>,
}

impl JsonlHistoryStore {
    /// Create a store from the history section of the config, falling back
    /// to the platform data directory when no root is configured.
    pub fn from_config(config: &trellis_config::HistoryConfig) -> Result<Self, HistoryError> {
        let root = match &config.root {
            Some(root) => root.clone(),
            None => directories::ProjectDirs::from("", "", "trellis")
                .map(|dirs| dirs.data_dir().join("sessions"))
                .ok_or_else(|| {
                    HistoryError::Io(std::io::Error::other("no platform data directory"))
                })?,
        };
        Self::new(root)
    }

    /// Create a new JSONL store under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized history store (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn rollout_path(&self, session_id: SessionId) -> PathBuf {
        self.root.join(format!("{session_id}.jsonl"))
    }

    fn write_event(&self, session_id: SessionId, event: &RolloutEvent) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock();
        let path = self.rollout_path(session_id);
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn write_new_rollout(
        &self,
        session_id: SessionId,
        event: &RolloutEvent,
    ) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock();
        let path = self.rollout_path(session_id);
        if path.exists() {
            return Err(HistoryError::SessionExists(session_id));
        }
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)?;
        let header = serde_json::to_string(&RolloutEvent::SchemaVersion { version: 1 })?;
        writeln!(file, "{header}")?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn read_rollout(
        &self,
        session_id: SessionId,
    ) -> Result<Option<(DateTime<Utc>, Vec<ChatMessage>)>, HistoryError> {
        let path = self.rollout_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let file = OpenOptions::new().read(true).open(&path)?;
        let reader = BufReader::new(file);
        let mut rollout = RolloutState::default();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: RolloutEvent = serde_json::from_str(&line)?;
            rollout.apply(event)?;
        }
        Ok(Some(rollout.finish()?))
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn record_session(
        &self,
        session_id: SessionId,
        created_at: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        info!("recording session creation (session_id={session_id})");
        let event = RolloutEvent::SessionCreated {
            session_id,
            created_at,
        };
        self.write_new_rollout(session_id, &event)
    }

    fn append_message(
        &self,
        session_id: SessionId,
        message: &ChatMessage,
    ) -> Result<(), HistoryError> {
        debug!(
            "appending message event (session_id={}, role={}, content_len={})",
            session_id,
            message.role,
            message.content.len()
        );
        let event = RolloutEvent::Message {
            session_id,
            role: message.role,
            content: message.content.clone(),
            created_at: message.created_at,
        };
        self.write_event(session_id, &event)
    }

    fn load_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<Vec<ChatMessage>>, HistoryError> {
        Ok(self
            .read_rollout(session_id)?
            .map(|(_created_at, messages)| messages))
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>, HistoryError> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
                continue;
            }
            let file_name = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(name) => name,
                None => continue,
            };
            let session_id = match Uuid::parse_str(file_name) {
                Ok(id) => id,
                Err(_) => continue,
            };
            if let Some((created_at, messages)) = self.read_rollout(session_id)? {
                let updated_at = messages
                    .last()
                    .map(|message| message.created_at)
                    .unwrap_or(created_at);
                summaries.push(SessionSummary {
                    id: session_id,
                    message_count: messages.len(),
                    created_at,
                    updated_at,
                });
            }
        }
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    fn delete_session(&self, session_id: SessionId) -> Result<bool, HistoryError> {
        let path = self.rollout_path(session_id);
        if path.exists() {
            info!("deleting session rollout (session_id={session_id})");
            fs::remove_file(path)?;
            Ok(true)
        } else {
            warn!("session rollout not found (session_id={session_id})");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatHistory, JsonlHistoryStore};
    use crate::history::HistoryStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::tempdir;
    use trellis_protocol::{ChatMessage, Role};
    use uuid::Uuid;

    #[test]
    fn denial_pair_is_appended_together() {
        let history = ChatHistory::in_memory(Uuid::new_v4());
        history.append(ChatMessage::user("buy nvda"));
        history.append_denial_pair("denied tuple asset:nvda", "not allowed");

        let messages = history.snapshot();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::System);
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, "not allowed");
    }

    #[test]
    fn replace_all_transforms_the_sequence() {
        let history = ChatHistory::in_memory(Uuid::new_v4());
        history.append(ChatMessage::user("one"));
        history.append(ChatMessage::user("two"));
        history.replace_all(|messages| {
            messages
                .into_iter()
                .filter(|message| message.content != "one")
                .collect()
        });
        let messages = history.snapshot();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "two");
    }

    #[test]
    fn store_round_trips_a_session() {
        let temp = tempdir().expect("tempdir");
        let store = Arc::new(JsonlHistoryStore::new(temp.path()).expect("store"));
        let session_id = Uuid::new_v4();

        let history = ChatHistory::with_store(session_id, store.clone()).expect("history");
        history.append(ChatMessage::user("hello"));
        history.append_denial_pair("blocked", "not allowed");

        let reloaded = ChatHistory::with_store(session_id, store.clone()).expect("reload");
        let messages = reloaded.snapshot();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].content, "blocked");

        let summaries = store.list_sessions().expect("summaries");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, session_id);
        assert_eq!(summaries[0].message_count, 3);

        assert_eq!(store.delete_session(session_id).expect("delete"), true);
        assert_eq!(store.load_session(session_id).expect("load"), None);
    }
}
