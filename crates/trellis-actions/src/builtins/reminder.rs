//! Built-in tool for gated reminder creation.

use crate::context::ActionContext;
use crate::tool::{Tool, parse_args};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use trellis_core::{ChatHistory, UiEmitter};
use trellis_protocol::{ChatMessage, RelationSpec, ToolError, ViewContent};
use uuid::Uuid;

/// Errors returned by the reminder API boundary.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// The external task API rejected or failed the call.
    #[error("reminder api error: {0}")]
    Api(String),
}

/// Reminder to create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewReminder {
    /// Owner reference, e.g. `user:alice`.
    pub user: String,
    /// Reminder title.
    pub title: String,
    /// Due timestamp.
    pub due_at: DateTime<Utc>,
}

/// Created reminder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    /// Reminder id assigned by the API.
    pub id: Uuid,
    /// Reminder title.
    pub title: String,
    /// Due timestamp.
    pub due_at: DateTime<Utc>,
}

/// External calendar/task API boundary.
#[async_trait]
pub trait ReminderService: Send + Sync {
    /// Create a reminder for a user.
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, ReminderError>;
}

/// Tool that creates a reminder once the gate allows it.
pub struct CreateReminderTool {
    service: Arc<dyn ReminderService>,
}

impl CreateReminderTool {
    /// Build the tool over a reminder service.
    pub fn new(service: Arc<dyn ReminderService>) -> Self {
        Self { service }
    }
}

impl fmt::Debug for CreateReminderTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CreateReminderTool")
    }
}

/// Arguments for CreateReminderTool.
#[derive(Debug, Serialize, Deserialize)]
struct CreateReminderArgs {
    title: String,
    due_at: DateTime<Utc>,
}

#[async_trait]
impl Tool for CreateReminderTool {
    fn name(&self) -> &str {
        "CreateReminder"
    }

    fn description(&self) -> &str {
        "Create a reminder in the user's task list"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Reminder title." },
                "due_at": { "type": "string", "format": "date-time", "description": "Due timestamp." },
            },
            "required": ["title", "due_at"],
        })
    }

    fn relation_spec(&self, _ctx: &ActionContext, args: &Value) -> Result<RelationSpec, ToolError> {
        let input: CreateReminderArgs = parse_args(args.clone())?;
        if input.title.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "title cannot be empty".to_string(),
            ));
        }
        Ok(RelationSpec::new("can_use", "service:reminders"))
    }

    async fn run(
        &self,
        ctx: &ActionContext,
        args: Value,
        ui: &UiEmitter,
        history: &ChatHistory,
    ) -> Result<String, ToolError> {
        let input: CreateReminderArgs = parse_args(args)?;
        let subject = ctx.identity.current_subject().await.ok_or_else(|| {
            ToolError::ExecutionFailed("session subject unavailable".to_string())
        })?;

        let reminder = self
            .service
            .create(NewReminder {
                user: subject.user_ref(),
                title: input.title,
                due_at: input.due_at,
            })
            .await
            .map_err(|err| ToolError::ExecutionFailed(err.to_string()))?;
        info!(
            "reminder created (user={}, reminder_id={})",
            subject.user_ref(),
            reminder.id
        );

        ui.view(ViewContent::ReminderCard {
            title: reminder.title.clone(),
            due_at: reminder.due_at,
        })
        .await;
        let summary = format!(
            "Reminder \"{}\" set for {}.",
            reminder.title,
            reminder.due_at.to_rfc3339()
        );
        history.append(ChatMessage::assistant(summary.clone()));
        Ok(summary)
    }
}
