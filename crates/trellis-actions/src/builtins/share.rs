//! Built-in tool for sharing a chat with another user.

use crate::context::ActionContext;
use crate::tool::{Tool, parse_args};
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use trellis_core::{ChatHistory, UiEmitter};
use trellis_policy::TupleWrites;
use trellis_protocol::{
    AccessTuple, ChatMessage, RelationSpec, ToolError, ViewContent, object_ref, user_ref,
};

/// Tool that grants another user viewer access to a chat.
///
/// The grant itself is a tuple write against the policy store; it runs only
/// after the gate confirmed the sharer holds `can_share` on the chat.
pub struct ShareChatTool;

impl fmt::Debug for ShareChatTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShareChatTool")
    }
}

/// Arguments for ShareChatTool.
#[derive(Debug, Serialize, Deserialize)]
struct ShareChatArgs {
    chat_id: String,
    email: String,
}

fn validate(args: &ShareChatArgs) -> Result<(), ToolError> {
    if args.chat_id.trim().is_empty() {
        return Err(ToolError::InvalidArguments(
            "chat_id cannot be empty".to_string(),
        ));
    }
    if !args.email.contains('@') {
        return Err(ToolError::InvalidArguments(
            "email must be an address".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Tool for ShareChatTool {
    fn name(&self) -> &str {
        "ShareChat"
    }

    fn description(&self) -> &str {
        "Share the current chat with another user by email"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "chat_id": { "type": "string", "description": "Chat to share." },
                "email": { "type": "string", "description": "Invitee email address." },
            },
            "required": ["chat_id", "email"],
        })
    }

    fn relation_spec(&self, _ctx: &ActionContext, args: &Value) -> Result<RelationSpec, ToolError> {
        let input: ShareChatArgs = parse_args(args.clone())?;
        validate(&input)?;
        Ok(RelationSpec::new(
            "can_share",
            object_ref("chat", &input.chat_id),
        ))
    }

    async fn run(
        &self,
        ctx: &ActionContext,
        args: Value,
        ui: &UiEmitter,
        history: &ChatHistory,
    ) -> Result<String, ToolError> {
        let input: ShareChatArgs = parse_args(args)?;
        let grant = AccessTuple::new(
            user_ref(&input.email),
            "viewer",
            object_ref("chat", &input.chat_id),
        );
        ctx.policy
            .write_tuples(TupleWrites::add(vec![grant]))
            .await
            .map_err(|err| ToolError::ExecutionFailed(err.to_string()))?;
        info!(
            "chat shared (chat_id={}, invitee={})",
            input.chat_id, input.email
        );

        let summary = format!("Shared this chat with {}.", input.email);
        ui.view(ViewContent::Markdown {
            text: summary.clone(),
        })
        .await;
        history.append(ChatMessage::assistant(summary.clone()));
        Ok(summary)
    }
}
