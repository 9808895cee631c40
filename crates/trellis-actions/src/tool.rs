//! Tool trait definition.

use crate::context::ActionContext;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use trellis_core::{ChatHistory, UiEmitter};
use trellis_protocol::{RelationSpec, ToolError};

/// Interface for gated tools.
///
/// Validation happens in [`Tool::relation_spec`], before any permission
/// check runs; the operation in [`Tool::run`] executes only after the gate
/// confirmed authorization, so every side effect lives there.
#[async_trait]
pub trait Tool: Send + Sync + Debug {
    /// Return the tool name.
    fn name(&self) -> &str;

    /// Return the tool description.
    fn description(&self) -> &str;

    /// Return the JSON schema for tool arguments.
    fn args_schema(&self) -> Value;

    /// Validate the argument payload and derive the one relation tuple
    /// enforced for this call.
    ///
    /// Rejections are `ToolError::InvalidArguments` and are never folded
    /// into a denial.
    fn relation_spec(&self, ctx: &ActionContext, args: &Value) -> Result<RelationSpec, ToolError>;

    /// Run the authorized operation, emitting UI states as they form.
    async fn run(
        &self,
        ctx: &ActionContext,
        args: Value,
        ui: &UiEmitter,
        history: &ChatHistory,
    ) -> Result<String, ToolError>;
}

/// Decode an argument payload into a typed args struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|err| ToolError::InvalidArguments(err.to_string()))
}
