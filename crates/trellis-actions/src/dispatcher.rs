//! Tool dispatch through the streaming gate.

use crate::context::ActionContext;
use crate::registry::ToolRegistry;
use crate::tool::Tool;
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::sync::Arc;
use trellis_config::DEFAULT_DENIAL_MESSAGE;
use trellis_core::{
    AccessChecker, ChatHistory, GateStream, GatedStreamAction, StreamingAction, TupleChecker,
    UiEmitter,
};
use trellis_protocol::ToolError;

/// Adapts one tool invocation to the streaming gate's operation shape.
struct GatedToolRun {
    tool: Arc<dyn Tool>,
    ctx: ActionContext,
}

#[async_trait]
impl StreamingAction<Value> for GatedToolRun {
    async fn run(
        &self,
        params: &Value,
        ui: &UiEmitter,
        history: &ChatHistory,
    ) -> Result<String, ToolError> {
        self.tool.run(&self.ctx, params.clone(), ui, history).await
    }
}

/// Routes tool calls through validation, then the gate.
///
/// Dispatches are independent; nothing here serializes concurrent calls.
pub struct ActionDispatcher {
    registry: ToolRegistry,
    denial_message: String,
}

impl ActionDispatcher {
    /// Build a dispatcher over a registry.
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            denial_message: DEFAULT_DENIAL_MESSAGE.to_string(),
        }
    }

    /// Override the default denial text.
    pub fn with_denial_message(mut self, message: impl Into<String>) -> Self {
        self.denial_message = message.into();
        self
    }

    /// Dispatch one tool call.
    ///
    /// Lookup and argument validation happen before the gate: an unknown
    /// name or a schema rejection returns an error here and no permission
    /// check is ever issued. The returned stream runs the gated call.
    pub fn dispatch(
        &self,
        ctx: &ActionContext,
        name: &str,
        args: Value,
    ) -> Result<GateStream, ToolError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::ToolNotFound(name.to_string()))?;
        let spec = tool.relation_spec(ctx, &args)?;
        info!(
            "dispatching tool (name={name}, relation={}, object={})",
            spec.relation, spec.object
        );

        let checker: Arc<dyn AccessChecker<Value>> = Arc::new(TupleChecker::for_spec(
            ctx.identity.clone(),
            ctx.policy.clone(),
            spec.clone(),
        ));
        let operation: Arc<dyn StreamingAction<Value>> = Arc::new(GatedToolRun {
            tool,
            ctx: ctx.clone(),
        });
        let gate = GatedStreamAction::new(checker, operation, spec)
            .with_denial_message(self.denial_message.clone());
        Ok(gate.run(args, ctx.history.clone()))
    }
}
