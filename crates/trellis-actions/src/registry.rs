//! Registry for tool implementations.

use crate::tool::Tool;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory registry for tool implementations.
///
/// Built once at startup; lookup is by exact name against this closed map.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl ToolRegistry {
    /// Create an empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool by name.
    pub fn register(&self, tool: Arc<dyn Tool>) {
        debug!("registering tool (name={})", tool.name());
        self.tools.write().insert(tool.name().to_string(), tool);
    }

    /// Fetch a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// List all registered tool names.
    pub fn list(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ToolRegistry;
    use crate::context::ActionContext;
    use crate::tool::Tool;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::fmt;
    use std::sync::Arc;
    use trellis_core::{ChatHistory, UiEmitter};
    use trellis_protocol::{RelationSpec, ToolError};

    struct NamedTool {
        name: &'static str,
    }

    impl fmt::Debug for NamedTool {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "NamedTool({})", self.name)
        }
    }

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "named"
        }

        fn args_schema(&self) -> Value {
            json!({})
        }

        fn relation_spec(
            &self,
            _ctx: &ActionContext,
            _args: &Value,
        ) -> Result<RelationSpec, ToolError> {
            Ok(RelationSpec::new("can_use", "service:test"))
        }

        async fn run(
            &self,
            _ctx: &ActionContext,
            _args: Value,
            _ui: &UiEmitter,
            _history: &ChatHistory,
        ) -> Result<String, ToolError> {
            Ok("ok".to_string())
        }
    }

    #[test]
    fn registry_tracks_tools_by_name() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool { name: "BuyStock" }));
        registry.register(Arc::new(NamedTool { name: "ShareChat" }));

        let mut names = registry.list();
        names.sort();
        assert_eq!(names, vec!["BuyStock", "ShareChat"]);
        assert_eq!(registry.get("BuyStock").expect("tool").name(), "BuyStock");
        assert_eq!(registry.get("Missing").is_none(), true);
    }
}
