//! Built-in tool for access-filtered document search.

use crate::context::ActionContext;
use crate::tool::{Tool, parse_args};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use trellis_core::{
    AccessFilteredRetriever, ChatHistory, DocumentRetriever, UiEmitter, document_relation,
};
use trellis_protocol::{ChatMessage, RelationSpec, ToolError, ViewContent};

/// Tool that searches documents, returning only those the current subject
/// may view.
pub struct SearchDocumentsTool {
    inner: Arc<dyn DocumentRetriever>,
    relation: String,
}

impl SearchDocumentsTool {
    /// Build the tool over an inner retriever and the per-document relation.
    pub fn new(inner: Arc<dyn DocumentRetriever>, relation: impl Into<String>) -> Self {
        Self {
            inner,
            relation: relation.into(),
        }
    }
}

impl fmt::Debug for SearchDocumentsTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SearchDocumentsTool")
    }
}

/// Arguments for SearchDocumentsTool.
#[derive(Debug, Serialize, Deserialize)]
struct SearchDocumentsArgs {
    query: String,
}

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn name(&self) -> &str {
        "SearchDocuments"
    }

    fn description(&self) -> &str {
        "Search the document corpus, filtered to accessible documents"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query." },
            },
            "required": ["query"],
        })
    }

    fn relation_spec(&self, _ctx: &ActionContext, args: &Value) -> Result<RelationSpec, ToolError> {
        let input: SearchDocumentsArgs = parse_args(args.clone())?;
        if input.query.trim().is_empty() {
            return Err(ToolError::InvalidArguments(
                "query cannot be empty".to_string(),
            ));
        }
        Ok(RelationSpec::new("can_use", "service:documents"))
    }

    async fn run(
        &self,
        ctx: &ActionContext,
        args: Value,
        ui: &UiEmitter,
        history: &ChatHistory,
    ) -> Result<String, ToolError> {
        let input: SearchDocumentsArgs = parse_args(args)?;
        let subject = ctx.identity.current_subject().await.ok_or_else(|| {
            ToolError::ExecutionFailed("session subject unavailable".to_string())
        })?;

        let retriever = AccessFilteredRetriever::new(
            subject.user_ref(),
            self.inner.clone(),
            document_relation(self.relation.clone()),
            ctx.policy.clone(),
        );
        let documents = retriever
            .retrieve(&input.query)
            .await
            .map_err(|err| ToolError::ExecutionFailed(err.to_string()))?;
        debug!(
            "document search finished (query_len={}, results={})",
            input.query.len(),
            documents.len()
        );

        let titles = documents
            .iter()
            .map(|document| document.title.clone())
            .collect::<Vec<_>>();
        ui.view(ViewContent::DocumentList {
            titles: titles.clone(),
        })
        .await;
        let summary = if titles.is_empty() {
            "No accessible documents matched the query.".to_string()
        } else {
            format!("Found {} accessible document(s).", titles.len())
        };
        history.append(ChatMessage::assistant(summary.clone()));
        Ok(summary)
    }
}
