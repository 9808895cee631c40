//! Cross-module flows: real checkers over the gates, with persistence.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;
use trellis_config::DEFAULT_DENIAL_MESSAGE;
use trellis_core::{
    AccessChecker, ChatHistory, GatedStreamAction, GatedView, JsonlHistoryStore, StreamingAction,
    TupleChecker, UiEmitter,
};
use trellis_protocol::{RelationSpec, Role, ToolError, UiEvent, ViewContent};
use trellis_test_utils::{MockPolicyClient, StaticIdentity};
use uuid::Uuid;

struct ReportOperation;

#[async_trait]
impl StreamingAction<String> for ReportOperation {
    async fn run(
        &self,
        params: &String,
        ui: &UiEmitter,
        _history: &ChatHistory,
    ) -> Result<String, ToolError> {
        ui.view(ViewContent::Markdown {
            text: format!("report for {params}"),
        })
        .await;
        Ok(format!("done: {params}"))
    }
}

fn checker<P: Send + Sync + 'static>(
    policy: Arc<MockPolicyClient>,
    spec: RelationSpec,
) -> Arc<dyn AccessChecker<P>> {
    Arc::new(TupleChecker::for_spec(
        Arc::new(StaticIdentity::new("alice")),
        policy,
        spec,
    ))
}

#[tokio::test]
async fn page_guard_resolves_the_session_subject() {
    let policy = Arc::new(MockPolicyClient::new());
    policy.allow("user:alice", "can_view", "chat:c1");

    let guard = GatedView::new(
        checker(policy.clone(), RelationSpec::new("can_view", "chat:c1")),
        |chat_id: &String| ViewContent::Markdown {
            text: format!("transcript of {chat_id}"),
        },
    );
    let view = guard.render(&"c1".to_string()).await;
    assert_eq!(
        view,
        ViewContent::Markdown {
            text: "transcript of c1".to_string(),
        }
    );

    policy.deny("user:alice", "can_view", "chat:c2");
    let guard = GatedView::new(
        checker(policy, RelationSpec::new("can_view", "chat:c2")),
        |chat_id: &String| ViewContent::Markdown {
            text: format!("transcript of {chat_id}"),
        },
    );
    let view = guard.render(&"c2".to_string()).await;
    assert_eq!(
        view,
        ViewContent::AccessDenied {
            message: DEFAULT_DENIAL_MESSAGE.to_string(),
        }
    );
}

#[tokio::test]
async fn stream_denial_is_persisted_and_reloadable() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(JsonlHistoryStore::new(temp.path()).expect("store"));
    let session_id = Uuid::new_v4();
    let history = ChatHistory::with_store(session_id, store.clone()).expect("history");

    let policy = Arc::new(MockPolicyClient::new());
    let spec = RelationSpec::new("can_view", "doc:confidential");
    let gate = GatedStreamAction::new(
        checker(policy, spec.clone()),
        Arc::new(ReportOperation),
        spec,
    );
    let (events, result) = gate
        .run("confidential".to_string(), history)
        .drain()
        .await;

    assert_eq!(events[0], UiEvent::Pending);
    assert_eq!(result.expect("terminal"), DEFAULT_DENIAL_MESSAGE);

    let reloaded = ChatHistory::with_store(session_id, store).expect("reload");
    let messages = reloaded.snapshot();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("doc:confidential"));
    assert_eq!(messages[1].content, DEFAULT_DENIAL_MESSAGE);
}
