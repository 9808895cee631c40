//! Streaming gate variant for tool UI generation.
//!
//! The consumer expects a first value immediately, so the gate emits its
//! loading placeholder before the authorization round trip resolves, then
//! forwards whichever branch runs. Events travel over a bounded channel;
//! the gate forwards them as produced and applies the consumer's
//! backpressure instead of buffering.

use crate::gate::{Decision, decide};
use crate::history::ChatHistory;
use crate::predicate::AccessChecker;
use async_trait::async_trait;
use futures_util::StreamExt;
use log::debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use trellis_config::DEFAULT_DENIAL_MESSAGE;
use trellis_protocol::{RelationSpec, ToolError, UiEvent, ViewContent};

const STREAM_BUFFER: usize = 64;

/// Sender half of a gated UI stream.
pub struct UiEmitter {
    sender: mpsc::Sender<UiEvent>,
}

impl UiEmitter {
    fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    /// Build an emitter with a standalone receiving stream.
    ///
    /// Used to drive a `StreamingAction` outside a gate, e.g. in tests.
    pub fn channel() -> (Self, ReceiverStream<UiEvent>) {
        let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
        (Self::new(sender), ReceiverStream::new(receiver))
    }

    /// Forward one event to the consumer.
    ///
    /// A dropped consumer discards the event; the producing branch keeps
    /// running to completion.
    pub async fn emit(&self, event: UiEvent) {
        if self.sender.send(event).await.is_err() {
            debug!("ui stream consumer dropped, discarding event");
        }
    }

    /// Forward one renderable state.
    pub async fn view(&self, view: ViewContent) {
        self.emit(UiEvent::View(view)).await;
    }
}

/// An operation that streams intermediate UI states and returns a terminal
/// value. The conversation history it may mutate is an explicit handle,
/// never ambient context.
#[async_trait]
pub trait StreamingAction<P>: Send + Sync {
    /// Run the operation, emitting intermediate states as they form.
    async fn run(
        &self,
        params: &P,
        ui: &UiEmitter,
        history: &ChatHistory,
    ) -> Result<String, ToolError>;
}

/// Handle for one gated streaming invocation.
#[derive(Debug)]
pub struct GateStream {
    /// Events emitted during the run, starting with the loading placeholder.
    pub events: ReceiverStream<UiEvent>,
    handle: JoinHandle<Result<String, ToolError>>,
}

impl GateStream {
    /// Await completion of the run and return the terminal value.
    pub async fn finish(self) -> Result<String, ToolError> {
        self.handle
            .await
            .map_err(|err| ToolError::ExecutionFailed(err.to_string()))?
    }

    /// Collect every remaining event, then the terminal value.
    pub async fn drain(mut self) -> (Vec<UiEvent>, Result<String, ToolError>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.next().await {
            events.push(event);
        }
        let result = self
            .handle
            .await
            .map_err(|err| ToolError::ExecutionFailed(err.to_string()))
            .and_then(|result| result);
        (events, result)
    }
}

/// Default streaming fallback: document the denied tuple in the history
/// and surface the denial text.
pub struct DenialFallback {
    spec: RelationSpec,
    message: String,
}

impl DenialFallback {
    /// Build a fallback for the tuple that was denied.
    pub fn new(spec: RelationSpec, message: impl Into<String>) -> Self {
        Self {
            spec,
            message: message.into(),
        }
    }
}

#[async_trait]
impl<P: Send + Sync> StreamingAction<P> for DenialFallback {
    async fn run(
        &self,
        _params: &P,
        ui: &UiEmitter,
        history: &ChatHistory,
    ) -> Result<String, ToolError> {
        let subject = self.spec.user.as_deref().unwrap_or("the current user");
        let system = format!(
            "Access denied: {subject} does not hold relation \"{}\" on \"{}\". Explain the restriction if the user asks.",
            self.spec.relation, self.spec.object
        );
        history.append_denial_pair(system, self.message.clone());
        ui.emit(UiEvent::Denied {
            message: self.message.clone(),
        })
        .await;
        Ok(self.message.clone())
    }
}

/// Gate for streaming tool UI generation.
pub struct GatedStreamAction<P> {
    checker: Arc<dyn AccessChecker<P>>,
    operation: Arc<dyn StreamingAction<P>>,
    fallback: Option<Arc<dyn StreamingAction<P>>>,
    spec: RelationSpec,
    denial_message: String,
}

impl<P: Send + Sync + 'static> GatedStreamAction<P> {
    /// Wrap a streaming operation behind a checker.
    ///
    /// `spec` names the tuple being enforced so the default fallback can
    /// document a denial in the conversation history.
    pub fn new(
        checker: Arc<dyn AccessChecker<P>>,
        operation: Arc<dyn StreamingAction<P>>,
        spec: RelationSpec,
    ) -> Self {
        Self {
            checker,
            operation,
            fallback: None,
            spec,
            denial_message: DEFAULT_DENIAL_MESSAGE.to_string(),
        }
    }

    /// Replace the default denial fallback.
    pub fn with_fallback(mut self, fallback: Arc<dyn StreamingAction<P>>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Override the default denial text.
    pub fn with_denial_message(mut self, message: impl Into<String>) -> Self {
        self.denial_message = message.into();
        self
    }

    /// Start the gated run and hand the event stream to the consumer.
    ///
    /// The placeholder is emitted before the checker is awaited; the
    /// checker completes before either branch starts; errors from the
    /// operation after an allowed check surface out of
    /// [`GateStream::finish`] unchanged.
    pub fn run(&self, params: P, history: ChatHistory) -> GateStream {
        let (sender, receiver) = mpsc::channel(STREAM_BUFFER);
        let checker = Arc::clone(&self.checker);
        let operation = Arc::clone(&self.operation);
        let fallback = self.fallback.clone();
        let spec = self.spec.clone();
        let denial_message = self.denial_message.clone();

        let handle = tokio::spawn(async move {
            let ui = UiEmitter::new(sender);
            ui.emit(UiEvent::Pending).await;
            match decide(checker.as_ref(), &params).await {
                Decision::Allowed => operation.run(&params, &ui, &history).await,
                Decision::Denied(reason) => {
                    debug!(
                        "stream denied (relation={}, object={}, reason={reason})",
                        spec.relation, spec.object
                    );
                    match fallback {
                        Some(fallback) => fallback.run(&params, &ui, &history).await,
                        None => {
                            DenialFallback::new(spec, denial_message)
                                .run(&params, &ui, &history)
                                .await
                        }
                    }
                }
            }
        });

        GateStream {
            events: ReceiverStream::new(receiver),
            handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GatedStreamAction, StreamingAction, UiEmitter};
    use crate::history::ChatHistory;
    use crate::predicate::AccessChecker;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use trellis_config::DEFAULT_DENIAL_MESSAGE;
    use trellis_policy::PolicyError;
    use trellis_protocol::{RelationSpec, Role, ToolError, UiEvent, ViewContent};
    use uuid::Uuid;

    struct ScriptedChecker {
        outcome: Result<bool, String>,
        release: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl AccessChecker<()> for ScriptedChecker {
        async fn check(&self, _params: &()) -> Result<bool, PolicyError> {
            if let Some(release) = &self.release {
                release.notified().await;
            }
            match &self.outcome {
                Ok(allowed) => Ok(*allowed),
                Err(message) => Err(PolicyError::Http(message.clone())),
            }
        }
    }

    struct EchoOperation {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl StreamingAction<()> for EchoOperation {
        async fn run(
            &self,
            _params: &(),
            ui: &UiEmitter,
            _history: &ChatHistory,
        ) -> Result<String, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ToolError::ExecutionFailed("backend down".to_string()));
            }
            ui.view(ViewContent::Markdown {
                text: "step one".to_string(),
            })
            .await;
            ui.view(ViewContent::Markdown {
                text: "step two".to_string(),
            })
            .await;
            Ok("done".to_string())
        }
    }

    fn gate(
        outcome: Result<bool, String>,
        release: Option<Arc<Notify>>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    ) -> GatedStreamAction<()> {
        GatedStreamAction::new(
            Arc::new(ScriptedChecker { outcome, release }),
            Arc::new(EchoOperation { calls, fail }),
            RelationSpec::new("can_buy", "asset:nvda").with_user("user:u1"),
        )
    }

    #[tokio::test]
    async fn placeholder_arrives_before_the_check_resolves() {
        let release = Arc::new(Notify::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let history = ChatHistory::in_memory(Uuid::new_v4());
        let mut stream = gate(Ok(true), Some(release.clone()), calls, false)
            .run((), history);

        // The checker is still parked on the notify when this arrives.
        let first = stream.events.next().await.expect("first event");
        assert_eq!(first, UiEvent::Pending);

        release.notify_one();
        let (rest, result) = stream.drain().await;
        assert_eq!(
            rest,
            vec![
                UiEvent::View(ViewContent::Markdown {
                    text: "step one".to_string(),
                }),
                UiEvent::View(ViewContent::Markdown {
                    text: "step two".to_string(),
                }),
            ]
        );
        assert_eq!(result.expect("terminal"), "done");
    }

    #[tokio::test]
    async fn allowed_forwards_branch_yields_and_terminal_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let history = ChatHistory::in_memory(Uuid::new_v4());
        let stream = gate(Ok(true), None, calls.clone(), false).run((), history);
        let (events, result) = stream.drain().await;

        assert_eq!(events[0], UiEvent::Pending);
        assert_eq!(events.len(), 3);
        assert_eq!(result.expect("terminal"), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denied_appends_message_pair_and_skips_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let history = ChatHistory::in_memory(Uuid::new_v4());
        let stream = gate(Ok(false), None, calls.clone(), false).run((), history.clone());
        let (events, result) = stream.drain().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            events,
            vec![
                UiEvent::Pending,
                UiEvent::Denied {
                    message: DEFAULT_DENIAL_MESSAGE.to_string(),
                },
            ]
        );
        assert_eq!(result.expect("terminal"), DEFAULT_DENIAL_MESSAGE);

        let messages = history.snapshot();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("asset:nvda"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, DEFAULT_DENIAL_MESSAGE);
    }

    #[tokio::test]
    async fn checker_fault_streams_the_same_denial_as_a_deliberate_deny() {
        let calls = Arc::new(AtomicUsize::new(0));
        let history = ChatHistory::in_memory(Uuid::new_v4());
        let stream = gate(
            Err("network timeout".to_string()),
            None,
            calls.clone(),
            false,
        )
        .run((), history);
        let (events, result) = stream.drain().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(events[0], UiEvent::Pending);
        assert_eq!(
            events[1],
            UiEvent::Denied {
                message: DEFAULT_DENIAL_MESSAGE.to_string(),
            }
        );
        assert_eq!(result.expect("no exception escapes"), DEFAULT_DENIAL_MESSAGE);
    }

    #[tokio::test]
    async fn operation_errors_surface_from_finish() {
        let calls = Arc::new(AtomicUsize::new(0));
        let history = ChatHistory::in_memory(Uuid::new_v4());
        let stream = gate(Ok(true), None, calls, true).run((), history);
        let (_events, result) = stream.drain().await;
        let err = result.expect_err("operation fault");
        let ToolError::ExecutionFailed(message) = err else {
            panic!("expected execution failure");
        };
        assert_eq!(message, "backend down");
    }

    #[tokio::test]
    async fn custom_fallback_replaces_the_default() {
        struct QuietFallback;

        #[async_trait]
        impl StreamingAction<()> for QuietFallback {
            async fn run(
                &self,
                _params: &(),
                ui: &UiEmitter,
                _history: &ChatHistory,
            ) -> Result<String, ToolError> {
                ui.emit(UiEvent::Denied {
                    message: "nope".to_string(),
                })
                .await;
                Ok("nope".to_string())
            }
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let history = ChatHistory::in_memory(Uuid::new_v4());
        let stream = gate(Ok(false), None, calls, false)
            .with_fallback(Arc::new(QuietFallback))
            .run((), history.clone());
        let (events, result) = stream.drain().await;

        assert_eq!(
            events,
            vec![
                UiEvent::Pending,
                UiEvent::Denied {
                    message: "nope".to_string(),
                },
            ]
        );
        assert_eq!(result.expect("terminal"), "nope");
        assert_eq!(history.snapshot().len(), 0);
    }
}
