//! Core permission-gated dispatch primitives for Trellis.
//!
//! This crate owns the permission predicate, the gate variants enforcing
//! check-before-act around heterogeneous execution models, the conversation
//! history handle their fallbacks mutate, and the access-filtered retriever.

pub mod gate;
pub mod history;
pub mod predicate;
pub mod retriever;
pub mod stream;

pub use gate::{Action, Decision, DenialReason, DeniedResponse, GatedAction, GatedView, decide};
pub use history::{ChatHistory, HistoryError, HistoryStore, JsonlHistoryStore, SessionSummary};
pub use predicate::{AccessChecker, TupleChecker, evaluate_relation};
pub use retriever::{
    AccessFilteredRetriever, DocumentRetriever, RetrievalError, TupleBuilder, document_relation,
};
pub use stream::{DenialFallback, GateStream, GatedStreamAction, StreamingAction, UiEmitter};
