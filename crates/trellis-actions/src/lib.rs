//! Gated tool surface for Trellis.
//!
//! Tools validate their arguments, derive exactly one relation tuple from
//! the validated parameters, and perform side effects only after the gate
//! confirms authorization. The dispatcher wires each call through the
//! streaming gate.

pub mod builtins;
mod context;
mod dispatcher;
mod ledger;
mod registry;
mod tool;

pub use context::ActionContext;
pub use dispatcher::ActionDispatcher;
pub use ledger::{LedgerError, PurchaseRecord, TradeLedger};
pub use registry::ToolRegistry;
pub use tool::Tool;
