//! Client boundary for the external relationship-based policy engine and
//! the session identity accessor.
//!
//! The engine itself is opaque: this crate only models `check`, batched
//! checks, and tuple writes, plus the subject resolution the predicate
//! needs. Every call is a fresh logical request against one shared client
//! instance; nothing here caches decisions.

mod client;
mod error;
mod http;
mod identity;

pub use client::{
    BatchCheckItem, BatchCheckOutcome, CheckDecision, CheckRequest, PolicyClient, TupleWrites,
};
pub use error::PolicyError;
pub use http::HttpPolicyClient;
pub use identity::{IdentityResolver, Subject};
