//! Policy client interface consumed by the permission predicate and the
//! retrieval access filter.

use crate::error::PolicyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use trellis_protocol::AccessTuple;
use uuid::Uuid;

/// A single relationship check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRequest {
    /// Tuple to evaluate.
    pub tuple: AccessTuple,
}

/// Engine verdict for one check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckDecision {
    /// Whether the relationship holds.
    pub allowed: bool,
}

/// One item of a batched check, tagged for response correlation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCheckItem {
    /// Caller-chosen id echoed back by the engine.
    pub correlation_id: Uuid,
    /// Tuple to evaluate.
    pub tuple: AccessTuple,
}

impl BatchCheckItem {
    /// Tag a tuple with a fresh correlation id.
    pub fn new(tuple: AccessTuple) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            tuple,
        }
    }
}

/// Engine verdict for one batched item, correlated by the echoed id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchCheckOutcome {
    /// Echo of the submitted correlation id.
    pub correlation_id: Uuid,
    /// Whether the relationship holds.
    pub allowed: bool,
}

/// Tuple mutations applied in one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TupleWrites {
    /// Tuples to add.
    #[serde(default)]
    pub writes: Vec<AccessTuple>,
    /// Tuples to remove.
    #[serde(default)]
    pub deletes: Vec<AccessTuple>,
}

impl TupleWrites {
    /// Writes-only mutation.
    pub fn add(writes: Vec<AccessTuple>) -> Self {
        Self {
            writes,
            deletes: Vec::new(),
        }
    }
}

/// Typed interface to the external relationship-based policy engine.
///
/// Implementations must be safe for concurrent use; every call is an
/// independent round trip with no shared lock.
#[async_trait]
pub trait PolicyClient: Send + Sync {
    /// Evaluate one tuple.
    async fn check(&self, request: CheckRequest) -> Result<CheckDecision, PolicyError>;

    /// Evaluate many tuples in a single round trip.
    ///
    /// Outcomes correlate to items by the echoed `correlation_id`, never by
    /// response position.
    async fn batch_check(
        &self,
        items: Vec<BatchCheckItem>,
    ) -> Result<Vec<BatchCheckOutcome>, PolicyError>;

    /// Apply tuple writes and deletes.
    async fn write_tuples(&self, writes: TupleWrites) -> Result<(), PolicyError>;
}
