//! Scripted policy client double.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use trellis_policy::{
    BatchCheckItem, BatchCheckOutcome, CheckDecision, CheckRequest, PolicyClient, PolicyError,
    TupleWrites,
};
use trellis_protocol::AccessTuple;

/// In-memory policy client with programmable outcomes.
///
/// Records every call so tests can assert round-trip counts and the exact
/// tuples submitted.
#[derive(Default)]
pub struct MockPolicyClient {
    outcomes: Mutex<HashMap<String, bool>>,
    default_allow: bool,
    check_fault: Option<String>,
    batch_fault: Option<String>,
    reverse_batch: bool,
    check_calls: Mutex<Vec<AccessTuple>>,
    batch_calls: Mutex<Vec<Vec<AccessTuple>>>,
    writes: Mutex<Vec<TupleWrites>>,
}

impl MockPolicyClient {
    /// Client denying everything not explicitly allowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the default outcome for unscripted tuples.
    pub fn with_default_allow(mut self, allow: bool) -> Self {
        self.default_allow = allow;
        self
    }

    /// Make every `check` call fail.
    pub fn with_check_fault(mut self, message: impl Into<String>) -> Self {
        self.check_fault = Some(message.into());
        self
    }

    /// Make every `batch_check` call fail.
    pub fn with_batch_fault(mut self, message: impl Into<String>) -> Self {
        self.batch_fault = Some(message.into());
        self
    }

    /// Return batch outcomes in reverse submission order, exercising
    /// correlation by echoed id.
    pub fn with_reversed_batch_outcomes(mut self) -> Self {
        self.reverse_batch = true;
        self
    }

    /// Script one tuple as allowed.
    pub fn allow(&self, user: &str, relation: &str, object: &str) {
        self.outcomes
            .lock()
            .insert(key_parts(user, relation, object), true);
    }

    /// Script one tuple as denied.
    pub fn deny(&self, user: &str, relation: &str, object: &str) {
        self.outcomes
            .lock()
            .insert(key_parts(user, relation, object), false);
    }

    /// Tuples submitted through `check`.
    pub fn check_calls(&self) -> Vec<AccessTuple> {
        self.check_calls.lock().clone()
    }

    /// Tuple batches submitted through `batch_check`.
    pub fn batch_calls(&self) -> Vec<Vec<AccessTuple>> {
        self.batch_calls.lock().clone()
    }

    /// Writes submitted through `write_tuples`.
    pub fn written(&self) -> Vec<TupleWrites> {
        self.writes.lock().clone()
    }

    fn outcome_for(&self, tuple: &AccessTuple) -> bool {
        self.outcomes
            .lock()
            .get(&key(tuple))
            .copied()
            .unwrap_or(self.default_allow)
    }
}

fn key_parts(user: &str, relation: &str, object: &str) -> String {
    format!("{user}|{relation}|{object}")
}

fn key(tuple: &AccessTuple) -> String {
    key_parts(&tuple.user, &tuple.relation, &tuple.object)
}

#[async_trait]
impl PolicyClient for MockPolicyClient {
    async fn check(&self, request: CheckRequest) -> Result<CheckDecision, PolicyError> {
        self.check_calls.lock().push(request.tuple.clone());
        if let Some(message) = &self.check_fault {
            return Err(PolicyError::Http(message.clone()));
        }
        Ok(CheckDecision {
            allowed: self.outcome_for(&request.tuple),
        })
    }

    async fn batch_check(
        &self,
        items: Vec<BatchCheckItem>,
    ) -> Result<Vec<BatchCheckOutcome>, PolicyError> {
        self.batch_calls
            .lock()
            .push(items.iter().map(|item| item.tuple.clone()).collect());
        if let Some(message) = &self.batch_fault {
            return Err(PolicyError::Http(message.clone()));
        }
        let mut outcomes = items
            .iter()
            .map(|item| BatchCheckOutcome {
                correlation_id: item.correlation_id,
                allowed: self.outcome_for(&item.tuple),
            })
            .collect::<Vec<_>>();
        if self.reverse_batch {
            outcomes.reverse();
        }
        Ok(outcomes)
    }

    async fn write_tuples(&self, writes: TupleWrites) -> Result<(), PolicyError> {
        self.writes.lock().push(writes);
        Ok(())
    }
}
