//! Access-filtered document retrieval.
//!
//! Wraps an inner retriever and keeps only the candidates the policy
//! engine allows, using one batched round trip regardless of candidate
//! count.

use async_trait::async_trait;
use log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use trellis_policy::{BatchCheckItem, PolicyClient, PolicyError};
use trellis_protocol::{AccessTuple, Document, object_ref};
use uuid::Uuid;

/// Errors returned by retrieval.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The inner retriever failed.
    #[error("retriever error: {0}")]
    Inner(String),
    /// The batched permission evaluation failed.
    #[error("policy error during retrieval: {0}")]
    Policy(#[from] PolicyError),
}

/// Retriever abstraction over a document source.
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Return ordered candidates for a query.
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError>;
}

/// Derives the check tuple for one candidate document.
pub type TupleBuilder = Arc<dyn Fn(&str, &Document, &str) -> AccessTuple + Send + Sync>;

/// Builder checking `relation` on `doc:<id>` for the subject.
pub fn document_relation(relation: impl Into<String>) -> TupleBuilder {
    let relation = relation.into();
    Arc::new(move |subject, document, _query| {
        AccessTuple::new(
            subject.to_string(),
            relation.clone(),
            object_ref("doc", &document.id),
        )
    })
}

/// Retriever returning the order-preserving subsequence of allowed
/// candidates.
pub struct AccessFilteredRetriever {
    subject: String,
    inner: Arc<dyn DocumentRetriever>,
    tuple_builder: TupleBuilder,
    policy: Arc<dyn PolicyClient>,
}

impl AccessFilteredRetriever {
    /// Wrap an inner retriever for one subject.
    pub fn new(
        subject: impl Into<String>,
        inner: Arc<dyn DocumentRetriever>,
        tuple_builder: TupleBuilder,
        policy: Arc<dyn PolicyClient>,
    ) -> Self {
        Self {
            subject: subject.into(),
            inner,
            tuple_builder,
            policy,
        }
    }

    /// Evaluate the batch and index outcomes by echoed correlation id.
    async fn batch_outcomes(
        &self,
        items: Vec<BatchCheckItem>,
    ) -> Result<HashMap<Uuid, bool>, RetrievalError> {
        let outcomes = self.policy.batch_check(items).await?;
        Ok(outcomes
            .into_iter()
            .map(|outcome| (outcome.correlation_id, outcome.allowed))
            .collect())
    }
}

#[async_trait]
impl DocumentRetriever for AccessFilteredRetriever {
    /// Retrieve candidates and filter them through one batched check.
    ///
    /// Candidates are never deduplicated before evaluation: duplicate
    /// object ids each retain their own outcome. Outcomes correlate by the
    /// echoed correlation id; a missing echo drops its candidate. A policy
    /// fault filters everything out rather than surfacing an error; only
    /// inner-retriever faults propagate.
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        let candidates = self.inner.retrieve(query).await?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let items = candidates
            .iter()
            .map(|document| {
                BatchCheckItem::new((self.tuple_builder)(&self.subject, document, query))
            })
            .collect::<Vec<_>>();
        let allowed = match self.batch_outcomes(items.clone()).await {
            Ok(allowed) => allowed,
            Err(RetrievalError::Policy(err)) => {
                error!("batch permission check failed, filtering all candidates (error={err})");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let total = candidates.len();
        let mut kept = Vec::new();
        for (document, item) in candidates.into_iter().zip(items) {
            match allowed.get(&item.correlation_id) {
                Some(true) => kept.push(document),
                Some(false) => {}
                None => {
                    warn!(
                        "batch outcome missing, dropping candidate (correlation_id={}, object={})",
                        item.correlation_id, item.tuple.object
                    );
                }
            }
        }
        debug!("retrieval filtered (kept={}, total={total})", kept.len());
        Ok(kept)
    }
}
