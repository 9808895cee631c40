//! Permission predicate: resolve a subject, evaluate one relation tuple.

use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use trellis_policy::{CheckRequest, IdentityResolver, PolicyClient, PolicyError};
use trellis_protocol::RelationSpec;

/// Predicate abstraction consumed by the gates.
///
/// Pure with respect to core state; the only external effect is the remote
/// check call. Independent checks share no lock.
#[async_trait]
pub trait AccessChecker<P>: Send + Sync {
    /// Return whether the operation described by `params` is authorized.
    async fn check(&self, params: &P) -> Result<bool, PolicyError>;
}

/// Evaluate one relation spec against the policy engine.
///
/// When the spec carries no explicit subject, the ambient session subject
/// is used; a missing session resolves to `false` rather than an error.
pub async fn evaluate_relation(
    identity: &dyn IdentityResolver,
    policy: &dyn PolicyClient,
    spec: &RelationSpec,
) -> Result<bool, PolicyError> {
    let user = match &spec.user {
        Some(user) => user.clone(),
        None => match identity.current_subject().await {
            Some(subject) => subject.user_ref(),
            None => {
                warn!(
                    "no session subject for permission check (relation={}, object={})",
                    spec.relation, spec.object
                );
                return Ok(false);
            }
        },
    };
    let tuple = spec.clone().into_tuple(user);
    debug!("checking relation (tuple={tuple})");
    let decision = policy.check(CheckRequest { tuple }).await?;
    Ok(decision.allowed)
}

/// An `AccessChecker` closing over one tuple derivation.
pub struct TupleChecker<P> {
    identity: Arc<dyn IdentityResolver>,
    policy: Arc<dyn PolicyClient>,
    to_spec: Arc<dyn Fn(&P) -> RelationSpec + Send + Sync>,
}

impl<P> TupleChecker<P> {
    /// Build a checker deriving its spec from the call parameters.
    pub fn new(
        identity: Arc<dyn IdentityResolver>,
        policy: Arc<dyn PolicyClient>,
        to_spec: impl Fn(&P) -> RelationSpec + Send + Sync + 'static,
    ) -> Self {
        Self {
            identity,
            policy,
            to_spec: Arc::new(to_spec),
        }
    }

    /// Build a checker for a spec already derived from validated params.
    pub fn for_spec(
        identity: Arc<dyn IdentityResolver>,
        policy: Arc<dyn PolicyClient>,
        spec: RelationSpec,
    ) -> Self {
        Self::new(identity, policy, move |_| spec.clone())
    }
}

#[async_trait]
impl<P: Send + Sync> AccessChecker<P> for TupleChecker<P> {
    async fn check(&self, params: &P) -> Result<bool, PolicyError> {
        let spec = (self.to_spec)(params);
        evaluate_relation(self.identity.as_ref(), self.policy.as_ref(), &spec).await
    }
}
