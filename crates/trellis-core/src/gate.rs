//! The permission gate: check before act, fail closed.
//!
//! Three execution contexts share one decision protocol but keep distinct
//! calling conventions: plain async actions and synchronous view guards
//! live here, the streaming variant in [`crate::stream`]. All of them
//! branch on [`decide`], the single place checker faults are absorbed.

use crate::predicate::AccessChecker;
use async_trait::async_trait;
use log::{debug, error};
use std::fmt;
use std::sync::Arc;
use trellis_config::DEFAULT_DENIAL_MESSAGE;
use trellis_protocol::{ToolError, ViewContent};

/// Outcome of running a checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The operation may run.
    Allowed,
    /// The fallback path must run instead.
    Denied(DenialReason),
}

/// Why a gate denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The policy engine answered `allowed: false`.
    NotAuthorized,
    /// The checker failed; uncertainty denies.
    CheckerFault(String),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::NotAuthorized => f.write_str("not authorized"),
            DenialReason::CheckerFault(message) => write!(f, "checker fault: {message}"),
        }
    }
}

/// Run a checker and fold its result into a decision.
///
/// The checker always completes before any operation or fallback starts.
/// A checker error is logged and becomes `Denied`; it never propagates to
/// the caller and is never treated as allowed.
pub async fn decide<P: Send + Sync>(checker: &dyn AccessChecker<P>, params: &P) -> Decision {
    match checker.check(params).await {
        Ok(true) => Decision::Allowed,
        Ok(false) => Decision::Denied(DenialReason::NotAuthorized),
        Err(err) => {
            error!("permission check failed, denying (error={err})");
            Decision::Denied(DenialReason::CheckerFault(err.to_string()))
        }
    }
}

/// A plain async operation guarded by [`GatedAction`].
#[async_trait]
pub trait Action<P, R>: Send + Sync {
    /// Run the operation with validated parameters.
    async fn run(&self, params: &P) -> Result<R, ToolError>;
}

/// Result types that can stand in for a denied operation.
pub trait DeniedResponse {
    /// Build the generic "not authorized" value for this result type.
    fn denied(message: &str) -> Self;
}

impl DeniedResponse for String {
    fn denied(message: &str) -> Self {
        message.to_string()
    }
}

impl DeniedResponse for ViewContent {
    fn denied(message: &str) -> Self {
        ViewContent::AccessDenied {
            message: message.to_string(),
        }
    }
}

/// Gate for plain async actions (server actions and the like).
///
/// Built once per call site and reused; holds no per-invocation state.
pub struct GatedAction<P, R> {
    checker: Arc<dyn AccessChecker<P>>,
    operation: Arc<dyn Action<P, R>>,
    fallback: Option<Arc<dyn Action<P, R>>>,
    denial_message: String,
}

impl<P: Send + Sync, R: DeniedResponse> GatedAction<P, R> {
    /// Wrap an operation behind a checker.
    pub fn new(checker: Arc<dyn AccessChecker<P>>, operation: Arc<dyn Action<P, R>>) -> Self {
        Self {
            checker,
            operation,
            fallback: None,
            denial_message: DEFAULT_DENIAL_MESSAGE.to_string(),
        }
    }

    /// Replace the default denial value with a custom fallback action.
    pub fn with_fallback(mut self, fallback: Arc<dyn Action<P, R>>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Override the default denial text.
    pub fn with_denial_message(mut self, message: impl Into<String>) -> Self {
        self.denial_message = message.into();
        self
    }

    /// Check, then run the operation or the fallback.
    ///
    /// Operation errors after an allowed check propagate unchanged; the
    /// gate's only responsibility is the authorization boundary. The
    /// default denial value is produced without mutating any state.
    pub async fn run(&self, params: &P) -> Result<R, ToolError> {
        match decide(self.checker.as_ref(), params).await {
            Decision::Allowed => self.operation.run(params).await,
            Decision::Denied(reason) => {
                debug!("action denied (reason={reason})");
                match &self.fallback {
                    Some(fallback) => fallback.run(params).await,
                    None => Ok(R::denied(&self.denial_message)),
                }
            }
        }
    }
}

/// Synchronous render closure used by [`GatedView`].
pub type RenderFn<P> = Arc<dyn Fn(&P) -> ViewContent + Send + Sync>;

/// Gate for whole-view renders (page and layout guards).
///
/// Operation and fallback are synchronous renders; only the checker
/// suspends.
pub struct GatedView<P> {
    checker: Arc<dyn AccessChecker<P>>,
    operation: RenderFn<P>,
    fallback: Option<RenderFn<P>>,
    denial_message: String,
}

impl<P: Send + Sync> GatedView<P> {
    /// Wrap a render closure behind a checker.
    pub fn new(
        checker: Arc<dyn AccessChecker<P>>,
        operation: impl Fn(&P) -> ViewContent + Send + Sync + 'static,
    ) -> Self {
        Self {
            checker,
            operation: Arc::new(operation),
            fallback: None,
            denial_message: DEFAULT_DENIAL_MESSAGE.to_string(),
        }
    }

    /// Replace the fixed denial rendering with a custom one.
    pub fn with_fallback(mut self, fallback: impl Fn(&P) -> ViewContent + Send + Sync + 'static) -> Self {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// Override the default denial text.
    pub fn with_denial_message(mut self, message: impl Into<String>) -> Self {
        self.denial_message = message.into();
        self
    }

    /// Check, then render the view or the denial.
    pub async fn render(&self, params: &P) -> ViewContent {
        match decide(self.checker.as_ref(), params).await {
            Decision::Allowed => (self.operation)(params),
            Decision::Denied(reason) => {
                debug!("view denied (reason={reason})");
                match &self.fallback {
                    Some(fallback) => fallback(params),
                    None => ViewContent::AccessDenied {
                        message: self.denial_message.clone(),
                    },
                }
            }
        }
    }
}
