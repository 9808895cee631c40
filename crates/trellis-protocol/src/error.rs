/// Errors returned by tools and the dispatch surface.
///
/// `InvalidArguments` is the validation class: it is reported before any
/// permission check runs and is never collapsed into a denial. There is
/// deliberately no denial variant here; a gate denial resolves to a plain
/// value under the caller's execution protocol, never to an error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool registered under the requested name.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// Argument payload failed schema validation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The authorized operation itself failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}
