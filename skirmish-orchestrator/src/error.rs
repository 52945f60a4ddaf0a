/// Errors returned to administrative callers
///
/// Only request validation fails a call outright. A busy or idle node and a
/// failing worker node are reported as `{success: false}` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    #[error("{0}")]
    Validation(String),
}
