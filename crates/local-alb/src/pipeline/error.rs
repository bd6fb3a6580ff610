use crate::auth::AuthError;
use hyper::header::InvalidHeaderValue;

/// Reasons a pipeline run fails. Each one is answered with a 500.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no actions to run (no rule matched and no default actions are configured)")]
    EmptyActions,

    #[error("action list ended without a terminal action")]
    UnterminatedActions,

    #[error("authenticate-oidc action at position {position} is not the first action")]
    MisplacedAuthentication { position: usize },

    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error("identity cannot be carried in a header: {0}")]
    InvalidIdentityHeader(#[from] InvalidHeaderValue),

    #[error("failed to build response: {0}")]
    Response(#[from] hyper::http::Error),
}

impl PipelineError {
    /// True for configuration problems that load-time validation should have caught
    pub fn is_misconfiguration(&self) -> bool {
        matches!(
            self,
            PipelineError::EmptyActions
                | PipelineError::UnterminatedActions
                | PipelineError::MisplacedAuthentication { .. }
        )
    }
}
