use crate::save::SaveReport;
use api_client::ApiError;
use doc_model::CollectionError;
use std::fmt;

/// Which request of a finalize sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStep {
    /// Recording signature `index` (1-based) of `total` before finalizing.
    Record { index: usize, total: usize },
    Submit,
}

impl fmt::Display for FinalizeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record { index, total } => write!(f, "recording signature {index} of {total}"),
            Self::Submit => f.write_str("finalize request"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("could not load document: {0}")]
    Load(#[source] ApiError),
    #[error("{0}")]
    Validation(String),
    #[error(
        "{failed} of {total} signatures failed to save",
        failed = .report.failed_count(),
        total = .report.len()
    )]
    PartialSave { report: SaveReport },
    #[error("finalize failed while {step}: {source}")]
    Finalize { step: FinalizeStep, source: ApiError },
    #[error("a finalize request is already in progress")]
    FinalizeInFlight,
    #[error("finalize was cancelled")]
    Cancelled,
    #[error("this signing link is invalid or expired")]
    TokenExpired,
    #[error("document already finalized in this session")]
    AlreadyFinalized,
    #[error("session is not ready ({0})")]
    NotReady(&'static str),
    #[error("could not start finalize worker: {0}")]
    Worker(String),
    #[error(transparent)]
    Collection(#[from] CollectionError),
}

impl SessionError {
    pub(crate) fn finalize(step: FinalizeStep, source: ApiError) -> Self {
        Self::Finalize { step, source }
    }

    /// Underlying API failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Load(source) | Self::Finalize { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The server rejected the credential somewhere along the way.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::PartialSave { report } => report
                .failed()
                .any(|outcome| matches!(outcome.result, Err(ApiError::Unauthorized))),
            _ => matches!(self.api_error(), Some(ApiError::Unauthorized)),
        }
    }
}
