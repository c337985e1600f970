use crate::models::CareRole;

/// Typed failure taxonomy surfaced by every callable operation. Validation
/// errors are raised before any write; storage failures collapse into
/// `Internal` unless a typed error was already in flight.
#[derive(Debug, thiserror::Error)]
pub enum CareError {
    #[error("caller identity is missing or unknown")]
    Unauthenticated,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("precondition failed: {0}")]
    FailedPrecondition(String),
    #[error("no suitable {0} candidate for this patient")]
    NoSuitableCandidate(CareRole),
    #[error("no doctor is currently available for escalation")]
    NoAvailableDoctor,
    #[error("internal error: {0}")]
    Internal(String),
}

impl CareError {
    /// Stable machine-readable code, independent of the display message.
    pub fn code(&self) -> &'static str {
        match self {
            CareError::Unauthenticated => "unauthenticated",
            CareError::InvalidArgument(_) => "invalid-argument",
            CareError::NotFound(_) => "not-found",
            CareError::PermissionDenied(_) => "permission-denied",
            CareError::FailedPrecondition(_) => "failed-precondition",
            CareError::NoSuitableCandidate(_) => "no-suitable-candidate",
            CareError::NoAvailableDoctor => "no-available-doctor",
            CareError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for CareError {
    fn from(err: sqlx::Error) -> Self {
        CareError::Internal(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for CareError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CareError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for CareError {
    fn from(err: serde_json::Error) -> Self {
        CareError::Internal(err.to_string())
    }
}

pub type CareResult<T> = Result<T, CareError>;
