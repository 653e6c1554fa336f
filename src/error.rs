use std::fmt;

use thiserror::Error;

use crate::model::LinkType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("company profile not found: {0}")]
    NotFound(String),

    #[error("link '{link_type}' already exists for company {company_number}")]
    LinkAlreadyExists {
        company_number: String,
        link_type: LinkType,
    },

    #[error("link '{link_type}' already does not exist for company {company_number}")]
    LinkAlreadyAbsent {
        company_number: String,
        link_type: LinkType,
    },

    #[error("stale delta for company {company_number}: {candidate} is before stored {stored}")]
    StaleDelta {
        company_number: String,
        candidate: String,
        stored: String,
    },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("resource changed notification failed: {0}")]
    Notification(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

/// Coarse error class used by callers that branch on outcome rather than cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    ServiceUnavailable,
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::BadRequest => "bad_request",
            Self::ServiceUnavailable => "service_unavailable",
        };
        write!(f, "{label}")
    }
}

impl SyncError {
    pub fn not_found(company_number: impl fmt::Display) -> Self {
        Self::NotFound(company_number.to_string())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::NotFound(_) => SyncErrorKind::NotFound,
            Self::LinkAlreadyExists { .. }
            | Self::LinkAlreadyAbsent { .. }
            | Self::StaleDelta { .. } => SyncErrorKind::Conflict,
            Self::BadRequest(_) => SyncErrorKind::BadRequest,
            Self::ServiceUnavailable(_) | Self::Notification(_) => {
                SyncErrorKind::ServiceUnavailable
            }
        }
    }

    /// Returns `true` when a caller may resubmit the same request later.
    pub fn is_retryable(&self) -> bool {
        self.kind() == SyncErrorKind::ServiceUnavailable
    }
}
