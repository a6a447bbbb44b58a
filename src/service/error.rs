use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::{jobmodel::JobStatus, proposalmodel::ProposalStatus},
    storage::StorageError,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Job {0} is not in status open (currently {1:?})")]
    InvalidJobStatus(Uuid, JobStatus),

    #[error("Job {0} has proposals and cannot be deleted")]
    JobHasProposals(Uuid),

    #[error("Proposal {0} not found")]
    ProposalNotFound(Uuid),

    #[error("You have already submitted a proposal for job {0}")]
    AlreadyApplied(Uuid),

    #[error("Proposal {proposal_id} is already {from:?} and cannot become {to:?}")]
    InvalidProposalTransition {
        proposal_id: Uuid,
        from: ProposalStatus,
        to: ProposalStatus,
    },

    #[error("Contract {0} not found")]
    ContractNotFound(Uuid),

    #[error("File {0} not found")]
    FileNotFound(Uuid),

    #[error("A user with this email already exists")]
    EmailExists,

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File exceeds the maximum size of {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UserNotFound(_)
            | ServiceError::JobNotFound(_)
            | ServiceError::ProposalNotFound(_)
            | ServiceError::ContractNotFound(_)
            | ServiceError::FileNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::InvalidJobStatus(_, _) | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,

            ServiceError::AlreadyApplied(_)
            | ServiceError::JobHasProposals(_)
            | ServiceError::InvalidProposalTransition { .. }
            | ServiceError::EmailExists => StatusCode::CONFLICT,

            ServiceError::Authentication(_) => StatusCode::UNAUTHORIZED,

            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,

            ServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,

            ServiceError::Storage(_) | ServiceError::Database(_) | ServiceError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn forbidden() -> Self {
        ServiceError::Forbidden(ErrorMessage::PermissionDenied.to_string())
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{}", error);
            return HttpError::server_error(ErrorMessage::ServerError.to_string());
        }
        HttpError::new(error.to_string(), status)
    }
}

impl From<ErrorMessage> for ServiceError {
    fn from(err: ErrorMessage) -> Self {
        match err {
            ErrorMessage::EmptyPassword | ErrorMessage::ExceededMaxPasswordLength(_) => {
                ServiceError::Validation(err.to_string())
            }
            ErrorMessage::HashingError | ErrorMessage::InvalidHashFormat | ErrorMessage::ServerError => {
                ServiceError::Other(err.to_string())
            }
            ErrorMessage::PermissionDenied => ServiceError::Forbidden(err.to_string()),
            _ => ServiceError::Authentication(err.to_string()),
        }
    }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
