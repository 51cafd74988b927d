use thiserror::Error;

use crate::domain::request::{ApproverId, Decision, RequestId, RequestStatus};

/// Logic errors produced by the workflow engine. None of these are
/// transient: retrying the same call yields the same error, so callers
/// should refresh their view instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("unknown unarchive request `{id}`")]
    RequestNotFound { id: RequestId },
    #[error("request `{request_id}` has no approver slot `{approver_id}`")]
    ApproverNotFound { request_id: RequestId, approver_id: ApproverId },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("request `{id}` is already finalized as {status:?}")]
    AlreadyFinalized { id: RequestId, status: RequestStatus },
    #[error("approver slot `{approver_id}` already decided ({decision:?})")]
    AlreadyDecided { approver_id: ApproverId, decision: Decision },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Presentation-safe mapping of application errors. The conflict class
/// covers "someone else already acted" races, which the calling layer
/// should surface as a non-fatal notice.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "That unarchive request could not be found.",
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Conflict { .. } => {
                "This request was already decided. Refresh to see the latest state."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = "unassigned".to_owned();
        match value {
            ApplicationError::Workflow(
                error @ (WorkflowError::RequestNotFound { .. }
                | WorkflowError::ApproverNotFound { .. }),
            ) => Self::NotFound { message: error.to_string(), correlation_id: unassigned },
            ApplicationError::Workflow(error @ WorkflowError::InvalidInput(_)) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Workflow(
                error @ (WorkflowError::AlreadyFinalized { .. }
                | WorkflowError::AlreadyDecided { .. }),
            ) => Self::Conflict { message: error.to_string(), correlation_id: unassigned },
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned }
            }
        }
    }
}
