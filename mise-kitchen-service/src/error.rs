use thiserror::Error;
use uuid::Uuid;

use crate::models::TicketState;

#[derive(Error, Debug)]
pub enum TicketServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid {entity} transition {from:?} -> {to:?}")]
    InvalidTransition {
        entity: &'static str,
        from: TicketState,
        to: TicketState,
    },
    #[error("Ticket {0} is already cancelled")]
    TicketClosed(Uuid),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("Unexpected internal error")]
    Database(#[from] diesel::result::Error),
}

impl TicketServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        TicketServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<TicketServiceError> for tonic::Status {
    fn from(err: TicketServiceError) -> Self {
        match &err {
            TicketServiceError::Validation(_) => tonic::Status::invalid_argument(err.to_string()),
            TicketServiceError::InvalidTransition { .. } | TicketServiceError::TicketClosed(_) => {
                tonic::Status::failed_precondition(err.to_string())
            }
            TicketServiceError::NotFound { .. } => tonic::Status::not_found(err.to_string()),
            TicketServiceError::Database(_) => tonic::Status::internal(err.to_string()),
        }
    }
}
