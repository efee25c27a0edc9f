use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::time::Duration;

/// Failures talking to the chain node or interpreting what it returned.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Node unreachable or the HTTP exchange failed
    #[error("connection to chain node failed: {0}")]
    Connection(String),

    /// Error object returned by the node
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Transaction was rejected by the contract
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// Response or return data could not be decoded
    #[error("malformed chain response: {0}")]
    Decode(String),

    /// Receipt did not show up within the wait bound
    #[error("transaction {0} was not mined within {1:?}")]
    Timeout(String, Duration),

    /// Contract descriptor file missing or unusable
    #[error("contract descriptor: {0}")]
    Descriptor(String),
}

/// Errors surfaced by the HTTP relay. Each variant fixes its status code.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("This account has already voted!")]
    AlreadyVoted,

    #[error("Only admin can reset voting!")]
    NotAdmin,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Connectivity(String),

    #[error("{0}")]
    Chain(String),
}

impl From<ChainError> for RelayError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Connection(_) | ChainError::Timeout(..) => {
                RelayError::Connectivity(err.to_string())
            }
            other => RelayError::Chain(other.to_string()),
        }
    }
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::AlreadyVoted | RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::NotAdmin => StatusCode::FORBIDDEN,
            RelayError::Connectivity(_) | RelayError::Chain(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}
