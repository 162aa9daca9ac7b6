//! Error type shared by the grid, recognizer, session and login layers.
//!
//! Too-short drags and verification mismatches are not errors: they are
//! reported through [`crate::recognizer::Release`]. Everything here is either
//! a configuration mistake or a failure of an external collaborator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("node {id} out of range for a grid of {len} nodes")]
    NodeOutOfRange { id: u8, len: usize },

    #[error("no lock pattern stored")]
    NoLockPattern,

    #[error("only the proprietor can manage the lock pattern")]
    NotProprietor,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("the proprietor signs in as {expected}")]
    ProprietorEmailMismatch { expected: String },

    #[error("not a registered signatory: {0}")]
    UnknownSignatory(String),

    #[error("no OTP pending")]
    NoPendingOtp,

    #[error("mail: {0}")]
    Mail(String),

    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type LockResult<T> = Result<T, LockError>;
