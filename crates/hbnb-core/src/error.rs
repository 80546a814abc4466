//! Error types for HBnB

use hbnb_types::kind::UnknownKind;
use hbnb_types::Kind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HbnbError>;

#[derive(Error, Debug)]
pub enum HbnbError {
    /// A foreign key points at nothing. Only the relational backend detects this.
    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    #[error("Invalid attributes for {kind}: {reason}")]
    InvalidAttributes { kind: Kind, reason: String },

    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl From<serde_json::Error> for HbnbError {
    fn from(e: serde_json::Error) -> Self {
        HbnbError::Serialization(e.to_string())
    }
}

impl From<UnknownKind> for HbnbError {
    fn from(e: UnknownKind) -> Self {
        HbnbError::UnknownKind(e.0)
    }
}
