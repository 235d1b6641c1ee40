use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is empty")]
    MissingSetting(&'static str),

    #[error("Failed to open database {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: redb::Error,
    },

    #[error("Session is not ready: {0}")]
    NotReady(&'static str),

    #[error("No keychain found, register this node first")]
    KeychainNotFound,

    #[error("Password rejected after {0} attempts")]
    PasswordRejected(usize),

    #[error("Database error: {0}")]
    Database(#[from] redb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Console error: {0}")]
    Console(#[from] inquire::InquireError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Crypto(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
