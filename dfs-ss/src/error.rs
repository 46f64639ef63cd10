//! Error kinds surfaced by the storage engine.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// User is neither the owner nor present in the relevant access list.
    AccessDenied,
    /// File, checkpoint tag, or undo history does not exist.
    NotFound,
    /// File or checkpoint tag already exists.
    Conflict,
    /// Sentence or word index outside its valid range.
    Range(String),
    /// Sentence is currently held by another WRITE session.
    Locked,
    /// Underlying filesystem operation failed.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AccessDenied => write!(f, "Access denied"),
            Error::NotFound => write!(f, "not found"),
            Error::Conflict => write!(f, "already exists"),
            Error::Range(msg) => write!(f, "{msg}"),
            Error::Locked => write!(f, "locked by another user"),
            Error::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
