use std::fmt;
use std::io;
use std::result;

use csvtok_core::{ConfigError, EncodeError, ParseError};
use thiserror::Error;

/// A type alias for `Result<T, csvtok::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing delimited data.
///
/// This error can happen when reading or writing. Configuration errors can
/// only happen when a reader or writer is built.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error that occurred while reading or writing.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The configuration could not be resolved.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The input could not be tokenized.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// A record could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    /// A value could not be turned into a record.
    #[error("serialize error: {0}")]
    Serialize(String),
}

impl Error {
    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// The line and column at which a parse error occurred, if this is one.
    pub fn position(&self) -> Option<(u64, u64)> {
        match *self {
            Error::Parse(ref err) => Some((err.line(), err.column())),
            _ => None,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Serialize(msg.to_string())
    }
}
