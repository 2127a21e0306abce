//! Error types for the ClickHouse connection.
//!
//! All fallible operations in this crate return [`Result<T>`], which is an
//! alias for `std::result::Result<T, Error>`.

use crate::query::Exception;
use thiserror::Error;

/// Errors surfaced by the ClickHouse connection.
///
/// Fatal variants (`Io`, `Connection`, `Protocol`, the three timeouts) close
/// the connection and propagate to every outstanding caller. `Server` is
/// returned for a single query and leaves the connection usable.
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error occurred on the underlying TCP or TLS connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to establish a connection to the ClickHouse server.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error, such as an unexpected packet type or
    /// malformed data from the server.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An exception returned by the ClickHouse server for a single query.
    /// The connection returns to the ready state and remains usable.
    #[error("Server exception: {0}")]
    Server(Exception),

    /// A type mismatch between expected and actual column types.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The type that was expected.
        expected: String,
        /// The type that was received.
        actual: String,
    },

    /// A type string received from the server could not be parsed.
    #[error("Cannot parse type: {0}")]
    TypeParse(String),

    /// A validation error, such as mismatched row counts in a block or an
    /// enum name that is not part of the column's enum map.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A command was issued while another one was still outstanding.
    #[error("Connection is not ready for a new command")]
    NotReady,

    /// A command was issued on a closed connection.
    #[error("Connection is closed")]
    Closed,

    /// The TCP (or TLS) connect did not complete within `connect_timeout`.
    #[error("Connect timed out")]
    ConnectTimeout,

    /// No bytes arrived within `read_timeout` while a response was pending.
    #[error("Read timed out")]
    ReadTimeout,

    /// The operation did not complete within its deadline; the connection
    /// is closed because the protocol has no targeted cancellation.
    #[error("Query timed out")]
    QueryTimeout,
}

impl Error {
    /// True for errors that terminate the connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Server(_)
                | Error::TypeMismatch { .. }
                | Error::TypeParse(_)
                | Error::Validation(_)
                | Error::NotReady
                | Error::Closed
        )
    }

    /// Replication helper for fanning one failure out to several waiters.
    ///
    /// `std::io::Error` is not `Clone`, so transport errors are replicated
    /// as `Connection` errors carrying the original display text.
    pub(crate) fn replicate(&self) -> Error {
        match self {
            Error::Io(e) => Error::Connection(e.to_string()),
            Error::Connection(s) => Error::Connection(s.clone()),
            Error::Protocol(s) => Error::Protocol(s.clone()),
            Error::Server(e) => Error::Server(e.clone()),
            Error::TypeMismatch { expected, actual } => Error::TypeMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            },
            Error::TypeParse(s) => Error::TypeParse(s.clone()),
            Error::Validation(s) => Error::Validation(s.clone()),
            Error::NotReady => Error::NotReady,
            Error::Closed => Error::Closed,
            Error::ConnectTimeout => Error::ConnectTimeout,
            Error::ReadTimeout => Error::ReadTimeout,
            Error::QueryTimeout => Error::QueryTimeout,
        }
    }
}

/// A type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
