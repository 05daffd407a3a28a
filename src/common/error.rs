//! Error types for pagetree.

use std::fmt;

use thiserror::Error;

use super::PageId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in pagetree.
///
/// Every fallible step returns one of these to its caller immediately.
/// Nothing is retried: I/O and decoding failures are terminal for the
/// operation that hit them.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller passed a nil/zero argument or used an uninitialized tree.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal invariant was violated (e.g. a child index out of bounds).
    ///
    /// This indicates a bug or a corrupted file.
    #[error("system error: {0}")]
    System(String),

    /// Opening, reading, writing, syncing or closing the backing file failed.
    #[error("pagination error: {context}")]
    Pagination {
        /// What the pager was doing.
        context: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A write targeted a page that was never allocated.
    #[error("{0} has not been allocated")]
    PageNotFound(PageId),

    /// Encoding failed, most often because a node outgrew its page.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Decoding failed because required bytes were missing or malformed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A fixed-width decode was handed a buffer of the wrong length.
    #[error("expected {expected} bytes for {kind}, got {actual}")]
    InvalidByteLength {
        /// Name of the primitive being decoded.
        kind: &'static str,
        /// Width of that primitive.
        expected: usize,
        /// Length of the buffer that was supplied.
        actual: usize,
    },

    /// The binary codec was asked for a type it cannot (de)serialize.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// The tree has no root page.
    #[error("init error: {0}")]
    Init(String),

    /// A panic escaped an engine operation and was caught at its boundary.
    #[error("panic recovered: {0}")]
    Panic(String),

    /// The operation is declared but not implemented.
    #[error("operation not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Wrap an I/O failure with a description of what the pager was doing.
    pub fn pagination(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Pagination {
            context: context.into(),
            source,
        }
    }

    /// Returns the taxonomy bucket this error belongs to.
    ///
    /// # Examples
    /// ```
    /// use pagetree::{Error, ErrorKind};
    ///
    /// let err = Error::Serialization("node too large".to_string());
    /// assert_eq!(err.kind(), ErrorKind::Serialization);
    /// assert_eq!(err.kind().as_str(), "SerializationError");
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::System(_) => ErrorKind::System,
            Error::Pagination { .. } | Error::PageNotFound(_) => ErrorKind::Pagination,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Deserialization(_) => ErrorKind::Deserialization,
            Error::InvalidByteLength { .. } => ErrorKind::InvalidByteLength,
            Error::UnsupportedType(_) => ErrorKind::UnsupportedType,
            Error::Init(_) => ErrorKind::Init,
            Error::Panic(_) => ErrorKind::Panic,
            Error::NotSupported(_) => ErrorKind::NotSupported,
        }
    }
}

/// Error category, independent of the message carried by an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    System,
    Pagination,
    Serialization,
    Deserialization,
    InvalidByteLength,
    UnsupportedType,
    Init,
    Panic,
    NotSupported,
}

impl ErrorKind {
    /// Stable name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInputError",
            ErrorKind::System => "SystemError",
            ErrorKind::Pagination => "PaginationError",
            ErrorKind::Serialization => "SerializationError",
            ErrorKind::Deserialization => "DeserializationError",
            ErrorKind::InvalidByteLength => "InvalidByteLength",
            ErrorKind::UnsupportedType => "UnsupportedTypeError",
            ErrorKind::Init => "InitError",
            ErrorKind::Panic => "PanicFoundError",
            ErrorKind::NotSupported => "NotSupportedError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
