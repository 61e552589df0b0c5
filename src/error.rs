//! Error types for tagstack-io

use std::io;

/// Result type for tagstack-io operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing tags
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A structural invariant of the file was violated
    #[error("Corrupt file at offset {offset}: {reason}")]
    CorruptFile { offset: u64, reason: String },

    /// Text uses a character set we cannot decode
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Invalid argument or format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Data size exceeds maximum allowed
    #[error("Data too large: {size} bytes (max: {max})")]
    DataTooLarge { size: u64, max: u64 },

    /// Nested directories went deeper than the configured limit
    #[error("Directory nesting exceeds limit of {depth}")]
    RecursionLimit { depth: usize },

    /// ID3v2 frame decoding or encoding failed
    #[error("ID3v2 error: {0}")]
    Id3(String),
}

impl Error {
    /// Shorthand for a [`Error::CorruptFile`]
    pub fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Self::CorruptFile {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns true for every error that means the file itself is malformed
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::CorruptFile { .. } | Self::RecursionLimit { .. } | Self::DataTooLarge { .. }
        )
    }
}

#[cfg(feature = "id3v2-frames")]
impl From<id3::Error> for Error {
    fn from(err: id3::Error) -> Self {
        Self::Id3(err.to_string())
    }
}
