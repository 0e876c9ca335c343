//! Error types for the protodump-core library.
//!
//! Scanning rejections (truncated varints, non-UTF-8 paths, undecodable
//! records) share this type with the filesystem failures of the dump writer,
//! so [`Error::is_recoverable`] is how callers tell "skip this candidate"
//! apart from "this output failed".

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for protodump operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all protodump operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Declared descriptor path would escape the output root
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The suspicious path
        path: PathBuf,
    },

    /// Buffer ended inside a varint or a length-delimited value
    #[error("input truncated at offset {offset}")]
    TruncatedInput {
        /// Byte offset where more input was expected
        offset: usize,
    },

    /// Candidate path bytes are not valid UTF-8
    #[error("candidate path at offset {offset} is not valid UTF-8")]
    InvalidUtf8Path {
        /// Offset of the first path byte
        offset: usize,
    },

    /// No path field tag precedes a `.proto` occurrence
    #[error("no path field tag within {window} bytes before offset {offset}")]
    MissingPathTag {
        /// Offset of the `.proto` occurrence
        offset: usize,
        /// Size of the backward search window
        window: usize,
    },

    /// Decoded descriptor has no declared path
    #[error("descriptor decoded at offset {offset} has an empty path")]
    EmptyPath {
        /// Offset of the record's tag byte
        offset: usize,
    },

    /// Invalid protobuf wire format
    #[error("invalid protobuf wire format at offset {offset}: {details}")]
    InvalidWireFormat {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Failed to parse FileDescriptorProto
    #[error("failed to parse FileDescriptorProto: {0}")]
    DescriptorDecode(#[from] prost::DecodeError),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a new truncated input error
    pub fn truncated(offset: usize) -> Self {
        Self::TruncatedInput { offset }
    }

    /// Creates a new wire format error
    pub fn invalid_wire_format(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidWireFormat {
            offset,
            details: details.into(),
        }
    }

    /// Returns true if this error only rejects a scan candidate.
    ///
    /// Recoverable errors are swallowed by the scanner; everything else is
    /// an I/O failure that belongs to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TruncatedInput { .. }
                | Self::InvalidUtf8Path { .. }
                | Self::MissingPathTag { .. }
                | Self::EmptyPath { .. }
                | Self::InvalidWireFormat { .. }
                | Self::DescriptorDecode(_)
        )
    }
}
