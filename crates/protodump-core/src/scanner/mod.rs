//! Binary scanning module for finding embedded protobuf descriptors.
//!
//! A serialized `FileDescriptorProto` carries no magic number and no outer
//! length, but it almost always starts with its own path: field 1, a
//! length-delimited string ending in `.proto`. The scanner keys on that.
//!
//! ## Algorithm Overview
//!
//! 1. Search for the `.proto` byte sequence, restarting one byte past the
//!    previous hit so that overlapping candidates are all visited
//! 2. Backtrack (at most [`DEFAULT_TAG_WINDOW`] bytes) to the tag byte `0x0A`
//!    (field 1, wire type LEN)
//! 3. Read the path length varint and check the path is UTF-8
//! 4. Decode a `FileDescriptorProto` from the tag byte to the end of input;
//!    trailing bytes end up as ignored unknown fields
//! 5. If that fails, optionally salvage the longest well-formed prefix
//!
//! Rejected candidates are logged at `trace` level and skipped. Nothing in
//! the scan itself is fatal.
//!
//! ## Extensibility
//!
//! The [`ScanStrategy`] trait allows custom scanning algorithms:
//!
//! ```no_run
//! use protodump_core::scanner::{ScanStrategy, ScanMatch};
//!
//! struct NothingHere;
//!
//! impl ScanStrategy for NothingHere {
//!     fn scan_iter<'a>(&'a self, _data: &'a [u8]) -> Box<dyn Iterator<Item = ScanMatch> + 'a> {
//!         Box::new(std::iter::empty())
//!     }
//! }
//! ```

mod wire;

use crate::error::{Error, Result};
use prost::Message;
use prost_types::FileDescriptorProto;
use tracing::{debug, trace};

pub use wire::{consume_field, decode_varint, WireType};

/// Pattern to search for (filename suffix)
pub const PROTO_SUFFIX: &[u8] = b".proto";

/// Tag byte of a `FileDescriptorProto` path field: `(1 << 3) | 2 = 0x0A`
pub const PATH_FIELD_TAG: u8 = WireType::Len.key(1);

/// How far back from a `.proto` hit the tag byte may sit
pub const DEFAULT_TAG_WINDOW: usize = 255;

/// A descriptor recovered from the input
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMatch {
    /// Offset of the record's tag byte in the scanned buffer
    pub offset: usize,
    /// The decoded descriptor
    pub descriptor: FileDescriptorProto,
    /// True when the full-buffer decode failed and a prefix was used instead
    pub salvaged: bool,
}

impl ScanMatch {
    /// Returns the descriptor's declared path
    pub fn path(&self) -> &str {
        self.descriptor.name()
    }

    /// Consumes the match, returning the descriptor
    pub fn into_descriptor(self) -> FileDescriptorProto {
        self.descriptor
    }
}

/// Configuration for the scanner
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Maximum number of descriptors to yield (0 = unlimited)
    pub max_results: usize,
    /// Number of bytes searched backward from a `.proto` hit for the tag byte
    pub tag_window: usize,
    /// Retry failed decodes over the longest well-formed field prefix
    pub salvage: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_results: 0,
            tag_window: DEFAULT_TAG_WINDOW,
            salvage: true,
        }
    }
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of results to return
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Sets the backward search window for the tag byte
    pub fn tag_window(mut self, window: usize) -> Self {
        self.tag_window = window;
        self
    }

    /// Enables or disables prefix salvage of undecodable records
    pub fn salvage(mut self, salvage: bool) -> Self {
        self.salvage = salvage;
        self
    }
}

/// Trait for implementing custom scanning strategies
pub trait ScanStrategy: Send + Sync {
    /// Lazily yield descriptors found in `data`, in discovery order
    fn scan_iter<'a>(&'a self, data: &'a [u8]) -> Box<dyn Iterator<Item = ScanMatch> + 'a>;

    /// Scan the provided data and collect every descriptor
    fn scan(&self, data: &[u8]) -> Vec<ScanMatch> {
        self.scan_iter(data).collect()
    }
}

/// Primary scanner for finding embedded protobuf descriptors
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScannerConfig,
}

impl Scanner {
    /// Creates a new scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Returns the scanner configuration
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns a lazy iterator over the descriptors in `data`.
    ///
    /// The iterator holds no state beyond a cursor into `data`; calling this
    /// again restarts the scan from the beginning.
    pub fn candidates<'a>(&'a self, data: &'a [u8]) -> Candidates<'a> {
        Candidates {
            data,
            scanner: self,
            cursor: 0,
            yielded: 0,
        }
    }

    /// Tries to decode a descriptor around the `.proto` hit at `suffix_pos`
    fn probe(&self, data: &[u8], suffix_pos: usize) -> Result<ScanMatch> {
        let (tag_pos, path_start, path_len) = self.locate_path(data, suffix_pos)?;

        let path_end = path_start
            .checked_add(path_len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::truncated(data.len()))?;
        std::str::from_utf8(&data[path_start..path_end])
            .map_err(|_| Error::InvalidUtf8Path { offset: path_start })?;

        let (descriptor, salvaged) = match FileDescriptorProto::decode(&data[tag_pos..]) {
            Ok(descriptor) => (descriptor, false),
            Err(e) if self.config.salvage => {
                trace!("Full decode at {} failed ({}), salvaging prefix", tag_pos, e);
                (salvage_prefix(data, tag_pos)?, true)
            }
            Err(e) => return Err(e.into()),
        };

        if descriptor.name().is_empty() {
            return Err(Error::EmptyPath { offset: tag_pos });
        }

        Ok(ScanMatch {
            offset: tag_pos,
            descriptor,
            salvaged,
        })
    }

    /// Finds the path field tag preceding `suffix_pos`.
    ///
    /// Returns the tag offset, the path's first byte and its declared length.
    /// Tags are tried nearest-first; one whose length ends exactly at the end
    /// of the suffix is preferred, otherwise the nearest tag is used. The
    /// preference matters for 10-byte paths, whose length byte is `0x0A`.
    fn locate_path(&self, data: &[u8], suffix_pos: usize) -> Result<(usize, usize, usize)> {
        let window = self.config.tag_window;
        let floor = suffix_pos.saturating_sub(window.saturating_sub(1));
        let suffix_end = suffix_pos + PROTO_SUFFIX.len();

        let mut nearest = None;
        for tag_pos in (floor..=suffix_pos).rev() {
            if data[tag_pos] != PATH_FIELD_TAG {
                continue;
            }

            let decoded = decode_varint(data, tag_pos + 1).and_then(|(length, start)| {
                usize::try_from(length)
                    .map(|length| (tag_pos, start, length))
                    .map_err(|_| Error::truncated(start))
            });

            match decoded {
                Ok(found @ (_, start, length)) if start.checked_add(length) == Some(suffix_end) => {
                    return Ok(found);
                }
                other if nearest.is_none() => nearest = Some(other),
                _ => {}
            }
        }

        nearest.unwrap_or(Err(Error::MissingPathTag {
            offset: suffix_pos,
            window,
        }))
    }
}

impl ScanStrategy for Scanner {
    fn scan_iter<'a>(&'a self, data: &'a [u8]) -> Box<dyn Iterator<Item = ScanMatch> + 'a> {
        Box::new(self.candidates(data))
    }
}

/// Lazy iterator over the descriptors in a buffer
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    data: &'a [u8],
    scanner: &'a Scanner,
    cursor: usize,
    yielded: usize,
}

impl Iterator for Candidates<'_> {
    type Item = ScanMatch;

    fn next(&mut self) -> Option<ScanMatch> {
        let max_results = self.scanner.config.max_results;
        if max_results > 0 && self.yielded >= max_results {
            return None;
        }

        while let Some(suffix_pos) = find_subsequence(self.data, PROTO_SUFFIX, self.cursor) {
            trace!("Found .proto suffix at position {}", suffix_pos);
            self.cursor = suffix_pos + 1;

            match self.scanner.probe(self.data, suffix_pos) {
                Ok(found) => {
                    debug!(
                        "Found descriptor '{}' at offset {}{}",
                        found.path(),
                        found.offset,
                        if found.salvaged { " (salvaged)" } else { "" }
                    );
                    self.yielded += 1;
                    return Some(found);
                }
                Err(e) => trace!("Rejected candidate near {}: {}", suffix_pos, e),
            }
        }

        self.cursor = self.data.len();
        None
    }
}

/// Decodes the longest run of well-formed descriptor fields starting at
/// `start`, stopping before a second path field.
fn salvage_prefix(data: &[u8], start: usize) -> Result<FileDescriptorProto> {
    let mut position = start;
    let mut seen_path = false;

    while position < data.len() {
        let Ok((field_number, len)) = consume_field(&data[position..]) else {
            break;
        };
        if field_number == 1 {
            if seen_path {
                trace!("Adjacent descriptor at position {}", position);
                break;
            }
            seen_path = true;
        }
        if FileDescriptorProto::decode(&data[position..position + len]).is_err() {
            break;
        }
        position += len;
    }

    if !seen_path {
        return Err(Error::invalid_wire_format(start, "no decodable path field"));
    }
    Ok(FileDescriptorProto::decode(&data[start..position])?)
}

/// Find a subsequence within a byte slice, starting at `from`
fn find_subsequence(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|relative| from + relative)
}

/// Scan a file for embedded protobuf descriptors
///
/// This is a convenience function that reads the file and scans it.
pub fn scan_file(path: impl AsRef<std::path::Path>) -> Result<Vec<ScanMatch>> {
    scan_file_with_config(path, ScannerConfig::default())
}

/// Scan a file with custom configuration
pub fn scan_file_with_config(
    path: impl AsRef<std::path::Path>,
    config: ScannerConfig,
) -> Result<Vec<ScanMatch>> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    Ok(Scanner::with_config(config).scan(&data))
}
