//! # protodump-core
//!
//! Recover protobuf schema definitions embedded in arbitrary bytes.
//!
//! Compiled protobuf code carries its `.proto` files as serialized
//! `FileDescriptorProto` records, with no index pointing at them. This crate:
//! - Finds those records in a raw buffer (binaries, core dumps, captures)
//! - Renders each decoded descriptor back into compilable `.proto` source
//! - Writes the result below an output root without overwriting anything
//!
//! ## Architecture
//!
//! - [`scanner`]: locating descriptor records and decoding them
//! - [`resolve`]: shortening fully qualified type references
//! - [`proto`]: `.proto` text rendering
//! - [`dump`]: collision-safe output files
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use protodump_core::{DumpWriter, ProtoRenderer, ScanStrategy, Scanner};
//! use std::fs;
//!
//! let data = fs::read("./target/release/my_app")?;
//! let writer = DumpWriter::new("./recovered");
//!
//! for found in Scanner::new().scan_iter(&data) {
//!     let renderer = ProtoRenderer::new(found.into_descriptor());
//!     match writer.dump(&renderer) {
//!         Ok(path) => println!("wrote {}", path.display()),
//!         Err(e) => eprintln!("{}", e),
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod dump;
pub mod error;
pub mod proto;
pub mod resolve;
pub mod scanner;

// Re-export primary types for convenience
pub use dump::DumpWriter;
pub use error::{Error, Result};
pub use proto::{ProtoRenderer, ProtoSyntax, RenderConfig};
pub use resolve::resolve_type_name;
pub use scanner::{ScanMatch, ScanStrategy, Scanner, ScannerConfig};

/// Maximum valid protobuf field number (2^29 - 1)
/// Used for `reserved X to max` ranges
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;
