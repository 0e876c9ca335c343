//! Writing rendered descriptors to disk.
//!
//! Each descriptor lands at `<root>/<declared path>`, with `.proto` enforced
//! on the file name. Existing files are never replaced: a taken name gets a
//! ` (2)`, ` (3)`, ... disambiguator before the suffix. Files are created with
//! `create_new`, so a file that appears between probing and writing simply
//! pushes the writer on to the next number.

use crate::error::{Error, Result};
use crate::proto::ProtoRenderer;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Suffix enforced on every written file name
pub const PROTO_EXTENSION: &str = ".proto";

/// Writes rendered `.proto` files below a destination root
#[derive(Debug, Clone)]
pub struct DumpWriter {
    root: PathBuf,
}

impl DumpWriter {
    /// Creates a writer rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the destination root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Renders `renderer`'s descriptor and writes it under its declared path
    pub fn dump(&self, renderer: &ProtoRenderer) -> Result<PathBuf> {
        self.write(renderer.path(), &renderer.render())
    }

    /// Writes `text` for a descriptor declared at `declared_path`.
    ///
    /// Returns the path actually written.
    pub fn write(&self, declared_path: &str, text: &str) -> Result<PathBuf> {
        let (dir, stem) = self.target(declared_path)?;

        fs::create_dir_all(&dir).map_err(|e| Error::directory_create(&dir, e))?;

        let mut attempt = 1;
        loop {
            let candidate = dir.join(numbered_name(&stem, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut file) => {
                    file.write_all(text.as_bytes())
                        .map_err(|e| Error::file_write(&candidate, e))?;
                    debug!("Wrote {} ({} bytes)", candidate.display(), text.len());
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(Error::file_write(&candidate, e)),
            }
        }
    }

    /// Returns the first free output path for `declared_path` without
    /// creating anything
    pub fn preview(&self, declared_path: &str) -> Result<PathBuf> {
        self.preview_excluding(declared_path, &HashSet::new())
    }

    /// Like [`preview`](Self::preview), but also treats every path in
    /// `reserved` as taken
    ///
    /// A dry run feeds back the paths it already reported so repeated
    /// declared paths get the same ` (N)` names a real run would write.
    pub fn preview_excluding(
        &self,
        declared_path: &str,
        reserved: &HashSet<PathBuf>,
    ) -> Result<PathBuf> {
        let (dir, stem) = self.target(declared_path)?;
        let mut attempt = 1;
        loop {
            let candidate = dir.join(numbered_name(&stem, attempt));
            if !candidate.exists() && !reserved.contains(&candidate) {
                return Ok(candidate);
            }
            attempt += 1;
        }
    }

    /// Splits a declared path into its output directory and file stem
    fn target(&self, declared_path: &str) -> Result<(PathBuf, String)> {
        let mut parts: Vec<&str> = declared_path.split('/').collect();
        let base = parts.pop().unwrap_or_default();

        let mut dir = self.root.clone();
        for part in parts {
            match Path::new(part).components().next() {
                None | Some(Component::CurDir) => {}
                Some(Component::Normal(_)) if !part.contains('\\') => dir.push(part),
                _ => return Err(Error::path_traversal(declared_path)),
            }
        }
        if matches!(base, "." | "..") || base.contains('\\') {
            return Err(Error::path_traversal(declared_path));
        }

        Ok((dir, file_stem(base)))
    }
}

/// Base name without a trailing `.proto`; any other extension is kept
fn file_stem(base: &str) -> String {
    let (stem, extension) = split_extension(base);
    if extension == PROTO_EXTENSION {
        stem.to_string()
    } else {
        base.to_string()
    }
}

/// Splits at the last dot, ignoring leading dots
fn split_extension(base: &str) -> (&str, &str) {
    match base.rfind('.') {
        Some(i) if base[..i].chars().any(|c| c != '.') => base.split_at(i),
        _ => (base, ""),
    }
}

fn numbered_name(stem: &str, attempt: usize) -> String {
    if attempt == 1 {
        format!("{}{}", stem, PROTO_EXTENSION)
    } else {
        format!("{} ({}){}", stem, attempt, PROTO_EXTENSION)
    }
}
