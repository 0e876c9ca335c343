//! protodump - Recover Protocol Buffer definitions from raw bytes
//!
//! Scans binaries, memory dumps or captures for embedded protobuf file
//! descriptors and writes them back out as `.proto` source files.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use protodump_core::{
    DumpWriter, ProtoRenderer, RenderConfig, ScanMatch, ScanStrategy, Scanner, ScannerConfig,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Recover Protocol Buffer definitions from binaries, dumps and captures
#[derive(Parser, Debug)]
#[command(name = "protodump")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a file or directory and write every recovered .proto file
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// File to scan, or a directory whose files are all scanned
    source: PathBuf,

    /// Output directory for recovered .proto files
    #[arg(env = "PROTODUMP_OUTPUT", default_value = ".")]
    destination: PathBuf,

    /// Maximum number of descriptors to recover per input file (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_descriptors: usize,

    /// Only list the declared paths of recovered descriptors
    #[arg(long)]
    list_only: bool,

    /// Show where files would be written without writing them
    #[arg(long)]
    dry_run: bool,

    /// Skip descriptors whose path and rendered text were already written
    #[arg(long)]
    skip_duplicates: bool,

    /// Reject records whose full decode fails instead of salvaging a prefix
    #[arg(long)]
    no_salvage: bool,

    /// Number of spaces per indentation level
    #[arg(long, default_value = "2")]
    indent: usize,
}

/// Tracks written descriptors for opt-in deduplication and dry-run naming
#[derive(Default)]
struct DumpRegistry {
    /// Hashes of `declared path + rendered text` already written
    seen: HashSet<blake3::Hash>,
    /// Output paths already reported by a dry run
    previewed: HashSet<PathBuf>,
    stats: DumpStats,
}

#[derive(Default)]
struct DumpStats {
    found: usize,
    duplicates_skipped: usize,
    written: usize,
    failed: usize,
}

impl DumpRegistry {
    fn new() -> Self {
        Self::default()
    }

    fn content_hash(path: &str, content: &str) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(path.as_bytes());
        hasher.update(&[0]);
        hasher.update(content.as_bytes());
        hasher.finalize()
    }

    /// Records a descriptor; returns false if an identical one was seen
    fn admit(&mut self, path: &str, content: &str) -> bool {
        if self.seen.insert(Self::content_hash(path, content)) {
            true
        } else {
            debug!("Skipping duplicate: {}", path);
            self.stats.duplicates_skipped += 1;
            false
        }
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} found, {} duplicates skipped, {} written, {} failed",
            self.stats.found, self.stats.duplicates_skipped, self.stats.written, self.stats.failed
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match &cli.command {
        Command::Extract(args) => extract(args),
    }
}

fn extract(args: &ExtractArgs) -> Result<()> {
    let source = &args.source;
    if !source.exists() {
        bail!("Source does not exist: {}", source.display());
    }

    if !args.list_only && !args.dry_run {
        fs::create_dir_all(&args.destination).with_context(|| {
            format!("Failed to create destination: {}", args.destination.display())
        })?;
    }

    let scanner = Scanner::with_config(
        ScannerConfig::new()
            .max_results(args.max_descriptors)
            .salvage(!args.no_salvage),
    );
    let writer = DumpWriter::new(&args.destination);
    let mut registry = DumpRegistry::new();

    if source.is_dir() {
        info!("Scanning directory: {}", source.display());
        let mut files = 0;
        for entry in WalkDir::new(source)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || is_hidden(path) {
                continue;
            }

            if let Err(e) = process_input(args, &scanner, &writer, &mut registry, path) {
                warn!("Error processing {}: {:#}", path.display(), e);
            }
            files += 1;
        }
        info!("Processed {} files", files);
    } else {
        process_input(args, &scanner, &writer, &mut registry, source)?;
    }

    if !args.list_only && !args.dry_run {
        registry.print_summary();
    }

    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Scan one input file and dump what it contains
fn process_input(
    args: &ExtractArgs,
    scanner: &Scanner,
    writer: &DumpWriter,
    registry: &mut DumpRegistry,
    path: &Path,
) -> Result<()> {
    trace!("Reading {}", path.display());
    let data =
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;
    debug!("Read {} bytes from {}", data.len(), path.display());

    let render_config = RenderConfig::new().indent_str(" ".repeat(args.indent));
    let mut found = 0;

    for matched in scanner.scan_iter(&data) {
        found += 1;
        dump_match(args, writer, registry, &render_config, matched);
    }

    if found == 0 {
        trace!("No descriptors found in {}", path.display());
    } else {
        debug!("Recovered {} descriptor(s) from {}", found, path.display());
    }
    Ok(())
}

fn dump_match(
    args: &ExtractArgs,
    writer: &DumpWriter,
    registry: &mut DumpRegistry,
    render_config: &RenderConfig,
    matched: ScanMatch,
) {
    let offset = matched.offset;
    let renderer = ProtoRenderer::new(matched.into_descriptor()).with_config(render_config.clone());
    let declared = renderer.path().to_string();

    if args.list_only {
        println!("{}", declared);
        return;
    }

    registry.stats.found += 1;
    let content = renderer.render();
    if args.skip_duplicates && !registry.admit(&declared, &content) {
        return;
    }

    if args.dry_run {
        match writer.preview_excluding(&declared, &registry.previewed) {
            Ok(path) => {
                println!("Would write: {}", path.display());
                registry.previewed.insert(path);
            }
            Err(e) => error!("Cannot place {} (offset {}): {}", declared, offset, e),
        }
        return;
    }

    match writer.write(&declared, &content) {
        Ok(path) => {
            println!("Wrote {}", path.display());
            registry.stats.written += 1;
        }
        Err(e) => {
            error!("Failed to write {} (offset {}): {}", declared, offset, e);
            registry.stats.failed += 1;
        }
    }
}
