//! Main entry point for the streamunzip CLI application.
//!
//! This binary extracts ZIP archives front to back while they are read from
//! a local file, standard input, or an HTTP download.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

use streamunzip::io::{ChunkSource, HttpStreamSource, LocalFileSource, StdinSource};
use streamunzip::zip::{DirectorySink, EntryFilter, ListedEntry, ListingSink, StreamExtractor};
use streamunzip::Cli;

/// Application entry point.
///
/// Parses command-line arguments, opens the input and dispatches to listing
/// or extraction.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut source = open_source(&cli).await?;
    let extractor = StreamExtractor::new();

    if cli.list || cli.verbose {
        // List mode: decode without writing anything
        let listing = extractor.run(source.as_mut(), ListingSink::new()).await?;
        list_files(listing.entries(), cli.verbose);
    } else {
        let sink = extractor.run(source.as_mut(), directory_sink(&cli)).await?;
        info!(
            files = sink.files_written(),
            folders = sink.folders_created(),
            skipped = sink.skipped(),
            "extraction complete"
        );
    }

    // Display network transfer statistics for HTTP sources
    if cli.is_http_url() && !cli.is_quiet() {
        eprintln!("\nTotal bytes transferred: {}", format_size(source.bytes_read()));
    }

    Ok(())
}

/// Open the archive input named on the command line.
async fn open_source(cli: &Cli) -> Result<Box<dyn ChunkSource>> {
    if cli.is_http_url() {
        let source = HttpStreamSource::new(cli.file.clone(), cli.retries).await?;
        if let Some(length) = source.content_length() {
            info!(size = %format_size(length), "remote archive");
        }
        Ok(Box::new(source))
    } else if cli.is_stdin() {
        Ok(Box::new(StdinSource::stdin(cli.chunk_size)))
    } else {
        let source = LocalFileSource::open(Path::new(&cli.file), cli.chunk_size)
            .await
            .with_context(|| format!("cannot open {}", cli.file))?;
        Ok(Box::new(source))
    }
}

/// Build the extraction sink from CLI options.
///
/// - Pipe mode (`-p`): write file contents to stdout instead of files
/// - Custom output directory (`-d`): extract to specified directory
/// - Junk paths (`-j`): ignore directory structure in archive
/// - Overwrite control (`-n`, `-o`): handle existing files
fn directory_sink(cli: &Cli) -> DirectorySink {
    let dest = cli
        .extract_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let filter = EntryFilter {
        include: cli.files.clone(),
        exclude: cli.exclude.clone(),
    };

    let sink = DirectorySink::new(dest)
        .overwrite(cli.overwrite_policy())
        .junk_paths(cli.junk_paths)
        .filter(filter)
        .announce(!cli.is_quiet());

    if cli.pipe {
        sink.pipe_to(Box::new(std::io::stdout()))
    } else {
        sink
    }
}

/// List files seen in the archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, and timestamps
///
/// Sizes are the ones measured while decoding, which also covers entries
/// whose header does not declare them.
fn list_files(entries: &[ListedEntry], verbose: bool) {
    if verbose {
        // Print table header for verbose output
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    // Track totals for summary line
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in entries {
        if !verbose {
            // Simple format: just the file name
            println!("{}", entry.file_name);
            continue;
        }

        let (date, time) = match &entry.header {
            Some(header) => {
                let (year, month, day) = header.mod_date();
                let (hour, minute, _second) = header.mod_time();
                (
                    format!("{:04}-{:02}-{:02}", year, month, day),
                    format!("{:02}:{:02}", hour, minute),
                )
            }
            None => (String::new(), String::new()),
        };

        println!(
            "{:>10}  {:>10}  {}  {:>10}  {:>5}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            date,
            time,
            entry.file_name
        );

        // Accumulate totals (excluding directories)
        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    // Print summary line in verbose mode
    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>17}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
    }
}

/// Compression ratio as percentage saved.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 {
        let saved = 100i64 - (compressed * 100 / uncompressed) as i64;
        format!("{:>4}%", saved)
    } else {
        "  0%".to_string()
    }
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
