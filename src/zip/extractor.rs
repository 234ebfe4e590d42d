use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context as _, Result};
use tracing::{debug, info, warn};

use crate::io::ChunkSource;

use super::decoder::{DecoderOptions, StreamDecoder};
use super::error::UnzipError;
use super::sink::EntrySink;
use super::structures::LocalFileHeader;

/// Pumps chunks from a [`ChunkSource`] into a [`StreamDecoder`].
#[derive(Debug, Default)]
pub struct StreamExtractor {
    options: DecoderOptions,
}

impl StreamExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self { options }
    }

    /// Decode the whole archive from `source` into `sink`.
    ///
    /// Stops reading as soon as the decoder reaches the end of the archive
    /// entries, so trailing central directory bytes are never downloaded in
    /// full. Returns the sink once decoding is complete.
    pub async fn run<C, S>(&self, source: &mut C, sink: S) -> Result<S>
    where
        C: ChunkSource + ?Sized,
        S: EntrySink,
    {
        let mut decoder = StreamDecoder::with_options(sink, self.options);

        while !decoder.is_finished() {
            let chunk = source.next_chunk().await.with_context(|| {
                format!("failed to read archive at offset {}", decoder.position())
            })?;
            match chunk {
                Some(chunk) => decoder.feed(&chunk)?,
                None => break,
            }
        }
        decoder.finish()?;

        debug!(
            consumed = decoder.position(),
            read = source.bytes_read(),
            "archive decoded"
        );
        Ok(decoder.into_sink())
    }
}

/// What to do when an extracted file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Keep the existing file and suggest `-o`.
    #[default]
    Skip,
    /// Keep the existing file without comment (`-n`).
    Never,
    /// Replace the existing file (`-o`).
    Always,
}

/// Include/exclude patterns applied to entry names.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl EntryFilter {
    pub fn matches(&self, name: &str) -> bool {
        // If specific files are requested, only include entries that match
        if !self.include.is_empty() {
            let matches = self.include.iter().any(|f| {
                if has_glob_chars(f) {
                    glob_match(f, name)
                } else {
                    // No wildcards: exact match on filename or full path
                    let basename = Path::new(name)
                        .file_name()
                        .map(|s| s.to_string_lossy())
                        .unwrap_or_default();
                    name == f.as_str() || basename == f.as_str()
                }
            });
            if !matches {
                return false;
            }
        }

        !self
            .exclude
            .iter()
            .any(|x| name.contains(x.as_str()) || glob_match(x, name))
    }
}

/// Destination of the file currently being written.
enum Output {
    File { path: PathBuf, writer: BufWriter<File> },
    Pipe,
    Discard,
}

/// Sink that recreates the archive contents under a directory.
///
/// Entry names are sanitised: names containing NUL, absolute paths and
/// paths escaping the destination with `..` are skipped.
pub struct DirectorySink {
    dest: PathBuf,
    overwrite: OverwritePolicy,
    junk_paths: bool,
    filter: EntryFilter,
    pipe: Option<Box<dyn Write + Send>>,
    announce: bool,
    current: Option<Output>,
    files_written: usize,
    folders_created: usize,
    skipped: usize,
}

impl DirectorySink {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            overwrite: OverwritePolicy::default(),
            junk_paths: false,
            filter: EntryFilter::default(),
            pipe: None,
            announce: false,
            current: None,
            files_written: 0,
            folders_created: 0,
            skipped: 0,
        }
    }

    pub fn overwrite(mut self, policy: OverwritePolicy) -> Self {
        self.overwrite = policy;
        self
    }

    /// Ignore directory structure in the archive.
    pub fn junk_paths(mut self, junk: bool) -> Self {
        self.junk_paths = junk;
        self
    }

    pub fn filter(mut self, filter: EntryFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Write file contents to `writer` instead of the filesystem.
    pub fn pipe_to(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.pipe = Some(writer);
        self
    }

    /// Print an `extracting:` line for each file.
    pub fn announce(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    pub fn files_written(&self) -> usize {
        self.files_written
    }

    pub fn folders_created(&self) -> usize {
        self.folders_created
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Determine the output path based on the sink options
    fn output_path(&self, name: &str) -> Option<PathBuf> {
        let relative = enclosed_path(name)?;
        if self.junk_paths {
            // Junk paths: use only the base filename, ignore directory structure
            let file_name = relative.file_name()?;
            return Some(self.dest.join(file_name));
        }
        Some(self.dest.join(relative))
    }

    fn open_output(&mut self, name: &str) -> io::Result<Output> {
        if !self.filter.matches(name) {
            debug!(%name, "filtered out");
            self.skipped += 1;
            return Ok(Output::Discard);
        }

        if self.pipe.is_some() {
            return Ok(Output::Pipe);
        }

        let Some(path) = self.output_path(name) else {
            warn!(%name, "skipping entry with unsafe path");
            self.skipped += 1;
            return Ok(Output::Discard);
        };

        // Handle existing files based on overwrite options
        if path.exists() {
            match self.overwrite {
                OverwritePolicy::Never => {
                    info!(%name, "skipping: file exists");
                    self.skipped += 1;
                    return Ok(Output::Discard);
                }
                OverwritePolicy::Skip => {
                    warn!(%name, "skipping: file exists (use -o to overwrite)");
                    self.skipped += 1;
                    return Ok(Output::Discard);
                }
                OverwritePolicy::Always => {}
            }
        }

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if self.announce {
            println!("  extracting: {}", name);
        }
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Output::File { path, writer })
    }
}

impl EntrySink for DirectorySink {
    fn create_folder(&mut self, path: &str) -> io::Result<()> {
        if self.junk_paths || self.pipe.is_some() {
            return Ok(());
        }
        match enclosed_path(path) {
            Some(relative) => {
                fs::create_dir_all(self.dest.join(relative))?;
                self.folders_created += 1;
            }
            None => {
                warn!(%path, "skipping folder with unsafe path");
                self.skipped += 1;
            }
        }
        Ok(())
    }

    fn begin_file(&mut self, _header: &LocalFileHeader, path: &str) -> io::Result<()> {
        // Directories written with flags or a data descriptor are not folder
        // markers but still name a directory.
        if path.ends_with('/') {
            self.create_folder(path)?;
            self.current = Some(Output::Discard);
            return Ok(());
        }
        let output = self.open_output(path)?;
        self.current = Some(output);
        Ok(())
    }

    fn write_data(&mut self, data: &[u8], _consumed: u64) -> io::Result<()> {
        match self.current.as_mut() {
            Some(Output::File { writer, .. }) => writer.write_all(data),
            Some(Output::Pipe) => match self.pipe.as_mut() {
                Some(pipe) => pipe.write_all(data),
                None => Ok(()),
            },
            Some(Output::Discard) | None => Ok(()),
        }
    }

    fn end_file(&mut self) -> io::Result<()> {
        match self.current.take() {
            Some(Output::File { mut writer, .. }) => {
                writer.flush()?;
                self.files_written += 1;
            }
            Some(Output::Pipe) => self.files_written += 1,
            Some(Output::Discard) | None => {}
        }
        Ok(())
    }

    fn did_finish(&mut self) {
        if let Some(pipe) = self.pipe.as_mut() {
            if let Err(e) = pipe.flush() {
                warn!(error = %e, "failed to flush output");
            }
        }
    }

    fn error_did_occur(&mut self, error: &UnzipError) {
        // A partially written file cannot be completed; remove it.
        if let Some(Output::File { path, writer }) = self.current.take() {
            drop(writer);
            warn!(path = %path.display(), %error, "removing incomplete file");
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove incomplete file");
            }
        }
    }
}

/// An entry seen while listing an archive.
#[derive(Debug, Clone)]
pub struct ListedEntry {
    pub file_name: String,
    pub is_directory: bool,
    /// Header of file entries; directories only carry a name.
    pub header: Option<LocalFileHeader>,
    /// Archive bytes occupied by the entry data.
    pub compressed_size: u64,
    /// Decoded size of the entry data.
    pub uncompressed_size: u64,
}

/// Sink that records entries without writing any data.
///
/// Sizes are measured while decoding, so entries with a trailing data
/// descriptor are listed with their real sizes.
#[derive(Debug, Default)]
pub struct ListingSink {
    entries: Vec<ListedEntry>,
}

impl ListingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ListedEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ListedEntry> {
        self.entries
    }
}

impl EntrySink for ListingSink {
    fn create_folder(&mut self, path: &str) -> io::Result<()> {
        self.entries.push(ListedEntry {
            file_name: path.to_string(),
            is_directory: true,
            header: None,
            compressed_size: 0,
            uncompressed_size: 0,
        });
        Ok(())
    }

    fn begin_file(&mut self, header: &LocalFileHeader, path: &str) -> io::Result<()> {
        self.entries.push(ListedEntry {
            file_name: path.to_string(),
            is_directory: path.ends_with('/'),
            header: Some(header.clone()),
            compressed_size: 0,
            uncompressed_size: 0,
        });
        Ok(())
    }

    fn write_data(&mut self, data: &[u8], consumed: u64) -> io::Result<()> {
        if let Some(entry) = self.entries.last_mut() {
            entry.compressed_size = consumed;
            entry.uncompressed_size += data.len() as u64;
        }
        Ok(())
    }

    fn end_file(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn did_finish(&mut self) {}

    fn error_did_occur(&mut self, _error: &UnzipError) {}
}

/// Resolve an entry name to a relative path that stays inside the
/// destination directory.
fn enclosed_path(name: &str) -> Option<PathBuf> {
    if name.contains('\0') {
        return None;
    }
    let path = PathBuf::from(name);
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return None,
            Component::ParentDir => depth = depth.checked_sub(1)?,
            Component::Normal(_) => depth += 1,
            Component::CurDir => (),
        }
    }
    if depth == 0 {
        return None;
    }
    Some(path)
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Simple glob pattern matching supporting `*` and `?` wildcards.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    fn do_match(pattern: &[char], text: &[char]) -> bool {
        match (pattern.first(), text.first()) {
            (None, None) => true,
            // Try matching zero characters, or one character and keep the star
            (Some('*'), _) => {
                do_match(&pattern[1..], text) || (!text.is_empty() && do_match(pattern, &text[1..]))
            }
            (Some('?'), Some(_)) => do_match(&pattern[1..], &text[1..]),
            (Some(p), Some(t)) if *p == *t => do_match(&pattern[1..], &text[1..]),
            _ => false,
        }
    }

    do_match(&pattern_chars, &text_chars)
}
