use clap::Parser;
use tracing::Level;

use crate::io::DEFAULT_CHUNK_SIZE;
use crate::zip::OverwritePolicy;

#[derive(Parser, Debug)]
#[command(name = "streamunzip")]
#[command(version)]
#[command(about = "Extract ZIP archives while they are still downloading", long_about = None)]
#[command(after_help = "Examples:\n  \
  streamunzip data1.zip -x joe                    extract all files except joe from data1.zip\n  \
  streamunzip -p foo.zip | more                   send contents of foo.zip via pipe into more\n  \
  curl -s https://example.com/a.zip | streamunzip -   extract an archive from a pipe\n  \
  streamunzip -l https://example.com/archive.zip  list files while streaming a remote ZIP")]
pub struct Cli {
    /// ZIP file path, HTTP URL, or - for standard input
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Files to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,

    /// List files (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract files to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract files into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Exclude files that follow
    #[arg(short = 'x', value_name = "FILE", num_args = 1..)]
    pub exclude: Vec<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Junk paths (do not make directories)
    #[arg(short = 'j')]
    pub junk_paths: bool,

    /// Quiet mode
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Log verbosity (-L info, -LL debug, -LLL trace)
    #[arg(short = 'L', action = clap::ArgAction::Count)]
    pub log_verbosity: u8,

    /// Bytes requested per read from the input
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Retry budget for interrupted downloads
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub retries: u32,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_stdin(&self) -> bool {
        self.file == "-"
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        if self.never_overwrite {
            OverwritePolicy::Never
        } else if self.overwrite {
            OverwritePolicy::Always
        } else {
            OverwritePolicy::Skip
        }
    }

    /// Maximum level for the stderr log.
    pub fn log_level(&self) -> Level {
        match self.log_verbosity {
            0 if self.is_quiet() => Level::ERROR,
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
