use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "komadev CLI (alpha)", long_about = None)]
pub struct Cli {
    /// JSON config file; KOMA_* environment variables are used when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Page cache directory (overrides config)
    #[arg(long = "cache-dir", global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// List cached pages with their sizes
    Ls,
    /// Remove one cached page by key
    Rm { key: String },
    /// Delete zero-byte entries and abandoned partial writes
    Purge,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the cache key derived from a page locator
    Key { locator: String },

    /// Resolve page locators through the disk cache
    Resolve {
        locators: Vec<String>,

        /// Prefix for relative locators (overrides config)
        #[arg(long = "remote-base")]
        remote_base: Option<String>,
    },

    /// Fetch a chapter from the content API and cache every page
    Chapter {
        id: String,

        /// Content API base URL (overrides config)
        #[arg(long = "api-url")]
        api_url: Option<String>,
    },

    /// List chapters per language from the content API
    Feed {
        /// Language to list; omit for the per-language counts
        language: Option<String>,

        #[arg(long = "api-url")]
        api_url: Option<String>,
    },

    /// Print the ordered page list of a CBZ/ZIP archive
    Index { archive: PathBuf },

    /// Decode one page of an archive
    Decode {
        archive: PathBuf,
        index: usize,

        /// Write the raw entry bytes here instead of printing a summary
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Simulate a visibility change and report which pages were prefetched
    Read {
        archive: PathBuf,

        #[arg(long, default_value_t = 0)]
        visible: usize,

        #[arg(long = "look-ahead")]
        look_ahead: Option<usize>,

        #[arg(long = "look-behind")]
        look_behind: Option<usize>,
    },

    /// Find archives under a directory and count their pages
    Scan { dir: PathBuf },

    #[command(subcommand)]
    /// Inspect or clean the page cache
    Cache(CacheCommands),
}
