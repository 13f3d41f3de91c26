//! CLI definitions for readmark.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Readmark background core.
#[derive(Parser)]
#[command(name = "readmark")]
#[command(about = "Background synchronization core for a page-bookmarking companion")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "READMARK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the background core in the foreground (default)
    Serve {
        /// Sign in as this user id on startup
        #[arg(long)]
        uid: Option<String>,
    },

    /// Probe backend health
    Ping,

    /// Locate a citation in a page text dump (one text node per line)
    Locate {
        /// File with the page's text nodes in document order
        file: PathBuf,

        /// The quoted citation to find
        verbatim: String,
    },
}
