//! ig-archiver main entry point
//!
//! This is the command-line interface for the profile and saved-posts
//! archivers.

use clap::{Parser, Subcommand};
use ig_archiver::config::SessionConfig;
use ig_archiver::ledger::Ledger;
use ig_archiver::{ProfileArchiver, SavedArchiver, Session, YtDlpExtractor};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ig-archiver: An incremental Instagram profile archiver
///
/// Archives a profile's posts, comments, and stories to a local directory,
/// keeping a capture ledger so interrupted or repeated runs only fetch what
/// is new. Video extraction is delegated to yt-dlp.
#[derive(Parser, Debug)]
#[command(name = "ig-archiver")]
#[command(version = "1.0.0")]
#[command(about = "An incremental Instagram profile archiver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output directory (defaults to ./<username> or ./@@saved-posts@@)
    #[arg(short, long, value_name = "DIR", global = true)]
    output_dir: Option<PathBuf>,

    /// File holding the raw Cookie header of a logged-in session
    #[arg(long, value_name = "FILE", global = true)]
    cookies: Option<PathBuf>,

    /// Ignore the capture ledger (re-fetch everything)
    #[arg(long, global = true)]
    no_log: bool,

    /// Also download all comments (extends download time significantly)
    #[arg(short = 'C', long, global = true)]
    include_comments: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Archive a profile's posts
    Profile {
        /// The username to archive
        username: String,
    },
    /// Archive the logged-in account's saved posts
    Saved {
        /// Unsave each post after archiving it
        #[arg(long)]
        unsave: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let cookie_header = match &cli.cookies {
        Some(path) => Some(std::fs::read_to_string(path)?.trim().to_string()),
        None => None,
    };

    let output_dir = cli.output_dir.clone().unwrap_or_else(|| match &cli.command {
        Command::Profile { username } => PathBuf::from(username),
        Command::Saved { .. } => PathBuf::from("@@saved-posts@@"),
    });
    std::fs::create_dir_all(&output_dir)?;

    let mut config = SessionConfig::new(output_dir);
    config.save_comments = cli.include_comments;
    config.disable_ledger = cli.no_log;

    let ledger = if cli.no_log {
        tracing::info!("Capture ledger disabled; re-fetching everything.");
        Ledger::disabled()
    } else {
        Ledger::open(&config.ledger_path())?
    };

    let session = Session::new(cookie_header.as_deref())?;
    let extractor = YtDlpExtractor::new(&config.output_dir);

    let result = match &cli.command {
        Command::Profile { username } => {
            tracing::info!("Archiving profile `{}`.", username);
            ProfileArchiver::new(&session, &ledger, &config, &extractor, username).process()
        }
        Command::Saved { unsave } => {
            tracing::info!("Archiving saved posts.");
            SavedArchiver::new(&session, &ledger, &config, &extractor, *unsave).process()
        }
    };

    match result {
        Ok(()) => {
            tracing::info!("Archive completed successfully");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Archive failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ig_archiver=info,warn"),
            1 => EnvFilter::new("ig_archiver=debug,info"),
            2 => EnvFilter::new("ig_archiver=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
