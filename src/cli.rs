//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fetch article PDFs by DOI from a document mirror.
///
/// When the mirror interposes a CAPTCHA, the image and a replayable challenge
/// record are saved so the answer can be submitted interactively or later with
/// the `answer` subcommand.
#[derive(Parser, Debug)]
#[command(name = "article-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Mirror base URL (overrides ARTICLE_FETCH_MIRROR_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub mirror_url: Option<String>,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// HTTP request timeout in seconds (1-3600)
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Retrieve the article for a DOI or DOI URL
    Fetch(FetchArgs),
    /// Submit the answer to a saved CAPTCHA challenge
    Answer(AnswerArgs),
    /// Show the effective configuration and where each value came from
    Config,
}

/// Arguments for `fetch`.
#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// DOI (10.xxxx/...) or resolver URL (https://doi.org/10.xxxx/...)
    pub doi: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `answer`.
#[derive(clap::Args, Debug)]
pub struct AnswerArgs {
    /// Challenge record written by a previous run (challenge-<id>.json)
    #[arg(long, value_name = "FILE")]
    pub challenge: PathBuf,

    /// The text shown in the CAPTCHA image
    pub answer: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Output options shared by `fetch` and `answer`.
#[derive(clap::Args, Debug)]
pub struct OutputArgs {
    /// Directory for the document, CAPTCHA image and challenge record
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Never prompt for a CAPTCHA answer, even on a terminal
    #[arg(long)]
    pub no_prompt: bool,
}
