//! CLI entry point for article-fetch.

use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use article_fetch::{ArticleRequest, RetrievalError, RetrievalOutcome, Retriever};
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod output;

use app_config::{CliOverrides, MIRROR_URL_ENV, Settings, load_default_file_config};
use cli::{Args, Command, OutputArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_default_file_config()?;
    let output_dir = match &args.command {
        Command::Fetch(fetch) => fetch.output.output_dir.clone(),
        Command::Answer(answer) => answer.output.output_dir.clone(),
        Command::Config => None,
    };
    let settings = Settings::resolve(
        CliOverrides {
            mirror_url: args.mirror_url.clone(),
            connect_timeout_secs: args.connect_timeout,
            read_timeout_secs: args.read_timeout,
            output_dir,
        },
        env::var(MIRROR_URL_ENV).ok(),
        &loaded,
    );

    match args.command {
        Command::Config => {
            println!("{}", settings.render());
            Ok(ExitCode::SUCCESS)
        }
        Command::Fetch(fetch) => {
            let retriever = build_retriever(&settings)?;
            info!(doi = %fetch.doi, "Fetching article");
            let result = retriever.retrieve(&ArticleRequest::new(fetch.doi)).await;
            finish(&retriever, result, &settings, &fetch.output).await
        }
        Command::Answer(answer) => {
            let retriever = build_retriever(&settings)?;
            let challenge = output::load_challenge(&answer.challenge)?;
            info!(captcha_id = %challenge.id, doi = %challenge.doi, "Submitting CAPTCHA answer");
            let result = retriever.submit_answer(challenge, &answer.answer).await;
            finish(&retriever, result, &settings, &answer.output).await
        }
    }
}

fn build_retriever(settings: &Settings) -> Result<Retriever> {
    let mirror = settings
        .mirror_config()
        .context("Mirror configuration is incomplete")?;
    debug!(base_url = %mirror.base_url(), "mirror configured");
    Retriever::new(mirror).context("Failed to initialise the mirror client")
}

/// Saves the outcome and, on a terminal, keeps prompting while the mirror
/// issues new challenges.
async fn finish(
    retriever: &Retriever,
    mut result: Result<RetrievalOutcome, RetrievalError>,
    settings: &Settings,
    output_args: &OutputArgs,
) -> Result<ExitCode> {
    let dir = settings.output_dir.value.as_path();
    let interactive = !output_args.no_prompt && io::stdin().is_terminal();

    loop {
        match result {
            Err(error) => {
                debug!(kind = ?error.kind(), error = %error, "retrieval failed");
                eprintln!("{}", error.user_message());
                return Ok(ExitCode::FAILURE);
            }
            Ok(RetrievalOutcome::Document(article)) => {
                let path = output::save_article(&article, dir)?;
                info!(path = %path.display(), "Article saved");
                println!("{}", path.display());
                return Ok(ExitCode::SUCCESS);
            }
            Ok(RetrievalOutcome::Challenge(challenge)) => {
                let saved = output::save_challenge(&challenge, dir)?;
                println!("CAPTCHA image: {}", saved.image.display());
                println!("Challenge record: {}", saved.record.display());

                if !interactive {
                    println!(
                        "Answer with: article-fetch answer --challenge {} <ANSWER>",
                        saved.record.display()
                    );
                    return Ok(ExitCode::SUCCESS);
                }

                let Some(answer) = prompt_answer(&saved.image)? else {
                    info!("No answer entered; challenge record kept for later");
                    return Ok(ExitCode::SUCCESS);
                };
                result = retriever.submit_answer(challenge, &answer).await;
            }
        }
    }
}

fn prompt_answer(image: &Path) -> Result<Option<String>> {
    let mut stderr = io::stderr();
    write!(stderr, "Enter the text shown in {}: ", image.display())?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read CAPTCHA answer")?;
    let answer = line.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}
