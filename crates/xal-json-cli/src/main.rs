//! `xal-json`: encode, decode and check reference-preserving JSON.
//!
//! Usage:
//!   xal-json encode [FILE]   standard JSON → coder text
//!   xal-json decode [FILE]   coder text → pretty plain JSON
//!   xal-json check  [FILE]   exit 1 unless coder text re-encodes stably
//!
//! Input is read from FILE, or from stdin when FILE is omitted or `-`.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xal_json::cli::{check_round_trip, decode_to_plain_json, encode_plain_json};
use xal_json::{CoderOptions, JsonCoder, DEFAULT_MAX_DEPTH};

#[derive(Parser)]
#[command(name = "xal-json", version, about = "Reference-preserving JSON coder for XAL object graphs")]
struct Cli {
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, help = "Maximum nesting depth")]
    max_depth: usize,
    #[arg(long, help = "Write repeated strings inline instead of as references")]
    no_string_identity: bool,
    #[arg(long, default_value = "warn", help = "Log filter used when RUST_LOG is unset")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Encode standard JSON as coder text")]
    Encode {
        #[arg(help = "Input file (stdin when omitted or -)")]
        input: Option<PathBuf>,
    },
    #[command(about = "Decode coder text to plain JSON with aliases expanded")]
    Decode {
        #[arg(help = "Input file (stdin when omitted or -)")]
        input: Option<PathBuf>,
    },
    #[command(about = "Check that coder text re-encodes to a stable form")]
    Check {
        #[arg(help = "Input file (stdin when omitted or -)")]
        input: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("xal-json: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let coder = JsonCoder::new().with_options(CoderOptions {
        track_string_identity: !cli.no_string_identity,
        max_depth: cli.max_depth,
    });
    let mut stdout = io::stdout().lock();
    match cli.command {
        Command::Encode { input } => {
            let text = read_input(input.as_deref())?;
            let encoded = encode_plain_json(&coder, &text).context("encode failed")?;
            writeln!(stdout, "{encoded}")?;
        }
        Command::Decode { input } => {
            let text = read_input(input.as_deref())?;
            let plain = decode_to_plain_json(&coder, &text).context("decode failed")?;
            writeln!(stdout, "{plain}")?;
        }
        Command::Check { input } => {
            let text = read_input(input.as_deref())?;
            let report = check_round_trip(&coder, &text).context("check failed")?;
            writeln!(
                stdout,
                "{}: {} bytes, re-encoded {} bytes",
                if report.stable { "stable" } else { "unstable" },
                report.encoded_len,
                report.reencoded_len
            )?;
            if !report.stable {
                return Ok(ExitCode::from(1));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    let text = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("cannot read stdin")?;
            text
        }
    };
    tracing::debug!(bytes = text.len(), "read input");
    Ok(text)
}

fn init_tracing(level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
