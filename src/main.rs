//! JSON Lineage - read and convert JSON to JSON Lines.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use json_lineage::config::{ConfigLoader, LineageConfig};
use json_lineage::sink::{self, SinkError};
use json_lineage::{AsyncLineStream, ConverterCommand, SyncLineStream};

#[derive(Parser)]
#[command(
    name = "json-lineage",
    about = "Read and convert JSON to JSONL (JSON Lines) format.",
    version
)]
struct Cli {
    /// Path to the JSON file to read.
    filepath: PathBuf,

    /// The JSON file may not be well formatted, e.g. several objects on one
    /// line. Considerably slower than the default.
    #[arg(short, long)]
    messy: bool,

    /// Path to the output file. Prints to stdout when omitted.
    #[arg(short, long)]
    output_file: Option<PathBuf>,

    /// Path to the jsonl_converter binary.
    #[arg(long)]
    converter: Option<PathBuf>,

    /// Path to a config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read the converter on a blocking thread instead of the async runtime.
    #[arg(long)]
    blocking: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_command(cli: &Cli, config: &LineageConfig) -> ConverterCommand {
    let mut command = ConverterCommand::from_config(&cli.filepath, config);
    if cli.messy {
        command = command.messy(true);
    }
    if let Some(converter) = &cli.converter {
        command = command.converter(converter);
    }
    command
}

fn run_blocking(command: ConverterCommand, output: Option<PathBuf>) -> Result<usize, SinkError> {
    let stream = SyncLineStream::new(command);
    match output {
        Some(path) => sink::write_to_file(stream, &path),
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            sink::write_lines(stream, &mut lock)
        }
    }
}

async fn run_async(command: ConverterCommand, output: Option<PathBuf>) -> Result<usize, SinkError> {
    let mut stream = AsyncLineStream::new(command);
    match output {
        Some(path) => sink::write_to_file_async(&mut stream, &path).await,
        None => {
            let mut stdout = tokio::io::stdout();
            let count = sink::write_lines_async(&mut stream, &mut stdout).await?;
            stdout.flush().await?;
            Ok(count)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let command = build_command(&cli, &config);
    tracing::info!(
        input = %command.input().display(),
        program = %command.program().display(),
        messy = command.is_messy(),
        blocking = cli.blocking,
        "Starting conversion"
    );

    let output = cli.output_file.clone();
    let result = if cli.blocking {
        match tokio::task::spawn_blocking(move || run_blocking(command, output)).await {
            Ok(result) => result,
            Err(e) => {
                eprintln!("error: conversion task failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        run_async(command, output).await
    };

    match result {
        Ok(count) => {
            tracing::info!(count, "Conversion finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
