use clap::{Parser, Subcommand};

use std::fmt;
use std::path::PathBuf;

use super::constants::{ENV_CONFIG, ENV_DEBUG, ENV_PROJECT_ID, ENV_WORKERS};

#[derive(Parser)]
#[command(name = "spangroup")]
#[command(version, about = "Span normalization and grouping engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Number of parallel pipeline workers
    #[arg(long, short = 'w', global = true, env = ENV_WORKERS)]
    pub workers: Option<usize>,

    /// Project id assigned to spans that carry none
    #[arg(long, global = true, env = ENV_PROJECT_ID)]
    pub project_id: Option<u32>,

    /// Enable debug mode (logs a per-group summary after each run)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,
}

/// Input encoding for the `process` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// One JSON span record per line
    #[default]
    Jsonl,
    /// Binary protobuf `ExportTraceServiceRequest`
    Otlp,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Jsonl => write!(f, "jsonl"),
            InputFormat::Otlp => write!(f, "otlp"),
        }
    }
}

/// Parse input format from CLI string
fn parse_input_format(s: &str) -> Result<InputFormat, String> {
    match s.to_lowercase().as_str() {
        "jsonl" | "json" => Ok(InputFormat::Jsonl),
        "otlp" | "protobuf" => Ok(InputFormat::Otlp),
        _ => Err(format!(
            "Invalid input format '{}'. Valid options: jsonl, otlp",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Process span records and print grouped output (default command)
    Process {
        /// Input file (reads stdin when omitted)
        #[arg(long, short = 'i')]
        input: Option<PathBuf>,

        /// Input format (jsonl or otlp)
        #[arg(
            long,
            short = 'f',
            default_value_t = InputFormat::Jsonl,
            value_parser = parse_input_format
        )]
        format: InputFormat,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub workers: Option<usize>,
    pub project_id: Option<u32>,
    pub debug: bool,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        config: cli.config,
        workers: cli.workers,
        project_id: cli.project_id,
        debug: cli.debug,
    };
    (config, cli.command)
}
