//! Core application

use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message;
use tokio::io::AsyncReadExt;

use crate::core::cli::{self, Commands, InputFormat};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::domain::traces::{Span, StaticProjects, TracePipeline};
use crate::utils::otlp::spans_from_request;

pub struct CoreApp {
    pub config: AppConfig,
    pub pipeline: TracePipeline,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;
        let app = Self::init(config);

        match command {
            Some(Commands::Process { input, format }) => {
                app.process(input.as_deref(), format).await
            }
            None => app.process(None, InputFormat::default()).await,
        }
    }

    fn init(config: AppConfig) -> Self {
        let projects = Arc::new(StaticProjects::new(config.projects.iter().cloned()));
        let pipeline = TracePipeline::new(projects, config.pipeline.workers);
        Self { config, pipeline }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    /// Read spans, run them through the pipeline and print one JSON record per line
    async fn process(&self, input: Option<&Path>, format: InputFormat) -> Result<()> {
        let bytes = read_input(input).await?;
        let spans = self.decode(&bytes, format)?;
        tracing::debug!(spans = spans.len(), %format, "Input decoded");

        let records = self.pipeline.run(spans).await;
        if self.config.debug {
            log_group_summary(&records);
        }

        let stdout = std::io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        for record in &records {
            serde_json::to_writer(&mut out, record).context("Failed to serialize record")?;
            out.write_all(b"\n").context("Failed to write output")?;
        }
        out.flush().context("Failed to write output")?;

        tracing::info!(records = records.len(), "Processing complete");
        Ok(())
    }

    fn decode(&self, bytes: &[u8], format: InputFormat) -> Result<Vec<Span>> {
        let default_project_id = self.config.pipeline.default_project_id;
        match format {
            InputFormat::Jsonl => {
                let text = std::str::from_utf8(bytes).context("Input is not valid UTF-8")?;
                Ok(decode_jsonl(text, default_project_id))
            }
            InputFormat::Otlp => {
                let request = ExportTraceServiceRequest::decode(bytes)
                    .context("Failed to decode OTLP trace request")?;
                Ok(spans_from_request(&request, default_project_id))
            }
        }
    }
}

async fn read_input(input: Option<&Path>) -> Result<Vec<u8>> {
    match input {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Parse one span per non-empty line. Malformed lines are logged and skipped.
fn decode_jsonl(text: &str, default_project_id: u32) -> Vec<Span> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str::<Span>(line) {
            Ok(mut span) => {
                if span.project_id == 0 {
                    span.project_id = default_project_id;
                }
                Some(span)
            }
            Err(e) => {
                tracing::warn!(line = i + 1, error = %e, "Skipping malformed span record");
                None
            }
        })
        .collect()
}

fn log_group_summary(records: &[Span]) {
    let mut groups: BTreeMap<&str, BTreeMap<u64, usize>> = BTreeMap::new();
    for record in records {
        *groups
            .entry(record.system.as_str())
            .or_default()
            .entry(record.group_id)
            .or_default() += 1;
    }
    for (system, by_group) in &groups {
        tracing::info!(
            system,
            groups = by_group.len(),
            records = by_group.values().sum::<usize>(),
            "Group summary"
        );
    }
}
