use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payment_vault::application::orchestrator::{ChargeOrchestrator, ChargeReceipt};
use payment_vault::config::{GatewaySettings, Settings, StoreBackend};
use payment_vault::error::PaymentError;
use payment_vault::interfaces::csv::request_reader::{ChargeSubmission, RequestReader};
use payment_vault::interfaces::csv::response_writer::ResponseWriter;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input charge requests CSV file (idempotency_key,user_id,amount,currency)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// PostgreSQL connection string (optional). If provided, uses PostgreSQL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Seed for the simulated provider, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated provider latency in milliseconds.
    #[arg(long, default_value_t = 500)]
    latency_ms: u64,

    /// Submit every row as its own concurrent task.
    #[arg(long)]
    concurrent: bool,
}

impl Cli {
    fn into_settings(self) -> (PathBuf, Settings) {
        let settings = Settings {
            store: StoreBackend::select(self.db_path, self.database_url),
            gateway: GatewaySettings {
                latency: Duration::from_millis(self.latency_ms),
                seed: self.seed,
            },
            concurrent: self.concurrent,
        };
        (self.input, settings)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let (input, settings) = Cli::parse().into_settings();

    let store = settings.store.open().await.into_diagnostic()?;
    let orchestrator = Arc::new(ChargeOrchestrator::new(store, settings.gateway.build()));

    let file = File::open(input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    let stdout = io::stdout();
    let mut writer = ResponseWriter::new(stdout.lock());

    let mut pending = JoinSet::new();
    for submission in reader.submissions() {
        let submission = match submission {
            Ok(submission) => submission,
            Err(e) => {
                error!("Error reading charge request: {}", e);
                continue;
            }
        };

        if settings.concurrent {
            let orchestrator = orchestrator.clone();
            pending.spawn(async move { process(&orchestrator, submission).await });
        } else {
            let (key, result) = process(&orchestrator, submission).await;
            writer.write_result(&key, &result).into_diagnostic()?;
        }
    }

    while let Some(joined) = pending.join_next().await {
        let (key, result) = joined.into_diagnostic()?;
        writer.write_result(&key, &result).into_diagnostic()?;
    }

    writer.flush().into_diagnostic()?;
    Ok(())
}

/// Validates one row and runs it through the orchestrator, returning the raw
/// key for the output row alongside the result.
async fn process(
    orchestrator: &ChargeOrchestrator,
    submission: ChargeSubmission,
) -> (String, std::result::Result<ChargeReceipt, PaymentError>) {
    let raw_key = submission.idempotency_key.clone().unwrap_or_default();
    let result = match submission.into_parts() {
        Ok((key, request)) => orchestrator.handle(&key, request).await,
        Err(e) => Err(e),
    };
    (raw_key, result)
}
