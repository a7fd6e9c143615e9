use anyhow::{bail, Context};
use audit_engine::{AuditSink, TracingAuditSink};
use clap::{Parser, Subcommand};
use ocsp_api::StoreFactoryRegistry;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use ocsp_responder::logging::init_tracing;
use ocsp_responder::{DeliveryMode, JsonCodec, OcspServer, OcspServerConf};

/// OCSP responder
#[derive(Parser, Debug)]
#[command(name = "ocsp-responder", version)]
#[command(about = "Certificate status responder")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "OCSP_CONFIG", default_value = "ocsp-responder.yaml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print the health of every responder
    Check,
    /// Answer one encoded request and write the response to stdout
    Answer {
        /// Servlet path the request was received under
        #[arg(long)]
        path: String,
        /// File holding the encoded request
        #[arg(long)]
        request: PathBuf,
        /// Treat the request as received over GET
        #[arg(long)]
        get: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose, args.json_logs)?;

    let conf = OcspServerConf::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink::new());
    let server = OcspServer::start(
        &conf,
        &StoreFactoryRegistry::with_builtin(),
        Arc::new(JsonCodec::new()),
        Some(audit),
    )
    .await
    .context("starting OCSP server")?;

    let outcome = run(&server, args.command).await;
    server.shutdown().await;
    outcome
}

async fn run(server: &OcspServer, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Check => {
            let health = server.health().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !health.healthy {
                bail!("at least one responder is unhealthy");
            }
        }
        Command::Answer { path, request, get } => {
            let bytes = std::fs::read(&request)
                .with_context(|| format!("reading {}", request.display()))?;
            let delivery = if get { DeliveryMode::Get } else { DeliveryMode::Post };
            let Some(answer) = server.answer(&path, &bytes, delivery).await else {
                bail!("no responder is mounted at {path}");
            };
            if let Some(cache_info) = answer.cache_info {
                info!(
                    this_update = %cache_info.this_update,
                    next_update = ?cache_info.next_update,
                    "Response is cacheable"
                );
            }
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&answer.response)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
