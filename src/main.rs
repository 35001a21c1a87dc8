//! LENDBOT: Resilient lending-exchange offer bot
//!
//! Entry point. Parses the command line, loads configuration, initialises
//! structured logging, wires the collaborators, and runs the lifecycle
//! until Ctrl+C or a fatal exchange error.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use lendbot::config::AppConfig;
use lendbot::dashboard::StatusServer;
use lendbot::engine::autorenew::AutoRenewController;
use lendbot::engine::clock::TokioClock;
use lendbot::engine::interrupt::{self, InterruptTrigger};
use lendbot::engine::lifecycle::LifecycleManager;
use lendbot::engine::orchestrator::{CycleOrchestrator, CycleSettings};
use lendbot::exchange::paper::PaperExchange;
use lendbot::lending::paper::PaperStrategy;
use lendbot::market::paper::PaperMarket;
use lendbot::status::StatusLog;
use lendbot::types::ProcessExit;

#[derive(Debug, Parser)]
#[command(name = "lendbot", version, about = "Lending-exchange offer bot")]
struct Cli {
    /// Location of the configuration file.
    #[arg(short, long, default_value = "default.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;

    init_logging();

    println!("Welcome to LENDBOT");
    info!(
        config = %cli.config,
        auto_renew = cfg.bot.auto_renew,
        output_currency = %cfg.bot.output_currency,
        status_server = cfg.status_server.enabled,
        "LENDBOT starting up"
    );

    // -- Initialise components -------------------------------------------

    let status = Arc::new(StatusLog::new(
        cfg.bot.json_file.as_ref().map(PathBuf::from),
        cfg.bot.json_log_size,
    ));

    let exchange = PaperExchange::new(cfg.paper.loans.clone());
    warn!(loans = cfg.paper.loans.len(), "Running against the paper exchange, no real offers");

    let orchestrator = CycleOrchestrator::new(
        Arc::new(PaperMarket::new(exchange.clone())),
        Arc::new(PaperStrategy::new(Duration::from_secs(cfg.paper.sleep_secs))),
        status.clone(),
        Arc::new(TokioClock),
        CycleSettings::from(&cfg),
    );

    let mut manager = LifecycleManager::new(orchestrator, status.clone());
    if cfg.bot.auto_renew {
        manager = manager.with_auto_renew(AutoRenewController::new(
            Arc::new(exchange.clone()),
            status.clone(),
        ));
    }
    if cfg.status_server.enabled {
        manager = manager.with_status_reporter(
            Box::new(StatusServer::new(status.subscribe())),
            cfg.status_server.clone(),
        );
    }

    // -- Run -------------------------------------------------------------

    let (trigger, interrupt) = interrupt::channel();
    spawn_signal_listener(trigger);

    match manager.run(interrupt).await? {
        ProcessExit::Graceful => Ok(()),
        exit @ ProcessExit::Fatal(class) => {
            println!("!!! Troubleshooting !!!");
            if let Some(hint) = class.hint() {
                println!("{hint}");
            }
            std::process::exit(exit.code());
        }
    }
}

/// Fire the interrupt once per Ctrl+C.
fn spawn_signal_listener(trigger: InterruptTrigger) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            trigger.fire();
        }
    });
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lendbot=info"));

    let json_logging = std::env::var("LENDBOT_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
