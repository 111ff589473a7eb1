//! dict-bridge daemon.
//!
//! ```text
//!   config (TOML + DICT_BRIDGE_* env)
//!        │
//!        ▼
//!   ┌──────────────────────────── Bridge ────────────────────────────┐
//!   │ validate → translate → sign ──▶ breaker ▶ retry ▶ SOAP/mTLS ───┼──▶ Bacen DICT
//!   │                                                                │
//!   │ parse ◀── translate back ◀─────────────────────────────────────┼─── response / fault
//!   │   │                                                            │
//!   │   └──▶ event dispatcher (bounded, drained on shutdown)         │
//!   └────────────────────────────────────────────────────────────────┘
//!        ▲
//!        │ admin API: /health, /admin/circuit, /admin/circuit/reset
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use dict_bridge::admin::{self, AdminState};
use dict_bridge::config::{self, loader};
use dict_bridge::lifecycle::{signals, startup, Shutdown};
use dict_bridge::CallContext;

const DEFAULT_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";
const EVENT_DRAIN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "dict-bridge", version, about = "Resilient bridge to the Bacen DICT directory")]
struct Args {
    /// TOML configuration file; defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => loader::from_env_only()?,
    };
    if args.check {
        println!("configuration OK");
        return Ok(());
    }

    startup::init_observability(&config)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dict-bridge starting");

    let bridge = startup::build_bridge(&config)?;
    let report = bridge.health_check(&CallContext::with_correlation_id("startup-health")).await;
    tracing::info!(
        status = %report.status,
        bacen_reachable = report.bacen.reachable,
        signer_reachable = report.signer.reachable,
        "Initial health check"
    );

    let shutdown = Shutdown::new();
    tokio::spawn(signals::forward_signals(shutdown.clone()));

    if config.admin.enabled {
        if config.admin.api_key == DEFAULT_API_KEY {
            tracing::warn!("Admin API is using the default API key");
        }
        let addr = startup::parse_addr("admin.bind_address", &config.admin.bind_address)?;
        let listener = TcpListener::bind(addr).await?;
        let state = AdminState::new(bridge.clone(), &config.admin.api_key);
        admin::serve(listener, state, shutdown.wait()).await?;
    } else {
        shutdown.wait().await;
    }

    if let Some(events) = bridge.events() {
        events.shutdown(EVENT_DRAIN_GRACE).await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
