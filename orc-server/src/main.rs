mod routes;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orc_core::{Orchestrator, OrchestratorConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "orc-server")]
#[command(about = "Cluster control-plane simulation server")]
#[command(version)]
struct Args {
    /// Host to bind to (env: ORC_HOST)
    #[arg(long, default_value = "0.0.0.0", env = "ORC_HOST")]
    host: String,

    /// Port to listen on (env: ORC_PORT)
    #[arg(short, long, default_value_t = 5001, env = "ORC_PORT")]
    port: u16,

    /// Seconds a node may go without a heartbeat before it is marked
    /// unhealthy (env: ORC_HEARTBEAT_TIMEOUT_SECS)
    #[arg(long, default_value_t = 15, env = "ORC_HEARTBEAT_TIMEOUT_SECS")]
    heartbeat_timeout_secs: u64,

    /// Cadence of the liveness monitor's background tick (env:
    /// ORC_LIVENESS_TICK_SECS)
    #[arg(long, default_value_t = 5, env = "ORC_LIVENESS_TICK_SECS")]
    liveness_tick_secs: u64,

    /// Bounded retry count for a pod placement under contention (env:
    /// ORC_RESCHEDULE_MAX_ATTEMPTS)
    #[arg(long, default_value_t = 3, env = "ORC_RESCHEDULE_MAX_ATTEMPTS")]
    reschedule_max_attempts: u32,

    /// Deterministic seed for RandomFit; omit to draw from OS entropy (env:
    /// ORC_RANDOM_SEED)
    #[arg(long, env = "ORC_RANDOM_SEED")]
    random_seed: Option<u64>,

    /// Log level filter (env: RUST_LOG)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Log format: "pretty" or "json" (env: LOG_FORMAT)
    #[arg(long, default_value = "pretty", env = "LOG_FORMAT")]
    log_format: String,

    /// Enable the Prometheus /metrics endpoint (env: ORC_METRICS_ENABLED)
    #[arg(long, default_value_t = true, env = "ORC_METRICS_ENABLED")]
    metrics_enabled: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::new(&args.log_level);
    let registry = tracing_subscriber::registry().with(env_filter);
    if args.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if args.metrics_enabled {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        builder
            .install()
            .expect("failed to install Prometheus metrics recorder");
        tracing::info!("Prometheus metrics enabled at /metrics");
    }

    let config = OrchestratorConfig {
        heartbeat_timeout_secs: args.heartbeat_timeout_secs,
        liveness_tick_secs: args.liveness_tick_secs,
        reschedule_max_attempts: args.reschedule_max_attempts,
        random_seed: args.random_seed,
    };

    let orchestrator = Orchestrator::new(config);
    orchestrator.start_liveness_monitor();

    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting orchestrator simulation server on {}", addr);

    let app = routes::router(Arc::clone(&orchestrator));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
