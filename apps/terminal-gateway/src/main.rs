//! Terminal Gateway Binary
//!
//! Serves the datafeed and broker APIs over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin terminal-gateway -- config/default.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `GATEWAY_CONFIG`: config path when no argument is given
//!   (default: `config/default.yaml`)
//! - `RUST_LOG`: log filter, overrides `observability.logging.level`
//!
//! The default config reads the backend and provider credentials from the
//! environment; see `config/default.yaml`.

use std::net::SocketAddr;

use anyhow::Context;
use terminal_gateway::config::{Config, load_config};
use terminal_gateway::infrastructure::Container;
use terminal_gateway::infrastructure::http::create_router;
use terminal_gateway::observability::{init_metrics, init_tracing};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

fn main() -> anyhow::Result<()> {
    load_dotenv();

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("GATEWAY_CONFIG").ok());
    let config = load_config(path.as_deref()).context("loading configuration")?;

    init_tracing(
        &config.observability.logging.level,
        config.observability.logging.is_json(),
    );

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        http_port = config.server.http_port,
        paper = config.backend.is_paper(),
        metrics = config.observability.metrics.enabled,
        "Starting terminal gateway"
    );

    if config.observability.metrics.enabled {
        let addr: SocketAddr = format!(
            "{}:{}",
            config.server.bind_address, config.observability.metrics.port
        )
        .parse()
        .context("parsing metrics address")?;
        if let Err(e) = init_metrics(addr) {
            tracing::warn!(error = %e, "Metrics exporter not started, continuing without it");
        }
    }

    let container = Container::from_config(&config).context("wiring gateway")?;
    let app = create_router(container.app_state(env!("CARGO_PKG_VERSION")));

    let addr: SocketAddr = config
        .server
        .listen_addr()
        .parse()
        .context("parsing listen address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .context("serving HTTP")?;

    container.shutdown();
    tracing::info!("Terminal gateway stopped");
    Ok(())
}

/// Load `.env` from the current directory or any ancestor.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        for dir in cwd.ancestors().skip(1) {
            let env_path = dir.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
        }
    }
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, initiating shutdown"),
    }

    token.cancel();
}
