//! # relay
//!
//! Message relay binary: loads settings, starts the HTTP + SSE server and
//! shuts it down cleanly on ctrl-c or SIGTERM.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use relay_server::{HttpSink, OutboundSink, RelayServer, ServerConfig};
use relay_settings::{RejectedOverride, RelaySettings};

/// Webhook-to-SSE message relay.
#[derive(Parser, Debug)]
#[command(name = "relay", version, about = "Webhook-to-SSE message relay")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings and `PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Outbound sink URL for `POST /send` (overrides settings).
    #[arg(long)]
    forward_url: Option<String>,

    /// Settings file (defaults to `RELAY_SETTINGS_PATH` or `~/.relay/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Apply CLI flags on top of loaded settings.
    fn apply(&self, settings: &mut RelaySettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref url) = self.forward_url {
            settings.forward.url = Some(url.clone());
        }
    }
}

/// Load settings, then layer the CLI flags on top and re-validate.
///
/// Returns the env overrides that were ignored so they can be logged once
/// the subscriber is installed.
fn resolve_settings(args: &Cli) -> Result<(RelaySettings, Vec<RejectedOverride>)> {
    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(relay_settings::settings_path);
    let (mut settings, rejected) = relay_settings::load_settings_reporting(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);
    relay_settings::validate(&settings).context("Invalid command-line settings")?;
    Ok((settings, rejected))
}

fn build_server(settings: &RelaySettings) -> Result<RelayServer> {
    let config = ServerConfig::from_settings(&settings.server, &settings.forward);
    let sink = HttpSink::from_config(&config).context("Failed to build outbound sink")?;
    let mut server = RelayServer::new(config);

    if let Some(sink) = sink {
        tracing::info!(target_url = %sink.target(), "outbound forwarding enabled");
        server = server.with_forwarder(Arc::new(sink));
    }

    match relay_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "metrics recorder unavailable"),
    }

    Ok(server)
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to listen for SIGTERM")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for ctrl-c")?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for ctrl-c")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let (settings, rejected) = resolve_settings(&args)?;

    relay_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);
    for r in &rejected {
        r.warn();
    }

    let server = build_server(&settings)?;
    let handle = server.start().await.with_context(|| {
        format!(
            "Failed to bind {}:{}",
            settings.server.host, settings.server.port
        )
    })?;

    shutdown_signal().await?;

    tracing::info!("Shutting down...");
    let closed = server.stop(handle).await;
    tracing::info!(closed, "Shutdown complete");
    Ok(())
}
