//! `aether-storefront` binary.
//!
//! Reads `STOREFRONT_*` and `AETHER_API_*` settings from the environment,
//! then serves the shop on `STOREFRONT_HOST:STOREFRONT_PORT` (port 3000
//! unless told otherwise). Pages are rendered on the server from the remote
//! shop API; the visitor's cart and login ride in cookies, flash notices in
//! a short-lived in-memory session.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;

use aether_storefront::app;
use aether_storefront::config::StorefrontConfig;
use aether_storefront::state::AppState;
use secrecy::ExposeSecret;
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "aether_storefront=info,tower_http=debug";

/// Start error reporting when a DSN is configured. Reports stop once the
/// returned guard is dropped.
fn error_reporting(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;
    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Cow::Owned),
        attach_stacktrace: true,
        ..Default::default()
    };
    Some(sentry::init((dsn.expose_secret(), options)))
}

/// Warnings and errors become reports; info and debug lines ride along as
/// breadcrumbs.
fn report_level(metadata: &tracing::Metadata<'_>) -> EventFilter {
    match *metadata.level() {
        Level::ERROR | Level::WARN => EventFilter::Event,
        Level::INFO | Level::DEBUG => EventFilter::Breadcrumb,
        Level::TRACE => EventFilter::Ignore,
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(report_level))
        .init();
}

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("invalid storefront configuration");

    // Reporting client first so the tracing layer has somewhere to send
    let reporting = error_reporting(&config);
    init_logging();
    if reporting.is_some() {
        tracing::info!("error reporting enabled");
    }

    let addr = config.socket_addr();
    tracing::info!(api = %config.api.base_url, secure = config.is_secure(), "storefront configured");

    let state = AppState::new(config).expect("could not build storefront state");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("cannot listen on {addr}: {e}"));
    tracing::info!(%addr, "storefront listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(stop_requested())
        .await
        .expect("storefront server failed");

    tracing::info!("storefront stopped");
}

/// Resolves on Ctrl+C, or on SIGTERM where the platform has it.
async fn stop_requested() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("stop requested, draining connections");
}
