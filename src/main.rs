//! Binary entry point: wire the pieces, pick a mode, run until done.
//!
//! No arguments runs the sidecar-draining processor; `serve [port]` runs
//! the single-shot HTTP receiver. Diagnostics go to stderr so stdout
//! stays a pure message stream.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slack_relay::config::Config;
use slack_relay::emit::Emitter;
use slack_relay::pipeline::EventPipeline;
use slack_relay::server::{build_router, AppState};
use slack_relay::sidecar::{FetchError, SidecarClient};
use slack_relay::slack::{ApiError, SlackClient};
use slack_relay::state::{RecentIdSet, StateError, WatermarkStore};
use slack_relay::webhooks::EventFilter;
use slack_relay::worker::{DrainLoop, ReconciliationPoller, RetryPolicy};

/// Default listen port for `serve` mode.
const DEFAULT_PORT: u16 = 9999;

/// Failures that stop the relay before it begins relaying.
///
/// Everything past startup is handled in place: the loops back off and
/// retry, the handlers drop and log.
#[derive(Debug, Error)]
enum StartupError {
    #[error("loading state: {0}")]
    State(#[from] StateError),

    #[error("building sidecar client: {0}")]
    Sidecar(#[from] FetchError),

    #[error("building slack client: {0}")]
    Slack(#[from] ApiError),

    #[error("listener I/O: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slack_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                cancel.cancel();
            }
        });
    }

    let config = Config::from_env();
    let result = match std::env::args().nth(1).as_deref() {
        Some("serve") => {
            let port = std::env::args()
                .nth(2)
                .and_then(|raw| match raw.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!(port = %raw, "unparsable port, using default");
                        None
                    }
                })
                .unwrap_or(DEFAULT_PORT);
            run_receiver(config, port, cancel).await
        }
        Some(other) => {
            warn!(argument = %other, "unrecognized argument, running the processor");
            run_processor(config, cancel).await
        }
        None => run_processor(config, cancel).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "startup failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs the sidecar-draining processor until cancelled.
async fn run_processor(config: Config, cancel: CancellationToken) -> Result<(), StartupError> {
    info!(
        sidecar = %config.sidecar_url,
        source = %config.sidecar_source,
        bot_filter = config.bot_id.as_deref().unwrap_or("(none)"),
        verification = config.signing_secret.is_some(),
        "processor starting"
    );

    let watermark = Arc::new(WatermarkStore::load(&config.watermark_file)?);
    let recent = Arc::new(RecentIdSet::load(&config.seen_ids_file)?);
    let emitter = Arc::new(Emitter::stdout());
    let filter = EventFilter::new(config.bot_id.clone(), recent);
    let pipeline = EventPipeline::new(filter.clone(), Arc::clone(&watermark), Arc::clone(&emitter));

    let poller = match config.reconciliation() {
        Some((token, channel)) => {
            info!(
                channel = %channel,
                interval_secs = config.poll_interval.as_secs(),
                "reconciliation enabled"
            );
            let slack = SlackClient::new(config.api_base.clone(), token)?;
            let poller = ReconciliationPoller::new(
                slack,
                channel,
                config.poll_interval,
                filter,
                watermark,
                emitter,
            );
            Some(tokio::spawn(poller.run(cancel.clone())))
        }
        None => None,
    };

    let sidecar = SidecarClient::new(config.sidecar_url.clone(), config.sidecar_source.clone())?;
    DrainLoop::new(
        sidecar,
        config.signing_secret.clone(),
        pipeline,
        RetryPolicy::RECONNECT,
    )
    .run(cancel)
    .await;

    if let Some(handle) = poller {
        let _ = handle.await;
    }
    info!("processor stopped");
    Ok(())
}

/// Runs the single-shot HTTP receiver until one message is relayed.
async fn run_receiver(
    config: Config,
    port: u16,
    cancel: CancellationToken,
) -> Result<(), StartupError> {
    info!(
        verification = config.signing_secret.is_some(),
        "receiver starting"
    );

    let watermark = Arc::new(WatermarkStore::load(&config.watermark_file)?);
    let recent = Arc::new(RecentIdSet::load(&config.seen_ids_file)?);
    let emitter = Arc::new(Emitter::stdout());
    let filter = EventFilter::new(config.bot_id.clone(), recent);
    let pipeline = EventPipeline::new(filter, watermark, emitter);

    // Child token: the handler cancels it after the first relayed message,
    // and an outer Ctrl-C reaches it through the parent.
    let done = cancel.child_token();
    let app_state = AppState::new(
        config.signing_secret.map(String::into_bytes),
        pipeline,
        done.clone(),
    );
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { done.cancelled().await })
        .await?;
    info!("receiver stopped");
    Ok(())
}
