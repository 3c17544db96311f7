use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use coxswain_db_memory::{MemoryStore, OutboxReceiver, outbox_channel};
use coxswain_reconcile::{Dispatcher, LocalEngine, Reconciler};
use coxswain_storage::ResourceStore;

use crate::{config::AppConfig, handlers, provisioner::DelayProvisioner, state::AppState};

pub fn build_app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Everything plane-rooted is parsed by the handlers themselves, so
        // arbitrary scope depths share one route.
        .route(
            "/planes/{*rest}",
            get(handlers::get_any)
                .put(handlers::put_any)
                .delete(handlers::delete_any),
        )
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct CoxswainServer {
    addr: SocketAddr,
    app: Router,
    dispatcher: Arc<Dispatcher>,
    outbox: Option<OutboxReceiver>,
    redeliver_delay: Duration,
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> CoxswainServer {
        let cfg = self.config;

        let (outbox_tx, outbox_rx) = outbox_channel();
        let store = ResourceStore::new(Arc::new(MemoryStore::new().with_outbox(outbox_tx)))
            .with_operation_ttl(cfg.operations.retention());

        let reconciler = Reconciler::new(
            store.clone(),
            Arc::new(DelayProvisioner::new(cfg.provisioner.delay())),
        )
        .with_idle_timeout(cfg.reconcile.idle_timeout());
        let engine = LocalEngine::new(reconciler).with_event_buffer(cfg.reconcile.event_buffer);
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(engine)));

        tracing::info!(backend = store.backend_name(), "storage initialized");

        let app = build_app(AppState::new(store), cfg.server.body_limit_bytes);
        CoxswainServer {
            addr: cfg.addr(),
            app,
            dispatcher,
            outbox: Some(outbox_rx),
            redeliver_delay: cfg.reconcile.redeliver_delay(),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoxswainServer {
    /// A clone of the router, for in-process tests.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Spawns the outbox delivery pump. Idempotent per server; the second
    /// call returns `None` because the receiver has been taken.
    pub fn start_pump(&mut self) -> Option<tokio::task::JoinHandle<()>> {
        let outbox = self.outbox.take()?;
        let dispatcher = Arc::clone(&self.dispatcher);
        let redeliver_delay = self.redeliver_delay;
        Some(tokio::spawn(run_pump(outbox, dispatcher, redeliver_delay)))
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let pump = self.start_pump();

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(pump) = pump {
            pump.abort();
        }
        Ok(())
    }
}

/// Delivery attempts per payload before the pump drops it.
const DELIVER_ATTEMPTS: u32 = 5;

/// Delivers committed outbox payloads to the dispatcher, in commit order.
/// Retryable failures redeliver the same payload after a delay, up to
/// [`DELIVER_ATTEMPTS`] times (at-least-once; the process discards
/// duplicates). Redelivery stays in place rather than re-enqueueing at the
/// back: events for one resource must reach its process in commit order.
async fn run_pump(
    mut outbox: OutboxReceiver,
    dispatcher: Arc<Dispatcher>,
    redeliver_delay: Duration,
) {
    while let Some(payload) = outbox.recv().await {
        let mut attempts = 0;
        loop {
            match dispatcher.dispatch(&payload).await {
                Ok(_) => break,
                Err(err) if err.is_retryable() => {
                    attempts += 1;
                    if attempts >= DELIVER_ATTEMPTS {
                        tracing::error!(
                            error = %err,
                            attempts,
                            "dropping notification after repeated dispatch failures"
                        );
                        break;
                    }
                    tracing::warn!(error = %err, attempts, "dispatch failed, redelivering");
                    tokio::time::sleep(redeliver_delay).await;
                }
                Err(err) => {
                    tracing::error!(error = %err, "dropping undeliverable notification");
                    break;
                }
            }
        }
    }
    tracing::debug!("outbox closed, delivery pump stopped");
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
