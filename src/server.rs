//! Reusable server runtime.
//!
//! [`ServerHandle`] owns the whole lifecycle: metrics recorder, database
//! and migrations, telemetry emitter, REST API and graceful shutdown.

use std::sync::{Arc, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::infrastructure::completion::{CompletionProvider, OpenAiCompletionClient};
use crate::infrastructure::{init_database, TelemetryEmitter};
use crate::interfaces::http::{create_api_router, ApiContext};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Options for starting the service.
#[derive(Default)]
pub struct ServerOptions {
    pub config: AppConfig,
}

/// The global metrics recorder can only be installed once per process, so
/// a restart within the same process reuses the first handle.
fn prometheus_handle() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("📊 Prometheus metrics recorder installed");
    Ok(PROM_HANDLE.get_or_init(|| handle).clone())
}

/// Handle to a running service.
///
/// ```rust,no_run
/// use opmetrics::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Port the REST API is listening on.
    pub api_port: u16,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    telemetry_task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let config = opts.config;
        info!("Starting opmetrics service...");

        let prometheus = prometheus_handle()?;

        // ── Database ───────────────────────────────────────────
        let db = init_database(&config.database_config()).await?;

        // ── Shutdown coordinator ───────────────────────────────
        let shutdown = ShutdownCoordinator::new(config.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        // ── Telemetry ──────────────────────────────────────────
        let (emitter, telemetry) = TelemetryEmitter::new(config.telemetry_config());
        let telemetry_task =
            emitter.map(|emitter| tokio::spawn(emitter.run(shutdown_signal.clone())));

        // ── Query suggestions ──────────────────────────────────
        let completion = config.completion_config().map(|cfg| {
            info!(model = %cfg.model, "Query suggestions enabled");
            Arc::new(OpenAiCompletionClient::new(cfg)) as Arc<dyn CompletionProvider>
        });

        for setting in config.default_credentials_in_use() {
            warn!(setting, "⚠️  Built-in default credential in use; set it in the config file");
        }
        if !config.security.auth_enabled {
            warn!("⚠️  Authentication is disabled: every user-scoped request is admitted");
        }

        // ── REST API ───────────────────────────────────────────
        let ctx = ApiContext::new(db.clone(), &config, telemetry, completion, prometheus);
        let router = create_api_router(ctx);

        let api_port = config.server.api_port;
        let api_addr = config.api_address();
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!("REST API server listening on http://{}", api_addr);
        if config.docs.enabled {
            info!("Swagger UI available at http://{}/docs/", api_addr);
        }

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                api_shutdown.wait().await;
                info!("🛑 REST API server received shutdown signal");
            });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        info!("🚀 Server started.");

        Ok(Self {
            config,
            api_port,
            db,
            shutdown,
            api_task,
            telemetry_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Send the shutdown signal without waiting.
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for every task to stop after shutdown has been triggered, then
    /// close the database pool.
    pub async fn wait(self) {
        info!("⏳ Waiting for server tasks to complete...");

        let Self {
            db,
            shutdown,
            api_task,
            telemetry_task,
            ..
        } = self;

        shutdown
            .cleanup_within_timeout(|| async move {
                match api_task.await {
                    Ok(()) => info!("REST API server stopped"),
                    Err(e) => error!("REST API server task panicked: {}", e),
                }
                if let Some(task) = telemetry_task {
                    if let Err(e) = task.await {
                        error!("Telemetry task panicked: {}", e);
                    }
                }
            })
            .await;

        if let Err(e) = db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("✅ Database connection closed");
        }

        info!("👋 opmetrics shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("🛑 Shutting down...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the logging config. `RUST_LOG` overrides
/// `logging.level`. Call once at process start.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
