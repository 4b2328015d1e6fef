//! Process runtime shared by the CLI and integration harnesses.
//!
//! [`ServerHandle::start`] wires storage, services, housekeeping tasks and
//! the REST API; [`ServerHandle::shutdown`] drains them in reverse.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::AppServices;
use crate::config::AppConfig;
use crate::domain::ports::Notifier;
use crate::domain::RepositoryProvider;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::notifications::run_delivery_log;
use crate::infrastructure::{
    create_event_bus, init_database, DatabaseConfig, EventBusNotifier, SeaOrmRepositoryProvider,
    SharedEventBus,
};
use crate::interfaces::http::{create_api_router, ApiState};
use crate::support::{listen_for_shutdown_signals, ShutdownSignal};

type StartError = Box<dyn std::error::Error>;

pub struct ServerOptions {
    pub config: AppConfig,
    /// Apply pending migrations before serving (default: true)
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

/// A running service.
///
/// ```rust,no_run
/// use evrental::server::{ServerHandle, ServerOptions};
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
    pub services: AppServices,
    pub repos: Arc<dyn RepositoryProvider>,
    pub event_bus: SharedEventBus,
    pub config: AppConfig,

    db: DatabaseConnection,
    shutdown: ShutdownSignal,
    http: JoinHandle<()>,
    housekeeping: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    pub async fn start(opts: ServerOptions) -> Result<Self, StartError> {
        let config = opts.config;
        config.validate()?;
        info!(version = env!("CARGO_PKG_VERSION"), "Starting EV rental service");

        let db = connect_database(&config, opts.auto_migrate).await?;
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

        let event_bus = create_event_bus();
        let notifier: Arc<dyn Notifier> = Arc::new(EventBusNotifier::new(event_bus.clone()));
        let services = AppServices::new(repos.clone(), notifier, &config);

        let shutdown = ShutdownSignal::new();
        let mut housekeeping = services.expiry_monitor(&config).start(shutdown.clone());
        housekeeping.push(tokio::spawn(run_delivery_log(
            event_bus.subscribe(),
            shutdown.clone(),
        )));

        let state = ApiState::new(services.clone(), db.clone(), prometheus_handle());
        let http = serve_api(&config, state, shutdown.clone()).await?;

        Ok(ServerHandle {
            services,
            repos,
            event_bus,
            config,
            db,
            shutdown,
            http,
            housekeeping,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Trigger shutdown on SIGTERM / SIGINT
    pub fn install_signal_handler(&self) {
        tokio::spawn(listen_for_shutdown_signals(self.shutdown.clone()));
    }

    /// Wait for everything to stop once shutdown has been triggered.
    /// In-flight requests get `server.shutdown_timeout` seconds.
    pub async fn wait(self) {
        let grace = Duration::from_secs(self.config.server.shutdown_timeout);
        match tokio::time::timeout(grace, self.http).await {
            Ok(Ok(())) => info!("HTTP server drained"),
            Ok(Err(e)) => error!(error = %e, "HTTP server task panicked"),
            Err(_) => warn!(grace_secs = grace.as_secs(), "HTTP server did not drain in time"),
        }

        for task in self.housekeeping {
            if let Err(e) = task.await {
                error!(error = %e, "Background task panicked");
            }
        }

        match self.db.close().await {
            Ok(()) => info!("Database closed"),
            Err(e) => warn!(error = %e, "Database close failed"),
        }
        info!("EV rental service stopped");
    }

    pub async fn shutdown(self) {
        self.shutdown.trigger();
        self.wait().await;
    }
}

async fn connect_database(config: &AppConfig, migrate: bool) -> Result<DatabaseConnection, StartError> {
    let db = init_database(&DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
    })
    .await?;

    if migrate {
        Migrator::up(&db, None).await?;
        info!("Database schema is current");
    }
    Ok(db)
}

async fn serve_api(
    config: &AppConfig,
    state: ApiState,
    shutdown: ShutdownSignal,
) -> Result<JoinHandle<()>, StartError> {
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("REST API on http://{addr} (Swagger UI at /docs/)");

    let server = axum::serve(listener, create_api_router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await });

    Ok(tokio::spawn(async move {
        if let Err(e) = server.await {
            error!(error = %e, "HTTP server failed");
        }
    }))
}

/// The global recorder can be installed once per process; later starts in
/// the same process reuse it.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .map_err(|e| warn!(error = %e, "Prometheus recorder unavailable, /metrics disabled"))
                .ok()
        })
        .clone()
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`;
/// `logging.format = "json"` switches to JSON lines.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let json = config.logging.format.eq_ignore_ascii_case("json");

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .try_init();
    if installed.is_err() {
        eprintln!("tracing subscriber already installed");
    }
}
