use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use inkpost_api::services::{accounts, notifications};
use inkpost_api::{build_router, ApiConfig, AppState};
use inkpost_auth::{MemorySessionStore, SessionStore};
use inkpost_core::{SERVICE_NAME, VERSION};
use inkpost_email::{provider_from_config, EmailTemplates, SiteInfo};
use inkpost_http::{
    init_logging, log_shutdown_info, log_startup_info, serve, shutdown_signal, LoggingConfig,
};
use inkpost_orm::{MemoryStore, PostgresStore, Store};
use inkpost_queue::{Dispatcher, MemoryOutbox, OutboxStore, PostgresOutbox};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Parser)]
#[command(name = "inkpost")]
#[command(version, about = "Blog backend: posts, comments, subscribers and analytics")]
struct Cli {
    /// Use the in-memory store instead of PostgreSQL
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,

    /// Apply database migrations and exit
    Migrate,

    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        /// Read from INKPOST_ADMIN_PASSWORD when not given
        #[arg(long, env = "INKPOST_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long)]
        full_name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ApiConfig::load().context("Invalid configuration")?;
    let logging = LoggingConfig::for_environment(config.environment)?
        .with_service(SERVICE_NAME, VERSION);
    init_logging(logging).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config, cli.memory).await,
        Commands::Migrate => migrate(&config, cli.memory).await,
        Commands::CreateAdmin {
            email,
            username,
            password,
            full_name,
        } => {
            let registration = accounts::Registration {
                email,
                username,
                password,
                full_name,
            };
            create_admin(config, cli.memory, registration).await
        }
    }
}

/// Storage and outbox for the selected backend
async fn backends(
    config: &ApiConfig,
    memory: bool,
) -> anyhow::Result<(Arc<dyn Store>, Arc<dyn OutboxStore>)> {
    if memory || config.database.url.is_none() {
        if !memory {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
        }
        return Ok((Arc::new(MemoryStore::new()), Arc::new(MemoryOutbox::new())));
    }

    let store = PostgresStore::connect(&config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    store.run_migrations().await.context("Failed to run migrations")?;
    let outbox = PostgresOutbox::new(store.pool().clone());
    Ok((Arc::new(store), Arc::new(outbox)))
}

async fn migrate(config: &ApiConfig, memory: bool) -> anyhow::Result<()> {
    if memory || config.database.url.is_none() {
        bail!("migrate needs DATABASE_URL and cannot run with --memory");
    }
    let store = PostgresStore::connect(&config.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    store.run_migrations().await.context("Failed to run migrations")?;
    info!("Migrations applied");
    Ok(())
}

async fn create_admin(
    config: ApiConfig,
    memory: bool,
    registration: accounts::Registration,
) -> anyhow::Result<()> {
    if memory {
        warn!("Creating an admin in the in-memory store; it disappears when this command exits");
    }
    let (store, _) = backends(&config, memory).await?;
    let hasher = config.auth.hash_algorithm.hasher();
    let user = accounts::register(store.as_ref(), hasher, registration, true)
        .await
        .map_err(|e| anyhow::anyhow!("Could not create admin: {}", e))?;
    info!(user_id = user.id, email = %user.email, "Administrator created");
    Ok(())
}

async fn run_server(config: ApiConfig, memory: bool) -> anyhow::Result<()> {
    log_startup_info(SERVICE_NAME, VERSION, config.environment);

    let (store, outbox) = backends(&config, memory).await?;
    let sessions = Arc::new(MemorySessionStore::new(config.auth.session.ttl_secs));
    let hasher = config.auth.hash_algorithm.hasher();

    let mailer = provider_from_config(&config.email)?;
    let site = SiteInfo {
        name: config.site.name.clone(),
        url: config.site.url.clone(),
    };
    let templates = Arc::new(EmailTemplates::new(site, config.email.from_mailbox())?);
    let registry = notifications::handlers(Arc::clone(&store), mailer, templates);
    let dispatcher = Dispatcher::new(Arc::clone(&outbox), registry, config.queue.clone());

    let state = AppState::new(
        store,
        outbox,
        sessions.clone() as Arc<dyn SessionStore>,
        hasher,
        config,
    );
    let http = state.config.http.clone();
    let addr = http.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let dispatcher_task = tokio::spawn(dispatcher.run(stopped(stop_rx.clone())));
    let sweeper_task = tokio::spawn(sweep_sessions(sessions, stopped(stop_rx)));

    let result = serve(listener, build_router(state), &http, shutdown_signal()).await;

    let _ = stop_tx.send(true);
    for (name, task) in [("dispatcher", dispatcher_task), ("session sweeper", sweeper_task)] {
        if let Err(e) = task.await {
            error!("Background {} task failed: {}", name, e);
        }
    }
    log_shutdown_info(SERVICE_NAME);
    result.map_err(Into::into)
}

/// Resolves once `true` is sent or the sender is gone
async fn stopped(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn sweep_sessions(sessions: Arc<MemorySessionStore>, shutdown: impl std::future::Future<Output = ()>) {
    let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => match sessions.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Expired sessions removed"),
                Err(e) => warn!(error = %e, "Session cleanup failed"),
            },
        }
    }
}
