use clap::Parser;
use newsdesk::db::schema;
use newsdesk::news::GuardianClient;
use newsdesk::server::config::ServerConfig;
use newsdesk::services::aggregator::{ArticleAggregator, SeaOrmArticleCache, SeaOrmPreferenceLookup};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) -> WorkerGuard {
    // Log to a file: JSON format, daily rotation
    let (file_writer, guard) = tracing_appender::non_blocking(rolling::daily(log_dir, "newsdesk.log"));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    guard
}

async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());
    opt.max_connections(max_connections).sqlx_logging(false);
    Database::connect(opt).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let server_config = Arc::new(ServerConfig::load(args.config.as_deref())?);
    let _log_guard = init_logging(&server_config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting newsdesk.");

    // --- Database Setup ---
    let db_pool = Arc::new(connect(&server_config.database_url, server_config.max_db_connections).await?);
    let document_pool = if server_config.document_database_url == server_config.database_url {
        db_pool.clone()
    } else {
        Arc::new(connect(&server_config.document_database_url, server_config.max_db_connections).await?)
    };

    schema::ensure_relational_schema(&db_pool).await?;
    schema::ensure_document_schema(&document_pool).await?;
    schema::seed_preferences(&db_pool).await?;

    // --- Aggregator Setup ---
    let provider = GuardianClient::new(
        &server_config.guardian_base_url,
        &server_config.guardian_api_key,
        server_config.provider_timeout(),
    )?;
    let aggregator = Arc::new(ArticleAggregator::new(
        Arc::new(SeaOrmPreferenceLookup::new(db_pool.clone())),
        Arc::new(SeaOrmArticleCache::new(document_pool.clone())),
        Arc::new(provider),
        server_config.cache_freshness(),
    ));

    // --- Axum HTTP Server Setup ---
    let app = newsdesk::web::create_axum_router(
        db_pool,
        document_pool,
        aggregator,
        server_config.clone(),
    );

    let addr: SocketAddr = server_config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server terminated with an error.");
            e
        })?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
