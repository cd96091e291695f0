//! Dianita API server binary.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use dianita_core::provider::openai::OpenAiClient;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "dianita_server", about = "Dianita API server")]
struct Args {
    /// Port to listen on (0 = ephemeral).
    #[arg(long, default_value_t = 3100)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/dianita"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dianita_api=debug,dianita_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(
        version = dianita_core::version(),
        database_url = %args.database_url,
        port = args.port,
        "starting dianita_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    dianita_api::migrate(&pool).await?;

    let mut config = dianita_api::config::ApiConfig::from_env();
    config.bind_addr = format!("127.0.0.1:{}", args.port);
    config.pg_connection_url = args.database_url;

    if config.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY is not set; chat requests will fail at the provider");
    }

    let provider = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));

    let state = dianita_api::AppState {
        pool,
        config: config.clone(),
        provider,
    };

    let app = dianita_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
