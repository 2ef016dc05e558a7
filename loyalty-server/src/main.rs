use loyalty_server::{Config, Server, logger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::load()?;
    logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref());

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database_uri,
        "Starting loyalty-server"
    );

    Server::new(config).run().await
}
