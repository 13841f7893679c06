use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use book_catalog::{
    cache::{CacheStore, InMemoryCacheStore, QueryCache, RedisCacheStore},
    config::Config,
    covers::CoverStorage,
    database::{Database, repositories::BookRepository},
    seed::SeedCatalog,
    services::CatalogService,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "book-catalog")]
#[command(version)]
#[command(about = "Book catalog service with cached search and an external seed set")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("book_catalog={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load_from_file(&cli.config)?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    let repository = BookRepository::new(database.connection());

    // the seed set is required state; a failed fetch aborts startup
    let seed = Arc::new(SeedCatalog::load(&config.seed).await?);

    let store: Arc<dyn CacheStore> = if config.cache.enabled {
        match RedisCacheStore::connect(&config.cache.url, config.cache.connect_timeout()).await {
            Ok(store) => {
                info!("Connected to cache backend at {}", config.cache.url);
                Arc::new(store)
            }
            Err(e) => {
                warn!(
                    "Cache backend unavailable ({}), falling back to in-memory cache",
                    e
                );
                Arc::new(InMemoryCacheStore::new())
            }
        }
    } else {
        info!("Cache backend disabled, using in-memory cache");
        Arc::new(InMemoryCacheStore::new())
    };
    let cache = QueryCache::new(store);

    let covers = CoverStorage::new(config.storage.image_path.clone());
    covers.ensure_dir().await?;

    let catalog = Arc::new(CatalogService::new(
        repository,
        seed,
        cache,
        covers,
        config.web.base_url.clone(),
        config.cache.books_ttl(),
        config.cache.authors_ttl(),
    ));

    let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
    WebServer::new(catalog, addr).run().await
}
