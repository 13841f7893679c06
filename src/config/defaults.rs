//! Default configuration values

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/books.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_CACHE_URL: &str = "redis://127.0.0.1:6379/0";
/// Book search results change with every catalog write, keep the ttl short.
pub const DEFAULT_BOOKS_TTL_SECS: u64 = 60;
/// Author aggregates change less often per write than raw search results.
pub const DEFAULT_AUTHORS_TTL_SECS: u64 = 120;
pub const DEFAULT_CACHE_CONNECT_TIMEOUT_SECS: u64 = 1;

pub const DEFAULT_IMAGE_PATH: &str = "./images";

pub const DEFAULT_SEED_URL: &str = "https://openlibrary.org/search.json";
pub const DEFAULT_SEED_QUERY: &str = "python";
pub const DEFAULT_SEED_LIMIT: u32 = 58;
pub const DEFAULT_SEED_TIMEOUT_SECS: u64 = 30;
