use std::env;
use std::fmt::Display;
use std::str::FromStr;

const DEFAULT_JWT_SECRET: &str = "default_jwt_secret_change_me";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub cache_ttl_secs: u64,
    pub event_queue_capacity: usize,
    pub notification_webhook_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_SECRET not set, using default (not secure for production!)");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: try_load("PORT", 8080),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "wishlist.db".to_string()),
            jwt_secret,
            token_ttl_days: try_load("TOKEN_TTL_DAYS", 7),
            cache_ttl_secs: try_load("CACHE_TTL_SECS", 300),
            event_queue_capacity: try_load("EVENT_QUEUE_CAPACITY", 256),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: ":memory:".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_days: 7,
            cache_ttl_secs: 300,
            event_queue_capacity: 256,
            notification_webhook_url: None,
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => {
            log::info!("{} not set, using default: {}", key, default);
            default
        }
    }
}

fn parse_or<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    raw.trim().parse().unwrap_or_else(|e| {
        log::warn!("Invalid {} value {:?} ({}), using default: {}", key, raw, e, default);
        default
    })
}
