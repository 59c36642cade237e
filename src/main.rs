use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;

use wishlist_server::api::{self, AppState};
use wishlist_server::auth::AuthService;
use wishlist_server::cache::Cache;
use wishlist_server::config::Config;
use wishlist_server::events::EventProcessor;
use wishlist_server::store::Store;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables before the logger reads RUST_LOG
    dotenvy::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();

    let store = Arc::new(
        Store::new(&config.database_path).expect("Failed to initialize database"),
    );
    log::info!("Database: {}", config.database_path);

    let auth_service = Arc::new(AuthService::new(config.jwt_secret.clone(), config.token_ttl_days));
    let cache = Cache::new(Duration::from_secs(config.cache_ttl_secs));

    if let Some(ref url) = config.notification_webhook_url {
        log::info!("Delivering notifications to {}", url);
    }
    let events = Arc::new(
        EventProcessor::new(store.clone(), cache.clone())
            .with_webhook(config.notification_webhook_url.clone()),
    )
    .spawn_worker(config.event_queue_capacity);

    let state = web::Data::new(AppState {
        store,
        auth_service,
        events,
        cache,
    });

    log::info!("Starting wishlist-server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(api::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
