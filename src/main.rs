use actix_web::{middleware, web, App, HttpServer};
use komik_gateway::app_state::AppState;
use komik_gateway::config::Config;
use komik_gateway::http_client::{Fetcher, HttpClientConfig, HttpFetcher};
use komik_gateway::routes;
use log::{info, warn};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::sync::Arc;

const LOG_CONFIG: &str = "log4rs.yml";

/// `log4rs.yml` when present, else plain console logging at info
fn init_logging() {
    if log4rs::init_file(LOG_CONFIG, Default::default()).is_ok() {
        return;
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}")))
        .build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(log::LevelFilter::Info));
    match config {
        Ok(c) => {
            if let Err(e) = log4rs::init_config(c) {
                eprintln!("Failed to initialize logging: {}", e);
            } else {
                warn!("{} not found or invalid, logging to console", LOG_CONFIG);
            }
        }
        Err(e) => eprintln!("Invalid fallback logging config: {}", e),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();

    let cfg = Config::load();

    let fetcher = HttpFetcher::with_config(HttpClientConfig {
        enable_gzip: cfg.http.enable_compression,
        ..HttpClientConfig::default()
    })
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);

    let addr = cfg.bind_addr();
    let data = web::Data::new(AppState::new(cfg, fetcher));

    info!(
        "Cache: {} (capacity {}), update delay {}ms",
        if data.config.cache.enabled { "on" } else { "off" },
        data.config.cache.capacity,
        data.config.updates.delay_ms
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .configure(routes::configure)
            .default_service(web::to(routes::not_found))
    })
    .bind(&addr)?;

    info!("Listening on {}", addr);
    server.run().await
}
