use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info, warn};
use std::io;
use std::path::Path;
use std::time::Duration;

use media_vault::api;
use media_vault::app_state::AppState;
use media_vault::config::AppConfig;
use media_vault::service::audit_worker::AuditWorker;

fn init_logging(config_file: &str) {
    if Path::new(config_file).exists() {
        match log4rs::init_file(config_file, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Failed to load log config {}: {}", config_file, e),
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    warn!("Log config {} unavailable, logging to stderr", config_file);
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::load().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    init_logging(&config.logging.config_file);

    let state = AppState::from_config(config.clone()).map_err(|e| {
        error!("Failed to initialize backends: {}", e);
        io::Error::new(io::ErrorKind::Other, e)
    })?;

    if config.audit.enabled {
        AuditWorker::new(state.media_service.clone(), Duration::from_secs(config.audit.interval_secs))
            .start_background();
    }

    let data = web::Data::new(state);
    info!("Starting server on {}:{}", config.server.host, config.server.port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(data.clone())
            .configure(api::configure)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
