// Palaver server entrypoint
//!
//! The heavy lifting (component bootstrap, middleware wiring, server run)
//! lives in dedicated modules so this file remains a thin orchestrator.

use anyhow::Result;
use log::info;
use palaver_server::config::ServerConfig;
use palaver_server::{lifecycle, logging};
use std::env;

#[actix_web::main]
async fn main() -> Result<()> {
    // Optional config path as the first argument
    let config_path = env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());

    let config = match ServerConfig::from_file(&config_path) {
        Ok(cfg) => {
            eprintln!("Loaded config from: {}", config_path);
            cfg
        }
        Err(e) => {
            eprintln!("FATAL: Failed to load {}: {}", config_path, e);
            eprintln!("Server cannot start without valid configuration");
            std::process::exit(1);
        }
    };

    // Logging before any other side effects
    logging::init_logging(
        &config.logging.level,
        &config.logging.file_path,
        config.logging.log_to_console,
        &config.logging.format,
    )?;

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let build_date = env!("BUILD_DATE");
    let branch = env!("GIT_BRANCH");

    info!("Palaver Server v{}", version);
    info!("Commit: {}  Branch: {}  Built: {}", commit, branch, build_date);
    info!("Host: {}  Port: {}", config.server.host, config.server.port);

    // Build application state and run until termination signal
    let components = lifecycle::bootstrap(&config)?;
    lifecycle::run(&config, components).await
}
