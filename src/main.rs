use std::process::ExitCode;

use foodgram::{config::Config, routes::api, state::State};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Environment misconfigured: {e}");
            return ExitCode::FAILURE;
        }
    };

    log::info!("Initializing state...");
    let state = match State::from_config(&config).await {
        Ok(state) => state,
        Err(e) => {
            log::error!("Failed to initialize: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (addr, server) = match warp::serve(api(state))
        .try_bind_with_graceful_shutdown(config.addr, shutdown_signal())
    {
        Ok(server) => server,
        Err(e) => {
            log::error!("Failed to bind {}: {e}", config.addr);
            return ExitCode::FAILURE;
        }
    };

    log::info!("Server running on {addr}");
    server.await;
    log::info!("Server shut down");

    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Received Ctrl+C, shutting down");
}
