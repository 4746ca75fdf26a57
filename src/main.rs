// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

pub mod robot;

use env_logger::Env;
use std::sync::Arc;

use crate::robot::memory::{Config, StartMode};
use crate::robot::services::crawler::Start;
use crate::robot::services::fetcher::Fetcher;
use crate::robot::services::{ErrorKind, Result};

/// Main entry point for the search robot.
/// Initializes logging, configuration, the store, the fetcher and the HTTP API.
fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let num_workers = num_cpus::get().max(4) + 2;
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_workers)
        .thread_name("robot")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to build Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let handle = runtime.handle().clone();
    if let Err(e) = runtime.block_on(run(handle)) {
        log::error!("Robot stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run(handle: tokio::runtime::Handle) -> Result<()> {
    let config = Config::from_env();
    crate::robot::print_banner(&config);

    let store = crate::robot::memory::open(&config).await?;
    let fetcher = Arc::new(Fetcher::from_config(&config).await?);
    log::info!("Fetch strategies: {}", fetcher.strategy_names().join(" -> "));

    let app = Arc::new(crate::robot::http::App::new(store.clone(), fetcher.clone(), &config, handle));

    let seeded = app.crawler.frontier().seed(&config.seeds).await?;
    if seeded > 0 {
        log::info!("Added {} seed(s) to the frontier", seeded);
    }

    if config.autostart {
        match app.crawler.start(StartMode::Detach).await {
            Ok(Start::Started) => log::info!("Crawling process started."),
            Ok(other) => log::info!("Crawler autostart: {:?}", other),
            Err(e) => log::error!("Error starting the crawler: {}", e),
        }
    }

    let server_app = app.clone();
    let server = rouille::Server::new(config.http_address.as_str(), move |request| {
        crate::robot::http::handle(&server_app, request)
    })
    .map_err(|e| ErrorKind::Other(format!("failed to bind {}: {}", config.http_address, e)))?;
    log::info!("Listening on http://{}", server.server_addr());

    let (server_thread, stop) = server.stoppable();

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down...");

    if stop.send(()).is_err() {
        log::warn!("HTTP server thread already exited");
    }
    match tokio::task::spawn_blocking(move || server_thread.join()).await {
        Ok(Ok(())) => log::info!("HTTP server stopped"),
        _ => log::warn!("HTTP server did not stop cleanly"),
    }

    fetcher.close().await;
    store.close().await;
    Ok(())
}
