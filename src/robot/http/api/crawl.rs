// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use rouille::Response;
use serde::Serialize;

use crate::robot::http::api::error;
use crate::robot::http::App;
use crate::robot::services::crawler::{CrawlReport, Start};

#[derive(Serialize)]
struct Message {
    message: &'static str,
}

#[derive(Serialize)]
struct Status {
    status: &'static str,
    descriptions: i64,
    pending: i64,
    last_crawl: Option<CrawlReport>,
}

// GET /start
pub fn start(app: &App) -> Result<Response, crate::robot::http::Error> {
    let message = match app.runtime.block_on(app.crawler.start(app.start_mode)) {
        Ok(Start::Finished(_)) => "Crawling process finished.",
        Ok(Start::Started) => "Crawling process started.",
        Ok(Start::AlreadyRunning) => "Crawling process already running.",
        Err(e) => {
            log::error!("Error starting crawling process: {}", e);
            return Ok(error(500, "Error starting crawling process"));
        }
    };
    Ok(Response::json(&Message { message }))
}

// GET /status
pub fn status(app: &App) -> Result<Response, crate::robot::http::Error> {
    let (descriptions, pending, last_crawl) = app.runtime.block_on(async {
        let descriptions = app.store.description_count().await?;
        let pending = app.crawler.frontier().pending().await?;
        let last_crawl = app.crawler.last_report().await;
        Ok::<_, crate::robot::memory::Error>((descriptions, pending, last_crawl))
    })?;

    Ok(Response::json(&Status {
        status: if app.crawler.is_running() { "running" } else { "idle" },
        descriptions,
        pending,
        last_crawl,
    }))
}
