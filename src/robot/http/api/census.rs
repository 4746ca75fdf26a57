// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use rouille::post_input;
use rouille::Request;
use rouille::Response;
use serde::Deserialize;

use crate::robot::http::api::error;
use crate::robot::http::App;
use crate::robot::services::census::CensusError;

#[derive(Deserialize)]
struct ParserInput {
    url: Option<String>,
}

// POST /parser with {url} as JSON or as a form
pub fn handle(app: &App, request: &Request) -> Result<Response, crate::robot::http::Error> {
    let is_json = request
        .header("Content-Type")
        .map_or(false, |ct| ct.to_lowercase().starts_with("application/json"));

    let url = if is_json {
        match rouille::input::json_input::<ParserInput>(request) {
            Ok(input) => input.url,
            Err(e) => {
                log::warn!("Rejected /parser body: {}", e);
                None
            }
        }
    } else {
        post_input!(request, {
            url: Option<String>,
        })?
        .url
    };

    let url = match url {
        Some(url) if !url.trim().is_empty() => url,
        _ => return Ok(error(400, &CensusError::MissingUrl.to_string())),
    };

    match app.runtime.block_on(app.census.run(&url)) {
        Ok(report) => Ok(Response::json(&serde_json::json!({ "uniqueCount": report.unique_count }))),
        Err(CensusError::MissingUrl) => Ok(error(400, &CensusError::MissingUrl.to_string())),
        Err(e @ CensusError::Fetch { .. }) => {
            log::warn!("Tag census failed: {}", e);
            Ok(error(502, &e.to_string()))
        }
        Err(CensusError::Persistence(e)) => {
            log::error!("Tag census could not be stored: {}", e);
            Ok(error(500, "Database query failed."))
        }
    }
}
