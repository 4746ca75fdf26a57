// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

use rouille::Request;
use rouille::Response;

use crate::robot::http::api::error;
use crate::robot::http::App;
use crate::robot::services::search::SearchError;

// GET /search?query=<terms>&operator=<AND|OR>
pub fn handle(app: &App, request: &Request) -> Result<Response, crate::robot::http::Error> {
    let query = match request.get_param("query") {
        Some(query) if !query.trim().is_empty() => query,
        _ => return Ok(error(400, "Query parameter is required.")),
    };
    let operator = request.get_param("operator");

    match app.runtime.block_on(app.search.search(&query, operator.as_deref())) {
        Ok(outcome) => Ok(Response::json(&outcome)),
        Err(SearchError::Input(message)) => Ok(error(400, &message)),
        Err(SearchError::Persistence(e)) => {
            log::error!("Error executing query '{}': {}", query, e);
            Ok(error(500, "Database query failed."))
        }
    }
}
