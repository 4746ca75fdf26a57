pub mod census;
pub mod crawl;
pub mod search;

use rouille::Request;
use rouille::Response;

use crate::robot::http::App;

/// `{"error": message}` with the given status.
pub fn error(status: u16, message: &str) -> Response {
    Response::json(&serde_json::json!({ "error": message })).with_status_code(status)
}

pub fn handle_api_request(app: &App, request: &Request) -> Result<Response, crate::robot::http::Error> {

    if request.url() == "/start" && request.method() == "GET" {
        return crawl::start(app);
    }

    if request.url() == "/status" && request.method() == "GET" {
        return crawl::status(app);
    }

    if request.url() == "/search" && request.method() == "GET" {
        return search::handle(app, request);
    }

    if request.url() == "/parser" && request.method() == "POST" {
        return census::handle(app, request);
    }

    Ok(Response::empty_404())
}
