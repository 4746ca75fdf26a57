// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

// http.rs is the crawler's public surface
// runs on port :12348 unless ROBOT_HTTP_ADDRESS says otherwise

use rouille::Request;
use rouille::Response;
use std::sync::Arc;
use error_chain::error_chain;
error_chain! {
    foreign_links {
        Io(std::io::Error);
        Json(serde_json::Error);
        PostError(rouille::input::post::PostError);
        InternalServiceError(crate::robot::services::Error);
        RobotMemoryError(crate::robot::memory::Error);
    }
}

pub mod api;

use crate::robot::memory::{Config, StartMode, Store};
use crate::robot::services::census::Census;
use crate::robot::services::crawler::Crawler;
use crate::robot::services::fetcher::Fetcher;
use crate::robot::services::search::QueryEngine;

/// Everything a request handler needs. Handlers run on rouille's worker
/// threads and drive async services through `runtime`.
pub struct App {
    pub store: Arc<dyn Store>,
    pub crawler: Arc<Crawler>,
    pub search: QueryEngine,
    pub census: Census,
    pub start_mode: StartMode,
    pub runtime: tokio::runtime::Handle,
}

impl App {
    pub fn new(store: Arc<dyn Store>, fetcher: Arc<Fetcher>, config: &Config, runtime: tokio::runtime::Handle) -> App {
        App {
            crawler: Arc::new(Crawler::new(store.clone(), fetcher.clone(), config)),
            search: QueryEngine::new(store.clone(), fetcher.clone(), config),
            census: Census::new(store.clone(), fetcher),
            store,
            start_mode: config.start_mode,
            runtime,
        }
    }
}

pub fn handle(app: &App, request: &Request) -> Response {
    let response = match api::handle_api_request(app, request) {
        Ok(response) => response,
        Err(err) => {
            log::error!("HTTP_ERROR: {} {}: {}", request.method(), request.url(), err);
            api::error(500, "Internal server error.")
        }
    };
    response.with_additional_header("Access-Control-Allow-Origin", "*")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::memory::{KeywordRank, MemoryStore, PageDescription, UnavailableStore};
    use crate::robot::services::fetcher::testing::ScriptedStrategy;
    use crate::robot::services::fetcher::{RetryPolicy, Strategy};
    use serde_json::Value;
    use std::io::Read;
    use std::time::Duration;

    struct Harness {
        _runtime: tokio::runtime::Runtime,
        app: App,
    }

    impl Harness {
        fn new(store: Arc<dyn Store>, http: ScriptedStrategy) -> Harness {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            let strategies: Vec<Arc<dyn Strategy>> = vec![Arc::new(http)];
            let fetcher = Arc::new(Fetcher::new(strategies, RetryPolicy::immediate(1, Duration::from_secs(5))));
            let config = Config {
                workers: 2,
                start_mode: StartMode::Wait,
                ..Config::default()
            };
            let app = App::new(store, fetcher, &config, runtime.handle().clone());
            Harness { _runtime: runtime, app }
        }

        fn call(&self, request: Request) -> (u16, Value) {
            let response = handle(&self.app, &request);
            let status = response.status_code;
            let (mut reader, _) = response.data.into_reader_and_size();
            let mut body = String::new();
            reader.read_to_string(&mut body).unwrap();
            let json = if body.is_empty() { Value::Null } else { serde_json::from_str(&body).unwrap() };
            (status, json)
        }

        fn get(&self, url: &str) -> (u16, Value) {
            self.call(Request::fake_http("GET", url, vec![], vec![]))
        }

        fn post_json(&self, url: &str, body: &str) -> (u16, Value) {
            self.call(Request::fake_http(
                "POST",
                url,
                vec![("Content-Type".to_owned(), "application/json".to_owned())],
                body.as_bytes().to_vec(),
            ))
        }
    }

    fn seeded_store(runtime: &tokio::runtime::Runtime) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        runtime.block_on(async {
            for (url, description) in [("https://x.example/", "X shoes"), ("https://y.example/", "Y shoes")] {
                store
                    .upsert_description(&PageDescription::new(url.to_string(), description.to_string()))
                    .await
                    .unwrap();
            }
            store
                .upsert_ranks(&[
                    KeywordRank::new("https://y.example/".into(), "shoes".into(), 2),
                    KeywordRank::new("https://x.example/".into(), "shoes".into(), 5),
                ])
                .await
                .unwrap();
        });
        store
    }

    #[test]
    fn start_on_empty_frontier_then_search_finds_nothing() {
        let harness = Harness::new(Arc::new(MemoryStore::new()), ScriptedStrategy::new("http"));

        let (status, body) = harness.get("/start");
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Crawling process finished.");
        assert!(body.get("error").is_none());

        let (status, body) = harness.get("/search?query=anything");
        assert_eq!(status, 200);
        assert_eq!(body, serde_json::json!({"message": "no results"}));
    }

    #[test]
    fn search_orders_results_by_rank() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = seeded_store(&runtime);
        let harness = Harness::new(store, ScriptedStrategy::new("http"));

        let (status, body) = harness.get("/search?query=shoes&operator=OR");
        assert_eq!(status, 200);
        assert_eq!(body["query"], "shoes");
        let urls = body["urls"].as_array().unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0]["url"], "https://x.example/");
        assert_eq!(urls[0]["rank"], 5);
        assert_eq!(urls[0]["description"], "X shoes");
        assert_eq!(urls[1]["url"], "https://y.example/");
        assert_eq!(urls[1]["rank"], 2);
    }

    #[test]
    fn search_input_errors_are_400() {
        let harness = Harness::new(Arc::new(MemoryStore::new()), ScriptedStrategy::new("http"));

        let (status, body) = harness.get("/search");
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Query parameter is required.");

        let (status, _) = harness.get("/search?query=%20%20");
        assert_eq!(status, 400);

        let (status, body) = harness.get("/search?query=shoes&operator=XOR");
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().contains("XOR"));
    }

    #[test]
    fn store_outage_is_500_with_error_body() {
        let harness = Harness::new(Arc::new(UnavailableStore), ScriptedStrategy::new("http"));

        let (status, body) = harness.get("/start");
        assert_eq!(status, 500);
        assert_eq!(body["error"], "Error starting crawling process");

        let (status, body) = harness.get("/search?query=shoes");
        assert_eq!(status, 500);
        assert_eq!(body["error"], "Database query failed.");

        let (status, body) = harness.get("/status");
        assert_eq!(status, 500);
        assert!(body["error"].is_string());
    }

    #[test]
    fn status_reports_store_counts() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let store = seeded_store(&runtime);
        runtime.block_on(store.enqueue("pending.example")).unwrap();
        let harness = Harness::new(store, ScriptedStrategy::new("http"));

        let (status, body) = harness.get("/status");
        assert_eq!(status, 200);
        assert_eq!(body["status"], "idle");
        assert_eq!(body["descriptions"], 2);
        assert_eq!(body["pending"], 1);
    }

    #[test]
    fn parser_counts_tags() {
        let http = ScriptedStrategy::new("http")
            .page("https://www.tags.example/", "<html><head></head><body><p>a</p><p>b</p></body></html>");
        let harness = Harness::new(Arc::new(MemoryStore::new()), http);

        let (status, body) = harness.post_json("/parser", r#"{"url": "tags.example"}"#);
        assert_eq!(status, 200);
        assert_eq!(body, serde_json::json!({"uniqueCount": 4}));

        let form = harness.call(Request::fake_http(
            "POST",
            "/parser",
            vec![("Content-Type".to_owned(), "application/x-www-form-urlencoded".to_owned())],
            b"url=www.tags.example".to_vec(),
        ));
        assert_eq!(form, (200, serde_json::json!({"uniqueCount": 4})));

        let (status, body) = harness.post_json("/parser", "{}");
        assert_eq!(status, 400);
        assert_eq!(body["error"], "URL is required.");

        let (status, _) = harness.post_json("/parser", r#"{"url": "missing.example"}"#);
        assert_eq!(status, 502);
    }

    #[test]
    fn unknown_routes_are_404() {
        let harness = Harness::new(Arc::new(MemoryStore::new()), ScriptedStrategy::new("http"));
        let response = handle(&harness.app, &Request::fake_http("GET", "/nope", vec![], vec![]));
        assert_eq!(response.status_code, 404);
        let response = handle(&harness.app, &Request::fake_http("POST", "/start", vec![], vec![]));
        assert_eq!(response.status_code, 404);
    }
}
