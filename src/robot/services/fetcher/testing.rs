// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Offline [`Strategy`] that serves canned pages.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::robot::services::fetcher::{FetchError, Strategy};

pub struct ScriptedStrategy {
    name: String,
    pages: HashMap<String, String>,
    // url -> remaining failures (usize::MAX = forever)
    failures: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    slow: HashMap<String, Duration>,
    attempts: AtomicUsize,
}

impl ScriptedStrategy {
    pub fn new(name: &str) -> ScriptedStrategy {
        ScriptedStrategy {
            name: name.to_string(),
            pages: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            delay: None,
            slow: HashMap::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Serves `html` for `url`. Urls are compared after parsing, so
    /// `https://a.com` and `https://a.com/` are the same page.
    pub fn page(mut self, url: &str, html: &str) -> ScriptedStrategy {
        self.pages.insert(normalise(url), html.to_string());
        self
    }

    pub fn fail_times(self, url: &str, times: usize) -> ScriptedStrategy {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(normalise(url), times);
        }
        self
    }

    pub fn fail_always(self, url: &str) -> ScriptedStrategy {
        self.fail_times(url, usize::MAX)
    }

    pub fn delay(mut self, delay: Duration) -> ScriptedStrategy {
        self.delay = Some(delay);
        self
    }

    /// Delays only `url`, overriding [`ScriptedStrategy::delay`].
    pub fn slow(mut self, url: &str, delay: Duration) -> ScriptedStrategy {
        self.slow.insert(normalise(url), delay);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

fn normalise(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let key = url.to_string();
        if let Some(delay) = self.slow.get(&key).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }

        let failing = match self.failures.lock() {
            Ok(mut failures) => match failures.get_mut(&key) {
                Some(0) | None => false,
                Some(left) => {
                    if *left != usize::MAX {
                        *left -= 1;
                    }
                    true
                }
            },
            Err(_) => false,
        };
        if failing {
            return Err(FetchError::Status(503));
        }

        self.pages.get(&key).cloned().ok_or(FetchError::Status(404))
    }
}
