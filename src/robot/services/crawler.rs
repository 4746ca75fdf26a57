// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Crawler service module.
//!
//! Re-exports the frontier handle and the crawl loop.

pub mod frontier;
pub mod runner;

pub use frontier::Frontier;
pub use runner::{CrawlReport, Crawler, Start, StopReason, WorkerState};
