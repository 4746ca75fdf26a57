// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

//! Boolean keyword search over the persisted rank index, with quoted
//! phrases verified against live page content.

use thiserror::Error;

pub mod engine;
pub mod query;

pub use engine::{QueryEngine, SearchOutcome, SearchResult, NO_DESCRIPTION};
pub use query::{Operator, Query};

#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed or missing query input. Never retried.
    #[error("{0}")]
    Input(String),
    #[error("store unavailable: {0}")]
    Persistence(#[from] crate::robot::memory::Error),
}
