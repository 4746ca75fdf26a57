// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.
use error_chain::error_chain;
error_chain! {
    foreign_links {
        Io(std::io::Error);
        RobotMemoryError(crate::robot::memory::Error);
        Fetch(crate::robot::services::fetcher::FetchError);
    }

    errors {
        Other(msg: String) {
            description("Other error")
            display("{}", msg)
        }
    }
}

pub mod census;
pub mod crawler;
pub mod extractor;
pub mod fetcher;
pub mod indexer;
pub mod search;
