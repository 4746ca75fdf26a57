// ███████     █████     ███    ███
// ██         ██   ██    ████  ████
// ███████    ███████    ██ ████ ██
//      ██    ██   ██    ██  ██  ██
// ███████ ██ ██   ██ ██ ██      ██ ██
// Copyright 2021-2026 The Open Sam Foundation (OSF)
// Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)
// Licensed under GPLv3....see LICENSE file.

pub mod http;
pub mod memory;
pub mod services;
pub mod tools;

pub fn print_banner(config: &memory::Config) {
    println!("███████     █████     ███    ███    ");
    println!("██         ██   ██    ████  ████    ");
    println!("███████    ███████    ██ ████ ██    ");
    println!("     ██    ██   ██    ██  ██  ██    ");
    println!("███████ ██ ██   ██ ██ ██      ██ ██ ");
    println!("Search Robot: crawler + keyword search");
    println!("VERSION: {}", config.version_installed);
    println!("Copyright 2021-2026 The Open Sam Foundation (OSF)");
    println!("Developed by Caleb Mitchell Smith (ktheindifferent, PixelCoda, p0indexter)");
    println!("Licensed under GPLv3....see LICENSE file.");
    println!("================================================");
    println!("Store: {:?}  Listening on: {}", config.store, config.http_address);
    println!("Workers: {}  Threshold: {}  Strategies: {}", config.workers, config.threshold, config.strategies.join(","));
    println!("================================================");
}
