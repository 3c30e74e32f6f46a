//! CLI bootstrap for the OSC<->SysEx bridge: parses arguments, configures
//! logging, and hands off to [`bridge::run`].

mod bridge;
mod cli;
mod device_map;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();

    let level = if cli.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new().filter_level(level).init();

    if let Err(e) = bridge::run(cli) {
        log::error!("[{}] {}: {}", e.kind.code(), e.context, e.message);
        std::process::exit(1);
    }
}
