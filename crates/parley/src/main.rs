// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - the coordination core of a desktop chat client.
//!
//! This is the binary entry point: a headless demo session and
//! configuration tooling.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod demo;
mod loopback;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use parley_config::ParleyConfig;

use crate::demo::DemoOptions;

/// Parley - the coordination core of a desktop chat client.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a headless session against an in-process loopback backend.
    Demo {
        /// Number of messages to send.
        #[arg(long, default_value_t = 6)]
        messages: usize,
        /// Refuse every n-th send (0 never refuses).
        #[arg(long, default_value_t = 0)]
        fail_every: u64,
        /// Simulated backend latency in milliseconds.
        #[arg(long, default_value_t = 40)]
        latency_ms: u64,
    },
    /// Print the effective configuration.
    Config,
}

fn load_config(path: Option<&std::path::Path>) -> ParleyConfig {
    let loaded = match path {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config_path.as_deref());

    match cli.command {
        Some(Commands::Demo {
            messages,
            fail_every,
            latency_ms,
        }) => {
            init_tracing(&config.logging.level);
            let options = DemoOptions {
                messages,
                fail_every,
                latency: Duration::from_millis(latency_ms),
            };
            match demo::run(&config, &options) {
                Ok(report) => println!("{report}"),
                Err(err) => {
                    eprintln!("parley demo: {}", err.humanize());
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(text) => print!("{text}"),
            Err(err) => {
                eprintln!("parley config: failed to render configuration: {err}");
                std::process::exit(1);
            }
        },
        None => {
            println!("parley: use --help for available commands");
        }
    }
}

/// Logs go to stderr so the demo report on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}
