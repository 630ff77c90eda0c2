mod cli;
mod commands;
mod hardware;
mod output;

use clap::Parser;
use cli::{Cli, ToolOverrides};
use commands::handle_command;
use hardware::{Collector, InventoryConfig, ToolKind};
use output::print_error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // RUST_LOG wins over -v
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    // stdout carries the inventory itself
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn apply_overrides(config: InventoryConfig, tools: &ToolOverrides) -> InventoryConfig {
    config
        .with_override(ToolKind::Disk, tools.disk_lib.clone())
        .with_override(ToolKind::Cpu, tools.cpu_lib.clone())
        .with_override(ToolKind::Gpu, tools.gpu_lib.clone())
        .with_override(ToolKind::Memory, tools.mem_lib.clone())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match InventoryConfig::detect() {
        Ok(config) => apply_overrides(config, &cli.tools),
        Err(e) => {
            print_error(&e.to_string());
            std::process::exit(1);
        }
    };

    let collector = Collector::new(config);
    if let Err(e) = handle_command(&collector, &cli.command) {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
