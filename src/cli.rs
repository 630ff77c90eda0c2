use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "archinv")]
#[command(about = "Collect hardware architecture inventory: disks, CPU, GPU and memory")]
pub struct Cli {
    #[command(flatten)]
    pub tools: ToolOverrides,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Explicit tool paths; each falls back to <kind>_lib / <KIND>_LIB in the
/// environment, then to the platform default.
#[derive(Args, Debug, Default)]
pub struct ToolOverrides {
    /// Disk tool (lsblk, diskutil or pwsh)
    #[arg(long, global = true, value_name = "PATH")]
    pub disk_lib: Option<PathBuf>,

    /// CPU source (/proc/cpuinfo, sysctl or wmic)
    #[arg(long, global = true, value_name = "PATH")]
    pub cpu_lib: Option<PathBuf>,

    /// GPU tool (lspci, system_profiler or wmic)
    #[arg(long, global = true, value_name = "PATH")]
    pub gpu_lib: Option<PathBuf>,

    /// Memory source (/proc/meminfo or sysctl)
    #[arg(long, global = true, value_name = "PATH")]
    pub mem_lib: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print physical disk information
    Disk {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Print the processor name and core counts
    Cpu {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Print GPU names and vendors
    Gpu {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Print memory usage in bytes
    Memory {
        /// Render sizes as human readable strings
        #[arg(long)]
        human: bool,

        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Print every inventory kind
    All {
        /// Output format (json, yaml, or pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Save the selected inventory kinds (all when none selected) to a JSON file
    Save {
        #[arg(long)]
        disk: bool,

        #[arg(long)]
        cpu: bool,

        #[arg(long)]
        gpu: bool,

        #[arg(long)]
        memory: bool,

        /// Output file, must end in .json [default: archinv_<timestamp>.json]
        #[arg(long)]
        filename: Option<PathBuf>,
    },
}
