// Hardware inventory collection modules
pub mod collector;
pub mod command;
pub mod error;
pub mod linux;
pub mod macos;
pub mod platform;
pub mod types;
pub mod units;
pub mod windows;

// Re-export main collection entry points
pub use collector::{collect_full_inventory, Collector, ALL_KINDS};
pub use platform::{InventoryConfig, ToolKind};
