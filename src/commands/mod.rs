pub mod hardware;

pub use hardware::handle_command;
