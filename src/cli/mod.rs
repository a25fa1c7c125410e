pub mod app;
pub mod commands;

pub use app::{Cli, Commands, SheetArgs};
