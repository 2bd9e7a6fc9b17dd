//! Inkpress Application
//!
//! Headless command-line shell over the editor session: inspect designs,
//! export them to PNG and import SVG artwork.

mod cli;
mod commands;

pub use cli::{Cli, Command};
pub use commands::{AppError, AppResult, run};
