//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inkpress print editor, headless shell.
#[derive(Debug, Parser)]
#[command(name = "inkpress", version, about)]
pub struct Cli {
    /// Editor configuration file (JSON). Defaults apply when omitted.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print page boxes and layers of a design.
    Info {
        /// Design document (JSON).
        design: PathBuf,
    },
    /// Render a design to PNG.
    Export {
        design: PathBuf,
        /// Output PNG file.
        #[arg(short, long)]
        output: PathBuf,
        /// Output px per display px.
        #[arg(long, conflicts_with = "print")]
        multiplier: Option<f64>,
        /// Export at the page's print DPI.
        #[arg(long)]
        print: bool,
    },
    /// Add SVG artwork to a design and save the result.
    ImportSvg {
        design: PathBuf,
        /// SVG file to import.
        svg: PathBuf,
        /// Output design document.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Create an empty design.
    New {
        /// Output design document.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "Untitled")]
        name: String,
        #[arg(long)]
        width_mm: f64,
        #[arg(long)]
        height_mm: f64,
        #[arg(long, default_value_t = 3.0)]
        bleed_mm: f64,
        #[arg(long, default_value_t = 3.0)]
        safe_mm: f64,
        #[arg(long, default_value_t = 300.0)]
        dpi: f64,
    },
}
