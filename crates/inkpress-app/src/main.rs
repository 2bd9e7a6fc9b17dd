//! Main application entry point.

use clap::Parser;
use inkpress_app::Cli;

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("Running {:?}", cli.command);

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = inkpress_app::run(&cli, &mut stdout) {
        log::error!("{e}");
        eprintln!("inkpress: {e}");
        std::process::exit(1);
    }
}
