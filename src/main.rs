//! # photo-catalog CLI
//!
//! ## Usage
//! ```bash
//! photo-catalog add ~/Pictures/kettle.jpg --tag kitchen
//! photo-catalog search ~/Downloads/what-is-this.jpg
//! ```

mod cli;

use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    photo_catalog::init_tracing();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            eprintln!("  {} {}", e.user_message(), style(format!("[{}]", e.code())).dim());
            ExitCode::FAILURE
        }
    }
}
