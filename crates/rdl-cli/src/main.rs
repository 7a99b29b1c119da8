use rdl_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    // Log to the state file when possible; a read-only home must not stop a download.
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("log file unavailable ({:#}), logging to stderr", e);
    }

    if let Err(err) = Cli::run_from_args() {
        eprintln!("rdl error: {:#}", err);
        std::process::exit(1);
    }
}
