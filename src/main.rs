use active_object::{app, cli, logging};
use anyhow::Result;
use log::warn;
use std::process;
use std::time::Duration;

/// Time allowed for the log writer to drain at exit
const LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

fn main() {
    if let Err(e) = run() {
        // The logger is gone by now; report directly
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::parse_args();

    cli::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    let logger = logging::init_logger(log_config)?;

    let result = app::run(&args, &config_manager)
        .and_then(|report| app::render_report(&report, args.json));

    // A run error is reported by main alone, after the log has drained
    if !logger.shutdown(LOG_DRAIN_TIMEOUT) {
        warn!("Log writer did not drain within {}ms", LOG_DRAIN_TIMEOUT.as_millis());
    }

    print!("{}", result?);
    Ok(())
}
