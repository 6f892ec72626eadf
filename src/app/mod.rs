//! Application orchestration module

pub mod execution;
pub mod initialization;

pub use execution::{process_input, render_report, run, LineMessage, LineStats, LineTotals, RunReport};
pub use initialization::{configure_logging, load_configuration, worker_config, WORKER_NAME};
