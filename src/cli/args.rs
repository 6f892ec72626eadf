use clap::Parser;
use anyhow::Result;
use std::path::PathBuf;
use log::debug;

/// Stream text through an active object and report line statistics
#[derive(Parser, Debug)]
#[command(name = "aobj")]
#[command(about = "Counts lines, words and bytes on a dedicated active object worker thread")]
#[command(version)]
pub struct Args {
    /// Input file (defaults to stdin)
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Queue capacity of the worker (overrides the configuration file)
    #[arg(short = 'c', long = "capacity", value_name = "N")]
    pub capacity: Option<usize>,

    /// Drop lines instead of waiting when the worker queue is full
    #[arg(long = "reject-when-full")]
    pub reject_when_full: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT")]
    pub log_format: Option<String>,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    if let Some(format) = &args.log_format {
        match format.to_lowercase().as_str() {
            "text" | "json" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Valid options: text, json", format
            )),
        }
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace", level
            )),
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    if args.capacity == Some(0) {
        return Err(anyhow::anyhow!("--capacity must be at least 1"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create Args with default values for testing
    fn create_test_args() -> Args {
        Args {
            input: None,
            capacity: None,
            reject_when_full: false,
            json: false,
            verbose: false,
            quiet: false,
            debug: false,
            log_format: None,
            log_file: None,
            log_file_level: None,
            config_file: None,
            config_name: None,
        }
    }

    #[test]
    fn test_args_parsing_from_command_line() {
        let args = Args::try_parse_from([
            "aobj", "--input", "notes.txt", "--capacity", "16", "--reject-when-full", "--json",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("notes.txt")));
        assert_eq!(args.capacity, Some(16));
        assert!(args.reject_when_full);
        assert!(args.json);
        assert!(args.log_format.is_none());
    }

    #[test]
    fn test_validate_args_success() {
        let args = Args {
            verbose: true,
            log_format: Some("json".to_string()),
            ..create_test_args()
        };
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_conflicting_flags() {
        let args = Args {
            verbose: true,
            quiet: true,
            ..create_test_args()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_invalid_format() {
        let args = Args {
            log_format: Some("xml".to_string()),
            ..create_test_args()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_file_level_without_file() {
        let args = Args {
            log_file_level: Some("debug".to_string()),
            ..create_test_args()
        };
        assert!(validate_args(&args).is_err());

        let args = Args {
            log_file_level: Some("debug".to_string()),
            log_file: Some(PathBuf::from("aobj.log")),
            ..create_test_args()
        };
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_zero_capacity() {
        let args = Args {
            capacity: Some(0),
            ..create_test_args()
        };
        assert!(validate_args(&args).is_err());
    }
}
