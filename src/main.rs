//! tablog - write JSON Lines records to a growing CSV file
//!
//! Reads JSON Lines from `--input` (or stdin). Object lines become CSV rows;
//! string lines are logged as messages. New keys grow the CSV header and
//! earlier rows are rewritten with blank cells for them.
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Configuration/argument error |
//! | 3 | File I/O error or corrupt output file |
//! | 4 | Runtime error |

use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tablog::cli::Args;
use tablog::csv_output::CsvOutput;
use tablog::error::TablogError;
use tablog::jsonl;

/// Exit code for success
const EXIT_SUCCESS: u8 = 0;
/// Exit code for configuration/argument errors
const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for file I/O errors
const EXIT_IO_ERROR: u8 = 3;
/// Exit code for runtime errors
const EXIT_RUNTIME_ERROR: u8 = 4;

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = args.validate() {
        eprintln!("Error: Configuration error: {}", e);
        eprintln!("  Hint: Use --help for usage information");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    match run(&args) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            error!("{}", e);
            ExitCode::from(error_to_exit_code(&e))
        }
    }
}

fn run(args: &Args) -> Result<(), TablogError> {
    let config = args.output_config()?;
    config.validate()?;
    info!(path = %config.path.display(), columns = config.columns.len(), "opening CSV output");

    let mut output = CsvOutput::from_config(&config)?;

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stats = jsonl::feed(reader, &mut output)?;
    output.close()?;

    info!(columns = output.schema().len(), "finished: {}", stats);
    Ok(())
}

fn error_to_exit_code(error: &TablogError) -> u8 {
    match error {
        TablogError::InvalidArgument(_) => EXIT_CONFIG_ERROR,
        TablogError::Json(_) => EXIT_CONFIG_ERROR,
        TablogError::Io(_) => EXIT_IO_ERROR,
        TablogError::Csv(_) => EXIT_IO_ERROR,
        TablogError::CorruptState(_) => EXIT_IO_ERROR,
        TablogError::InvalidInputKind(_) => EXIT_RUNTIME_ERROR,
        TablogError::Closed => EXIT_RUNTIME_ERROR,
    }
}
