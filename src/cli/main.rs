//! Background removal CLI
//!
//! `bgremove <input_path> <output_path>`: one image in, one image out.
//! The run is a single linear sequence with early exits:
//! resolve capability → parse arguments → check input → read, remove, write.

use crate::{
    config::RemovalConfig,
    error::BgRemovalError,
    remover::{self, BackgroundRemover},
    tracing_config::TracingConfig,
};
use anyhow::Context;
use clap::Parser;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// One-line usage printed for any argument error
pub const USAGE: &str = "Usage: bgremove <input_path> <output_path>";

/// Background removal CLI tool
#[derive(Parser, Debug)]
#[command(name = "bgremove", disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Image to read
    #[arg(value_name = "INPUT_PATH", allow_hyphen_values = true)]
    pub input_path: PathBuf,

    /// Where to write the result (created or truncated)
    #[arg(value_name = "OUTPUT_PATH", allow_hyphen_values = true)]
    pub output_path: PathBuf,
}

impl Cli {
    /// Parse the raw argument vector, program name first
    ///
    /// Exactly two user arguments are required and both are taken verbatim,
    /// so `--` is counted like any other argument and can name a file.
    ///
    /// # Errors
    /// - [`ShellError::Usage`] for any other argument count
    pub fn from_args(args: Vec<OsString>) -> Result<Self, ShellError> {
        let [program, input_path, output_path]: [OsString; 3] =
            args.try_into().map_err(|args: Vec<OsString>| {
                debug!(count = args.len().saturating_sub(1), "Wrong number of arguments");
                ShellError::Usage
            })?;

        // Everything after the terminator is positional, including another `--`
        Self::try_parse_from([program, OsString::from("--"), input_path, output_path]).map_err(
            |e| {
                debug!(error = %e, "Argument parsing failed");
                ShellError::Usage
            },
        )
    }
}

/// Why a run ended unsuccessfully; every variant exits with status 1
#[derive(Debug, Error)]
pub enum ShellError {
    /// Configuration invalid or removal capability unavailable
    #[error("startup failed: {0}")]
    Startup(#[source] BgRemovalError),

    /// Wrong number of arguments
    #[error("invalid arguments")]
    Usage,

    /// Input path does not exist
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Read, removal or write failed; details were already reported
    #[error("background removal failed")]
    Transform,
}

impl ShellError {
    /// Print the user-facing message for this failure
    ///
    /// # Errors
    /// - Writing to `err` fails
    pub fn report(&self, err: &mut dyn Write) -> io::Result<()> {
        match self {
            Self::Startup(BgRemovalError::Unavailable { capability, remedy }) => {
                writeln!(err, "Error: Required capability not available: {capability}")?;
                writeln!(err, "Please install: {remedy}")
            },
            Self::Startup(other) => writeln!(err, "Error: {other}"),
            Self::Usage => writeln!(err, "{USAGE}"),
            Self::InputNotFound(path) => {
                writeln!(err, "Error: Input file not found: {}", path.display())
            },
            Self::Transform => Ok(()),
        }
    }
}

/// Entry point of the `bgremove` binary
pub fn main() -> ExitCode {
    if let Err(e) = TracingConfig::from_env().init() {
        eprintln!("Warning: failed to initialize tracing: {e:#}");
    }

    let mut out = io::stdout();
    let mut err = io::stderr();

    let resolve = || RemovalConfig::from_env().and_then(|config| remover::resolve(&config));

    match run(std::env::args_os(), resolve, &mut out, &mut err) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            debug!(%error, "Exiting with failure");
            let _ = error.report(&mut err);
            ExitCode::FAILURE
        },
    }
}

/// Run one invocation
///
/// `resolve` is called before anything else; argument and input checks only
/// happen once the capability is known to be usable.
///
/// # Errors
/// - [`ShellError::Startup`] when `resolve` fails
/// - [`ShellError::Usage`] when `args` (program name first) are not exactly two paths
/// - [`ShellError::InputNotFound`] when the input path does not exist
/// - [`ShellError::Transform`] when [`remove_background`] fails
pub fn run<I, T, R>(
    args: I,
    resolve: R,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), ShellError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    R: FnOnce() -> crate::error::Result<Box<dyn BackgroundRemover>>,
{
    let mut remover = resolve().map_err(ShellError::Startup)?;

    let cli = Cli::from_args(args.into_iter().map(Into::into).collect())?;

    if !cli.input_path.exists() {
        return Err(ShellError::InputNotFound(cli.input_path));
    }

    if remove_background(remover.as_mut(), &cli.input_path, &cli.output_path, out, err) {
        Ok(())
    } else {
        Err(ShellError::Transform)
    }
}

/// Read `input_path`, remove its background, write the result to `output_path`
///
/// Prints the success line to `out`, or the error detail followed by its full
/// cause chain to `err`. A failed write may leave a partial output file.
pub fn remove_background(
    remover: &mut dyn BackgroundRemover,
    input_path: &Path,
    output_path: &Path,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> bool {
    let start = Instant::now();
    match transform_file(remover, input_path, output_path) {
        Ok(written) => {
            info!(
                input = %input_path.display(),
                output = %output_path.display(),
                bytes = written,
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Background removed"
            );
            let _ = writeln!(
                out,
                "Background removed successfully: {}",
                output_path.display()
            );
            true
        },
        Err(error) => {
            let _ = writeln!(err, "Error removing background: {error:#}");
            let _ = writeln!(err, "{error:?}");
            false
        },
    }
}

fn transform_file(
    remover: &mut dyn BackgroundRemover,
    input_path: &Path,
    output_path: &Path,
) -> anyhow::Result<usize> {
    let input = fs::read(input_path)
        .with_context(|| format!("Failed to read input file '{}'", input_path.display()))?;
    debug!(bytes = input.len(), "Read input");

    let output = remover
        .remove(&input)
        .with_context(|| format!("Failed to process '{}'", input_path.display()))?;

    fs::write(output_path, &output)
        .with_context(|| format!("Failed to write output file '{}'", output_path.display()))?;
    Ok(output.len())
}
