//! goci CLI Entry Point
//!
//! Runs the CI pipeline for a Go project.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in Go pipeline
//! goci -p ./myproject
//!
//! # Run a pipeline described in YAML
//! goci -p ./myproject -c pipeline.yaml
//!
//! # Push a different branch
//! goci -p ./myproject -b main
//! ```
//!
//! Success messages go to stdout, one per step. Logs and errors go to
//! stderr. The exit code is non-zero on any failure or received signal.

use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use goci::pipeline::{default_pipeline, load_pipeline};
use goci::{Pipeline, PipelineError, APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    project: Option<PathBuf>,
    pipeline_path: Option<PathBuf>,
    branch: Option<String>,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: goci [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -p, --project DIR   Project directory the tools run in");
    println!("  -c, --config FILE   Pipeline description (YAML or JSON)");
    println!("  -b, --branch NAME   Branch appended to the push step");
    println!("  -v, --verbose       Enable debug logging");
    println!("  -h, --help          Show this help message");
    println!("  -V, --version       Show version information");
    println!();
    println!("Without --config, the built-in Go pipeline runs:");
    println!("  go build, go test, gofmt, golangci-lint, gocyclo, git push");
    println!();
    println!("Examples:");
    println!("  goci -p ./myproject");
    println!("  goci -p ./myproject -c pipeline.yaml -b main");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--project" | "-p" => {
                config.project = Some(PathBuf::from(next_value(args, &mut i, arg)?));
            }
            "--config" | "-c" => {
                config.pipeline_path = Some(PathBuf::from(next_value(args, &mut i, arg)?));
            }
            "--branch" | "-b" => {
                config.branch = Some(next_value(args, &mut i, arg)?.to_string());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                return Err(format!("Unexpected argument: {}", arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Returns the value following an option, advancing the cursor.
fn next_value<'a>(args: &'a [String], i: &mut usize, option: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", option))
}

/// Checks the project directory, if one was given.
fn check_project_directory(project: Option<&PathBuf>) -> Result<(), PipelineError> {
    let Some(dir) = project else {
        return Ok(());
    };

    if !dir.exists() {
        return Err(PipelineError::Validation(format!(
            "project directory does not exist: {}",
            dir.display()
        )));
    }

    if !dir.is_dir() {
        return Err(PipelineError::Validation(format!(
            "project path is not a directory: {}",
            dir.display()
        )));
    }

    info!("Project directory: {}", dir.display());
    Ok(())
}

/// Builds the pipeline from the config file, or the built-in one.
fn build_pipeline(config: &Config) -> Result<Pipeline, PipelineError> {
    check_project_directory(config.project.as_ref())?;

    let project = config.project.as_deref();
    let branch = config.branch.as_deref();

    match (&config.pipeline_path, project) {
        (Some(path), _) => load_pipeline(path, project, branch),
        (None, Some(project)) => default_pipeline(project, branch),
        (None, None) => Err(PipelineError::Validation(
            "project directory is required".to_string(),
        )),
    }
}

/// Main application entry point.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("{} {}", "Error:".red().bold(), e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    info!("{} v{}", APP_NAME, VERSION);

    let pipeline = build_pipeline(&config).map_err(|e| {
        error!("Failed to build pipeline: {}", e);
        e
    })?;

    info!("Pipeline ready: {} steps", pipeline.len());
    pipeline.run(io::stdout()).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
