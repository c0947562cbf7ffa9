//! slurm-workflow-build CLI Entry Point
//!
//! Provides command-line interface for building SLURM workflows.
//!
//! # Usage
//!
//! ```bash
//! # Build all scripts for a control file
//! slurm-workflow-build control.yaml
//!
//! # Choose the output root and log file
//! slurm-workflow-build -c control.yaml -o /scratch/runs -l build.log
//!
//! # Dry run mode (preview jobs, write nothing)
//! slurm-workflow-build control.yaml --dry-run
//!
//! # Fail on placeholders left unresolved
//! slurm-workflow-build control.yaml --strict
//! ```

use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info};

use slurm_workflow_utils::control::model::{OUTDIR_PLACEHOLDER, TIMESTAMP_PLACEHOLDER};
use slurm_workflow_utils::control::{load_control_file, ControlSpec};
use slurm_workflow_utils::emit::{default_outdir, default_timestamp, Builder};
use slurm_workflow_utils::layout::absolute_path;
use slurm_workflow_utils::lookup::{BoundedSubstitution, PlaceholderResolver};
use slurm_workflow_utils::{APP_NAME, VERSION};

/// Name of the binary, used in log file names.
const BIN_NAME: &str = "slurm-workflow-build";

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    control_file: Option<PathBuf>,
    outdir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    timestamp: Option<String>,
    dry_run: bool,
    strict: bool,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
///
/// Records go to `log_file` when given, stderr otherwise.
fn setup_logging(verbose: bool, log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "debug" } else { "info" };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format(|buf, record| {
        use std::io::Write;

        match record.level() {
            log::Level::Warn | log::Level::Error => {
                writeln!(buf, "[{}] {}", record.level(), record.args())
            }
            _ => writeln!(buf, "{}", record.args()),
        }
    });

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("SLURM Workflow Builder");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: {} [OPTIONS] --control-file <CONTROL_FILE>", BIN_NAME);
    println!();
    println!("Arguments:");
    println!("  [CONTROL_FILE]             Control file (alternative to --control-file)");
    println!();
    println!("Options:");
    println!("  -c, --control-file PATH    Path to the YAML control file (required)");
    println!("  -o, --outdir PATH          Output root (default: <temp>/<user>/slurm-workflow-utils)");
    println!("  -l, --log-file PATH        Log file (default: <outdir>/{}.<timestamp>.log)", BIN_NAME);
    println!("      --timestamp VALUE      Build timestamp (default: current time)");
    println!("      --dry-run              Preview jobs without writing any files");
    println!("      --strict               Fail on unresolved placeholders");
    println!("  -v, --verbose              Enable debug logging");
    println!("  -h, --help                 Show this help message");
    println!("  -V, --version              Show version information");
    println!();
    println!("Examples:");
    println!("  {} control.yaml", BIN_NAME);
    println!("  {} -c control.yaml --dry-run", BIN_NAME);
    println!("  {} -c control.yaml -o /scratch/runs -l build.log", BIN_NAME);
}

/// Reads the value following an option.
fn option_value<'a>(args: &'a [String], i: &mut usize, name: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", name))
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
            "--dry-run" => {
                config.dry_run = true;
            }
            "--strict" => {
                config.strict = true;
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--control-file" | "-c" => {
                let value = option_value(args, &mut i, arg)?;
                config.control_file = Some(PathBuf::from(value));
            }
            "--outdir" | "-o" => {
                let value = option_value(args, &mut i, arg)?;
                config.outdir = Some(PathBuf::from(value));
            }
            "--log-file" | "-l" => {
                let value = option_value(args, &mut i, arg)?;
                config.log_file = Some(PathBuf::from(value));
            }
            "--timestamp" => {
                let value = option_value(args, &mut i, arg)?;
                config.timestamp = Some(value.to_string());
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.control_file.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.control_file = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    if config.control_file.is_none() {
        return Err("Missing required parameter: --control-file".to_string());
    }

    Ok(config)
}

/// Output root and timestamp the build will use: CLI flag, then control
/// file, then default.
fn effective_settings(config: &Config, spec: &ControlSpec) -> (PathBuf, String) {
    let mut common = spec.common.clone();
    BoundedSubstitution::default().resolve(&mut common);

    let timestamp = config
        .timestamp
        .clone()
        .or_else(|| common.get(TIMESTAMP_PLACEHOLDER).cloned())
        .unwrap_or_else(default_timestamp);

    let outdir = config
        .outdir
        .clone()
        .or_else(|| common.get(OUTDIR_PLACEHOLDER).map(PathBuf::from))
        .unwrap_or_else(default_outdir);

    (outdir, timestamp)
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    let control_file = config
        .control_file
        .clone()
        .ok_or("Missing required parameter: --control-file")?;

    // Load control file
    let spec = load_control_file(&control_file).map_err(|e| {
        format!(
            "Could not load control file '{}': {}",
            control_file.display(),
            e
        )
    })?;

    let (outdir, timestamp) = effective_settings(&config, &spec);
    let outdir = absolute_path(&outdir)?;

    // Setup logging; dry runs write nothing, so they log to stderr
    let log_file = if config.dry_run {
        None
    } else {
        Some(config.log_file.clone().unwrap_or_else(|| {
            outdir.join(format!("{}.{}.log", BIN_NAME, timestamp))
        }))
    };
    setup_logging(config.verbose, log_file.as_deref())?;

    // Print banner
    print_banner();

    info!("{} v{}", APP_NAME, VERSION);
    info!("Control file: {}", control_file.display());
    info!("Output root: {}", outdir.display());
    info!("Timestamp: {}", timestamp);

    if config.dry_run {
        info!("Mode: DRY RUN (no files will be written)");
    }

    // Create and configure builder
    let mut builder = Builder::new(spec);
    builder.set_control_path(&control_file);
    builder.set_outdir(&outdir);
    builder.set_timestamp(&timestamp);
    builder.set_dry_run(config.dry_run);
    builder.set_strict(config.strict);

    if let Some(ref path) = log_file {
        builder.set_log_file(path);
    }

    // Build scripts
    let report = builder.run().map_err(|e| {
        error!("Build failed: {}", e);
        e
    })?;

    println!();
    if let Some(ref path) = log_file {
        println!("Log file: {}", path.display());
    }
    if let Some(ref manifest) = report.manifest {
        println!("Manifest: {}", manifest.display());
    }
    println!("Build complete: {} scripts generated", report.jobs.len());

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
