//! Command-line parsing for the `vaccine-sim` binary.

use std::env;
use std::path::PathBuf;

/// Parsed CLI arguments.
#[derive(Debug, Default)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub tries: Option<usize>,
    /// JSON report destination.
    pub output: Option<PathBuf>,
    /// Per-trial CSV destination.
    pub trials_csv: Option<PathBuf>,
    pub help: bool,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

pub fn parse_args_from(args: &[String]) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --scenario (expected a TOML file path)")?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let value = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{value}\" is not a valid u64"))?;
                opts.seed = Some(seed);
            }
            "--tries" => {
                i += 1;
                let value = args.next_or_err(i, "missing value for --tries (expected a trial count)")?;
                let tries = value
                    .parse::<usize>()
                    .map_err(|_| format!("--tries value \"{value}\" is not a valid count"))?;
                opts.tries = Some(tries);
            }
            "--output" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --output (expected a file path)")?;
                opts.output = Some(PathBuf::from(path));
            }
            "--trials-csv" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --trials-csv (expected a file path)")?;
                opts.trials_csv = Some(PathBuf::from(path));
            }
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source".to_string(),
        );
    }
    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("vaccine-sim: Monte Carlo simulation of a vaccine pipeline and manufacturing");
    eprintln!();
    eprintln!("Usage: vaccine-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>     Load scenario from TOML config file");
    eprintln!("  --preset <name>       Use a built-in preset (baseline, optimistic, pessimistic)");
    eprintln!("  --seed <u64>          Override random seed");
    eprintln!("  --tries <n>           Override number of trials");
    eprintln!("  --output <path>       Write the run report as JSON");
    eprintln!("  --trials-csv <path>   Export per-trial completion months to CSV");
    eprintln!("  --help                Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity is read from VACCINE_SIM_LOG (e.g. VACCINE_SIM_LOG=debug).");
}
