//! Vaccine pipeline simulator entry point: CLI wiring, config loading and export.

use std::process;

use tracing::error;
use vaccine_sim::cli::{parse_args, print_usage};
use vaccine_sim::config::ScenarioConfig;
use vaccine_sim::error::SimError;
use vaccine_sim::io::export::{export_report_json, export_trials_csv};
use vaccine_sim::logging::init_tracing;
use vaccine_sim::sim::engine::Simulation;

fn main() {
    init_tracing();

    let cli = match parse_args() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            print_usage();
            process::exit(1);
        }
    };
    if cli.help {
        print_usage();
        process::exit(0);
    }

    // --scenario takes priority, then --preset, then the baseline default
    let loaded = if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(tries) = cli.tries {
        scenario.simulation.tries = tries;
    }

    let simulation = match Simulation::new(scenario) {
        Ok(sim) => sim,
        Err(SimError::InvalidConfig(errors)) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let result = match simulation.run() {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "simulation failed");
            eprintln!("error: {e}");
            process::exit(2);
        }
    };

    println!("{}", result.report);

    if let Some(ref path) = cli.output {
        if let Err(e) = export_report_json(&result.report, path) {
            eprintln!("error: failed to write report: {e}");
            process::exit(1);
        }
        eprintln!("Report written to {}", path.display());
    }
    if let Some(ref path) = cli.trials_csv {
        if let Err(e) = export_trials_csv(&result.trial_rows, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Trial table written to {}", path.display());
    }
}
