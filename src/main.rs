//! Appliance load generator entry point: CLI wiring and config-driven generation.

mod cli;

use std::fs;
use std::process;

use tracing_subscriber::EnvFilter;

use appliance_loadgen::config::ScenarioConfig;
use appliance_loadgen::generate_scenario;
use appliance_loadgen::io::export::export_csv;
use appliance_loadgen::pattern::PatternStore;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        cli::print_usage();
        process::exit(1);
    });

    // Load config: --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(ref path) = cli.overrides {
        let applied = fs::read_to_string(path)
            .map_err(|e| format!("cannot read \"{}\": {e}", path.display()))
            .and_then(|json| scenario.apply_overrides_json(&json).map_err(|e| e.to_string()));
        if let Err(e) = applied {
            eprintln!("{e}");
            process::exit(1);
        }
    }
    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(ref dir) = cli.patterns_dir {
        scenario.simulation.patterns_dir = dir.display().to_string();
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let store = PatternStore::new(&scenario.simulation.patterns_dir);
    let output = generate_scenario(&scenario, &store);

    for appliance in &output.appliances {
        println!("{appliance}");
    }

    if let Some(ref dir) = cli.out_dir {
        for appliance in &output.appliances {
            match export_csv(&appliance.series, appliance.name(), dir, cli.format) {
                Ok(path) => eprintln!("Series written to {}", path.display()),
                Err(e) => {
                    eprintln!("error: failed to write CSV: {e}");
                    process::exit(1);
                }
            }
        }
    }

    if !output.is_ok() {
        for e in &output.errors {
            eprintln!("error: {e}");
        }
        process::exit(1);
    }
}
