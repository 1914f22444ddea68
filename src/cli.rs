use std::env;
use std::path::PathBuf;

use appliance_loadgen::io::export::CsvFormat;

pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub overrides: Option<PathBuf>,
    pub seed: Option<u64>,
    pub patterns_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub format: CsvFormat,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_options(&args)
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut i = 0usize;
    let mut opts = CliOptions {
        scenario: None,
        preset: None,
        overrides: None,
        seed: None,
        patterns_dir: None,
        out_dir: None,
        format: CsvFormat::default(),
    };

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args
                    .next_or_err(i, "missing value for --scenario (expected a TOML file path)")?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args
                    .next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--overrides" => {
                i += 1;
                let path = args
                    .next_or_err(i, "missing value for --overrides (expected a JSON file path)")?;
                if opts.overrides.replace(PathBuf::from(path)).is_some() {
                    return Err("--overrides provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                opts.seed = Some(seed);
            }
            "--patterns-dir" => {
                i += 1;
                let path = args
                    .next_or_err(i, "missing value for --patterns-dir (expected a directory)")?;
                opts.patterns_dir = Some(PathBuf::from(path));
            }
            "--out-dir" => {
                i += 1;
                let path = args
                    .next_or_err(i, "missing value for --out-dir (expected a directory)")?;
                opts.out_dir = Some(PathBuf::from(path));
            }
            "--format" => {
                i += 1;
                let raw = args
                    .next_or_err(i, "missing value for --format (expected player or table)")?;
                opts.format = raw.parse().map_err(|e| format!("{e}"))?;
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
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
    eprintln!("appliance-loadgen: synthetic appliance consumption generator");
    eprintln!();
    eprintln!("Usage: appliance-loadgen [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, heavy_use)");
    eprintln!("  --overrides <path>       JSON object of per-appliance overrides");
    eprintln!("  --seed <u64>             Override the scenario seed");
    eprintln!("  --patterns-dir <dir>     Override simulation.patterns_dir");
    eprintln!("  --out-dir <dir>          Write <appliance>_consumption.csv files here");
    eprintln!("  --format <player|table>  CSV layout (default: player)");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=debug) to control log output.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn supports_scenario_cli() {
        let opts = parse_options(&args(&["--scenario", "scenario.toml"]))
            .expect("parse should succeed");
        assert_eq!(
            opts.scenario.as_deref().and_then(|p| p.to_str()),
            Some("scenario.toml")
        );
        assert!(opts.preset.is_none());
        assert_eq!(opts.format, CsvFormat::Player);
    }

    #[test]
    fn supports_full_option_set() {
        let opts = parse_options(&args(&[
            "--preset",
            "heavy_use",
            "--seed",
            "7",
            "--out-dir",
            "out",
            "--format",
            "table",
            "--overrides",
            "o.json",
        ]))
        .expect("parse should succeed");
        assert_eq!(opts.preset.as_deref(), Some("heavy_use"));
        assert_eq!(opts.seed, Some(7));
        assert_eq!(opts.format, CsvFormat::Table);
        assert!(opts.out_dir.is_some() && opts.overrides.is_some());
    }

    #[test]
    fn rejects_conflicting_and_malformed_args() {
        assert!(parse_options(&args(&["--scenario", "a.toml", "--preset", "baseline"])).is_err());
        assert!(parse_options(&args(&["--seed", "abc"])).is_err());
        assert!(parse_options(&args(&["--format", "xlsx"])).is_err());
        assert!(parse_options(&args(&["--seed"])).is_err());
        assert!(parse_options(&args(&["--bogus"])).is_err());
    }
}
