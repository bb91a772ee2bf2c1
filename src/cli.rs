use std::error::Error as _;
use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::combat::{
    build_fleets, run_scenario, CombatEvent, OutcomeReport, ScenarioRun, SimulationConfig,
    TraceMode,
};
use crate::data::registry::ShipRegistry;
use crate::data::scenario::load_scenario;
use crate::data::validate::{validate_stats_table, ValidationSeverity};
use crate::error::Error;
use crate::parallel::{run_batch, BatchSummary, WorkerPool};

const USAGE: &str = "usage: broadside <simulate|batch|ships|validate>";
const DEFAULT_BATCH_RUNS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Simulate,
    Batch,
    Ships,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("simulate") => Some(Command::Simulate),
        Some("batch") => Some(Command::Batch),
        Some("ships") => Some(Command::Ships),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Batch) => handle_batch(args),
        Some(Command::Ships) => handle_ships(args),
        Some(Command::Validate) => handle_validate(args),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

/// Flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &["--seed", "--max-rounds"];

/// Positional arguments after the command name, skipping flags and their values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter().skip(2);
    while let Some(arg) = iter.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            iter.next();
        } else if !arg.starts_with("--") {
            out.push(arg.as_str());
        }
    }
    out
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

/// `--seed` and `--max-rounds`; these win over scenario rules.
fn cli_overrides(args: &[String]) -> (Option<u64>, Option<u32>) {
    let seed = flag_value(args, "--seed").and_then(|raw| parse_arg::<u64>(raw, "seed"));
    let max_rounds =
        flag_value(args, "--max-rounds").and_then(|raw| parse_arg::<u32>(raw, "max-rounds"));
    (seed, max_rounds)
}

fn apply_overrides(config: SimulationConfig, args: &[String]) -> SimulationConfig {
    let (seed, max_rounds) = cli_overrides(args);
    SimulationConfig {
        seed: seed.unwrap_or(config.seed),
        max_rounds: max_rounds.unwrap_or(config.max_rounds),
        ..config
    }
}

fn parse_arg<T: std::str::FromStr>(raw: &str, name: &str) -> Option<T> {
    let parsed = raw.parse::<T>().ok();
    if parsed.is_none() {
        eprintln!("invalid {name} '{raw}', ignoring");
    }
    parsed
}

fn report_error(context: &str, err: &Error) -> i32 {
    let mut msg = format!("{context}: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(&mut msg, "\n  caused by: {cause}");
        source = cause.source();
    }
    eprintln!("{msg}");
    1
}

fn print_json<T: Serialize>(value: &T, what: &str) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize {what}: {err}");
            1
        }
    }
}

#[derive(Serialize)]
struct TracedReport<'a> {
    report: &'a OutcomeReport,
    events: &'a [CombatEvent],
}

fn simulate_from_paths(
    stats_path: &Path,
    scenario_path: &Path,
    args: &[String],
    trace_mode: TraceMode,
) -> Result<ScenarioRun, Error> {
    let registry = ShipRegistry::load_path(stats_path)?;
    let mut scenario = load_scenario(scenario_path)?;
    let (seed, max_rounds) = cli_overrides(args);
    scenario.rules.seed = seed.or(scenario.rules.seed);
    scenario.rules.max_rounds = max_rounds.or(scenario.rules.max_rounds);
    let base = SimulationConfig {
        trace_mode,
        ..SimulationConfig::default()
    };
    run_scenario(&registry, &scenario, base)
}

fn handle_simulate(args: &[String]) -> i32 {
    let positional = positionals(args);
    let [stats_path, scenario_path] = positional.as_slice() else {
        eprintln!("usage: broadside simulate <stats.csv> <scenario.yaml|json> [--seed N] [--max-rounds N] [--table] [--trace]");
        return 2;
    };
    let as_table = has_flag(args, "--table");
    let traced = has_flag(args, "--trace");
    let trace_mode = if traced { TraceMode::Events } else { TraceMode::Off };

    let run = match simulate_from_paths(
        Path::new(stats_path),
        Path::new(scenario_path),
        args,
        trace_mode,
    ) {
        Ok(run) => run,
        Err(err) => return report_error("simulation failed", &err),
    };

    if as_table {
        print!("{}", render_table(&run.report));
        0
    } else if traced {
        print_json(
            &TracedReport {
                report: &run.report,
                events: &run.events,
            },
            "simulation result",
        )
    } else {
        print_json(&run.report, "simulation result")
    }
}

fn batch_from_paths(
    stats_path: &Path,
    scenario_path: &Path,
    runs: usize,
    args: &[String],
) -> Result<BatchSummary, Error> {
    let registry = ShipRegistry::load_path(stats_path)?;
    let scenario = load_scenario(scenario_path)?;
    let config = apply_overrides(scenario.apply_rules(SimulationConfig::default())?, args);
    let fleets = build_fleets(&scenario, &registry)?;
    run_batch(&fleets, config, runs, &WorkerPool::from_env())
}

fn handle_batch(args: &[String]) -> i32 {
    let positional = positionals(args);
    let (stats_path, scenario_path, runs) = match positional.as_slice() {
        [stats, scenario] => (*stats, *scenario, DEFAULT_BATCH_RUNS),
        [stats, scenario, runs] => match runs.parse::<usize>() {
            Ok(runs) => (*stats, *scenario, runs),
            Err(_) => {
                eprintln!("invalid runs '{runs}'");
                return 2;
            }
        },
        _ => {
            eprintln!("usage: broadside batch <stats.csv> <scenario.yaml|json> [runs] [--seed N] [--max-rounds N]");
            return 2;
        }
    };

    match batch_from_paths(Path::new(stats_path), Path::new(scenario_path), runs, args) {
        Ok(summary) => print_json(&summary, "batch summary"),
        Err(err) => report_error("batch failed", &err),
    }
}

fn handle_ships(args: &[String]) -> i32 {
    let Some(path) = positionals(args).first().copied() else {
        eprintln!("usage: broadside ships <stats.csv>");
        return 2;
    };

    match ShipRegistry::load_path(path) {
        Ok(registry) => {
            println!("name\tattack\tdefense\thit_points\tspeed");
            for ship in registry.ships() {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    ship.name, ship.attack, ship.defense, ship.hit_points, ship.speed
                );
            }
            0
        }
        Err(err) => report_error("unable to load ships", &Error::from(err)),
    }
}

fn handle_validate(args: &[String]) -> i32 {
    let Some(path) = positionals(args).first().copied() else {
        eprintln!("usage: broadside validate <stats.csv>");
        return 2;
    };

    match validate_stats_table(path) {
        Ok(report) => {
            for diag in &report.diagnostics {
                eprintln!("- {diag}");
            }
            if report.has_errors() {
                eprintln!(
                    "validation failed: {} error(s), {} warning(s)",
                    report.count(ValidationSeverity::Error),
                    report.count(ValidationSeverity::Warning)
                );
                1
            } else {
                println!(
                    "validation passed: {path} ({} rows, {} warning(s))",
                    report.rows_checked,
                    report.count(ValidationSeverity::Warning)
                );
                0
            }
        }
        Err(err) => report_error("validation failed", &Error::from(err)),
    }
}

/// Tab-separated rendering: a summary line, then one line per unit.
pub fn render_table(report: &OutcomeReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "winner\trounds");
    let _ = writeln!(out, "{}\t{}", report.winner, report.rounds);
    let _ = writeln!(out, "side\tid\tship\tstatus\thp\tmax_hp");
    for side in &report.sides {
        let rows = side
            .survivors
            .iter()
            .map(|unit| (unit, "afloat"))
            .chain(side.losses.iter().map(|unit| (unit, "sunk")));
        for (unit, status) in rows {
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t{}\t{:.3}\t{:.3}",
                side.side, unit.id, unit.name, status, unit.hp, unit.max_hp
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positionals_skip_flags_and_their_values() {
        let a = args(&["broadside", "simulate", "--seed", "9", "ships.csv", "--table", "fight.yaml"]);
        assert_eq!(positionals(&a), vec!["ships.csv", "fight.yaml"]);
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let a = args(&["broadside", "batch", "--max-rounds", "4"]);
        let config = apply_overrides(SimulationConfig::default(), &a);
        assert_eq!(config.max_rounds, 4);
        assert_eq!(config.seed, SimulationConfig::default().seed);
    }

    #[test]
    fn unknown_command_is_none() {
        assert_eq!(parse_command(&args(&["broadside", "serve"])), None);
        assert_eq!(parse_command(&args(&["broadside", "batch"])), Some(Command::Batch));
    }
}
