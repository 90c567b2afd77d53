use std::{fs, io, process};

use anyhow::{bail, Context};
use log::error;

use second_chance::{
    config::{Config, RunConfig, Triples},
    sim::{self, RunReport, SimOptions},
};

// progress lines are logged at info
const DEFAULT_FILTER: &str = "info";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER))
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(2);
        }
    }
}

/// Returns whether every run succeeded.
fn run() -> anyhow::Result<bool> {
    let mut args = pico_args::Arguments::from_env();
    let defaults = SimOptions::default();
    let opts = SimOptions {
        heartbeat: args
            .opt_value_from_str("--heartbeat")
            .context("--heartbeat should be an integer")?
            .unwrap_or(defaults.heartbeat),
        tokens_per_block: args
            .opt_value_from_str("--buffer-size")
            .context("--buffer-size must be an integer")?
            .unwrap_or(defaults.tokens_per_block),
        blocks_per_queue: args
            .opt_value_from_str("--queue-size")
            .context("--queue-size must be an integer")?
            .unwrap_or(defaults.blocks_per_queue),
        parallel: args.contains("--parallel"),
    };
    let stats_path: Option<String> = args.opt_value_from_str("--json")?;
    let runs = read_runs(&mut args)?;

    let remaining = args.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {remaining:?}");
    }

    let mut reports = Vec::new();
    let mut all_ok = true;
    let mut record = |trace: &str, result: second_chance::Result<RunReport>| match result {
        Ok(report) => {
            println!("{report}");
            reports.push(report);
        }
        Err(err) => {
            all_ok = false;
            error!("run {trace} failed: {err}");
        }
    };

    match runs {
        Some(runs) => {
            for (run, result) in runs.iter().zip(sim::simulate_all(&runs, &opts)) {
                record(&run.trace, result);
            }
        }
        // one report per triple, as soon as it is typed
        None => {
            for triple in Triples::new(io::stdin().lock()) {
                match triple {
                    Ok(run) => record(&run.trace, sim::simulate(&run, &opts)),
                    Err(err) => record("<stdin>", Err(err)),
                }
            }
        }
    }

    if let Some(stats_path) = stats_path {
        let stats_file = fs::File::create(&stats_path)
            .with_context(|| format!("cannot open output file {stats_path}"))?;
        serde_json::to_writer_pretty(stats_file, &reports)?;
    }
    Ok(all_ok)
}

/// The runs named on the command line, or `None` to read them from stdin.
fn read_runs(args: &mut pico_args::Arguments) -> anyhow::Result<Option<Vec<RunConfig>>> {
    let trace: Option<String> = args.opt_value_from_str("-t")?;
    if let Some(trace) = trace {
        let memory_kb = args
            .value_from_str("-m")
            .context("a single run needs -m <memory_kb>")?;
        let page_kb = args
            .value_from_str("-s")
            .context("a single run needs -s <page_kb>")?;
        return Ok(Some(vec![RunConfig {
            trace,
            memory_kb,
            page_kb,
        }]));
    }

    let config_str: Option<String> = args.opt_value_from_str("--config")?;
    let config_str = match config_str {
        Some(config_str) => Some(config_str),
        None => match args.opt_value_from_str::<_, String>("-p")? {
            Some(config_path) => Some(
                fs::read_to_string(&config_path)
                    .with_context(|| format!("could not read config file {config_path}"))?,
            ),
            None => None,
        },
    };
    match config_str {
        Some(config_str) => Ok(Some(Config::from_json(&config_str)?.runs)),
        None => Ok(None),
    }
}
