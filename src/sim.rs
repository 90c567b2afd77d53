use std::{fmt, path::Path};

use log::{debug, info};
use serde::Serialize;

use crate::{
    config::RunConfig,
    engine::ClockEngine,
    error::{Error, Result},
    trace::Trace,
    translate::PageSplit,
};

#[derive(Debug, Clone, Copy)]
pub struct SimOptions {
    pub tokens_per_block: usize,
    pub blocks_per_queue: usize,
    /// Log progress every this many accesses; 0 disables it.
    pub heartbeat: u64,
    pub parallel: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        SimOptions {
            tokens_per_block: 1024 * 16,
            blocks_per_queue: 32,
            heartbeat: 0,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub trace: String,
    pub memory_kb: u64,
    pub page_kb: u64,
    pub frames: usize,
    pub offset_bits: u32,
    pub accesses: u64,
    pub hits: u64,
    pub faults: u64,
    pub evictions: u64,
    pub fault_rate: f64,
}

impl RunReport {
    fn new(run: &RunConfig, split: PageSplit, engine: &ClockEngine) -> Self {
        let stats = engine.stats();
        let accesses = stats.hits + stats.faults;
        let fault_rate = if accesses == 0 {
            0.0
        } else {
            stats.faults as f64 / accesses as f64
        };
        RunReport {
            trace: run.trace.clone(),
            memory_kb: run.memory_kb,
            page_kb: run.page_kb,
            frames: stats.frames,
            offset_bits: split.offset_bits(),
            accesses,
            hits: stats.hits,
            faults: stats.faults,
            evictions: stats.evictions,
            fault_rate,
        }
    }
}

const RULE: &str = "----------------------------------------------------";

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "Trace file:{}", self.trace)?;
        writeln!(f, "Memory Size:{}KB", self.memory_kb)?;
        writeln!(f, "Page Size:{}KB", self.page_kb)?;
        writeln!(f, "Page Faults:{}", self.faults)?;
        write!(f, "{RULE}")
    }
}

/// Simulates one run from its trace file.
pub fn simulate(run: &RunConfig, opts: &SimOptions) -> Result<RunReport> {
    // geometry is checked before the trace is touched
    let geometry = run.geometry()?;
    let engine = ClockEngine::new(geometry.frames)?;
    let trace = Trace::open(
        Path::new(&run.trace),
        opts.tokens_per_block,
        opts.blocks_per_queue,
    )?;
    simulate_trace(run, engine, geometry.split, &trace, opts.heartbeat)
}

fn simulate_trace(
    run: &RunConfig,
    mut engine: ClockEngine,
    split: PageSplit,
    trace: &Trace,
    heartbeat: u64,
) -> Result<RunReport> {
    info!(
        "simulating {} with {} frames, {} offset bits",
        run.trace,
        engine.capacity(),
        split.offset_bits()
    );
    let mut accesses = 0u64;
    for token in trace.tokens() {
        let page = split.page_of(&token?)?;
        engine.process(page);
        accesses += 1;
        if heartbeat != 0 && accesses % heartbeat == 0 {
            info!(
                "{}: {} accesses, {} faults",
                run.trace,
                accesses,
                engine.faults()
            );
        }
    }
    let report = RunReport::new(run, split, &engine);
    debug!("{report:?}");
    Ok(report)
}

/// Simulates every run, one engine per run, returning results in input order.
pub fn simulate_all(runs: &[RunConfig], opts: &SimOptions) -> Vec<Result<RunReport>> {
    if !opts.parallel || runs.len() < 2 {
        return runs.iter().map(|run| simulate(run, opts)).collect();
    }

    let outcome = crossbeam::scope(|s| {
        let handles: Vec<_> = runs
            .iter()
            .map(|run| s.spawn(move |_| simulate(run, opts)))
            .collect();
        handles
            .into_iter()
            .zip(runs)
            .map(|(handle, run)| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(Error::Panicked(run.trace.clone())))
            })
            .collect::<Vec<_>>()
    });
    match outcome {
        Ok(reports) => reports,
        Err(_) => runs
            .iter()
            .map(|run| Err(Error::Panicked(run.trace.clone())))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use std::{
        fs,
        io::{Cursor, Write},
        path::PathBuf,
    };
    use xz2::write::XzEncoder;

    fn run(trace: &str, memory_kb: u64, page_kb: u64) -> RunConfig {
        RunConfig {
            trace: trace.into(),
            memory_kb,
            page_kb,
        }
    }

    fn simulate_text(run: &RunConfig, text: &'static str) -> Result<RunReport> {
        let geometry = run.geometry()?;
        let engine = ClockEngine::new(geometry.frames)?;
        let trace = Trace::spawn(Cursor::new(text), 2, 2);
        simulate_trace(run, engine, geometry.split, &trace, 1)
    }

    fn temp_trace(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("second_chance-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    // pages 1 2 3 4 1 2 5 1 2 3 4 5 with 4KB pages and assorted offsets
    const CLASSIC: &str = "1000 2fff 3abc\n4000 1001 2002 5000\n1fff 2000 3000 4000 5123\n";

    #[test]
    fn test_simulate_classic_trace() {
        let report = simulate_text(&run("classic", 12, 4), CLASSIC).unwrap();
        assert_eq!(report.frames, 3);
        assert_eq!(report.offset_bits, 12);
        assert_eq!(report.accesses, 12);
        assert_eq!(report.faults, 9);
        assert_eq!(report.hits, 3);
        assert_eq!(report.evictions, 6);
        assert_eq!(report.fault_rate, 0.75);
    }

    #[test]
    fn test_simulate_aborts_on_bad_token() {
        let err = simulate_text(&run("bad", 12, 4), "1000 2000 xyz 3000").unwrap_err();
        assert!(matches!(err, Error::Parse { token, .. } if token == "xyz"));
    }

    #[test]
    fn test_simulate_rejects_geometry_before_reading() {
        let err = simulate(&run("/nonexistent/trace", 10, 4), &SimOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Domain(DomainError::MemoryNotDivisible { .. })
        ));
    }

    #[test]
    fn test_simulate_rejects_unallocatable_memory() {
        let err = simulate(
            &run("/nonexistent/trace", u64::MAX / 2 + 1, 1),
            &SimOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Domain(DomainError::TooManyFrames { .. })
        ));
    }

    #[test]
    fn test_simulate_missing_trace() {
        let err = simulate(&run("/nonexistent/trace", 16, 4), &SimOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_empty_trace_report() {
        let report = simulate_text(&run("empty", 8, 4), "").unwrap();
        assert_eq!(report.faults, 0);
        assert_eq!(report.fault_rate, 0.0);
    }

    #[test]
    fn test_report_text() {
        let report = simulate_text(&run("gcc.trace", 12, 4), CLASSIC).unwrap();
        assert_eq!(
            report.to_string(),
            "----------------------------------------------------\n\
             Trace file:gcc.trace\n\
             Memory Size:12KB\n\
             Page Size:4KB\n\
             Page Faults:9\n\
             ----------------------------------------------------"
        );
    }

    #[test]
    fn test_simulate_all_files() {
        let plain = temp_trace("classic.trace", CLASSIC.as_bytes());
        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(CLASSIC.as_bytes()).unwrap();
        let packed = temp_trace("classic.trace.xz", &encoder.finish().unwrap());

        let runs = vec![
            run(plain.to_str().unwrap(), 12, 4),
            run(packed.to_str().unwrap(), 16, 4),
            run(plain.to_str().unwrap(), 12, 0),
            run(plain.to_str().unwrap(), 4, 4),
        ];

        for parallel in [false, true] {
            let opts = SimOptions {
                parallel,
                tokens_per_block: 3,
                ..SimOptions::default()
            };
            let results = simulate_all(&runs, &opts);
            assert_eq!(results.len(), 4);
            assert_eq!(results[0].as_ref().unwrap().faults, 9);
            assert_eq!(results[1].as_ref().unwrap().faults, 10);
            assert!(matches!(
                results[2],
                Err(Error::Domain(DomainError::ZeroPageSize))
            ));
            // one frame never hits on this trace
            assert_eq!(results[3].as_ref().unwrap().faults, 12);
        }
    }
}
