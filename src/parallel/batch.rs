//! Batch simulation: many independent engagements of the same fleets, one seed each.
//!
//! Every run clones the fleets and owns its own engagement state, so runs share nothing
//! mutable. Per-run seeds are `config.seed + i`. Each report is folded into integer
//! counts as soon as it is produced, so the summary is independent of worker count.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::combat::{
    resolve, summarize, validate_fleets, Fleet, OutcomeKind, OutcomeReport, SimulationConfig,
    TraceMode,
};
use crate::error::Result;
use crate::parallel::pool::WorkerPool;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub runs: usize,
    pub base_seed: u64,
    /// Wins per side, every side listed even at zero.
    pub wins: BTreeMap<String, usize>,
    pub win_rates: BTreeMap<String, f64>,
    pub draws: usize,
    pub timeouts: usize,
    pub mean_rounds: f64,
}

/// Run `runs` engagements on `pool`.
pub fn run_batch(
    fleets: &[Fleet],
    config: SimulationConfig,
    runs: usize,
    pool: &WorkerPool,
) -> Result<BatchSummary> {
    run_batch_with_parallelism(fleets, config, runs, Some(pool))
}

/// Like [run_batch] but on the calling thread.
pub fn run_batch_sequential(
    fleets: &[Fleet],
    config: SimulationConfig,
    runs: usize,
) -> Result<BatchSummary> {
    run_batch_with_parallelism(fleets, config, runs, None)
}

fn run_batch_with_parallelism(
    fleets: &[Fleet],
    config: SimulationConfig,
    runs: usize,
    pool: Option<&WorkerPool>,
) -> Result<BatchSummary> {
    validate_fleets(fleets)?;

    let run_one = |index: usize| -> Result<OutcomeReport> {
        let run_config = SimulationConfig {
            seed: config.seed.wrapping_add(index as u64),
            trace_mode: TraceMode::Off,
            ..config
        };
        let resolution = resolve(fleets.to_vec(), run_config)?;
        Ok(summarize(&resolution.state)?)
    };

    let tally = match pool {
        Some(pool) => pool.install(|| {
            (0..runs)
                .into_par_iter()
                .map(run_one)
                .try_fold(Tally::default, |mut tally, report| {
                    tally.record(&report?);
                    Ok::<_, crate::Error>(tally)
                })
                .try_reduce(Tally::default, |left, right| Ok(left.merge(right)))
        })??,
        None => (0..runs).try_fold(Tally::default(), |mut tally, index| {
            tally.record(&run_one(index)?);
            Ok::<_, crate::Error>(tally)
        })?,
    };

    let summary = tally.into_summary(fleets, config.seed);
    tracing::info!(
        runs = summary.runs,
        draws = summary.draws,
        timeouts = summary.timeouts,
        "batch complete"
    );
    Ok(summary)
}

/// Running counts; each report is dropped once recorded.
#[derive(Debug, Default)]
struct Tally {
    runs: usize,
    wins: BTreeMap<String, usize>,
    draws: usize,
    timeouts: usize,
    total_rounds: u64,
}

impl Tally {
    fn record(&mut self, report: &OutcomeReport) {
        self.runs += 1;
        self.total_rounds += u64::from(report.rounds);
        match report.outcome {
            OutcomeKind::Victory => *self.wins.entry(report.winner.clone()).or_default() += 1,
            OutcomeKind::Draw => self.draws += 1,
            OutcomeKind::Timeout => self.timeouts += 1,
        }
    }

    fn merge(mut self, other: Tally) -> Tally {
        self.runs += other.runs;
        self.draws += other.draws;
        self.timeouts += other.timeouts;
        self.total_rounds += other.total_rounds;
        for (side, count) in other.wins {
            *self.wins.entry(side).or_default() += count;
        }
        self
    }

    fn into_summary(self, fleets: &[Fleet], base_seed: u64) -> BatchSummary {
        let mut wins: BTreeMap<String, usize> = fleets
            .iter()
            .map(|fleet| (fleet.side().to_string(), 0))
            .collect();
        for (side, count) in self.wins {
            *wins.entry(side).or_default() += count;
        }

        let runs = self.runs;
        let rate = |count: usize| if runs == 0 { 0.0 } else { count as f64 / runs as f64 };
        let win_rates = wins
            .iter()
            .map(|(side, &count)| (side.clone(), rate(count)))
            .collect();
        let mean_rounds = if runs == 0 {
            0.0
        } else {
            self.total_rounds as f64 / runs as f64
        };

        BatchSummary {
            runs,
            base_seed,
            wins,
            win_rates,
            draws: self.draws,
            timeouts: self.timeouts,
            mean_rounds,
        }
    }
}
