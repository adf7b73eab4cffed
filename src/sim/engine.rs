//! Trial orchestrator: runs independent trials and merges their results.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use super::metric::Metric;
use super::report::RunReport;
use crate::config::{DEMAND_GROUPS, ScenarioConfig};
use crate::error::SimError;
use crate::manufacturing::simulate_manufacturing;
use crate::pipeline::{PipelineModel, PipelineTrial, TrialRow};
use crate::stats::StatAccumulator;

/// Cooperative cancellation flag, checked before each trial starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Immutable result of one trial, merged into the run at a single point.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub trial: usize,
    pub stats: StatAccumulator<Metric>,
    /// Roster indices in approval order.
    pub approved: Vec<usize>,
    pub rows: Vec<TrialRow>,
    /// Cumulative doses for production months `1..`, empty when
    /// manufacturing is disabled.
    pub cumulative: Vec<f64>,
    pub target_months: [Option<u32>; DEMAND_GROUPS],
}

/// Report and raw per-trial table of a completed run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub report: RunReport,
    pub trial_rows: Vec<TrialRow>,
}

/// Monte Carlo run over a validated scenario.
///
/// Each trial owns its RNG (`seed + trial`), candidate states and capacity
/// pool, so results are identical whether trials run sequentially or on
/// the rayon pool.
#[derive(Debug)]
pub struct Simulation {
    cfg: ScenarioConfig,
    cancel: CancelToken,
}

impl Simulation {
    /// Validates `cfg` and prepares a run.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfig`] listing every problem found.
    pub fn new(cfg: ScenarioConfig) -> Result<Self, SimError> {
        let errors = cfg.validate();
        if !errors.is_empty() {
            return Err(SimError::InvalidConfig(errors));
        }
        Ok(Self {
            cfg,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.cfg
    }

    /// Runs every trial and builds the report.
    ///
    /// # Errors
    ///
    /// [`SimError::Cancelled`] if the token was set before all trials
    /// started, [`SimError::Fault`] if a trial panicked. No partial results
    /// are returned in either case.
    pub fn run(&self) -> Result<SimulationResult, SimError> {
        let started = Instant::now();
        let sim = &self.cfg.simulation;
        info!(
            tries = sim.tries,
            months = sim.months,
            candidates = self.cfg.candidates.len(),
            seed = sim.seed,
            parallel = sim.parallel,
            "simulation started"
        );

        let model = PipelineModel::new(&self.cfg);
        let completed = AtomicUsize::new(0);
        let outcomes = self.run_trials(&model, &completed)?;

        let mut stats = StatAccumulator::new();
        let mut trial_rows = Vec::new();
        for outcome in &outcomes {
            stats.merge(&outcome.stats);
            trial_rows.extend(outcome.rows.iter().cloned());
        }
        let report = RunReport::build(&self.cfg, &stats, &outcomes);

        info!(
            tries = sim.tries,
            approval_prob = report.pipeline.benchmark.final_prob.value,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation finished"
        );
        Ok(SimulationResult { report, trial_rows })
    }

    fn run_trials(
        &self,
        model: &PipelineModel<'_>,
        completed: &AtomicUsize,
    ) -> Result<Vec<TrialOutcome>, SimError> {
        let tries = self.cfg.simulation.tries;

        #[cfg(feature = "parallel")]
        if self.cfg.simulation.parallel {
            use rayon::prelude::*;
            return (0..tries)
                .into_par_iter()
                .map(|trial| self.guarded_trial(model, trial, completed))
                .collect();
        }

        (0..tries)
            .map(|trial| self.guarded_trial(model, trial, completed))
            .collect()
    }

    fn guarded_trial(
        &self,
        model: &PipelineModel<'_>,
        trial: usize,
        completed: &AtomicUsize,
    ) -> Result<TrialOutcome, SimError> {
        if self.cancel.is_cancelled() {
            return Err(SimError::Cancelled {
                completed: completed.load(Ordering::SeqCst),
            });
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_trial(model, trial)))
            .map_err(|payload| SimError::Fault {
                message: format!("trial {trial}: {}", panic_message(payload.as_ref())),
            })?;
        completed.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }

    /// Runs trial `trial` from its own seed.
    pub fn run_trial(&self, model: &PipelineModel<'_>, trial: usize) -> TrialOutcome {
        let cfg = &self.cfg;
        let mut rng = StdRng::seed_from_u64(cfg.simulation.trial_seed(trial));
        let mut stats = StatAccumulator::new();

        let pipeline = PipelineTrial::new(model, &mut rng).run(&mut rng, &mut stats);
        let (cumulative, target_months) = if cfg.manufacturing.enabled {
            let m = simulate_manufacturing(cfg, &pipeline.candidates, &pipeline.approved, &mut rng, &mut stats);
            let targets = m.production.targets.each_ref().map(|t| t.month);
            (m.production.totals, targets)
        } else {
            (Vec::new(), [None; DEMAND_GROUPS])
        };

        debug!(
            trial,
            approvals = pipeline.approved.len(),
            buyouts = pipeline.buyouts,
            first_month = ?pipeline.first_month,
            targets = ?target_months,
            "trial finished"
        );

        TrialOutcome {
            trial,
            stats,
            rows: pipeline.rows(trial),
            approved: pipeline.approved,
            cumulative,
            target_months,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
