//! Manufacturing on top of real pipeline trials.

mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;
use vaccine_sim::config::ScenarioConfig;
use vaccine_sim::manufacturing::schedule::MIN_SECONDARY_GAP;
use vaccine_sim::manufacturing::{ManufacturingOutcome, simulate_manufacturing};
use vaccine_sim::pipeline::{PipelineModel, PipelineTrial};
use vaccine_sim::sim::engine::Simulation;
use vaccine_sim::sim::types::Platform;
use vaccine_sim::stats::StatAccumulator;

/// Runs one pipeline trial and manufacturing for the approvals.
fn run_trial(cfg: &ScenarioConfig, seed: u64) -> (usize, ManufacturingOutcome) {
    let model = PipelineModel::new(cfg);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut stats = StatAccumulator::new();
    let pipeline = PipelineTrial::new(&model, &mut rng).run(&mut rng, &mut stats);
    let outcome = simulate_manufacturing(cfg, &pipeline.candidates, &pipeline.approved, &mut rng, &mut stats);
    (pipeline.approved.len(), outcome)
}

#[test]
fn single_fill_site_bounds_total_capacity() {
    let mut cfg = common::certain_config(ScenarioConfig::baseline().candidates);
    let fill = 2.0e6;
    common::single_secondary_site(&mut cfg, fill);

    for seed in 0..10 {
        let (approved, outcome) = run_trial(&cfg, seed);
        assert_eq!(approved, cfg.candidates.len());
        let total: f64 = outcome.allocations.iter().map(|a| a.capacity).sum();
        assert!(total <= fill, "seed {seed}: total capacity {total} exceeds {fill}");
        let filled = outcome
            .allocations
            .iter()
            .filter(|a| !a.secondary_sites.is_empty())
            .count();
        assert_eq!(filled, 1, "seed {seed}");
    }
}

#[test]
fn secondary_start_follows_primary_start() {
    let cfg = common::certain_config(ScenarioConfig::baseline().candidates);
    let (_, outcome) = run_trial(&cfg, 3);
    for a in &outcome.allocations {
        assert!(a.start.secondary >= a.start.primary + MIN_SECONDARY_GAP);
        assert!(a.capacity <= a.primary);
        assert!(a.capacity <= a.secondary);
    }
}

#[test]
fn production_curve_is_monotone() {
    let cfg = common::certain_config(ScenarioConfig::baseline().candidates);
    let (_, outcome) = run_trial(&cfg, 5);
    let totals = &outcome.production.totals;
    assert_eq!(totals.len(), cfg.manufacturing.production_months as usize);
    assert!(totals.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(outcome.production.total_at(0), 0.0);
}

#[test]
fn targets_are_reached_in_priority_order() {
    let mut cfg = common::certain_config(ScenarioConfig::baseline().candidates);
    cfg.manufacturing.production_months = 600;
    let (_, outcome) = run_trial(&cfg, 8);
    let months: Vec<u32> = outcome
        .production
        .targets
        .iter()
        .filter_map(|t| t.month)
        .collect();
    assert!(months.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn candidate_contributions_add_up_at_each_target() {
    let mut cfg = common::certain_config(ScenarioConfig::baseline().candidates);
    cfg.manufacturing.production_months = 600;
    let (_, outcome) = run_trial(&cfg, 8);
    let indices: Vec<usize> = outcome.allocations.iter().map(|a| a.index).collect();
    for target in outcome.production.targets.iter().filter(|t| t.month.is_some()) {
        let keys: Vec<usize> = target.candidate_doses.iter().map(|&(j, _)| j).collect();
        assert_eq!(keys, indices);
        let sum: f64 = target.candidate_doses.iter().map(|&(_, d)| d).sum();
        assert!((sum - target.doses).abs() <= 1e-6 * target.doses.max(1.0));
    }
}

#[test]
fn report_timeline_covers_approved_platforms() {
    let mut cfg = common::certain_config(vec![common::rna(1)]);
    common::single_secondary_site(&mut cfg, 1.0e6);
    let report = Simulation::new(cfg).expect("valid").run().expect("run").report;
    let manufacturing = report.manufacturing.expect("manufacturing enabled");
    let rna = manufacturing
        .timeline
        .iter()
        .find(|t| t.platform == Platform::Rna)
        .expect("RNA timeline row");
    assert_eq!(rna.approvals, 1.0);
    assert_eq!(rna.approval_month.mean, 5.0);
    assert!(rna.monthly_capacity.mean <= 1.0e6);
    for target in &manufacturing.targets {
        assert_eq!(target.candidate_doses.len(), 1);
    }
}
