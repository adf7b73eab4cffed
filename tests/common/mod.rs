//! Shared test fixtures for integration tests.

use vaccine_sim::config::{CandidateConfig, OverlapRule, ScenarioConfig, SecondarySite};
use vaccine_sim::sim::sampling::Triangle;
use vaccine_sim::sim::types::{Funding, OverlapStrategy, Phase, Platform, TimelineLevel};

/// Small sequential run of the baseline scenario (20 trials, 24 months).
pub fn small_baseline() -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.tries = 20;
    cfg.simulation.months = 24;
    cfg.simulation.parallel = false;
    cfg
}

/// Scenario in which every phase succeeds and lasts exactly one month,
/// with consecutive phases and no gaps.
///
/// A fresh candidate is approved at month 5 in every trial.
pub fn certain_config(candidates: Vec<CandidateConfig>) -> ScenarioConfig {
    let mut cfg = small_baseline();
    cfg.phases.success = [1.0; Phase::COUNT];
    cfg.phases.best = [1.0; Phase::COUNT];
    cfg.phases.likely = [1.0; Phase::COUNT];
    cfg.phases.worst = [1.0; Phase::COUNT];
    cfg.phases.phase3_slowdown_fract = 0.0;
    for p in &mut cfg.platforms {
        p.phase3_pos = 1.0;
        p.timeline = TimelineLevel::Normal;
    }
    for f in &mut cfg.funding {
        f.pos = 1.0;
        f.timeline = TimelineLevel::Normal;
        f.overlap = OverlapStrategy::Consecutive;
        f.tech_failure = 1.0;
    }
    cfg.overlap.consecutive = OverlapRule::new(0, 0, 0, 0);
    cfg.buyout.enabled = false;
    cfg.feedback.update_approval = false;
    cfg.candidates = candidates;
    cfg
}

/// RNA candidate with no prior history.
pub fn rna(number: u32) -> CandidateConfig {
    CandidateConfig::new(number, "mRNA sample", Platform::Rna, Funding::Government)
}

/// Replaces the secondary pool with one fill-and-finish site of `doses`
/// per month, always at full capacity.
pub fn single_secondary_site(cfg: &mut ScenarioConfig, doses: f64) {
    let m = &mut cfg.manufacturing;
    m.secondary_ratio = Triangle::fixed(1.0);
    m.secondary_sites = vec![SecondarySite {
        country: "Fill".to_string(),
        doses,
    }];
}
