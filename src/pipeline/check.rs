//! Deterministic expectation per candidate, reported alongside the Monte
//! Carlo results as a sanity reference.

use serde::Serialize;

use super::candidate::PipelineModel;
use crate::config::{CandidateConfig, OverlapRule, ScenarioConfig};
use crate::sim::sampling::{multiply_pos, triangular_mean};
use crate::sim::types::{Funding, OverlapStrategy, Phase, PhaseArray, Platform};

/// Expected time to approval and probability of approval for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateCheck {
    pub number: u32,
    pub name: String,
    pub platform: Platform,
    pub funding: Funding,
    /// Months from the start of pre-clinical work to approval.
    pub months: f64,
    /// Probability of approval over the phases not yet completed.
    pub success: f64,
}

/// Computes a [`CandidateCheck`] for every roster candidate.
///
/// Phase lengths use the triangle mean of the base timelines, or the known
/// length of phases already finished. Outlook multipliers are not applied.
pub fn cross_check(cfg: &ScenarioConfig) -> Vec<CandidateCheck> {
    let model = PipelineModel::new(cfg);
    cfg.candidates
        .iter()
        .map(|c| candidate_check(&model, c))
        .collect()
}

fn candidate_check(model: &PipelineModel<'_>, candidate: &CandidateConfig) -> CandidateCheck {
    let cfg = model.cfg();
    let phases = &cfg.phases;
    let mut lengths: PhaseArray<f64> = [0.0; Phase::COUNT];
    let mut success = 1.0;
    for phase in Phase::ALL {
        let i = phase.index();
        let finished = candidate
            .history
            .iter()
            .find(|h| h.phase == phase)
            .and_then(|h| match (h.start, h.end) {
                (Some(start), Some(end)) if end <= 0 => Some(end - start),
                _ => None,
            });
        match finished {
            Some(months) => lengths[i] = f64::from(months),
            None => {
                lengths[i] = triangular_mean(phases.best[i], phases.likely[i], phases.worst[i]);
                success *= model.base_pos(candidate.platform, phase);
            }
        }
    }

    let funding = model.funding(candidate.funding);
    let rule = cfg.overlap.rule(funding.overlap);
    let factors = &cfg.timeline_factors;
    let months = overlapped_months(funding.overlap, rule, &lengths)
        * factors.value(model.platform(candidate.platform).timeline)
        * factors.value(funding.timeline);

    CandidateCheck {
        number: candidate.number,
        name: candidate.name.clone(),
        platform: candidate.platform,
        funding: candidate.funding,
        months,
        success: multiply_pos(success, funding.pos),
    }
}

/// Total months across all phases laid out by the overlap strategy.
fn overlapped_months(strategy: OverlapStrategy, rule: OverlapRule, m: &PhaseArray<f64>) -> f64 {
    let overlap = f64::from(rule.phase_overlap);
    let gap = f64::from(rule.phase_gap);
    let [m0, m1, m2, m3, m4] = *m;
    let clinical = match strategy {
        OverlapStrategy::Simultaneous | OverlapStrategy::Mostly => {
            m1.max(overlap + m2).max(2.0 * overlap + m3)
        }
        OverlapStrategy::Phases12 => m1.max(overlap + m2) + gap + m3,
        OverlapStrategy::Phases23 => m1 + gap + m2.max(overlap + m3),
        OverlapStrategy::Consecutive | OverlapStrategy::Gaps => m1 + gap + m2 + gap + m3,
    };
    m0 + f64::from(rule.phase1_start) + clinical + f64::from(rule.approval_start) + m4
}
