//! Candidate phase state and the run-wide parameters used to (re)initialise it.

use rand::Rng;

use crate::config::{FundingConfig, PlatformConfig, ScenarioConfig};
use crate::sim::sampling::{multiply_pos, round_months, triangular};
use crate::sim::types::{Funding, OverlapStrategy, Outlook, Phase, PhaseArray, Platform, Status};

/// Funding category a bought-out candidate is promoted to.
pub const BUYOUT_FUNDING: Funding = Funding::LargePharma;

/// Mutable state of one candidate for the duration of a single trial.
///
/// Created fresh for every trial from the roster entry at the same index.
/// Phase arrays are indexed by [`Phase::index`]; months are relative to the
/// simulation epoch (negative months are in the past).
#[derive(Debug, Clone)]
pub struct CandidateState {
    /// Position in the scenario roster.
    pub index: usize,
    pub number: u32,
    pub platform: Platform,
    /// Current funding category (changes on buyout).
    pub funding: Funding,
    pub cepi: bool,
    pub ows: bool,
    pub pos: PhaseArray<f64>,
    pub best: PhaseArray<i32>,
    pub likely: PhaseArray<i32>,
    pub worst: PhaseArray<i32>,
    pub start: PhaseArray<i32>,
    pub end: PhaseArray<i32>,
    /// Month each phase was completed successfully.
    pub ended: PhaseArray<Option<i32>>,
    pub status: Status,
    /// Product of the PoS of every phase not yet completed.
    pub overall_pos: f64,
    /// Accumulated approval-feedback multiplier on the Approval PoS.
    pub approval_factor: f64,
}

impl CandidateState {
    /// `true` while `month` lies within the phase's `start..=end`.
    pub fn is_active_in(&self, phase: Phase, month: i32) -> bool {
        let i = phase.index();
        self.start[i] <= month && self.end[i] >= month
    }

    /// `true` once the phase has been completed successfully.
    pub fn has_completed(&self, phase: Phase) -> bool {
        self.ended[phase.index()].is_some()
    }

    /// Month the candidate was approved, if it was.
    pub fn approval_month(&self) -> Option<i32> {
        self.ended[Phase::Approval.index()]
    }

    /// Phases not yet completed, in order.
    pub fn remaining_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL.into_iter().filter(|p| !self.has_completed(*p))
    }

    pub fn refresh_overall_pos(&mut self) {
        self.overall_pos = self
            .remaining_phases()
            .map(|p| self.pos[p.index()])
            .product();
    }
}

/// Run-wide pipeline parameters resolved from a [`ScenarioConfig`].
///
/// Holds the per-platform and per-funding records in lookup tables and the
/// outlook multipliers, and knows how to derive a candidate's phase PoS,
/// timelines and dates.
#[derive(Debug, Clone)]
pub struct PipelineModel<'a> {
    cfg: &'a ScenarioConfig,
    platforms: [PlatformConfig; Platform::COUNT],
    funding: [FundingConfig; Funding::COUNT],
    option_timeline: f64,
}

impl<'a> PipelineModel<'a> {
    pub fn new(cfg: &'a ScenarioConfig) -> Self {
        // the outlook only scales timelines; `pos_factor` is validated but not applied
        let s = &cfg.simulation;
        let option_timeline = match s.outlook {
            Outlook::Normal => 1.0,
            Outlook::Optimistic if s.timeline_factor > 0.0 => 1.0 / s.timeline_factor,
            Outlook::Optimistic => 1.0,
            Outlook::Pessimistic => s.timeline_factor,
        };
        Self {
            cfg,
            platforms: Platform::ALL.map(|p| cfg.platform(p)),
            funding: Funding::ALL.map(|f| cfg.funding(f)),
            option_timeline,
        }
    }

    pub fn cfg(&self) -> &'a ScenarioConfig {
        self.cfg
    }

    pub fn platform(&self, platform: Platform) -> &PlatformConfig {
        &self.platforms[platform.index()]
    }

    pub fn funding(&self, funding: Funding) -> &FundingConfig {
        &self.funding[funding.index()]
    }

    /// Phase PoS before any candidate-specific adjustment.
    pub fn base_pos(&self, platform: Platform, phase: Phase) -> f64 {
        if phase == Phase::PhaseIII {
            self.platform(platform).phase3_pos
        } else {
            self.cfg.phases.success[phase.index()]
        }
    }

    /// Per-phase funding multiplier: the fifth root of the funding PoS, or
    /// the square root for biotech/academic developers when buyouts are on.
    pub fn funding_factor(&self, funding: Funding) -> f64 {
        let exponent = if self.cfg.buyout.enabled && funding == Funding::BiotechAcademic {
            0.5
        } else {
            0.2
        };
        self.funding(funding).pos.powf(exponent)
    }

    /// PoS of one phase, with the base value scaled by a correlation `ratio`.
    pub fn phase_pos(&self, platform: Platform, funding: Funding, phase: Phase, ratio: f64) -> f64 {
        let pos = multiply_pos(self.base_pos(platform, phase), ratio);
        multiply_pos(pos, self.funding_factor(funding))
    }

    /// Combined outlook, platform and funding timeline multiplier.
    pub fn timeline_multiplier(&self, platform: Platform, funding: Funding) -> f64 {
        let factors = &self.cfg.timeline_factors;
        self.option_timeline
            * factors.value(self.platform(platform).timeline)
            * factors.value(self.funding(funding).timeline)
    }

    /// Known `(start, end)` months for a roster candidate's phase.
    ///
    /// Future end months are dropped when `ignore_future_dates` is set.
    pub fn known_dates(&self, index: usize, phase: Phase) -> (Option<i32>, Option<i32>) {
        let Some(record) = self
            .cfg
            .candidates
            .get(index)
            .and_then(|c| c.history.iter().find(|h| h.phase == phase))
        else {
            return (None, None);
        };
        let ignore_future = self.cfg.simulation.ignore_future_dates;
        let end = record.end.filter(|&e| !(ignore_future && e > 0));
        (record.start, end)
    }

    /// Start month of `phase` derived from the funding overlap strategy.
    pub fn phase_start(&self, c: &CandidateState, phase: Phase) -> i32 {
        let strategy = self.funding(c.funding).overlap;
        let rule = self.cfg.overlap.rule(strategy);
        let i = phase.index();
        match phase {
            Phase::PreClinical => 0,
            Phase::PhaseI => c.end[i - 1] + rule.phase1_start,
            Phase::Approval => c.end[i - 1] + rule.approval_start,
            Phase::PhaseII | Phase::PhaseIII => {
                let overlapped = matches!(
                    (strategy, phase),
                    (OverlapStrategy::Simultaneous | OverlapStrategy::Mostly, _)
                        | (OverlapStrategy::Phases12, Phase::PhaseII)
                        | (OverlapStrategy::Phases23, Phase::PhaseIII)
                );
                if overlapped {
                    c.start[i - 1] + rule.phase_overlap
                } else {
                    c.end[i - 1] + rule.phase_gap
                }
            }
        }
    }

    /// Draws a phase duration from the candidate's best/likely/worst triangle.
    ///
    /// Phase III is stretched by the slow-down factor with the configured
    /// probability.
    pub fn phase_length<R: Rng + ?Sized>(&self, rng: &mut R, c: &CandidateState, phase: Phase) -> i32 {
        let i = phase.index();
        let mut months = triangular(
            rng,
            f64::from(c.best[i]),
            f64::from(c.likely[i]),
            f64::from(c.worst[i]),
        );
        if phase == Phase::PhaseIII {
            let u: f64 = rng.random();
            if u < self.cfg.phases.phase3_slowdown_fract {
                months *= self.cfg.phases.phase3_slowdown_factor;
            }
        }
        round_months(months)
    }

    /// Builds the trial-start state of roster candidate `index`.
    pub fn new_candidate<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> CandidateState {
        let roster = &self.cfg.candidates[index];
        let mut c = CandidateState {
            index,
            number: roster.number,
            platform: roster.platform,
            funding: roster.funding,
            cepi: roster.cepi,
            ows: roster.ows,
            pos: [0.0; Phase::COUNT],
            best: [0; Phase::COUNT],
            likely: [0; Phase::COUNT],
            worst: [0; Phase::COUNT],
            start: [0; Phase::COUNT],
            end: [0; Phase::COUNT],
            ended: [None; Phase::COUNT],
            status: Status::Active,
            overall_pos: 1.0,
            approval_factor: 1.0,
        };
        self.reinitialise(&mut c, Phase::PreClinical, 0, rng);

        // phases already finished before the epoch count as completed
        for phase in Phase::ALL {
            let i = phase.index();
            if c.end[i] <= 0 {
                c.ended[i] = Some(c.end[i]);
            }
        }
        if c.has_completed(Phase::Approval) {
            c.status = Status::Approved;
        }
        c.refresh_overall_pos();
        c
    }

    /// Recomputes PoS, timelines and dates for `from` and every later phase.
    ///
    /// Completed phases are untouched. Derived dates at or before
    /// `this_month` are moved to the following month.
    pub fn reinitialise<R: Rng + ?Sized>(
        &self,
        c: &mut CandidateState,
        from: Phase,
        this_month: i32,
        rng: &mut R,
    ) {
        let multiplier = self.timeline_multiplier(c.platform, c.funding);
        let phases = &self.cfg.phases;
        for phase in Phase::ALL.into_iter().skip(from.index()) {
            let i = phase.index();
            c.pos[i] = self.phase_pos(c.platform, c.funding, phase, 1.0);
            if phase == Phase::Approval {
                c.pos[i] = multiply_pos(c.pos[i], c.approval_factor);
            }
            c.best[i] = round_months(phases.best[i] * multiplier);
            c.likely[i] = round_months(phases.likely[i] * multiplier);
            c.worst[i] = round_months(phases.worst[i] * multiplier);

            let (known_start, known_end) = self.known_dates(c.index, phase);
            if let Some(start) = known_start {
                c.start[i] = start;
            }
            if let Some(end) = known_end {
                c.end[i] = end;
            }
            if let (Some(start), Some(end)) = (known_start, known_end) {
                if end > 0 {
                    let diff = (end - start) - c.best[i];
                    c.best[i] += diff;
                    c.likely[i] += diff;
                    c.worst[i] += diff;
                }
            }

            if known_start.is_none() && phase != Phase::PreClinical {
                c.start[i] = self.phase_start(c, phase).max(this_month + 1);
            }
            match known_end {
                Some(end) => c.start[i] = c.start[i].min(end),
                None => {
                    let length = self.phase_length(rng, c, phase);
                    c.end[i] = (c.start[i] + length).max(this_month + 1);
                }
            }
        }
        c.refresh_overall_pos();
    }

    /// Rescales the PoS of every remaining phase by a correlation `ratio`.
    pub fn apply_ratio(&self, c: &mut CandidateState, ratio: f64) {
        for phase in Phase::ALL {
            let i = phase.index();
            if c.has_completed(phase) {
                continue;
            }
            c.pos[i] = self.phase_pos(c.platform, c.funding, phase, ratio);
            if phase == Phase::Approval {
                c.pos[i] = multiply_pos(c.pos[i], c.approval_factor);
            }
        }
        c.refresh_overall_pos();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CandidateConfig, OverlapRule, PhaseHistory};
    use crate::sim::types::TimelineLevel;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn flat_config(strategy: OverlapStrategy, rule: OverlapRule) -> ScenarioConfig {
        let mut cfg = ScenarioConfig::baseline();
        cfg.phases.best = [2.0; Phase::COUNT];
        cfg.phases.likely = [2.0; Phase::COUNT];
        cfg.phases.worst = [2.0; Phase::COUNT];
        cfg.phases.phase3_slowdown_fract = 0.0;
        for p in &mut cfg.platforms {
            p.timeline = TimelineLevel::Normal;
        }
        for f in &mut cfg.funding {
            f.timeline = TimelineLevel::Normal;
            f.overlap = strategy;
        }
        cfg.overlap.consecutive = rule;
        cfg.overlap.simultaneous = rule;
        cfg.overlap.phases12 = rule;
        cfg.overlap.phases23 = rule;
        cfg.candidates = vec![CandidateConfig::new(1, "sample", Platform::Rna, Funding::Government)];
        cfg
    }

    #[test]
    fn consecutive_phases_follow_each_other() {
        let cfg = flat_config(OverlapStrategy::Consecutive, OverlapRule::new(1, 2, 0, 1));
        let model = PipelineModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(1);
        let c = model.new_candidate(0, &mut rng);
        assert_eq!(c.start, [0, 3, 6, 9, 13]);
        assert_eq!(c.end, [2, 5, 8, 11, 15]);
        assert_eq!(c.status, Status::Active);
    }

    #[test]
    fn simultaneous_phases_start_together() {
        let cfg = flat_config(OverlapStrategy::Simultaneous, OverlapRule::new(0, 0, 0, 0));
        let model = PipelineModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(2);
        let c = model.new_candidate(0, &mut rng);
        assert_eq!(c.start[1], c.start[2]);
        assert_eq!(c.start[2], c.start[3]);
        assert_eq!(c.start[4], c.end[3]);
    }

    #[test]
    fn phases12_overlaps_then_gaps() {
        let cfg = flat_config(OverlapStrategy::Phases12, OverlapRule::new(0, 0, 1, 3));
        let model = PipelineModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(3);
        let c = model.new_candidate(0, &mut rng);
        assert_eq!(c.start[2], c.start[1] + 1);
        assert_eq!(c.start[3], c.end[2] + 3);
    }

    #[test]
    fn known_dates_override_and_mark_completed() {
        let mut cfg = flat_config(OverlapStrategy::Consecutive, OverlapRule::new(0, 0, 0, 0));
        cfg.candidates[0].history = vec![
            PhaseHistory {
                phase: Phase::PreClinical,
                start: Some(-6),
                end: Some(-2),
            },
            PhaseHistory {
                phase: Phase::PhaseI,
                start: Some(-1),
                end: Some(4),
            },
        ];
        let model = PipelineModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(4);
        let c = model.new_candidate(0, &mut rng);
        assert_eq!(c.ended[0], Some(-2));
        assert!(c.ended[1].is_none());
        assert_eq!((c.start[1], c.end[1]), (-1, 4));
        // known future phase length folded into the triangle
        assert_eq!(c.best[1], 5);
        assert_eq!(c.start[2], 4);
    }

    #[test]
    fn ignore_future_dates_drops_planned_end() {
        let mut cfg = flat_config(OverlapStrategy::Consecutive, OverlapRule::new(0, 0, 0, 0));
        cfg.simulation.ignore_future_dates = true;
        cfg.candidates[0].history = vec![PhaseHistory {
            phase: Phase::PreClinical,
            start: Some(-1),
            end: Some(9),
        }];
        let model = PipelineModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(5);
        let c = model.new_candidate(0, &mut rng);
        assert_eq!(c.end[0], 1);
    }

    #[test]
    fn derived_dates_never_precede_reinitialisation_month() {
        let cfg = flat_config(OverlapStrategy::Simultaneous, OverlapRule::new(0, 0, 0, 0));
        let model = PipelineModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(6);
        let mut c = model.new_candidate(0, &mut rng);
        c.ended[0] = Some(2);
        c.ended[1] = Some(4);
        model.reinitialise(&mut c, Phase::PhaseII, 10, &mut rng);
        for i in 2..Phase::COUNT {
            assert!(c.start[i] >= 11, "phase {i} starts at {}", c.start[i]);
            assert!(c.start[i] <= c.end[i]);
        }
    }

    #[test]
    fn funding_factor_uses_square_root_for_buyout_candidates() {
        let mut cfg = ScenarioConfig::baseline();
        for f in &mut cfg.funding {
            f.pos = 0.64;
        }
        let model = PipelineModel::new(&cfg);
        assert!((model.funding_factor(Funding::BiotechAcademic) - 0.8).abs() < 1e-12);
        assert!((model.funding_factor(Funding::Government) - 0.64_f64.powf(0.2)).abs() < 1e-12);
    }

    #[test]
    fn outlook_scales_timelines_but_not_pos() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.phases.success[Phase::PhaseI.index()] = 0.5;
        for f in &mut cfg.funding {
            f.pos = 1.0;
        }
        cfg.simulation.pos_factor = 2.0;
        let normal = PipelineModel::new(&cfg);
        let base_time = normal.timeline_multiplier(Platform::Rna, Funding::Government);
        assert_eq!(normal.phase_pos(Platform::Rna, Funding::Government, Phase::PhaseI, 1.0), 0.5);

        cfg.simulation.outlook = Outlook::Optimistic;
        let optimistic = PipelineModel::new(&cfg);
        assert_eq!(optimistic.phase_pos(Platform::Rna, Funding::Government, Phase::PhaseI, 1.0), 0.5);
        assert!(optimistic.timeline_multiplier(Platform::Rna, Funding::Government) < base_time);

        cfg.simulation.outlook = Outlook::Pessimistic;
        let pessimistic = PipelineModel::new(&cfg);
        assert_eq!(pessimistic.phase_pos(Platform::Rna, Funding::Government, Phase::PhaseI, 1.0), 0.5);
        assert!(pessimistic.timeline_multiplier(Platform::Rna, Funding::Government) > base_time);
    }

    #[test]
    fn phase3_pos_comes_from_platform() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.platforms.retain(|p| p.platform != Platform::Dna);
        let mut dna = PlatformConfig::default_for(Platform::Dna);
        dna.phase3_pos = 0.123;
        cfg.platforms.push(dna);
        let model = PipelineModel::new(&cfg);
        assert_eq!(model.base_pos(Platform::Dna, Phase::PhaseIII), 0.123);
        assert_eq!(model.base_pos(Platform::Dna, Phase::PhaseII), cfg.phases.success[2]);
    }

    #[test]
    fn apply_ratio_skips_completed_phases() {
        let cfg = flat_config(OverlapStrategy::Consecutive, OverlapRule::new(0, 0, 0, 0));
        let model = PipelineModel::new(&cfg);
        let mut rng = StdRng::seed_from_u64(7);
        let mut c = model.new_candidate(0, &mut rng);
        c.ended[0] = Some(2);
        let before = c.pos[0];
        model.apply_ratio(&mut c, 0.5);
        assert_eq!(c.pos[0], before);
        let expected = model.phase_pos(c.platform, c.funding, Phase::PhaseI, 0.5);
        assert!((c.pos[1] - expected).abs() < 1e-12);
        let product: f64 = c.pos[1..].iter().product();
        assert!((c.overall_pos - product).abs() < 1e-12);
    }
}
