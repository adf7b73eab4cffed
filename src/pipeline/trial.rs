//! Month-by-month development loop for one trial.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::warn;

use super::candidate::{BUYOUT_FUNDING, CandidateState, PipelineModel};
use crate::sim::clock::MonthClock;
use crate::sim::metric::{CountBucket, Group, Metric};
use crate::sim::sampling::{multiply_pos, round_months};
use crate::sim::types::{Funding, Phase, PhaseArray, Phase3Action, Platform, Status};
use crate::stats::StatAccumulator;

/// Highest approval count tracked by the approval-probability curve.
pub const MAX_APPROVAL_COUNT: u8 = 5;

/// Per phase and platform flags or counters.
type PlatformTable<T> = PhaseArray<[T; Platform::COUNT]>;

/// Completion months of one candidate in one trial, for the trials table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRow {
    /// 1-based trial number.
    pub trial: usize,
    pub candidate: u32,
    pub phase_i: Option<i32>,
    pub phase_ii: Option<i32>,
    pub phase_iii: Option<i32>,
    pub approval: Option<i32>,
}

/// Final state of one trial's development pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub candidates: Vec<CandidateState>,
    /// Roster indices in approval order.
    pub approved: Vec<usize>,
    pub buyouts: u32,
    pub first_month: Option<u32>,
}

impl PipelineOutcome {
    /// Rows for every candidate that completed at least one clinical phase.
    pub fn rows(&self, trial: usize) -> Vec<TrialRow> {
        self.candidates
            .iter()
            .filter(|c| c.ended[1..].iter().any(Option::is_some))
            .map(|c| TrialRow {
                trial: trial + 1,
                candidate: c.number,
                phase_i: c.ended[Phase::PhaseI.index()],
                phase_ii: c.ended[Phase::PhaseII.index()],
                phase_iii: c.ended[Phase::PhaseIII.index()],
                approval: c.ended[Phase::Approval.index()],
            })
            .collect()
    }
}

/// One trial of the clinical development pipeline.
///
/// Each month runs, in order: Phase III admission control, the phase
/// transitions of every active candidate in a fresh random order, the
/// platform correlation pass, the approval feedback pass and the census.
pub struct PipelineTrial<'a> {
    model: &'a PipelineModel<'a>,
    candidates: Vec<CandidateState>,
    successes: PlatformTable<u32>,
    failures: PlatformTable<u32>,
    approved: Vec<usize>,
    buyouts: u32,
    first_month: Option<u32>,
    first_months: HashMap<Group, u32>,
    /// Phase III trials still running at the end of the previous month.
    in_phase3: u32,
}

impl<'a> PipelineTrial<'a> {
    /// Initialises every roster candidate for a new trial.
    ///
    /// Phases completed before the epoch count as successes for the
    /// correlation aggregate.
    pub fn new<R: Rng + ?Sized>(model: &'a PipelineModel<'a>, rng: &mut R) -> Self {
        let candidates: Vec<CandidateState> = (0..model.cfg().candidates.len())
            .map(|i| model.new_candidate(i, rng))
            .collect();

        let mut trial = Self {
            model,
            candidates,
            successes: [[0; Platform::COUNT]; Phase::COUNT],
            failures: [[0; Platform::COUNT]; Phase::COUNT],
            approved: Vec::new(),
            buyouts: 0,
            first_month: None,
            first_months: HashMap::new(),
            in_phase3: 0,
        };
        for j in 0..trial.candidates.len() {
            let c = &trial.candidates[j];
            let p = c.platform.index();
            for phase in Phase::ALL {
                if c.has_completed(phase) {
                    trial.successes[phase.index()][p] += 1;
                }
            }
            if c.status == Status::Approved {
                trial.record_approval(j, 0);
            }
        }
        trial
    }

    pub fn candidates(&self) -> &[CandidateState] {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut [CandidateState] {
        &mut self.candidates
    }

    pub fn approved(&self) -> &[usize] {
        &self.approved
    }

    /// Runs months `0..=months` and returns the final pipeline state.
    pub fn run<R: Rng + ?Sized>(
        mut self,
        rng: &mut R,
        stats: &mut StatAccumulator<Metric>,
    ) -> PipelineOutcome {
        let horizon = self.model.cfg().simulation.months;
        MonthClock::new(horizon).run(|month| self.step(month, rng, stats));
        self.finish(stats)
    }

    /// Simulates one month. Month 0 only records PoS and the census.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        month: u32,
        rng: &mut R,
        stats: &mut StatAccumulator<Metric>,
    ) {
        let cfg = self.model.cfg();
        let now = month as i32;
        if month > 0 && cfg.phase3_limit.enabled {
            self.limit_phase3(now, rng);
        }

        let mut events: PlatformTable<bool> = [[false; Platform::COUNT]; Phase::COUNT];
        let mut approvals = 0usize;
        let mut order: Vec<usize> = (0..self.candidates.len()).collect();
        order.shuffle(rng);
        for j in order {
            if self.candidates[j].status.is_terminal() {
                continue;
            }
            self.record_pos(month, j, stats);
            if month > 0 && self.advance(j, now, rng, stats, &mut events) {
                approvals += 1;
            }
        }

        let feedback = &cfg.feedback;
        if feedback.update_pos && events.iter().flatten().any(|&e| e) {
            self.correlate(&events);
        }
        if feedback.update_approval
            && approvals > 0
            && self.approved.len() >= feedback.approval_limit as usize
        {
            self.approval_feedback();
        }
        self.census(month, stats);
    }

    fn record_pos(&self, month: u32, j: usize, stats: &mut StatAccumulator<Metric>) {
        let c = &self.candidates[j];
        let (platform, funding) = (c.platform, c.funding);
        stats.add(Metric::PosPlatform { month, platform }, c.overall_pos);
        stats.add(Metric::PosFunding { month, funding }, c.overall_pos);
        stats.add(
            Metric::PosPlatformFunding {
                month,
                platform,
                funding,
            },
            c.overall_pos,
        );
    }

    /// Resolves every phase of candidate `j` ending this month.
    ///
    /// Returns `true` if the candidate was approved.
    fn advance<R: Rng + ?Sized>(
        &mut self,
        j: usize,
        now: i32,
        rng: &mut R,
        stats: &mut StatAccumulator<Metric>,
        events: &mut PlatformTable<bool>,
    ) -> bool {
        let model = self.model;
        let cfg = model.cfg();
        for phase in Phase::ALL {
            let i = phase.index();
            let c = &mut self.candidates[j];
            if c.end[i] != now || c.has_completed(phase) {
                continue;
            }
            let platform = c.platform;
            let p = platform.index();
            stats.add(
                Metric::PhaseLength { phase, platform },
                f64::from(c.end[i] - c.start[i]),
            );
            stats.add(Metric::PhaseNumbers { phase, platform }, 1.0);

            let u: f64 = rng.random();
            if u > c.pos[i] {
                c.status = Status::Failed;
                stats.add(Metric::PhaseSuccess { phase, platform }, 0.0);
                let technical: f64 = rng.random();
                if technical < model.funding(c.funding).tech_failure {
                    events[i][p] = true;
                    self.failures[i][p] += 1;
                }
                return false;
            }

            stats.add(Metric::PhaseSuccess { phase, platform }, 1.0);
            events[i][p] = true;
            self.successes[i][p] += 1;
            c.ended[i] = Some(now);
            c.refresh_overall_pos();

            if phase == Phase::Approval {
                c.status = Status::Approved;
                self.record_approval(j, now as u32);
                return true;
            }

            if phase == Phase::PhaseI
                && cfg.buyout.enabled
                && c.funding == Funding::BiotechAcademic
            {
                let u: f64 = rng.random();
                if u < cfg.buyout.fraction {
                    self.buyouts += 1;
                    c.funding = BUYOUT_FUNDING;
                    model.reinitialise(c, Phase::PhaseII, now, rng);
                }
            }
        }
        false
    }

    fn record_approval(&mut self, j: usize, month: u32) {
        self.approved.push(j);
        self.first_month.get_or_insert(month);
        let c = &self.candidates[j];
        let mut groups = vec![Group::Platform(c.platform), Group::All];
        if c.cepi {
            groups.push(Group::Cepi);
        }
        if c.ows {
            groups.push(Group::Ows);
        }
        for group in groups {
            self.first_months.entry(group).or_insert(month);
        }
    }

    /// Delays or slows candidates entering Phase III above the concurrency limit.
    fn limit_phase3<R: Rng + ?Sized>(&mut self, now: i32, rng: &mut R) {
        let limit = &self.model.cfg().phase3_limit;
        let p3 = Phase::PhaseIII.index();
        let ap = Phase::Approval.index();
        let mut running = self.in_phase3;
        let mut order: Vec<usize> = (0..self.candidates.len()).collect();
        order.shuffle(rng);
        for j in order {
            let c = &mut self.candidates[j];
            if c.status.is_terminal() || c.start[p3] != now {
                continue;
            }
            running += 1;
            if running <= limit.limit {
                continue;
            }
            match limit.action {
                Phase3Action::Stop => {
                    for i in [p3, ap] {
                        c.start[i] += 1;
                        c.end[i] += 1;
                    }
                }
                Phase3Action::SlowDown => {
                    let months = c.end[p3] - c.start[p3];
                    let stretched = round_months(f64::from(months) * limit.factor);
                    c.end[p3] = c.start[p3] + stretched;
                    c.start[ap] += stretched - months;
                    c.end[ap] += stretched - months;
                }
            }
        }
    }

    /// Blends each correlated platform's observed success rate into the PoS
    /// of its still-active candidates.
    ///
    /// Only phases with an event this month contribute; Phase I and II need
    /// at least one technical failure. When several phases qualify the
    /// highest one sets the ratio.
    fn correlate(&mut self, events: &PlatformTable<bool>) {
        let model = self.model;
        let cfg = model.cfg();
        for platform in Platform::ALL {
            let p = platform.index();
            let correlation = cfg
                .correlation_values
                .value(model.platform(platform).correlation);
            if correlation <= 0.0 {
                continue;
            }

            let mut ratio = None;
            for phase in [Phase::PhaseI, Phase::PhaseII, Phase::PhaseIII] {
                let i = phase.index();
                let (s, f) = (self.successes[i][p], self.failures[i][p]);
                if !events[i][p] || s + f == 0 || (phase != Phase::PhaseIII && f == 0) {
                    continue;
                }
                let base = model.base_pos(platform, phase);
                if base <= 0.0 {
                    warn!(%platform, %phase, "base PoS is zero, correlation update skipped");
                    continue;
                }
                let aggregate = f64::from(s) / f64::from(s + f);
                let blended = (aggregate - base) * correlation + base;
                ratio = Some(blended / base);
            }

            let Some(ratio) = ratio else { continue };
            for c in self
                .candidates
                .iter_mut()
                .filter(|c| c.platform == platform && !c.status.is_terminal())
            {
                model.apply_ratio(c, ratio);
            }
        }
    }

    /// Lowers the Approval PoS and stretches the Approval phase of every
    /// active candidate once enough candidates have been approved.
    fn approval_feedback(&mut self) {
        let feedback = &self.model.cfg().feedback;
        let ap = Phase::Approval.index();
        for c in self.candidates.iter_mut().filter(|c| !c.status.is_terminal()) {
            c.approval_factor *= feedback.approval_pos;
            if c.has_completed(Phase::Approval) {
                continue;
            }
            c.pos[ap] = multiply_pos(c.pos[ap], feedback.approval_pos);
            let months = c.end[ap] - c.start[ap];
            c.end[ap] = c.start[ap] + round_months(f64::from(months) * feedback.approval_timeline);
            c.refresh_overall_pos();
        }
    }

    /// Counts candidates by phase at the end of the month.
    fn census(&mut self, month: u32, stats: &mut StatAccumulator<Metric>) {
        let now = month as i32;
        let mut in_phase = [0u32; Phase::COUNT];
        let (mut phase_i2, mut phase_ii3, mut approved, mut total, mut in_phase3) =
            (0u32, 0u32, 0u32, 0u32, 0u32);

        for c in self.candidates.iter().filter(|c| c.status != Status::Failed) {
            let active = Phase::ALL.map(|p| c.is_active_in(p, now));
            for (count, _) in in_phase.iter_mut().zip(active).filter(|(_, a)| *a) {
                *count += 1;
            }
            let [_, one, two, three, _] = active;
            if one && two && !three {
                phase_i2 += 1;
            }
            if !one && two && three {
                phase_ii3 += 1;
            }
            if c.status == Status::Approved {
                approved += 1;
            }
            if three && c.end[Phase::PhaseIII.index()] != now {
                in_phase3 += 1;
            }
            total += 1;
        }
        self.in_phase3 = in_phase3;

        for phase in Phase::ALL {
            stats.add(
                Metric::Count {
                    month,
                    bucket: CountBucket::InPhase(phase),
                },
                f64::from(in_phase[phase.index()]),
            );
        }
        for (bucket, value) in [
            (CountBucket::PhaseI2, phase_i2),
            (CountBucket::PhaseII3, phase_ii3),
            (CountBucket::Approved, approved),
            (CountBucket::Total, total),
        ] {
            stats.add(Metric::Count { month, bucket }, f64::from(value));
        }
        if approved == 0 {
            stats.add(Metric::ApprovalProb { month, at_least: 0 }, 1.0);
        }
        for k in 1..=MAX_APPROVAL_COUNT {
            if approved >= u32::from(k) {
                stats.add(Metric::ApprovalProb { month, at_least: k }, 1.0);
            }
        }
    }

    /// Records the per-trial summaries and hands back the final state.
    pub fn finish(self, stats: &mut StatAccumulator<Metric>) -> PipelineOutcome {
        for c in &self.candidates {
            for phase in Phase::ALL {
                if let Some(month) = c.ended[phase.index()] {
                    stats.add(
                        Metric::End {
                            candidate: c.index,
                            phase,
                        },
                        f64::from(month),
                    );
                }
            }
        }
        stats.add(Metric::Buyouts, f64::from(self.buyouts));
        stats.add(
            Metric::FirstMonth {
                month: self.first_month,
            },
            1.0,
        );
        for (group, month) in &self.first_months {
            stats.add(Metric::FirstMonths { group: *group }, f64::from(*month));
        }

        PipelineOutcome {
            candidates: self.candidates,
            approved: self.approved,
            buyouts: self.buyouts,
            first_month: self.first_month,
        }
    }
}
