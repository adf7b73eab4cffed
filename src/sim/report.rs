//! Cross-trial summary built once all trials have been merged.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use super::engine::TrialOutcome;
use super::metric::{CountBucket, Group, Metric};
use super::types::{Funding, Phase, Platform};
use crate::config::{DEMAND_GROUPS, ScenarioConfig};
use crate::pipeline::check::{CandidateCheck, cross_check};
use crate::pipeline::trial::MAX_APPROVAL_COUNT;
use crate::stats::{StatAccumulator, binomial_error, percentile};

/// Percentiles of the cumulative production trend.
pub const TREND_PERCENTILES: [f64; 5] = [0.10, 0.25, 0.50, 0.75, 0.90];

/// Mean and sample standard deviation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Estimate {
    pub mean: f64,
    pub stddev: f64,
}

impl Estimate {
    fn of(stats: &StatAccumulator<Metric>, key: &Metric) -> Self {
        Self {
            mean: stats.mean(key),
            stddev: stats.stddev(key),
        }
    }
}

/// Success ratio with its asymmetric Poisson error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Efficiency {
    pub value: f64,
    pub error: f64,
}

impl Efficiency {
    pub fn new(n: u64, total: u64) -> Self {
        let value = if total == 0 { 0.0 } else { n as f64 / total as f64 };
        Self {
            value,
            error: binomial_error(n, total),
        }
    }
}

/// Candidate census and approval probabilities at one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRow {
    pub month: u32,
    pub in_phase: [Estimate; Phase::COUNT],
    pub phase_i2: Estimate,
    pub phase_ii3: Estimate,
    pub approved: Estimate,
    pub total: Estimate,
    /// Index 0: no candidate approved; index k: at least k approved.
    pub approval_prob: [Efficiency; MAX_APPROVAL_COUNT as usize + 1],
    /// Mean overall PoS of active candidates.
    pub pos_platform: [f64; Platform::COUNT],
    pub pos_funding: [f64; Funding::COUNT],
    pub pos_platform_funding: [[f64; Funding::COUNT]; Platform::COUNT],
}

/// Length and outcome of one phase for one platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseStats {
    pub platform: Platform,
    pub phase: Phase,
    /// Mean number of phase completions attempted per trial.
    pub attempts: f64,
    pub success: Efficiency,
    pub length: Estimate,
}

/// How often and when a candidate finished a phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Finish {
    pub efficiency: Efficiency,
    pub month: Estimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
    pub number: u32,
    pub name: String,
    pub platform: Platform,
    pub funding: Funding,
    pub finished: [Finish; Phase::COUNT],
    /// Fraction of trials approving both this candidate and each roster
    /// candidate, in roster order.
    pub co_approval: Vec<f64>,
    /// 1-based position in the ranking.
    pub rank: usize,
}

/// One entry of the greedy best-candidate cover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestCandidate {
    pub number: u32,
    pub name: String,
    /// Fraction of trials newly covered by this candidate.
    pub percent: f64,
    pub cumulative: f64,
}

/// Approval outcomes for a portfolio group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    /// P(at least 1, 2, 3 approvals in the group).
    pub success: [Efficiency; 3],
    pub per_run: f64,
    pub per_successful_run: f64,
    pub first_month: Estimate,
}

/// Months at which P(at least one approval) first reaches 50/90/99%.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Benchmark {
    pub prob50: Option<u32>,
    pub prob90: Option<u32>,
    pub prob99: Option<u32>,
    pub final_prob: Efficiency,
    pub final_mean_approved: f64,
}

/// Distribution of the first approval month over trials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirstMonthDistribution {
    /// Fraction of trials whose first approval was at each month.
    pub by_month: Vec<f64>,
    /// Fraction of trials with no approval.
    pub never: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub monthly: Vec<MonthRow>,
    pub phases: Vec<PhaseStats>,
    pub candidates: Vec<CandidateSummary>,
    /// Candidate numbers in rank order.
    pub ranking: Vec<u32>,
    pub best: Vec<BestCandidate>,
    pub groups: Vec<GroupSummary>,
    pub benchmark: Benchmark,
    pub first_month: FirstMonthDistribution,
    pub mean_buyouts: f64,
    pub checks: Vec<CandidateCheck>,
}

/// Manufacturing timeline of approved candidates per platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformTimeline {
    pub platform: Platform,
    /// Mean approvals per trial.
    pub approvals: f64,
    pub approval_month: Estimate,
    pub primary_start: Estimate,
    pub secondary_start: Estimate,
    /// Doses per month per approved candidate.
    pub monthly_capacity: Estimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSummary {
    /// Cumulative doses required.
    pub doses_required: f64,
    pub reached: Efficiency,
    /// Month reached, over trials that reached it (0 if none did).
    pub month: Estimate,
    pub doses: f64,
    pub platform_doses: [f64; Platform::COUNT],
    /// Mean doses per roster candidate, in roster order.
    pub candidate_doses: Vec<f64>,
}

/// Cumulative production as a fraction of the largest target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub month: u32,
    pub percentiles: [f64; TREND_PERCENTILES.len()],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManufacturingSummary {
    pub timeline: Vec<PlatformTimeline>,
    pub targets: Vec<TargetSummary>,
    pub trend: Vec<TrendRow>,
}

/// Cross-trial results of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub tries: usize,
    pub months: u32,
    pub seed: u64,
    pub pipeline: PipelineSummary,
    /// `None` when manufacturing is disabled.
    pub manufacturing: Option<ManufacturingSummary>,
}

impl RunReport {
    /// Builds the report from the merged statistics and per-trial outcomes.
    pub fn build(cfg: &ScenarioConfig, stats: &StatAccumulator<Metric>, trials: &[TrialOutcome]) -> Self {
        let tries = cfg.simulation.tries as u64;
        let monthly = monthly_rows(cfg, stats, tries);
        let approved: Vec<&[usize]> = trials.iter().map(|t| t.approved.as_slice()).collect();
        let mut candidates = candidate_summaries(cfg, stats, &approved, tries);
        let ranking = rank_candidates(&mut candidates);

        let pipeline = PipelineSummary {
            phases: phase_stats(stats, tries),
            best: best_cover(cfg, &approved, cfg.simulation.best_candidates),
            groups: group_summaries(cfg, stats, &approved),
            benchmark: benchmark(&monthly, stats, cfg.simulation.months),
            first_month: first_month_distribution(stats, cfg.simulation.months, tries),
            mean_buyouts: stats.mean(&Metric::Buyouts),
            checks: cross_check(cfg),
            monthly,
            candidates,
            ranking,
        };

        let manufacturing = cfg
            .manufacturing
            .enabled
            .then(|| manufacturing_summary(cfg, stats, trials, tries));

        Self {
            tries: cfg.simulation.tries,
            months: cfg.simulation.months,
            seed: cfg.simulation.seed,
            pipeline,
            manufacturing,
        }
    }

    /// P(at least one approval) at `month`, 0 past the horizon.
    pub fn approval_probability(&self, month: u32) -> f64 {
        self.pipeline
            .monthly
            .get(month as usize)
            .map_or(0.0, |row| row.approval_prob[1].value)
    }
}

fn monthly_rows(cfg: &ScenarioConfig, stats: &StatAccumulator<Metric>, tries: u64) -> Vec<MonthRow> {
    (0..=cfg.simulation.months)
        .map(|month| {
            let count = |bucket| Estimate::of(stats, &Metric::Count { month, bucket });
            MonthRow {
                month,
                in_phase: Phase::ALL.map(|phase| count(CountBucket::InPhase(phase))),
                phase_i2: count(CountBucket::PhaseI2),
                phase_ii3: count(CountBucket::PhaseII3),
                approved: count(CountBucket::Approved),
                total: count(CountBucket::Total),
                approval_prob: std::array::from_fn(|k| {
                    let key = Metric::ApprovalProb {
                        month,
                        at_least: k as u8,
                    };
                    Efficiency::new(stats.count(&key), tries)
                }),
                pos_platform: Platform::ALL.map(|platform| stats.mean(&Metric::PosPlatform { month, platform })),
                pos_funding: Funding::ALL.map(|funding| stats.mean(&Metric::PosFunding { month, funding })),
                pos_platform_funding: Platform::ALL.map(|platform| {
                    Funding::ALL.map(|funding| {
                        stats.mean(&Metric::PosPlatformFunding {
                            month,
                            platform,
                            funding,
                        })
                    })
                }),
            }
        })
        .collect()
}

fn phase_stats(stats: &StatAccumulator<Metric>, tries: u64) -> Vec<PhaseStats> {
    let mut rows = Vec::new();
    for platform in Platform::ALL {
        for phase in Phase::ALL {
            let attempts = stats.count(&Metric::PhaseNumbers { phase, platform });
            if attempts == 0 {
                continue;
            }
            let successes = stats
                .sums(&Metric::PhaseSuccess { phase, platform })
                .map_or(0, |s| s.sum.round() as u64);
            rows.push(PhaseStats {
                platform,
                phase,
                attempts: attempts as f64 / tries.max(1) as f64,
                success: Efficiency::new(successes, attempts),
                length: Estimate::of(stats, &Metric::PhaseLength { phase, platform }),
            });
        }
    }
    rows
}

fn candidate_summaries(
    cfg: &ScenarioConfig,
    stats: &StatAccumulator<Metric>,
    approved: &[&[usize]],
    tries: u64,
) -> Vec<CandidateSummary> {
    let n = cfg.candidates.len();
    let mut together = vec![vec![0u64; n]; n];
    for list in approved {
        for &a in *list {
            for &b in *list {
                together[a][b] += 1;
            }
        }
    }

    cfg.candidates
        .iter()
        .enumerate()
        .map(|(candidate, c)| CandidateSummary {
            number: c.number,
            name: c.name.clone(),
            platform: c.platform,
            funding: c.funding,
            finished: Phase::ALL.map(|phase| {
                let key = Metric::End { candidate, phase };
                Finish {
                    efficiency: Efficiency::new(stats.count(&key), tries),
                    month: Estimate::of(stats, &key),
                }
            }),
            co_approval: together[candidate]
                .iter()
                .map(|&k| if tries == 0 { 0.0 } else { k as f64 / tries as f64 })
                .collect(),
            rank: 0,
        })
        .collect()
}

/// Approval efficiency descending, then mean approval month ascending,
/// falling back to earlier phases on ties.
fn rank_order(a: &CandidateSummary, b: &CandidateSummary) -> Ordering {
    for (fa, fb) in a.finished.iter().zip(&b.finished).rev() {
        let ord = fb
            .efficiency
            .value
            .total_cmp(&fa.efficiency.value)
            .then(fa.month.mean.total_cmp(&fb.month.mean));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn rank_candidates(candidates: &mut [CandidateSummary]) -> Vec<u32> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| rank_order(&candidates[a], &candidates[b]));
    for (rank, &i) in order.iter().enumerate() {
        candidates[i].rank = rank + 1;
    }
    order.iter().map(|&i| candidates[i].number).collect()
}

/// Greedy cover: repeatedly picks the candidate approved in the most trials
/// not yet covered by an earlier pick.
fn best_cover(cfg: &ScenarioConfig, approved: &[&[usize]], limit: usize) -> Vec<BestCandidate> {
    let tries = approved.len().max(1) as f64;
    let mut covered = vec![false; approved.len()];
    let mut picked = vec![false; cfg.candidates.len()];
    let mut best = Vec::new();
    let mut cumulative = 0.0;

    while best.len() < limit {
        let mut hits = vec![0usize; cfg.candidates.len()];
        for (list, _) in approved.iter().zip(&covered).filter(|(_, c)| !**c) {
            for &j in *list {
                hits[j] += 1;
            }
        }
        let Some((j, &n)) = hits
            .iter()
            .enumerate()
            .filter(|(j, n)| !picked[*j] && **n > 0)
            .max_by(|(a, x), (b, y)| x.cmp(y).then(b.cmp(a)))
        else {
            break;
        };
        picked[j] = true;
        for (list, cover) in approved.iter().zip(covered.iter_mut()) {
            if list.contains(&j) {
                *cover = true;
            }
        }
        let percent = n as f64 / tries;
        cumulative += percent;
        best.push(BestCandidate {
            number: cfg.candidates[j].number,
            name: cfg.candidates[j].name.clone(),
            percent,
            cumulative,
        });
    }
    best
}

fn group_summaries(
    cfg: &ScenarioConfig,
    stats: &StatAccumulator<Metric>,
    approved: &[&[usize]],
) -> Vec<GroupSummary> {
    let tries = approved.len() as u64;
    Group::all()
        .into_iter()
        .map(|group| {
            let member = |j: usize| {
                let c = &cfg.candidates[j];
                match group {
                    Group::Platform(p) => c.platform == p,
                    Group::Cepi => c.cepi,
                    Group::Ows => c.ows,
                    Group::All => true,
                }
            };
            let counts: Vec<usize> = approved
                .iter()
                .map(|list| list.iter().filter(|&&j| member(j)).count())
                .collect();
            let total: usize = counts.iter().sum();
            let successful = counts.iter().filter(|&&n| n > 0).count();
            let at_least = |k: usize| counts.iter().filter(|&&n| n >= k).count() as u64;
            GroupSummary {
                group: group.name(),
                success: [1, 2, 3].map(|k| Efficiency::new(at_least(k), tries)),
                per_run: if tries == 0 { 0.0 } else { total as f64 / tries as f64 },
                per_successful_run: if successful == 0 {
                    0.0
                } else {
                    total as f64 / successful as f64
                },
                first_month: Estimate::of(stats, &Metric::FirstMonths { group }),
            }
        })
        .collect()
}

fn benchmark(monthly: &[MonthRow], stats: &StatAccumulator<Metric>, months: u32) -> Benchmark {
    let first_reaching = |p: f64| {
        monthly
            .iter()
            .find(|row| row.approval_prob[1].value >= p)
            .map(|row| row.month)
    };
    Benchmark {
        prob50: first_reaching(0.5),
        prob90: first_reaching(0.9),
        prob99: first_reaching(0.99),
        final_prob: monthly.last().map_or_else(Efficiency::default, |row| row.approval_prob[1]),
        final_mean_approved: stats.mean(&Metric::Count {
            month: months,
            bucket: CountBucket::Approved,
        }),
    }
}

fn first_month_distribution(stats: &StatAccumulator<Metric>, months: u32, tries: u64) -> FirstMonthDistribution {
    let fraction = |month| stats.efficiency(&Metric::FirstMonth { month }, tries);
    FirstMonthDistribution {
        by_month: (0..=months).map(|m| fraction(Some(m))).collect(),
        never: fraction(None),
    }
}

fn manufacturing_summary(
    cfg: &ScenarioConfig,
    stats: &StatAccumulator<Metric>,
    trials: &[TrialOutcome],
    tries: u64,
) -> ManufacturingSummary {
    let timeline = Platform::ALL
        .into_iter()
        .filter_map(|platform| {
            let key = Metric::ApprovalMonth { platform };
            let n = stats.count(&key);
            (n > 0).then(|| PlatformTimeline {
                platform,
                approvals: n as f64 / tries.max(1) as f64,
                approval_month: Estimate::of(stats, &key),
                primary_start: Estimate::of(stats, &Metric::PrimaryStart { platform }),
                secondary_start: Estimate::of(stats, &Metric::SecondaryStart { platform }),
                monthly_capacity: Estimate::of(stats, &Metric::MonthlyCapacity { platform }),
            })
        })
        .collect();

    let required = cfg.manufacturing.demand_targets();
    let targets = (0..DEMAND_GROUPS)
        .map(|target| TargetSummary {
            doses_required: required[target],
            reached: Efficiency::new(stats.count(&Metric::TargetMonth { target }), tries),
            month: Estimate::of(stats, &Metric::TargetMonth { target }),
            doses: stats.mean(&Metric::TargetDoses { target }),
            platform_doses: Platform::ALL
                .map(|platform| stats.mean(&Metric::TargetPlatformDoses { target, platform })),
            candidate_doses: (0..cfg.candidates.len())
                .map(|candidate| stats.mean(&Metric::TargetCandidateDoses { target, candidate }))
                .collect(),
        })
        .collect();

    let largest = required.iter().copied().fold(0.0, f64::max);
    let trend = (1..=cfg.manufacturing.production_months)
        .map(|month| {
            let mut values: Vec<f64> = trials
                .iter()
                .map(|t| {
                    let doses = t.cumulative.get(month as usize - 1).copied().unwrap_or(0.0);
                    if largest > 0.0 { doses / largest } else { 0.0 }
                })
                .collect();
            TrendRow {
                month,
                percentiles: TREND_PERCENTILES.map(|q| percentile(&mut values, q)),
            }
        })
        .collect();

    ManufacturingSummary {
        timeline,
        targets,
        trend,
    }
}

fn month_or_none(month: Option<u32>) -> String {
    month.map_or_else(|| "not reached".to_string(), |m| m.to_string())
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.pipeline;
        writeln!(f, "--- Vaccine Pipeline Report ---")?;
        writeln!(
            f,
            "Trials:                {} ({} months, seed {})",
            self.tries, self.months, self.seed
        )?;
        let b = &p.benchmark;
        writeln!(
            f,
            "P(>=1 approval):       {:.1}% +/- {:.1}% at month {}",
            100.0 * b.final_prob.value,
            100.0 * b.final_prob.error,
            self.months
        )?;
        writeln!(f, "Mean approvals:        {:.2}", b.final_mean_approved)?;
        writeln!(
            f,
            "50/90/99% reached at:  {} / {} / {}",
            month_or_none(b.prob50),
            month_or_none(b.prob90),
            month_or_none(b.prob99)
        )?;
        writeln!(f, "Mean buyouts:          {:.2}", p.mean_buyouts)?;

        writeln!(f)?;
        writeln!(f, "Top candidates:")?;
        for number in p.ranking.iter().take(5) {
            let Some(c) = p.candidates.iter().find(|c| c.number == *number) else {
                continue;
            };
            let approval = &c.finished[Phase::Approval.index()];
            writeln!(
                f,
                "  {:>2}. #{:<3} {:<32} {:>5.1}% (month {:.1})",
                c.rank,
                c.number,
                c.name,
                100.0 * approval.efficiency.value,
                approval.month.mean
            )?;
        }

        if let Some(m) = &self.manufacturing {
            writeln!(f)?;
            writeln!(f, "Demand targets:")?;
            for (i, t) in m.targets.iter().enumerate() {
                writeln!(
                    f,
                    "  group {}: {:.3e} doses, reached in {:.1}% of trials (month {:.1})",
                    i + 1,
                    t.doses_required,
                    100.0 * t.reached.value,
                    t.month.mean
                )?;
            }
        }
        write!(f, "Cross checks:          {} candidates", p.checks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(number: u32, approval: f64, month: f64, phase3: f64) -> CandidateSummary {
        let mut finished = [Finish::default(); Phase::COUNT];
        finished[Phase::Approval.index()] = Finish {
            efficiency: Efficiency {
                value: approval,
                error: 0.0,
            },
            month: Estimate { mean: month, stddev: 0.0 },
        };
        finished[Phase::PhaseIII.index()].efficiency.value = phase3;
        CandidateSummary {
            number,
            name: format!("c{number}"),
            platform: Platform::Rna,
            funding: Funding::Government,
            finished,
            co_approval: Vec::new(),
            rank: 0,
        }
    }

    #[test]
    fn ranking_prefers_efficiency_then_speed_then_earlier_phases() {
        let mut candidates = vec![
            summary(1, 0.5, 20.0, 0.6),
            summary(2, 0.7, 30.0, 0.8),
            summary(3, 0.5, 15.0, 0.6),
            summary(4, 0.5, 20.0, 0.9),
        ];
        let ranking = rank_candidates(&mut candidates);
        assert_eq!(ranking, vec![2, 3, 4, 1]);
        assert_eq!(candidates[1].rank, 1);
        assert_eq!(candidates[0].rank, 4);
    }

    #[test]
    fn best_cover_picks_uncovered_trials() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.candidates.truncate(3);
        let trials: Vec<Vec<usize>> = vec![vec![0, 1], vec![0], vec![1], vec![2], vec![0]];
        let approved: Vec<&[usize]> = trials.iter().map(Vec::as_slice).collect();
        let best = best_cover(&cfg, &approved, 10);
        let numbers: Vec<u32> = best.iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!((best[0].percent - 0.6).abs() < 1e-12);
        assert!((best[1].percent - 0.2).abs() < 1e-12);
        assert!((best[2].cumulative - 1.0).abs() < 1e-12);
    }

    #[test]
    fn best_cover_respects_limit() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.candidates.truncate(3);
        let trials: Vec<Vec<usize>> = vec![vec![0], vec![1], vec![2]];
        let approved: Vec<&[usize]> = trials.iter().map(Vec::as_slice).collect();
        assert_eq!(best_cover(&cfg, &approved, 2).len(), 2);
        assert!(best_cover(&cfg, &[], 5).is_empty());
    }

    #[test]
    fn efficiency_of_empty_total_is_zero() {
        let e = Efficiency::new(0, 0);
        assert_eq!(e.value, 0.0);
        assert_eq!(e.error, 0.0);
    }

    #[test]
    fn group_counts_cover_all_and_programs() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.candidates.truncate(3);
        let stats = StatAccumulator::new();
        let trials: Vec<Vec<usize>> = vec![vec![0, 1], vec![], vec![2], vec![1]];
        let approved: Vec<&[usize]> = trials.iter().map(Vec::as_slice).collect();
        let groups = group_summaries(&cfg, &stats, &approved);
        let all = groups.iter().find(|g| g.group == "All").map(|g| g.success[0].value);
        assert_eq!(all, Some(0.75));
        let all_per_run = groups.iter().find(|g| g.group == "All").map(|g| g.per_run);
        assert_eq!(all_per_run, Some(1.0));
        let rna = groups
            .iter()
            .find(|g| g.group == Platform::Rna.name())
            .map(|g| g.per_successful_run);
        // candidates 2 and 3 are RNA
        assert_eq!(rna, Some(1.0));
    }
}
