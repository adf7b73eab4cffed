//! Critical-path scheduling of manufacturing preparation tasks.
//!
//! A [`TaskGraph`] is built per call from the activity template, scaled by
//! the platform and funding duration ratios and rewired by the funding
//! flags, then evaluated with a single forward pass. The approval task's end
//! is pinned to the candidate's simulated approval month.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ActivityConfig, FundingConfig, PlatformConfig};
use crate::sim::sampling::{round_months, triangular};

/// Minimum gap between primary and secondary manufacturing start (months).
pub const MIN_SECONDARY_GAP: i32 = 3;

/// Duration distribution of one activity, in months.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurationDist {
    Static { months: f64 },
    Triangular { low: f64, mode: f64, high: f64 },
}

impl DurationDist {
    /// Draws one duration. Static durations consume no randomness.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            DurationDist::Static { months } => months,
            DurationDist::Triangular { low, mode, high } => triangular(rng, low, mode, high),
        }
    }

    /// Multiplies every parameter by `ratio`.
    pub fn scaled(&self, ratio: f64) -> Self {
        match *self {
            DurationDist::Static { months } => DurationDist::Static {
                months: months * ratio,
            },
            DurationDist::Triangular { low, mode, high } => DurationDist::Triangular {
                low: low * ratio,
                mode: mode * ratio,
                high: high * ratio,
            },
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            DurationDist::Static { months } => months >= 0.0,
            DurationDist::Triangular { low, mode, high } => {
                low >= 0.0 && low <= mode && mode <= high
            }
        }
    }
}

/// Which duration ratio scales an activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    #[default]
    ValueChain,
    TechTransfer,
}

/// Special meaning of an activity in the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityRole {
    #[default]
    Task,
    /// End pinned to the simulated approval month.
    Approval,
    /// Starts at the epoch when tech transfer is simultaneous.
    PrimaryScaleUp,
    /// Starts at the epoch when tech transfer is simultaneous.
    SecondaryScaleUp,
    /// End is the primary manufacturing start; ungated from approval when
    /// the funding category manufactures at risk.
    PrimaryStart,
    /// End is the secondary manufacturing start.
    SecondaryStart,
}

/// One node of the preparation graph with its computed dates.
#[derive(Debug, Clone)]
pub struct ScheduleTask {
    pub id: u32,
    pub role: ActivityRole,
    pub predecessors: Vec<u32>,
    pub duration: DurationDist,
    pub start: f64,
    pub end: f64,
}

/// Months at which manufacturing may begin for one approved candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ManufacturingStart {
    pub primary: i32,
    pub secondary: i32,
}

/// Preparation task graph for one (platform, funding) combination.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<ScheduleTask>,
    duration_factor: f64,
}

impl TaskGraph {
    /// Builds a fresh graph from the activity template.
    ///
    /// Activities must already be listed in topological order (checked by
    /// configuration validation).
    pub fn build(
        activities: &[ActivityConfig],
        platform: &PlatformConfig,
        funding: &FundingConfig,
    ) -> Self {
        let tasks = activities
            .iter()
            .map(|a| {
                let ratio = match a.chain {
                    Chain::ValueChain => platform.value_chain_ratio * funding.value_chain_ratio,
                    Chain::TechTransfer => {
                        platform.tech_transfer_ratio * funding.tech_transfer_ratio
                    }
                };
                let predecessors = match a.role {
                    ActivityRole::PrimaryScaleUp | ActivityRole::SecondaryScaleUp
                        if funding.simultaneous_tech_transfer =>
                    {
                        Vec::new()
                    }
                    ActivityRole::PrimaryStart if funding.manufacture_before_approval => {
                        let approval_ids: Vec<u32> = activities
                            .iter()
                            .filter(|b| b.role == ActivityRole::Approval)
                            .map(|b| b.id)
                            .collect();
                        a.after
                            .iter()
                            .copied()
                            .filter(|id| !approval_ids.contains(id))
                            .collect()
                    }
                    _ => a.after.clone(),
                };
                ScheduleTask {
                    id: a.id,
                    role: a.role,
                    predecessors,
                    duration: a.duration.scaled(ratio),
                    start: 0.0,
                    end: 0.0,
                }
            })
            .collect();

        Self {
            tasks,
            duration_factor: funding.duration_factor,
        }
    }

    /// Evaluates every task once in template order.
    ///
    /// Each task starts at the latest end among its predecessors (or the
    /// epoch) and lasts one sampled duration scaled by the funding factor;
    /// the approval task ends at `approval_month` regardless of duration.
    pub fn forward_pass<R: Rng + ?Sized>(&mut self, rng: &mut R, approval_month: f64) {
        let mut ends: HashMap<u32, f64> = HashMap::with_capacity(self.tasks.len());
        for task in &mut self.tasks {
            task.start = task
                .predecessors
                .iter()
                .filter_map(|id| ends.get(id).copied())
                .fold(0.0, f64::max);
            task.end = if task.role == ActivityRole::Approval {
                approval_month
            } else {
                task.start + task.duration.sample(rng) * self.duration_factor
            };
            ends.insert(task.id, task.end);
        }
    }

    pub fn tasks(&self) -> &[ScheduleTask] {
        &self.tasks
    }

    fn end_of(&self, role: ActivityRole) -> f64 {
        self.tasks
            .iter()
            .filter(|t| t.role == role)
            .map(|t| t.end)
            .fold(0.0, f64::max)
    }

    /// Extracts the manufacturing start months after a forward pass.
    pub fn manufacturing_start(&self) -> ManufacturingStart {
        let primary = round_months(self.end_of(ActivityRole::PrimaryStart));
        let secondary = round_months(self.end_of(ActivityRole::SecondaryStart));
        ManufacturingStart {
            primary,
            secondary: secondary.max(primary + MIN_SECONDARY_GAP),
        }
    }
}

/// Computes primary/secondary manufacturing start months for a candidate
/// approved at `approval_month`.
pub fn schedule_manufacturing<R: Rng + ?Sized>(
    rng: &mut R,
    activities: &[ActivityConfig],
    platform: &PlatformConfig,
    funding: &FundingConfig,
    approval_month: u32,
) -> ManufacturingStart {
    let mut graph = TaskGraph::build(activities, platform, funding);
    graph.forward_pass(rng, f64::from(approval_month));
    graph.manufacturing_start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::sim::types::{Funding, Platform};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn activity(id: u32, role: ActivityRole, after: &[u32], months: f64) -> ActivityConfig {
        ActivityConfig {
            id,
            name: format!("task {id}"),
            chain: Chain::ValueChain,
            role,
            after: after.to_vec(),
            duration: DurationDist::Static { months },
        }
    }

    /// Scale-up (2) -> primary start (4, gated on approval 3) -> secondary start (5).
    fn chain_template() -> Vec<ActivityConfig> {
        vec![
            activity(1, ActivityRole::PrimaryScaleUp, &[], 2.0),
            activity(2, ActivityRole::SecondaryScaleUp, &[1], 2.0),
            activity(3, ActivityRole::Approval, &[], 0.0),
            activity(4, ActivityRole::PrimaryStart, &[1, 3], 1.0),
            activity(5, ActivityRole::SecondaryStart, &[2, 4], 1.0),
        ]
    }

    fn unit_platform_and_funding() -> (PlatformConfig, FundingConfig) {
        let cfg = ScenarioConfig::baseline();
        let mut platform = cfg.platform(Platform::Rna);
        platform.value_chain_ratio = 1.0;
        platform.tech_transfer_ratio = 1.0;
        let mut funding = cfg.funding(Funding::LargePharma);
        funding.value_chain_ratio = 1.0;
        funding.tech_transfer_ratio = 1.0;
        funding.duration_factor = 1.0;
        funding.simultaneous_tech_transfer = false;
        funding.manufacture_before_approval = false;
        (platform, funding)
    }

    #[test]
    fn forward_pass_uses_latest_predecessor() {
        let (platform, funding) = unit_platform_and_funding();
        let mut rng = StdRng::seed_from_u64(1);
        let mut graph = TaskGraph::build(&chain_template(), &platform, &funding);
        graph.forward_pass(&mut rng, 10.0);
        let tasks = graph.tasks();
        assert_eq!(tasks[2].end, 10.0);
        // primary start waits for approval (10) rather than scale-up (2)
        assert_eq!(tasks[3].start, 10.0);
        assert_eq!(tasks[3].end, 11.0);
        assert_eq!(tasks[4].start, 11.0);
    }

    #[test]
    fn secondary_gap_is_enforced() {
        let (platform, funding) = unit_platform_and_funding();
        let mut rng = StdRng::seed_from_u64(2);
        let start = schedule_manufacturing(&mut rng, &chain_template(), &platform, &funding, 10);
        assert_eq!(start.primary, 11);
        assert_eq!(start.secondary, 14);
    }

    #[test]
    fn manufacturing_before_approval_ungates_primary() {
        let (platform, mut funding) = unit_platform_and_funding();
        funding.manufacture_before_approval = true;
        let mut rng = StdRng::seed_from_u64(3);
        let start = schedule_manufacturing(&mut rng, &chain_template(), &platform, &funding, 20);
        assert_eq!(start.primary, 3);
    }

    #[test]
    fn simultaneous_tech_transfer_starts_scale_ups_at_epoch() {
        let (platform, mut funding) = unit_platform_and_funding();
        funding.simultaneous_tech_transfer = true;
        let mut rng = StdRng::seed_from_u64(4);
        let mut graph = TaskGraph::build(&chain_template(), &platform, &funding);
        graph.forward_pass(&mut rng, 0.0);
        assert_eq!(graph.tasks()[1].start, 0.0);
        assert_eq!(graph.tasks()[1].end, 2.0);
    }

    #[test]
    fn ratios_scale_durations() {
        let (mut platform, mut funding) = unit_platform_and_funding();
        platform.value_chain_ratio = 2.0;
        funding.duration_factor = 1.5;
        let mut rng = StdRng::seed_from_u64(5);
        let mut graph = TaskGraph::build(&chain_template(), &platform, &funding);
        graph.forward_pass(&mut rng, 0.0);
        // 2 months * ratio 2 * factor 1.5
        assert_eq!(graph.tasks()[0].end, 6.0);
    }

    #[test]
    fn default_template_respects_gap_for_many_draws() {
        let cfg = ScenarioConfig::baseline();
        let mut rng = StdRng::seed_from_u64(9);
        for funding in Funding::ALL {
            for platform in Platform::ALL {
                for month in [1, 12, 40] {
                    let start = schedule_manufacturing(
                        &mut rng,
                        &cfg.manufacturing.activities,
                        &cfg.platform(platform),
                        &cfg.funding(funding),
                        month,
                    );
                    assert!(start.secondary >= start.primary + MIN_SECONDARY_GAP);
                }
            }
        }
    }

    #[test]
    fn triangular_duration_within_bounds() {
        let dist = DurationDist::Triangular {
            low: 1.0,
            mode: 2.0,
            high: 4.0,
        };
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..200 {
            let d = dist.sample(&mut rng);
            assert!((1.0..=4.0).contains(&d));
        }
        assert!(dist.is_valid());
        assert!(!DurationDist::Static { months: -1.0 }.is_valid());
    }
}
