//! Manufacturing scheduling, capacity allocation and production for the
//! candidates approved in one trial.

pub mod allocation;
pub mod production;
pub mod schedule;

use rand::Rng;

use crate::config::ScenarioConfig;
use crate::pipeline::candidate::CandidateState;
use crate::sim::metric::Metric;
use crate::sim::types::Platform;
use crate::stats::StatAccumulator;
use allocation::{Allocation, ApprovedCandidate, CapacityPool};
use production::Production;
use schedule::schedule_manufacturing;

/// Manufacturing result of one trial.
#[derive(Debug, Clone)]
pub struct ManufacturingOutcome {
    pub allocations: Vec<Allocation>,
    pub production: Production,
}

/// Schedules, allocates and produces for the approved candidates.
///
/// `approved` holds roster indices in approval order. Pre-epoch approvals
/// are scheduled from month 0.
pub fn simulate_manufacturing<R: Rng + ?Sized>(
    cfg: &ScenarioConfig,
    candidates: &[CandidateState],
    approved: &[usize],
    rng: &mut R,
    stats: &mut StatAccumulator<Metric>,
) -> ManufacturingOutcome {
    let m = &cfg.manufacturing;
    let mut pool = CapacityPool::draw(cfg, rng);

    let approved: Vec<ApprovedCandidate> = approved
        .iter()
        .map(|&j| {
            let c = &candidates[j];
            let approval_month = c
                .approval_month()
                .map_or(0, |month| u32::try_from(month).unwrap_or(0));
            let start = schedule_manufacturing(
                rng,
                &m.activities,
                &cfg.platform(c.platform),
                &cfg.funding(c.funding),
                approval_month,
            );
            ApprovedCandidate {
                index: c.index,
                platform: c.platform,
                funding: c.funding,
                approval_month,
                start,
            }
        })
        .collect();

    let allocations = pool.allocate(&approved);
    for (candidate, a) in approved.iter().zip(&allocations) {
        let platform = candidate.platform;
        stats.add(
            Metric::ApprovalMonth { platform },
            f64::from(candidate.approval_month),
        );
        stats.add(Metric::PrimaryStart { platform }, f64::from(a.start.primary));
        stats.add(Metric::SecondaryStart { platform }, f64::from(a.start.secondary));
        stats.add(Metric::MonthlyCapacity { platform }, a.capacity);
    }

    let production = Production::simulate(&allocations, &m.demand_targets(), m.production_months);
    for (target, outcome) in production.targets.iter().enumerate() {
        let Some(month) = outcome.month else { continue };
        stats.add(Metric::TargetMonth { target }, f64::from(month));
        stats.add(Metric::TargetDoses { target }, outcome.doses);
        for platform in Platform::ALL {
            stats.add(
                Metric::TargetPlatformDoses { target, platform },
                outcome.platform_doses[platform.index()],
            );
        }
        for &(candidate, doses) in &outcome.candidate_doses {
            stats.add(Metric::TargetCandidateDoses { target, candidate }, doses);
        }
    }

    ManufacturingOutcome {
        allocations,
        production,
    }
}
