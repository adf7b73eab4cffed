//! Cumulative dose output and demand-target achievement.

use serde::Serialize;

use super::allocation::Allocation;
use crate::config::DEMAND_GROUPS;
use crate::sim::types::Platform;

/// Doses produced by one candidate up to and including `month`.
///
/// Output accumulates linearly from the secondary start; nothing is
/// produced at or before it.
pub fn cumulative_doses(allocation: &Allocation, month: u32) -> f64 {
    let elapsed = i64::from(month) - i64::from(allocation.start.secondary);
    if elapsed > 0 {
        elapsed as f64 * allocation.capacity
    } else {
        0.0
    }
}

/// When a demand target was first exceeded, with the output at that month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetOutcome {
    /// `None` if the target was never reached.
    pub month: Option<u32>,
    pub doses: f64,
    pub platform_doses: [f64; Platform::COUNT],
    /// Doses contributed by each allocated candidate, keyed by roster index.
    pub candidate_doses: Vec<(usize, f64)>,
}

impl TargetOutcome {
    fn missed() -> Self {
        Self {
            month: None,
            doses: 0.0,
            platform_doses: [0.0; Platform::COUNT],
            candidate_doses: Vec::new(),
        }
    }

    /// Month reported for the target, 0 when it was never reached.
    pub fn month_or_zero(&self) -> u32 {
        self.month.unwrap_or(0)
    }
}

/// Total production curve of one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Production {
    /// Cumulative doses for months `1..=len`.
    pub totals: Vec<f64>,
    pub targets: [TargetOutcome; DEMAND_GROUPS],
}

impl Production {
    /// Sums every allocation's output over months `1..=months` and records
    /// the first month each target is exceeded.
    pub fn simulate(allocations: &[Allocation], targets: &[f64; DEMAND_GROUPS], months: u32) -> Self {
        let mut totals = Vec::with_capacity(months as usize);
        let mut outcomes: [TargetOutcome; DEMAND_GROUPS] = std::array::from_fn(|_| TargetOutcome::missed());

        for month in 1..=months {
            let mut by_platform = [0.0; Platform::COUNT];
            let by_candidate: Vec<(usize, f64)> = allocations
                .iter()
                .map(|a| (a.index, cumulative_doses(a, month)))
                .collect();
            for (a, &(_, doses)) in allocations.iter().zip(&by_candidate) {
                by_platform[a.platform.index()] += doses;
            }
            let total: f64 = by_platform.iter().sum();
            totals.push(total);

            for (outcome, &target) in outcomes.iter_mut().zip(targets) {
                if outcome.month.is_none() && total > target {
                    *outcome = TargetOutcome {
                        month: Some(month),
                        doses: total,
                        platform_doses: by_platform,
                        candidate_doses: by_candidate.clone(),
                    };
                }
            }
        }

        Self {
            totals,
            targets: outcomes,
        }
    }

    /// Cumulative doses at `month`, 0 outside the simulated range.
    pub fn total_at(&self, month: u32) -> f64 {
        match month.checked_sub(1) {
            Some(i) => self.totals.get(i as usize).copied().unwrap_or(0.0),
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manufacturing::schedule::ManufacturingStart;

    fn allocation(platform: Platform, secondary: i32, capacity: f64) -> Allocation {
        Allocation {
            index: platform.index(),
            platform,
            start: ManufacturingStart {
                primary: secondary - 3,
                secondary,
            },
            primary_sites: Vec::new(),
            secondary_sites: Vec::new(),
            primary: capacity,
            secondary: capacity,
            capacity,
        }
    }

    #[test]
    fn nothing_produced_until_after_secondary_start() {
        let a = allocation(Platform::Rna, 10, 100.0);
        assert_eq!(cumulative_doses(&a, 9), 0.0);
        assert_eq!(cumulative_doses(&a, 10), 0.0);
        assert_eq!(cumulative_doses(&a, 11), 100.0);
        assert_eq!(cumulative_doses(&a, 15), 500.0);
    }

    #[test]
    fn targets_reached_in_order() {
        let allocations = [
            allocation(Platform::Rna, 2, 10.0),
            allocation(Platform::Dna, 4, 5.0),
        ];
        let production = Production::simulate(&allocations, &[15.0, 30.0, 60.0, 1.0e9], 12);
        assert_eq!(production.totals.len(), 12);
        // month 4: 20, month 5: 30 + 5, month 7: 50 + 15
        assert_eq!(production.targets[0].month, Some(4));
        assert_eq!(production.targets[1].month, Some(5));
        assert_eq!(production.targets[2].month, Some(7));
        assert_eq!(production.targets[3].month, None);
        assert_eq!(production.targets[3].month_or_zero(), 0);
        let at5 = &production.targets[1];
        assert_eq!(at5.doses, 35.0);
        assert_eq!(at5.platform_doses[Platform::Rna.index()], 30.0);
        assert_eq!(at5.platform_doses[Platform::Dna.index()], 5.0);
        assert_eq!(
            at5.candidate_doses,
            vec![(Platform::Rna.index(), 30.0), (Platform::Dna.index(), 5.0)]
        );
        assert!(production.targets[3].candidate_doses.is_empty());
        assert_eq!(production.total_at(0), 0.0);
        assert_eq!(production.total_at(5), 35.0);
        assert_eq!(production.total_at(13), 0.0);
    }

    #[test]
    fn no_allocations_reach_nothing() {
        let production = Production::simulate(&[], &[1.0, 2.0, 3.0, 4.0], 100);
        assert!(production.totals.iter().all(|&t| t == 0.0));
        assert!(production.targets.iter().all(|t| t.month.is_none()));
    }
}
