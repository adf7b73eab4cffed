//! Structured keys for the run-wide [`StatAccumulator`](crate::stats::StatAccumulator).

use super::types::{Funding, Phase, Platform};

/// Bucket of the per-month candidate census.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountBucket {
    /// Candidates active in a given phase.
    InPhase(Phase),
    /// Active in Phase I and II but not III.
    PhaseI2,
    /// Active in Phase II and III but not I.
    PhaseII3,
    Approved,
    Total,
}

/// Portfolio grouping used for first-approval and success analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Platform(Platform),
    Cepi,
    Ows,
    All,
}

impl Group {
    /// Every group in reporting order.
    pub fn all() -> Vec<Group> {
        let mut groups: Vec<Group> = Platform::ALL.iter().map(|p| Group::Platform(*p)).collect();
        groups.extend([Group::Cepi, Group::Ows, Group::All]);
        groups
    }

    pub fn name(&self) -> String {
        match self {
            Group::Platform(p) => p.name().to_string(),
            Group::Cepi => "CEPI".to_string(),
            Group::Ows => "OWS".to_string(),
            Group::All => "All".to_string(),
        }
    }
}

/// Composite statistic key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Overall PoS of active candidates by platform at a month.
    PosPlatform { month: u32, platform: Platform },
    /// Overall PoS of active candidates by funding at a month.
    PosFunding { month: u32, funding: Funding },
    PosPlatformFunding {
        month: u32,
        platform: Platform,
        funding: Funding,
    },
    /// Months spent in a phase, recorded when the phase ends.
    PhaseLength { phase: Phase, platform: Platform },
    /// One entry per phase completion attempt.
    PhaseNumbers { phase: Phase, platform: Platform },
    /// 1 for success, 0 for failure.
    PhaseSuccess { phase: Phase, platform: Platform },
    Count { month: u32, bucket: CountBucket },
    /// Recorded once per trial in which at least `at_least` candidates were
    /// approved by `month`; `at_least == 0` records trials with none.
    ApprovalProb { month: u32, at_least: u8 },
    /// Completion month of a phase for a candidate (index into the roster).
    End { candidate: usize, phase: Phase },
    Buyouts,
    /// Month of the first approval, `None` when nothing was approved.
    FirstMonth { month: Option<u32> },
    FirstMonths { group: Group },
    /// Month each demand target was reached (recorded only when reached).
    TargetMonth { target: usize },
    /// Total doses produced at the month the target was reached.
    TargetDoses { target: usize },
    /// Doses contributed by a platform at the month the target was reached.
    TargetPlatformDoses { target: usize, platform: Platform },
    /// Doses contributed by a roster candidate at the month the target was reached.
    TargetCandidateDoses { target: usize, candidate: usize },
    ApprovalMonth { platform: Platform },
    PrimaryStart { platform: Platform },
    SecondaryStart { platform: Platform },
    /// Doses per month allocated to one approved candidate.
    MonthlyCapacity { platform: Platform },
}
