//! Categorical vocabulary shared by the pipeline and manufacturing engines.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Clinical development phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreClinical,
    PhaseI,
    PhaseII,
    PhaseIII,
    Approval,
}

/// Per-phase array indexed by [`Phase::index`].
pub type PhaseArray<T> = [T; Phase::COUNT];

impl Phase {
    pub const COUNT: usize = 5;
    pub const ALL: [Phase; Phase::COUNT] = [
        Phase::PreClinical,
        Phase::PhaseI,
        Phase::PhaseII,
        Phase::PhaseIII,
        Phase::Approval,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the phase at `index`, or `None` past Approval.
    pub fn from_index(index: usize) -> Option<Phase> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Phase::PreClinical => "Pre-Clinical",
            Phase::PhaseI => "Phase I",
            Phase::PhaseII => "Phase II",
            Phase::PhaseIII => "Phase III",
            Phase::Approval => "Approval",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Candidate state within one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Status {
    Active,
    Failed,
    Approved,
}

impl Status {
    /// `Failed` and `Approved` freeze the candidate for the rest of the trial.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Active)
    }
}

/// Underlying vaccine technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    LiveAttenuated,
    Inactivated,
    ProteinSubunit,
    VirusLikeParticle,
    NonReplicatingVector,
    ReplicatingVector,
    #[serde(alias = "DNA")]
    Dna,
    #[serde(alias = "RNA")]
    Rna,
    Other,
}

impl Platform {
    pub const COUNT: usize = 9;
    pub const ALL: [Platform; Platform::COUNT] = [
        Platform::LiveAttenuated,
        Platform::Inactivated,
        Platform::ProteinSubunit,
        Platform::VirusLikeParticle,
        Platform::NonReplicatingVector,
        Platform::ReplicatingVector,
        Platform::Dna,
        Platform::Rna,
        Platform::Other,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::LiveAttenuated => "Live attenuated virus",
            Platform::Inactivated => "Inactivated virus",
            Platform::ProteinSubunit => "Protein subunit",
            Platform::VirusLikeParticle => "Virus-like particle",
            Platform::NonReplicatingVector => "Non-replicating viral vector",
            Platform::ReplicatingVector => "Replicating viral vector",
            Platform::Dna => "DNA",
            Platform::Rna => "RNA",
            Platform::Other => "Other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Funding category of a candidate's developer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Funding {
    Government,
    Multilateral,
    LargePharma,
    SmallPharma,
    BiotechAcademic,
}

impl Funding {
    pub const COUNT: usize = 5;
    pub const ALL: [Funding; Funding::COUNT] = [
        Funding::Government,
        Funding::Multilateral,
        Funding::LargePharma,
        Funding::SmallPharma,
        Funding::BiotechAcademic,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Funding::Government => "Government",
            Funding::Multilateral => "Multilateral",
            Funding::LargePharma => "Large pharma",
            Funding::SmallPharma => "Small pharma",
            Funding::BiotechAcademic => "Biotech/Academic",
        }
    }
}

impl fmt::Display for Funding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primary manufacturing category, derived from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManufacturingCategory {
    Viral,
    Protein,
    NucleicAcid,
}

impl ManufacturingCategory {
    pub const COUNT: usize = 3;
    pub const ALL: [ManufacturingCategory; ManufacturingCategory::COUNT] = [
        ManufacturingCategory::Viral,
        ManufacturingCategory::Protein,
        ManufacturingCategory::NucleicAcid,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Named timeline speed level; numeric values come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineLevel {
    MuchFaster,
    Faster,
    SlightlyFaster,
    Normal,
    SlightlySlower,
    Slower,
    MuchSlower,
    VeryMuchSlower,
}

/// Named platform correlation strength; numeric values come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationLevel {
    None,
    Low,
    Medium,
    Strong,
}

/// How much consecutive clinical phases may overlap for a funding category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapStrategy {
    /// Almost simultaneous phases.
    Simultaneous,
    /// Mostly overlapped phases.
    Mostly,
    /// Phases I and II overlapped, gap before Phase III.
    Phases12,
    /// Gap before Phase II, Phases II and III overlapped.
    Phases23,
    Consecutive,
    /// Consecutive with gaps between phases.
    Gaps,
}

/// Global outlook applied to every candidate's timelines and PoS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outlook {
    Pessimistic,
    Normal,
    Optimistic,
}

/// What happens to candidates entering Phase III above the concurrency limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase3Action {
    /// Delay the Phase III start by one month.
    Stop,
    /// Stretch the Phase III duration.
    SlowDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_indices_round_trip() {
        for (i, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
            assert_eq!(Phase::from_index(i), Some(*phase));
        }
        assert_eq!(Phase::from_index(Phase::COUNT), None);
    }

    #[test]
    fn platform_accepts_upper_case_alias() {
        #[derive(Deserialize)]
        struct Entry {
            platform: Platform,
        }
        let entry: Entry = toml::from_str("platform = \"RNA\"").expect("alias should parse");
        assert_eq!(entry.platform, Platform::Rna);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!Status::Active.is_terminal());
        assert!(Status::Failed.is_terminal());
        assert!(Status::Approved.is_terminal());
    }
}
