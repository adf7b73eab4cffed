//! TOML-based scenario configuration, preset definitions, and validation.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::manufacturing::schedule::{ActivityRole, Chain, DurationDist};
use crate::sim::sampling::Triangle;
use crate::sim::types::{
    CorrelationLevel, Funding, ManufacturingCategory, OverlapStrategy, Outlook, Phase,
    Phase3Action, PhaseArray, Platform, TimelineLevel,
};

/// Number of population demand groups.
pub const DEMAND_GROUPS: usize = 4;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Trial count, horizon, seed and global outlook.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Per-phase base PoS and timeline triples.
    #[serde(default)]
    pub phases: PhasesConfig,
    #[serde(default)]
    pub timeline_factors: TimelineFactors,
    #[serde(default)]
    pub correlation_values: CorrelationValues,
    /// Per-platform parameters; platforms not listed use built-in defaults.
    #[serde(default = "default_platforms")]
    pub platforms: Vec<PlatformConfig>,
    /// Per-funding-category parameters; categories not listed use defaults.
    #[serde(default = "default_funding")]
    pub funding: Vec<FundingConfig>,
    /// Phase start offsets per overlap strategy.
    #[serde(default)]
    pub overlap: OverlapTable,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub buyout: BuyoutConfig,
    #[serde(default)]
    pub phase3_limit: Phase3LimitConfig,
    #[serde(default)]
    pub manufacturing: ManufacturingConfig,
    /// Candidate roster.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<CandidateConfig>,
}

/// Trial count, horizon and global parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of Monte Carlo trials (1..=50000).
    pub tries: usize,
    /// Months simulated per trial (24..=240).
    pub months: u32,
    /// Master random seed.
    pub seed: u64,
    /// Global outlook: `"pessimistic"`, `"normal"` or `"optimistic"`.
    pub outlook: Outlook,
    /// Outlook PoS multiplier (1..=10). Range-checked but not applied:
    /// the outlook only scales timelines.
    pub pos_factor: f64,
    /// Timeline divisor applied by the optimistic outlook (1..=10).
    pub timeline_factor: f64,
    /// Discard known phase end months that lie in the future.
    pub ignore_future_dates: bool,
    /// Run trials in parallel (requires the `parallel` feature).
    pub parallel: bool,
    /// Length of the best-candidate list.
    pub best_candidates: usize,
}

impl SimulationConfig {
    /// RNG seed for one trial: `seed + trial`, wrapping.
    pub fn trial_seed(&self, trial: usize) -> u64 {
        self.seed.wrapping_add(trial as u64)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tries: 1000,
            months: 36,
            seed: 42,
            outlook: Outlook::Normal,
            pos_factor: 1.5,
            timeline_factor: 1.5,
            ignore_future_dates: false,
            parallel: true,
            best_candidates: 10,
        }
    }
}

/// Per-phase base parameters, indexed Pre-clinical, I, II, III, Approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhasesConfig {
    /// Base probability of success per phase (Phase III uses the platform value).
    pub success: PhaseArray<f64>,
    /// Best-case duration in months.
    pub best: PhaseArray<f64>,
    /// Most likely duration in months.
    pub likely: PhaseArray<f64>,
    /// Worst-case duration in months.
    pub worst: PhaseArray<f64>,
    /// Probability that a Phase III duration is stretched.
    pub phase3_slowdown_fract: f64,
    /// Stretch factor for slowed Phase III trials.
    pub phase3_slowdown_factor: f64,
}

impl Default for PhasesConfig {
    fn default() -> Self {
        Self {
            success: [0.41, 0.68, 0.46, 0.85, 0.9],
            best: [3.0, 2.0, 3.0, 6.0, 1.0],
            likely: [6.0, 4.0, 6.0, 10.0, 3.0],
            worst: [12.0, 8.0, 12.0, 18.0, 6.0],
            phase3_slowdown_fract: 0.1,
            phase3_slowdown_factor: 1.5,
        }
    }
}

/// Numeric values for the named timeline levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimelineFactors {
    pub much_faster: f64,
    pub faster: f64,
    pub slightly_faster: f64,
    pub normal: f64,
    pub slightly_slower: f64,
    pub slower: f64,
    pub much_slower: f64,
    pub very_much_slower: f64,
}

impl Default for TimelineFactors {
    fn default() -> Self {
        Self {
            much_faster: 0.5,
            faster: 0.7,
            slightly_faster: 0.85,
            normal: 1.0,
            slightly_slower: 1.2,
            slower: 1.5,
            much_slower: 2.0,
            very_much_slower: 3.0,
        }
    }
}

impl TimelineFactors {
    pub fn value(&self, level: TimelineLevel) -> f64 {
        match level {
            TimelineLevel::MuchFaster => self.much_faster,
            TimelineLevel::Faster => self.faster,
            TimelineLevel::SlightlyFaster => self.slightly_faster,
            TimelineLevel::Normal => self.normal,
            TimelineLevel::SlightlySlower => self.slightly_slower,
            TimelineLevel::Slower => self.slower,
            TimelineLevel::MuchSlower => self.much_slower,
            TimelineLevel::VeryMuchSlower => self.very_much_slower,
        }
    }

    fn entries(&self) -> [(&'static str, f64); 8] {
        [
            ("much_faster", self.much_faster),
            ("faster", self.faster),
            ("slightly_faster", self.slightly_faster),
            ("normal", self.normal),
            ("slightly_slower", self.slightly_slower),
            ("slower", self.slower),
            ("much_slower", self.much_slower),
            ("very_much_slower", self.very_much_slower),
        ]
    }
}

/// Numeric correlation coefficient for each named strength.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorrelationValues {
    pub none: f64,
    pub low: f64,
    pub medium: f64,
    pub strong: f64,
}

impl Default for CorrelationValues {
    fn default() -> Self {
        Self {
            none: 0.0,
            low: 0.25,
            medium: 0.5,
            strong: 1.0,
        }
    }
}

impl CorrelationValues {
    pub fn value(&self, level: CorrelationLevel) -> f64 {
        match level {
            CorrelationLevel::None => self.none,
            CorrelationLevel::Low => self.low,
            CorrelationLevel::Medium => self.medium,
            CorrelationLevel::Strong => self.strong,
        }
    }
}

/// Parameters of one vaccine platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    pub platform: Platform,
    /// Phase III PoS, replacing the phase-level base value.
    pub phase3_pos: f64,
    pub timeline: TimelineLevel,
    pub correlation: CorrelationLevel,
    /// Primary manufacturing category.
    pub category: ManufacturingCategory,
    /// Doses obtained per litre of primary capacity.
    pub doses_per_litre: f64,
    /// Duration ratio for value-chain schedule activities.
    pub value_chain_ratio: f64,
    /// Duration ratio for technology-transfer schedule activities.
    pub tech_transfer_ratio: f64,
}

impl PlatformConfig {
    /// Built-in parameters for `platform`.
    pub fn default_for(platform: Platform) -> Self {
        use ManufacturingCategory::{NucleicAcid, Protein, Viral};
        let (phase3_pos, timeline, correlation, category, doses_per_litre, vc, tt) = match platform
        {
            Platform::LiveAttenuated => (
                0.75,
                TimelineLevel::Slower,
                CorrelationLevel::Low,
                Viral,
                2500.0,
                1.2,
                1.2,
            ),
            Platform::Inactivated => (
                0.8,
                TimelineLevel::Normal,
                CorrelationLevel::Low,
                Viral,
                2000.0,
                1.0,
                1.1,
            ),
            Platform::ProteinSubunit => (
                0.7,
                TimelineLevel::Normal,
                CorrelationLevel::Medium,
                Protein,
                5000.0,
                1.0,
                1.0,
            ),
            Platform::VirusLikeParticle => (
                0.7,
                TimelineLevel::SlightlySlower,
                CorrelationLevel::Medium,
                Protein,
                4000.0,
                1.1,
                1.0,
            ),
            Platform::NonReplicatingVector => (
                0.65,
                TimelineLevel::SlightlyFaster,
                CorrelationLevel::Medium,
                Viral,
                10000.0,
                0.9,
                0.9,
            ),
            Platform::ReplicatingVector => (
                0.6,
                TimelineLevel::Normal,
                CorrelationLevel::Medium,
                Viral,
                8000.0,
                1.0,
                1.0,
            ),
            Platform::Dna => (
                0.5,
                TimelineLevel::Faster,
                CorrelationLevel::Strong,
                NucleicAcid,
                15000.0,
                0.8,
                0.8,
            ),
            Platform::Rna => (
                0.6,
                TimelineLevel::Faster,
                CorrelationLevel::Strong,
                NucleicAcid,
                20000.0,
                0.7,
                0.8,
            ),
            Platform::Other => (
                0.5,
                TimelineLevel::Normal,
                CorrelationLevel::None,
                Protein,
                3000.0,
                1.0,
                1.0,
            ),
        };
        Self {
            platform,
            phase3_pos,
            timeline,
            correlation,
            category,
            doses_per_litre,
            value_chain_ratio: vc,
            tech_transfer_ratio: tt,
        }
    }
}

fn default_platforms() -> Vec<PlatformConfig> {
    Platform::ALL
        .iter()
        .map(|p| PlatformConfig::default_for(*p))
        .collect()
}

/// Parameters of one funding category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FundingConfig {
    pub funding: Funding,
    /// PoS multiplier, applied per phase as a fifth (or square) root.
    pub pos: f64,
    pub timeline: TimelineLevel,
    pub overlap: OverlapStrategy,
    /// Fraction of failures that are technical rather than commercial.
    pub tech_failure: f64,
    /// Primary and secondary scale-up run in parallel from the epoch.
    #[serde(default)]
    pub simultaneous_tech_transfer: bool,
    /// Primary manufacturing may start before approval.
    #[serde(default)]
    pub manufacture_before_approval: bool,
    #[serde(default = "one")]
    pub value_chain_ratio: f64,
    #[serde(default = "one")]
    pub tech_transfer_ratio: f64,
    /// Global multiplier on every sampled schedule duration.
    #[serde(default = "one")]
    pub duration_factor: f64,
}

fn one() -> f64 {
    1.0
}

impl FundingConfig {
    /// Built-in parameters for `funding`.
    pub fn default_for(funding: Funding) -> Self {
        let (pos, timeline, overlap, tech_failure, simultaneous, at_risk, factor) = match funding
        {
            Funding::Government => (
                1.0,
                TimelineLevel::Normal,
                OverlapStrategy::Consecutive,
                0.6,
                false,
                false,
                1.0,
            ),
            Funding::Multilateral => (
                1.2,
                TimelineLevel::Faster,
                OverlapStrategy::Mostly,
                0.7,
                true,
                true,
                0.8,
            ),
            Funding::LargePharma => (
                1.5,
                TimelineLevel::Faster,
                OverlapStrategy::Phases12,
                0.8,
                true,
                true,
                0.8,
            ),
            Funding::SmallPharma => (
                1.0,
                TimelineLevel::Normal,
                OverlapStrategy::Phases23,
                0.5,
                false,
                false,
                1.0,
            ),
            Funding::BiotechAcademic => (
                0.7,
                TimelineLevel::Slower,
                OverlapStrategy::Gaps,
                0.4,
                false,
                false,
                1.2,
            ),
        };
        Self {
            funding,
            pos,
            timeline,
            overlap,
            tech_failure,
            simultaneous_tech_transfer: simultaneous,
            manufacture_before_approval: at_risk,
            value_chain_ratio: 1.0,
            tech_transfer_ratio: 1.0,
            duration_factor: factor,
        }
    }
}

fn default_funding() -> Vec<FundingConfig> {
    Funding::ALL
        .iter()
        .map(|f| FundingConfig::default_for(*f))
        .collect()
}

/// Phase start offsets (months) for one overlap strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlapRule {
    /// Delay from pre-clinical end to Phase I start.
    pub phase1_start: i32,
    /// Delay from Phase III end to Approval start.
    pub approval_start: i32,
    /// Offset from the previous phase's start for overlapped phases.
    pub phase_overlap: i32,
    /// Gap after the previous phase's end for sequential phases.
    pub phase_gap: i32,
}

impl OverlapRule {
    pub const fn new(phase1_start: i32, approval_start: i32, overlap: i32, gap: i32) -> Self {
        Self {
            phase1_start,
            approval_start,
            phase_overlap: overlap,
            phase_gap: gap,
        }
    }
}

impl Default for OverlapRule {
    fn default() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

/// Offsets for every overlap strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlapTable {
    pub simultaneous: OverlapRule,
    pub mostly: OverlapRule,
    pub phases12: OverlapRule,
    pub phases23: OverlapRule,
    pub consecutive: OverlapRule,
    pub gaps: OverlapRule,
}

impl Default for OverlapTable {
    fn default() -> Self {
        Self {
            simultaneous: OverlapRule::new(0, 0, 0, 0),
            mostly: OverlapRule::new(0, 0, 1, 0),
            phases12: OverlapRule::new(0, 1, 1, 1),
            phases23: OverlapRule::new(1, 1, 2, 1),
            consecutive: OverlapRule::new(1, 1, 0, 1),
            gaps: OverlapRule::new(2, 2, 0, 3),
        }
    }
}

impl OverlapTable {
    pub fn rule(&self, strategy: OverlapStrategy) -> OverlapRule {
        match strategy {
            OverlapStrategy::Simultaneous => self.simultaneous,
            OverlapStrategy::Mostly => self.mostly,
            OverlapStrategy::Phases12 => self.phases12,
            OverlapStrategy::Phases23 => self.phases23,
            OverlapStrategy::Consecutive => self.consecutive,
            OverlapStrategy::Gaps => self.gaps,
        }
    }

    /// Every rule with its section name, for validation.
    pub fn entries(&self) -> [(&'static str, OverlapRule); 6] {
        [
            ("simultaneous", self.simultaneous),
            ("mostly", self.mostly),
            ("phases12", self.phases12),
            ("phases23", self.phases23),
            ("consecutive", self.consecutive),
            ("gaps", self.gaps),
        ]
    }
}

/// Cross-candidate feedback switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Same-platform success/failure correlation pass.
    pub update_pos: bool,
    /// Approval-count feedback on remaining candidates.
    pub update_approval: bool,
    /// Approvals required before approval feedback applies.
    pub approval_limit: u32,
    /// PoS multiplier on the Approval phase of remaining candidates.
    pub approval_pos: f64,
    /// Duration multiplier on the Approval phase of remaining candidates.
    pub approval_timeline: f64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            update_pos: true,
            update_approval: true,
            approval_limit: 3,
            approval_pos: 0.9,
            approval_timeline: 1.2,
        }
    }
}

/// Buyout of biotech/academic candidates after Phase I.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuyoutConfig {
    pub enabled: bool,
    /// Probability of a buyout after a successful Phase I.
    pub fraction: f64,
}

impl Default for BuyoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fraction: 0.3,
        }
    }
}

/// Concurrent Phase III admission control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Phase3LimitConfig {
    pub enabled: bool,
    /// Maximum concurrent Phase III trials.
    pub limit: u32,
    pub action: Phase3Action,
    /// Duration stretch for the slow-down action.
    pub factor: f64,
}

impl Default for Phase3LimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: 20,
            action: Phase3Action::SlowDown,
            factor: 1.5,
        }
    }
}

/// Primary capacity of one platform at a site (litres per month).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformVolume {
    pub platform: Platform,
    pub litres: f64,
}

/// A primary (drug substance) manufacturing site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrimarySite {
    pub country: String,
    pub category: ManufacturingCategory,
    pub capacity: Vec<PlatformVolume>,
}

impl PrimarySite {
    /// Litres per month available for `platform` (0 if not listed).
    pub fn litres(&self, platform: Platform) -> f64 {
        self.capacity
            .iter()
            .filter(|v| v.platform == platform)
            .map(|v| v.litres)
            .sum()
    }
}

/// A secondary (fill/finish) manufacturing site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecondarySite {
    pub country: String,
    /// Doses per month.
    pub doses: f64,
}

/// Plant budget per primary manufacturing category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryPlants {
    pub viral: u32,
    pub protein: u32,
    pub nucleic_acid: u32,
}

impl Default for CategoryPlants {
    fn default() -> Self {
        Self {
            viral: 8,
            protein: 6,
            nucleic_acid: 6,
        }
    }
}

impl CategoryPlants {
    pub fn budget(&self, category: ManufacturingCategory) -> u32 {
        match category {
            ManufacturingCategory::Viral => self.viral,
            ManufacturingCategory::Protein => self.protein,
            ManufacturingCategory::NucleicAcid => self.nucleic_acid,
        }
    }
}

/// One activity of the manufacturing preparation template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityConfig {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub chain: Chain,
    #[serde(default)]
    pub role: ActivityRole,
    /// Predecessor activity ids.
    #[serde(default)]
    pub after: Vec<u32>,
    pub duration: DurationDist,
}

/// Manufacturing defaults and adjustable parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManufacturingConfig {
    /// Run scheduling and allocation for approved candidates.
    pub enabled: bool,
    /// Per-trial scaling of primary capacity.
    pub primary_ratio: Triangle,
    /// Per-trial scaling of secondary capacity.
    pub secondary_ratio: Triangle,
    pub primary_plants: CategoryPlants,
    pub secondary_plants: u32,
    pub primary_sites: Vec<PrimarySite>,
    pub secondary_sites: Vec<SecondarySite>,
    /// Preparation activities in topological order.
    pub activities: Vec<ActivityConfig>,
    /// Population of each demand group, in priority order.
    pub population: [f64; DEMAND_GROUPS],
    pub doses_per_person: f64,
    /// Percentage of doses lost to wastage.
    pub wastage_pct: f64,
    /// Months of production to evaluate.
    pub production_months: u32,
}

impl Default for ManufacturingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            primary_ratio: Triangle::new(0.5, 0.8, 1.0),
            secondary_ratio: Triangle::new(0.6, 0.85, 1.0),
            primary_plants: CategoryPlants::default(),
            secondary_plants: 12,
            primary_sites: default_primary_sites(),
            secondary_sites: default_secondary_sites(),
            activities: default_activities(),
            population: [100.0e6, 700.0e6, 1500.0e6, 5500.0e6],
            doses_per_person: 2.0,
            wastage_pct: 10.0,
            production_months: 100,
        }
    }
}

impl ManufacturingConfig {
    /// Cumulative dose targets, one per demand group.
    pub fn demand_targets(&self) -> [f64; DEMAND_GROUPS] {
        let per_person = self.doses_per_person * (1.0 + self.wastage_pct / 100.0);
        let mut targets = [0.0; DEMAND_GROUPS];
        let mut cumulative = 0.0;
        for (target, population) in targets.iter_mut().zip(self.population) {
            cumulative += population * per_person;
            *target = cumulative;
        }
        targets
    }
}

fn site(country: &str, category: ManufacturingCategory, capacity: &[(Platform, f64)]) -> PrimarySite {
    PrimarySite {
        country: country.to_string(),
        category,
        capacity: capacity
            .iter()
            .map(|&(platform, litres)| PlatformVolume { platform, litres })
            .collect(),
    }
}

fn default_primary_sites() -> Vec<PrimarySite> {
    use ManufacturingCategory::{NucleicAcid, Protein, Viral};
    use Platform::*;
    vec![
        site(
            "India",
            Viral,
            &[
                (Inactivated, 6000.0),
                (LiveAttenuated, 4000.0),
                (NonReplicatingVector, 2500.0),
                (ReplicatingVector, 2000.0),
            ],
        ),
        site(
            "China",
            Viral,
            &[
                (Inactivated, 8000.0),
                (LiveAttenuated, 3000.0),
                (NonReplicatingVector, 2000.0),
                (ReplicatingVector, 1500.0),
            ],
        ),
        site(
            "United Kingdom",
            Viral,
            &[(NonReplicatingVector, 3000.0), (ReplicatingVector, 2500.0)],
        ),
        site(
            "Brazil",
            Viral,
            &[(Inactivated, 3000.0), (NonReplicatingVector, 1000.0)],
        ),
        site(
            "United States",
            Protein,
            &[(ProteinSubunit, 5000.0), (VirusLikeParticle, 4000.0), (Other, 2000.0)],
        ),
        site(
            "Switzerland",
            Protein,
            &[(ProteinSubunit, 3000.0), (VirusLikeParticle, 2000.0)],
        ),
        site(
            "South Korea",
            Protein,
            &[(ProteinSubunit, 2500.0), (Other, 1500.0)],
        ),
        site("Germany", NucleicAcid, &[(Rna, 1500.0), (Dna, 800.0)]),
        site("United States", NucleicAcid, &[(Rna, 2000.0), (Dna, 1000.0)]),
        site("Belgium", NucleicAcid, &[(Rna, 800.0), (Dna, 600.0)]),
    ]
}

fn default_secondary_sites() -> Vec<SecondarySite> {
    [
        ("India", 150.0e6),
        ("China", 120.0e6),
        ("United States", 100.0e6),
        ("Germany", 60.0e6),
        ("Italy", 50.0e6),
        ("Brazil", 40.0e6),
        ("France", 40.0e6),
        ("South Africa", 20.0e6),
    ]
    .iter()
    .map(|&(country, doses)| SecondarySite {
        country: country.to_string(),
        doses,
    })
    .collect()
}

fn activity(
    id: u32,
    name: &str,
    chain: Chain,
    role: ActivityRole,
    after: &[u32],
    duration: DurationDist,
) -> ActivityConfig {
    ActivityConfig {
        id,
        name: name.to_string(),
        chain,
        role,
        after: after.to_vec(),
        duration,
    }
}

fn tri(low: f64, mode: f64, high: f64) -> DurationDist {
    DurationDist::Triangular { low, mode, high }
}

fn default_activities() -> Vec<ActivityConfig> {
    use ActivityRole::*;
    use Chain::*;
    vec![
        activity(1, "Process development", ValueChain, Task, &[], tri(2.0, 3.0, 5.0)),
        activity(2, "Primary scale-up", TechTransfer, PrimaryScaleUp, &[1], tri(2.0, 4.0, 6.0)),
        activity(3, "Secondary scale-up", TechTransfer, SecondaryScaleUp, &[2], tri(1.0, 2.0, 4.0)),
        activity(4, "Raw material sourcing", ValueChain, Task, &[1], tri(1.0, 2.0, 4.0)),
        activity(5, "Regulatory approval", ValueChain, Approval, &[], DurationDist::Static { months: 0.0 }),
        activity(6, "Conformance batches", ValueChain, Task, &[2, 4], DurationDist::Static { months: 2.0 }),
        activity(7, "Primary manufacturing start", ValueChain, PrimaryStart, &[5, 6], DurationDist::Static { months: 1.0 }),
        activity(8, "Fill/finish validation", TechTransfer, Task, &[3, 7], tri(1.0, 2.0, 3.0)),
        activity(9, "Secondary manufacturing start", ValueChain, SecondaryStart, &[8], DurationDist::Static { months: 1.0 }),
    ]
}

/// Known dates for one phase of a candidate (months relative to the epoch).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseHistory {
    pub phase: Phase,
    pub start: Option<i32>,
    pub end: Option<i32>,
}

/// One candidate of the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateConfig {
    /// External identifier.
    pub number: u32,
    #[serde(default)]
    pub name: String,
    pub platform: Platform,
    pub funding: Funding,
    #[serde(default)]
    pub history: Vec<PhaseHistory>,
    /// Member of the CEPI portfolio.
    #[serde(default)]
    pub cepi: bool,
    /// Member of the OWS portfolio.
    #[serde(default)]
    pub ows: bool,
}

impl CandidateConfig {
    pub fn new(number: u32, name: &str, platform: Platform, funding: Funding) -> Self {
        Self {
            number,
            name: name.to_string(),
            platform,
            funding,
            history: Vec::new(),
            cepi: false,
            ows: false,
        }
    }

    fn with_history(mut self, phase: Phase, start: i32, end: Option<i32>) -> Self {
        self.history.push(PhaseHistory {
            phase,
            start: Some(start),
            end,
        });
        self
    }

    fn in_programs(mut self, cepi: bool, ows: bool) -> Self {
        self.cepi = cepi;
        self.ows = ows;
        self
    }
}

fn default_candidates() -> Vec<CandidateConfig> {
    use Funding::*;
    use Phase::*;
    use Platform::*;
    vec![
        CandidateConfig::new(1, "Adenovirus vector A", NonReplicatingVector, LargePharma)
            .with_history(PreClinical, -8, Some(-5))
            .with_history(PhaseI, -4, Some(-1))
            .in_programs(true, true),
        CandidateConfig::new(2, "mRNA lipid nanoparticle A", Rna, BiotechAcademic)
            .with_history(PreClinical, -6, Some(-3))
            .with_history(PhaseI, -2, None)
            .in_programs(true, true),
        CandidateConfig::new(3, "mRNA lipid nanoparticle B", Rna, LargePharma)
            .with_history(PreClinical, -5, Some(-2))
            .in_programs(false, true),
        CandidateConfig::new(4, "Inactivated whole virus A", Inactivated, Government)
            .with_history(PreClinical, -6, Some(-2)),
        CandidateConfig::new(5, "Inactivated whole virus B", Inactivated, Government),
        CandidateConfig::new(6, "Recombinant spike protein A", ProteinSubunit, SmallPharma)
            .in_programs(true, false),
        CandidateConfig::new(7, "Recombinant spike protein B", ProteinSubunit, LargePharma)
            .in_programs(false, true),
        CandidateConfig::new(8, "Plasmid DNA A", Dna, BiotechAcademic).in_programs(true, false),
        CandidateConfig::new(9, "Virus-like particle A", VirusLikeParticle, SmallPharma),
        CandidateConfig::new(10, "Measles vector A", ReplicatingVector, Multilateral)
            .in_programs(true, false),
        CandidateConfig::new(11, "Codon-deoptimised live virus", LiveAttenuated, BiotechAcademic),
        CandidateConfig::new(12, "Peptide vaccine A", Other, Government),
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.tries"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn check_range(errors: &mut Vec<ConfigError>, field: &str, value: f64, min: f64, max: f64) {
    if !value.is_finite() {
        errors.push(ConfigError::new(field, format!("value {value} is not finite")));
    } else if value < min {
        errors.push(ConfigError::new(field, format!("value {value} < {min}")));
    } else if value > max {
        errors.push(ConfigError::new(field, format!("value {value} > {max}")));
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            phases: PhasesConfig::default(),
            timeline_factors: TimelineFactors::default(),
            correlation_values: CorrelationValues::default(),
            platforms: default_platforms(),
            funding: default_funding(),
            overlap: OverlapTable::default(),
            feedback: FeedbackConfig::default(),
            buyout: BuyoutConfig::default(),
            phase3_limit: Phase3LimitConfig::default(),
            manufacturing: ManufacturingConfig::default(),
            candidates: default_candidates(),
        }
    }

    /// Returns the optimistic preset: shorter timelines, more primary capacity
    /// and at-risk manufacturing for every funder.
    pub fn optimistic() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.outlook = Outlook::Optimistic;
        for funding in &mut cfg.funding {
            funding.manufacture_before_approval = true;
        }
        cfg.manufacturing.primary_ratio = Triangle::new(0.7, 0.9, 1.0);
        cfg
    }

    /// Returns the pessimistic preset: longer timelines, less primary capacity
    /// and Phase III admission limited and slowed down.
    pub fn pessimistic() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.outlook = Outlook::Pessimistic;
        cfg.phase3_limit = Phase3LimitConfig {
            enabled: true,
            limit: 4,
            action: Phase3Action::SlowDown,
            factor: 1.5,
        };
        cfg.manufacturing.primary_ratio = Triangle::new(0.3, 0.6, 0.9);
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "optimistic", "pessimistic"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "optimistic" => Ok(Self::optimistic()),
            "pessimistic" => Ok(Self::pessimistic()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Effective parameters for `platform` (configured or built-in).
    pub fn platform(&self, platform: Platform) -> PlatformConfig {
        self.platforms
            .iter()
            .find(|p| p.platform == platform)
            .cloned()
            .unwrap_or_else(|| PlatformConfig::default_for(platform))
    }

    /// Effective parameters for `funding` (configured or built-in).
    pub fn funding(&self, funding: Funding) -> FundingConfig {
        self.funding
            .iter()
            .find(|f| f.funding == funding)
            .cloned()
            .unwrap_or_else(|| FundingConfig::default_for(funding))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        self.validate_simulation(&mut errors);
        self.validate_phases(&mut errors);
        self.validate_tables(&mut errors);
        self.validate_feedback(&mut errors);
        self.validate_manufacturing(&mut errors);
        self.validate_candidates(&mut errors);
        errors
    }

    fn validate_simulation(&self, errors: &mut Vec<ConfigError>) {
        let s = &self.simulation;
        check_range(errors, "simulation.tries", s.tries as f64, 1.0, 50000.0);
        check_range(errors, "simulation.months", f64::from(s.months), 24.0, 240.0);
        check_range(errors, "simulation.pos_factor", s.pos_factor, 1.0, 10.0);
        check_range(errors, "simulation.timeline_factor", s.timeline_factor, 1.0, 10.0);
    }

    fn validate_phases(&self, errors: &mut Vec<ConfigError>) {
        let p = &self.phases;
        for phase in Phase::ALL {
            let i = phase.index();
            check_range(errors, &format!("phases.success[{i}]"), p.success[i], 0.0, 1.0);
            check_range(errors, &format!("phases.best[{i}]"), p.best[i], 1.0, 48.0);
            check_range(errors, &format!("phases.likely[{i}]"), p.likely[i], 1.0, 48.0);
            check_range(errors, &format!("phases.worst[{i}]"), p.worst[i], 1.0, 48.0);
            if p.best[i] > p.likely[i] {
                errors.push(ConfigError::new(
                    format!("phases.best[{i}]"),
                    format!(
                        "best timeline for {phase} ({}) > likely timeline ({})",
                        p.best[i], p.likely[i]
                    ),
                ));
            }
            if p.likely[i] > p.worst[i] {
                errors.push(ConfigError::new(
                    format!("phases.likely[{i}]"),
                    format!(
                        "likely timeline for {phase} ({}) > worst timeline ({})",
                        p.likely[i], p.worst[i]
                    ),
                ));
            }
        }
        check_range(errors, "phases.phase3_slowdown_fract", p.phase3_slowdown_fract, 0.0, 1.0);
        check_range(errors, "phases.phase3_slowdown_factor", p.phase3_slowdown_factor, 1.0, 10.0);
    }

    fn validate_tables(&self, errors: &mut Vec<ConfigError>) {
        for (name, value) in self.timeline_factors.entries() {
            check_range(errors, &format!("timeline_factors.{name}"), value, 0.0, 10.0);
        }
        let c = &self.correlation_values;
        for (name, value) in [("none", c.none), ("low", c.low), ("medium", c.medium), ("strong", c.strong)] {
            check_range(errors, &format!("correlation_values.{name}"), value, 0.0, 1.0);
        }

        let mut seen = HashSet::new();
        for (i, p) in self.platforms.iter().enumerate() {
            if !seen.insert(p.platform) {
                errors.push(ConfigError::new(
                    format!("platforms[{i}].platform"),
                    format!("duplicate platform \"{}\"", p.platform),
                ));
            }
            check_range(errors, &format!("platforms[{i}].phase3_pos"), p.phase3_pos, 0.0, 1.0);
            check_range(errors, &format!("platforms[{i}].doses_per_litre"), p.doses_per_litre, 0.0, f64::MAX);
            check_range(errors, &format!("platforms[{i}].value_chain_ratio"), p.value_chain_ratio, 0.0, 10.0);
            check_range(errors, &format!("platforms[{i}].tech_transfer_ratio"), p.tech_transfer_ratio, 0.0, 10.0);
        }

        let mut seen = HashSet::new();
        for (i, f) in self.funding.iter().enumerate() {
            if !seen.insert(f.funding) {
                errors.push(ConfigError::new(
                    format!("funding[{i}].funding"),
                    format!("duplicate funding category \"{}\"", f.funding),
                ));
            }
            check_range(errors, &format!("funding[{i}].pos"), f.pos, 0.0, 10.0);
            check_range(errors, &format!("funding[{i}].tech_failure"), f.tech_failure, 0.0, 1.0);
            check_range(errors, &format!("funding[{i}].value_chain_ratio"), f.value_chain_ratio, 0.0, 10.0);
            check_range(errors, &format!("funding[{i}].tech_transfer_ratio"), f.tech_transfer_ratio, 0.0, 10.0);
            check_range(errors, &format!("funding[{i}].duration_factor"), f.duration_factor, 0.0, 10.0);
        }

        for (name, rule) in self.overlap.entries() {
            check_range(errors, &format!("overlap.{name}.phase1_start"), f64::from(rule.phase1_start), 0.0, 10.0);
            check_range(errors, &format!("overlap.{name}.approval_start"), f64::from(rule.approval_start), 0.0, 10.0);
            check_range(errors, &format!("overlap.{name}.phase_overlap"), f64::from(rule.phase_overlap), 0.0, 10.0);
            check_range(errors, &format!("overlap.{name}.phase_gap"), f64::from(rule.phase_gap), 0.0, 30.0);
        }
    }

    fn validate_feedback(&self, errors: &mut Vec<ConfigError>) {
        let f = &self.feedback;
        check_range(errors, "feedback.approval_limit", f64::from(f.approval_limit), 0.0, 100.0);
        check_range(errors, "feedback.approval_pos", f.approval_pos, 0.0, 1.0);
        check_range(errors, "feedback.approval_timeline", f.approval_timeline, 1.0, 10.0);
        check_range(errors, "buyout.fraction", self.buyout.fraction, 0.0, 1.0);
        let l = &self.phase3_limit;
        check_range(errors, "phase3_limit.limit", f64::from(l.limit), 1.0, 100.0);
        check_range(errors, "phase3_limit.factor", l.factor, 1.0, 10.0);
    }

    fn validate_manufacturing(&self, errors: &mut Vec<ConfigError>) {
        let m = &self.manufacturing;
        for (name, t) in [("primary_ratio", m.primary_ratio), ("secondary_ratio", m.secondary_ratio)] {
            if !t.is_ordered() {
                errors.push(ConfigError::new(
                    format!("manufacturing.{name}"),
                    "must satisfy low <= mode <= high",
                ));
            }
            check_range(errors, &format!("manufacturing.{name}.low"), t.low, 0.0, 10.0);
            check_range(errors, &format!("manufacturing.{name}.high"), t.high, 0.0, 10.0);
        }
        for (i, s) in m.primary_sites.iter().enumerate() {
            for (j, v) in s.capacity.iter().enumerate() {
                check_range(errors, &format!("manufacturing.primary_sites[{i}].capacity[{j}].litres"), v.litres, 0.0, f64::MAX);
            }
        }
        for (i, s) in m.secondary_sites.iter().enumerate() {
            check_range(errors, &format!("manufacturing.secondary_sites[{i}].doses"), s.doses, 0.0, f64::MAX);
        }
        for (i, p) in m.population.iter().enumerate() {
            check_range(errors, &format!("manufacturing.population[{i}]"), *p, 0.0, f64::MAX);
        }
        check_range(errors, "manufacturing.doses_per_person", m.doses_per_person, 0.1, 10.0);
        check_range(errors, "manufacturing.wastage_pct", m.wastage_pct, 0.0, 100.0);
        check_range(errors, "manufacturing.production_months", f64::from(m.production_months), 1.0, 600.0);
        self.validate_activities(errors);
    }

    fn validate_activities(&self, errors: &mut Vec<ConfigError>) {
        let activities = &self.manufacturing.activities;
        let mut defined = HashSet::new();
        for (i, a) in activities.iter().enumerate() {
            let field = format!("manufacturing.activities[{i}]");
            for pred in &a.after {
                if !defined.contains(pred) {
                    let known = activities.iter().any(|b| b.id == *pred);
                    errors.push(ConfigError::new(
                        format!("{field}.after"),
                        if known {
                            format!("predecessor {pred} must be listed before activity {}", a.id)
                        } else {
                            format!("unknown predecessor {pred}")
                        },
                    ));
                }
            }
            if !defined.insert(a.id) {
                errors.push(ConfigError::new(format!("{field}.id"), format!("duplicate id {}", a.id)));
            }
            if !a.duration.is_valid() {
                errors.push(ConfigError::new(
                    format!("{field}.duration"),
                    "durations must be >= 0 with low <= mode <= high",
                ));
            }
        }
        for (role, name) in [
            (ActivityRole::Approval, "approval"),
            (ActivityRole::PrimaryStart, "primary_start"),
            (ActivityRole::SecondaryStart, "secondary_start"),
        ] {
            let n = activities.iter().filter(|a| a.role == role).count();
            if n != 1 {
                errors.push(ConfigError::new(
                    "manufacturing.activities",
                    format!("expected exactly one \"{name}\" activity, found {n}"),
                ));
            }
        }
    }

    fn validate_candidates(&self, errors: &mut Vec<ConfigError>) {
        if self.candidates.is_empty() {
            errors.push(ConfigError::new("candidates", "at least one candidate is required"));
        }
        let mut numbers = HashSet::new();
        for (i, c) in self.candidates.iter().enumerate() {
            if !numbers.insert(c.number) {
                errors.push(ConfigError::new(
                    format!("candidates[{i}].number"),
                    format!("duplicate candidate number {}", c.number),
                ));
            }
            for (j, h) in c.history.iter().enumerate() {
                if let (Some(start), Some(end)) = (h.start, h.end) {
                    if start > end {
                        errors.push(ConfigError::new(
                            format!("candidates[{i}].history[{j}]"),
                            format!("start {start} is after end {end}"),
                        ));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(errors.is_empty(), "preset \"{name}\" should be valid: {errors:?}");
        }
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
tries = 50
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("partial TOML should parse");
        assert_eq!(cfg.simulation.seed, 99);
        assert_eq!(cfg.simulation.tries, 50);
        assert_eq!(cfg.simulation.months, 36);
        assert_eq!(cfg.candidates.len(), 12);
        assert_eq!(cfg.platforms.len(), Platform::COUNT);
    }

    #[test]
    fn full_sections_parse() {
        let toml = r#"
[simulation]
tries = 10
months = 48
outlook = "optimistic"

[phases]
success = [1.0, 1.0, 1.0, 1.0, 1.0]
best = [1.0, 1.0, 1.0, 1.0, 1.0]
likely = [1.0, 1.0, 1.0, 1.0, 1.0]
worst = [1.0, 1.0, 1.0, 1.0, 1.0]

[[platforms]]
platform = "RNA"
phase3_pos = 0.9
timeline = "normal"
correlation = "strong"
category = "nucleic_acid"
doses_per_litre = 1000.0
value_chain_ratio = 1.0
tech_transfer_ratio = 1.0

[[funding]]
funding = "large_pharma"
pos = 1.0
timeline = "faster"
overlap = "consecutive"
tech_failure = 0.5

[overlap.consecutive]
phase_gap = 2

[phase3_limit]
enabled = true
action = "stop"

[[manufacturing.activities]]
id = 1
name = "approval"
role = "approval"
duration = { kind = "static", months = 0.0 }

[[manufacturing.activities]]
id = 2
name = "fill"
role = "primary_start"
after = [1]
duration = { kind = "triangular", low = 1.0, mode = 2.0, high = 3.0 }

[[manufacturing.activities]]
id = 3
name = "finish"
role = "secondary_start"
after = [2]
duration = { kind = "static", months = 1.0 }

[[candidates]]
number = 7
platform = "rna"
funding = "large_pharma"
cepi = true
history = [{ phase = "pre_clinical", start = -3, end = -1 }]
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("full TOML should parse");
        assert_eq!(cfg.simulation.outlook, Outlook::Optimistic);
        assert_eq!(cfg.platform(Platform::Rna).phase3_pos, 0.9);
        // unlisted platforms fall back to built-in defaults
        assert_eq!(cfg.platform(Platform::Dna).category, ManufacturingCategory::NucleicAcid);
        assert_eq!(cfg.funding(Funding::LargePharma).duration_factor, 1.0);
        assert_eq!(cfg.overlap.consecutive.phase_gap, 2);
        assert_eq!(cfg.phase3_limit.action, Phase3Action::Stop);
        assert_eq!(cfg.manufacturing.activities.len(), 3);
        assert_eq!(cfg.candidates[0].history[0].end, Some(-1));
        let errors = cfg.validate();
        assert!(errors.is_empty(), "parsed scenario should be valid: {errors:?}");
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
tries = 24
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn unknown_categorical_choice_is_rejected() {
        let toml = r#"
[simulation]
outlook = "wildly_optimistic"
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_out_of_range_pos() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.phases.success[1] = 1.3;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "phases.success[1]"));
    }

    #[test]
    fn validation_catches_timeline_ordering() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.phases.best[2] = 20.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "phases.best[2]" && e.message.contains("likely")));
    }

    #[test]
    fn validation_reports_every_problem() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.tries = 0;
        cfg.simulation.months = 6;
        cfg.buyout.fraction = 2.0;
        let errors = cfg.validate();
        assert!(errors.len() >= 3, "expected all problems, got {errors:?}");
    }

    #[test]
    fn validation_catches_forward_predecessor() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.manufacturing.activities[1].after = vec![9];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.message.contains("must be listed before")));
    }

    #[test]
    fn validation_catches_missing_approval_activity() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.manufacturing.activities.retain(|a| a.role != ActivityRole::Approval);
        for a in &mut cfg.manufacturing.activities {
            a.after.retain(|id| *id != 5);
        }
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.message.contains("\"approval\"")));
    }

    #[test]
    fn validation_catches_duplicate_candidates() {
        let mut cfg = ScenarioConfig::baseline();
        let first = cfg.candidates[0].clone();
        cfg.candidates.push(first);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.message.contains("duplicate candidate")));
    }

    #[test]
    fn demand_targets_are_cumulative_and_increasing() {
        let m = ManufacturingConfig::default();
        let targets = m.demand_targets();
        // 100M people * 2 doses * 1.1 wastage
        assert!((targets[0] - 220.0e6).abs() < 1.0);
        for k in 1..DEMAND_GROUPS {
            assert!(targets[k] > targets[k - 1]);
        }
    }

    #[test]
    fn trial_seeds_offset_the_master_seed() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.seed = 7;
        assert_eq!(cfg.simulation.trial_seed(0), 7);
        assert_eq!(cfg.simulation.trial_seed(3), 10);
        cfg.simulation.seed = u64::MAX;
        assert_eq!(cfg.simulation.trial_seed(1), 0);
    }

    #[test]
    fn optimistic_and_pessimistic_differ_from_baseline() {
        let opt = ScenarioConfig::optimistic();
        let pes = ScenarioConfig::pessimistic();
        assert_eq!(opt.simulation.outlook, Outlook::Optimistic);
        assert!(pes.phase3_limit.enabled);
        assert!(pes.manufacturing.primary_ratio.high < ScenarioConfig::baseline().manufacturing.primary_ratio.high);
    }
}
