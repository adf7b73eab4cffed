//! Greedy assignment of primary and secondary plants to approved candidates.

use std::cmp::Ordering;

use rand::Rng;
use serde::Serialize;
use tracing::warn;

use super::schedule::ManufacturingStart;
use crate::config::{PrimarySite, ScenarioConfig, SecondarySite};
use crate::sim::types::{Funding, ManufacturingCategory, Platform};

/// Most plants any one candidate may take from a pool.
pub const MAX_PLANTS: u32 = 3;

/// An approved candidate with its manufacturing start months.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedCandidate {
    /// Position in the scenario roster.
    pub index: usize,
    pub platform: Platform,
    pub funding: Funding,
    pub approval_month: u32,
    pub start: ManufacturingStart,
}

/// Capacity assigned to one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub index: usize,
    pub platform: Platform,
    pub start: ManufacturingStart,
    /// Indices into the primary site list.
    pub primary_sites: Vec<usize>,
    /// Indices into the secondary site list.
    pub secondary_sites: Vec<usize>,
    /// Primary output in doses per month.
    pub primary: f64,
    /// Secondary output in doses per month, trimmed to `primary`.
    pub secondary: f64,
    /// Usable doses per month (whole doses).
    pub capacity: f64,
}

impl Allocation {
    fn empty(candidate: &ApprovedCandidate) -> Self {
        Self {
            index: candidate.index,
            platform: candidate.platform,
            start: candidate.start,
            primary_sites: Vec::new(),
            secondary_sites: Vec::new(),
            primary: 0.0,
            secondary: 0.0,
            capacity: 0.0,
        }
    }
}

/// Trial-private capacity pool.
///
/// Built from the immutable site lists with capacity ratios drawn once per
/// trial; each site is consumed by at most one candidate.
#[derive(Debug, Clone)]
pub struct CapacityPool<'a> {
    primary_sites: &'a [PrimarySite],
    secondary_sites: &'a [SecondarySite],
    primary_ratio: f64,
    secondary_ratio: f64,
    primary_used: Vec<bool>,
    secondary_used: Vec<bool>,
    primary_budget: [u32; ManufacturingCategory::COUNT],
    secondary_budget: u32,
    category: [ManufacturingCategory; Platform::COUNT],
    doses_per_litre: [f64; Platform::COUNT],
}

impl<'a> CapacityPool<'a> {
    /// Draws this trial's capacity ratios and resets every site.
    pub fn draw<R: Rng + ?Sized>(cfg: &'a ScenarioConfig, rng: &mut R) -> Self {
        let m = &cfg.manufacturing;
        let primary_ratio = m.primary_ratio.sample(rng);
        let secondary_ratio = m.secondary_ratio.sample(rng);
        Self {
            primary_sites: &m.primary_sites,
            secondary_sites: &m.secondary_sites,
            primary_ratio,
            secondary_ratio,
            primary_used: vec![false; m.primary_sites.len()],
            secondary_used: vec![false; m.secondary_sites.len()],
            primary_budget: ManufacturingCategory::ALL.map(|c| m.primary_plants.budget(c)),
            secondary_budget: m.secondary_plants,
            category: Platform::ALL.map(|p| cfg.platform(p).category),
            doses_per_litre: Platform::ALL.map(|p| cfg.platform(p).doses_per_litre),
        }
    }

    pub fn primary_ratio(&self) -> f64 {
        self.primary_ratio
    }

    pub fn secondary_ratio(&self) -> f64 {
        self.secondary_ratio
    }

    /// Scaled primary output of `site` for `platform`, in doses per month.
    fn primary_doses(&self, site: usize, platform: Platform) -> f64 {
        self.primary_sites[site].litres(platform)
            * self.primary_ratio
            * self.doses_per_litre[platform.index()]
    }

    fn secondary_doses(&self, site: usize) -> f64 {
        self.secondary_sites[site].doses * self.secondary_ratio
    }

    /// Allocates primary then secondary capacity and trims each candidate's
    /// secondary output to its primary output.
    ///
    /// The result is in the same order as `candidates`.
    pub fn allocate(&mut self, candidates: &[ApprovedCandidate]) -> Vec<Allocation> {
        let mut allocations: Vec<Allocation> = candidates.iter().map(Allocation::empty).collect();
        if candidates.is_empty() {
            return allocations;
        }
        if self.primary_sites.is_empty() || self.secondary_sites.is_empty() {
            warn!(
                primary = self.primary_sites.len(),
                secondary = self.secondary_sites.len(),
                "empty capacity pool, approved candidates get no capacity"
            );
        }

        for category in ManufacturingCategory::ALL {
            self.allocate_primary(category, candidates, &mut allocations);
        }
        self.allocate_secondary(candidates, &mut allocations);

        for a in &mut allocations {
            a.secondary = a.secondary.min(a.primary);
            a.capacity = a.secondary.floor();
        }
        allocations
    }

    fn allocate_primary(
        &mut self,
        category: ManufacturingCategory,
        candidates: &[ApprovedCandidate],
        allocations: &mut [Allocation],
    ) {
        let mut members: Vec<usize> = (0..candidates.len())
            .filter(|&k| self.category[candidates[k].platform.index()] == category)
            .collect();
        members.sort_by_key(|&k| (candidates[k].start.primary, k));
        let Some(&first) = members.first() else {
            return;
        };

        let representative = candidates[first].platform;
        let mut sites: Vec<usize> = (0..self.primary_sites.len())
            .filter(|&s| self.primary_sites[s].category == category)
            .collect();
        sites.sort_by(|&a, &b| {
            descending(
                self.primary_doses(a, representative),
                self.primary_doses(b, representative),
            )
        });

        let c = category.index();
        for (n, &k) in members.iter().enumerate() {
            let quota = plant_quota(self.primary_budget[c], members.len() - n);
            let platform = candidates[k].platform;
            let mut taken = 0;
            for &s in &sites {
                if taken == quota {
                    break;
                }
                if self.primary_used[s] {
                    continue;
                }
                let doses = self.primary_doses(s, platform);
                if doses <= 0.0 {
                    continue;
                }
                self.primary_used[s] = true;
                allocations[k].primary_sites.push(s);
                allocations[k].primary += doses;
                taken += 1;
            }
            self.primary_budget[c] -= taken;
        }
    }

    fn allocate_secondary(&mut self, candidates: &[ApprovedCandidate], allocations: &mut [Allocation]) {
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by_key(|&k| (candidates[k].start.secondary, k));
        let mut sites: Vec<usize> = (0..self.secondary_sites.len()).collect();
        sites.sort_by(|&a, &b| descending(self.secondary_doses(a), self.secondary_doses(b)));

        for (n, &k) in order.iter().enumerate() {
            let quota = plant_quota(self.secondary_budget, order.len() - n);
            let mut taken = 0;
            for &s in &sites {
                if taken == quota {
                    break;
                }
                let doses = self.secondary_doses(s);
                if self.secondary_used[s] || doses <= 0.0 {
                    continue;
                }
                self.secondary_used[s] = true;
                allocations[k].secondary_sites.push(s);
                allocations[k].secondary += doses;
                taken += 1;
            }
            self.secondary_budget -= taken;
        }
    }
}

/// Even share of the remaining budget among the candidates still waiting,
/// capped at [`MAX_PLANTS`].
pub fn plant_quota(budget: u32, waiting: usize) -> u32 {
    if waiting == 0 {
        return 0;
    }
    let waiting = u32::try_from(waiting).unwrap_or(u32::MAX);
    budget.div_ceil(waiting).min(MAX_PLANTS)
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlatformVolume;
    use crate::sim::sampling::Triangle;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approved(index: usize, platform: Platform, primary: i32, secondary: i32) -> ApprovedCandidate {
        ApprovedCandidate {
            index,
            platform,
            funding: Funding::Government,
            approval_month: 0,
            start: ManufacturingStart { primary, secondary },
        }
    }

    fn rna_site(country: &str, litres: f64) -> PrimarySite {
        PrimarySite {
            country: country.to_string(),
            category: ManufacturingCategory::NucleicAcid,
            capacity: vec![PlatformVolume {
                platform: Platform::Rna,
                litres,
            }],
        }
    }

    fn unit_config() -> ScenarioConfig {
        let mut cfg = ScenarioConfig::baseline();
        let m = &mut cfg.manufacturing;
        m.primary_ratio = Triangle::fixed(1.0);
        m.secondary_ratio = Triangle::fixed(1.0);
        m.primary_sites = (1..=5).map(|n| rna_site(&format!("site {n}"), f64::from(n) * 10.0)).collect();
        m.secondary_sites = vec![SecondarySite {
            country: "fill".to_string(),
            doses: 1.0e9,
        }];
        m.primary_plants.nucleic_acid = 10;
        for p in &mut cfg.platforms {
            p.doses_per_litre = 1000.0;
        }
        cfg
    }

    #[test]
    fn quota_is_capped_and_shared() {
        assert_eq!(plant_quota(10, 1), 3);
        assert_eq!(plant_quota(4, 2), 2);
        assert_eq!(plant_quota(5, 2), 3);
        assert_eq!(plant_quota(1, 3), 1);
        assert_eq!(plant_quota(0, 2), 0);
        assert_eq!(plant_quota(5, 0), 0);
    }

    #[test]
    fn earliest_starter_gets_largest_sites() {
        let cfg = unit_config();
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = CapacityPool::draw(&cfg, &mut rng);
        let allocations = pool.allocate(&[
            approved(0, Platform::Rna, 8, 11),
            approved(1, Platform::Rna, 5, 8),
        ]);
        // candidate 1 starts first and takes sites 5, 4, 3
        assert_eq!(allocations[1].primary_sites, vec![4, 3, 2]);
        assert_eq!(allocations[0].primary_sites, vec![1, 0]);
        assert_eq!(allocations[1].primary, (50.0 + 40.0 + 30.0) * 1000.0);
        assert_eq!(allocations[0].primary, (20.0 + 10.0) * 1000.0);
    }

    #[test]
    fn secondary_is_trimmed_to_primary() {
        let cfg = unit_config();
        let mut rng = StdRng::seed_from_u64(2);
        let mut pool = CapacityPool::draw(&cfg, &mut rng);
        let allocations = pool.allocate(&[approved(0, Platform::Rna, 1, 4)]);
        let a = &allocations[0];
        assert_eq!(a.primary, 120_000.0);
        assert_eq!(a.secondary, a.primary);
        assert_eq!(a.capacity, 120_000.0);
    }

    #[test]
    fn sites_without_platform_capacity_are_skipped() {
        let mut cfg = unit_config();
        cfg.manufacturing.primary_sites[4].capacity[0].platform = Platform::Dna;
        let mut rng = StdRng::seed_from_u64(3);
        let mut pool = CapacityPool::draw(&cfg, &mut rng);
        let allocations = pool.allocate(&[approved(0, Platform::Rna, 1, 4)]);
        assert!(!allocations[0].primary_sites.contains(&4));
        assert_eq!(allocations[0].primary_sites.len(), 3);
    }

    #[test]
    fn primary_output_uses_candidate_platform_and_ratio() {
        let mut cfg = unit_config();
        cfg.manufacturing.primary_ratio = Triangle::fixed(0.5);
        cfg.manufacturing.primary_sites[0].capacity.push(PlatformVolume {
            platform: Platform::Dna,
            litres: 10.0,
        });
        for p in cfg.platforms.iter_mut().filter(|p| p.platform == Platform::Dna) {
            p.doses_per_litre = 3000.0;
        }
        let mut rng = StdRng::seed_from_u64(5);
        let mut pool = CapacityPool::draw(&cfg, &mut rng);
        let allocations = pool.allocate(&[approved(0, Platform::Dna, 1, 4)]);
        assert_eq!(allocations[0].primary_sites, vec![0]);
        assert_eq!(allocations[0].primary, 15_000.0);
    }

    #[test]
    fn category_budget_limits_total_plants() {
        let mut cfg = unit_config();
        cfg.manufacturing.primary_plants.nucleic_acid = 2;
        let mut rng = StdRng::seed_from_u64(4);
        let mut pool = CapacityPool::draw(&cfg, &mut rng);
        let allocations = pool.allocate(&[
            approved(0, Platform::Rna, 1, 4),
            approved(1, Platform::Rna, 2, 5),
            approved(2, Platform::Dna, 3, 6),
        ]);
        let plants: usize = allocations.iter().map(|a| a.primary_sites.len()).sum();
        assert!(plants <= 2);
    }

    #[test]
    fn single_secondary_site_goes_to_earliest() {
        let cfg = unit_config();
        let mut rng = StdRng::seed_from_u64(5);
        let mut pool = CapacityPool::draw(&cfg, &mut rng);
        let allocations = pool.allocate(&[
            approved(0, Platform::Rna, 4, 7),
            approved(1, Platform::Rna, 4, 7),
        ]);
        assert_eq!(allocations[0].secondary_sites, vec![0]);
        assert!(allocations[1].secondary_sites.is_empty());
        assert_eq!(allocations[1].capacity, 0.0);
    }

    #[test]
    fn empty_pool_yields_zero_capacity() {
        let mut cfg = unit_config();
        cfg.manufacturing.primary_sites.clear();
        let mut rng = StdRng::seed_from_u64(6);
        let mut pool = CapacityPool::draw(&cfg, &mut rng);
        let allocations = pool.allocate(&[approved(0, Platform::Rna, 1, 4)]);
        assert_eq!(allocations[0].capacity, 0.0);
    }
}
