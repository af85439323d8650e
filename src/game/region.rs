use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;
use std::env;
use std::fmt::{Display, Formatter, Error as FmtError};
use std::fs::File;
use crate::lib::Result;

/// Coarse geographic bucket game servers and players are matched within.
///
/// The groups split into two islands with no defined distance between them:
/// the mainland (`EU`, `RU`, `US`) and east asia (`EA`).
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum RegionGroup {
    EU,
    RU,
    US,
    EA,
}

impl Display for RegionGroup {
    fn fmt(&self, f: &mut Formatter) -> std::result::Result<(), FmtError> {
        write!(f, "{:?}", self)
    }
}

/// Symmetric-pair cost table for one island. Pairs absent from the table
/// have an undefined cost, not a zero one.
pub struct DistanceMap {
    pairs: &'static [(RegionGroup, RegionGroup, f64)],
}

impl DistanceMap {
    pub fn distance(&self, a: RegionGroup, b: RegionGroup) -> Option<f64> {
        self.pairs.iter()
            .find(|(x, y, _)| (*x, *y) == (a, b) || (*x, *y) == (b, a))
            .map(|(_, _, d)| *d)
    }
}

static MAINLAND_DISTANCES: DistanceMap = DistanceMap {
    pairs: &[
        (RegionGroup::EU, RegionGroup::EU, 0.0),
        (RegionGroup::RU, RegionGroup::RU, 0.0),
        (RegionGroup::US, RegionGroup::US, 0.0),
        (RegionGroup::EU, RegionGroup::RU, 1.0),
        (RegionGroup::EU, RegionGroup::US, 1.1),
        (RegionGroup::RU, RegionGroup::US, 1.2),
    ],
};

static EAST_ASIA_DISTANCES: DistanceMap = DistanceMap {
    pairs: &[
        (RegionGroup::EA, RegionGroup::EA, 0.0),
    ],
};

impl RegionGroup {
    /// The cost table of the island this group belongs to.
    pub fn distance_map(self) -> &'static DistanceMap {
        match self {
            RegionGroup::EA => &EAST_ASIA_DISTANCES,
            _ => &MAINLAND_DISTANCES,
        }
    }
}

/// Maps raw region codes sent by clients and game servers to region groups.
pub struct RegionMapper {
    mapping: HashMap<String, RegionGroup>,
}

impl RegionMapper {
    pub fn new(mapping: HashMap<String, RegionGroup>) -> Self {
        Self { mapping }
    }

    pub fn load(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        let mapping = serde_json::from_reader(file)?;
        Ok(Self::new(mapping))
    }

    /// Case-insensitive lookup; unknown codes land in `EU`.
    pub fn region_group(&self, code: &str) -> RegionGroup {
        self.mapping.get(&code.to_uppercase()).copied().unwrap_or(RegionGroup::EU)
    }
}

/// The region group most of the given players sit in, `EU` when empty.
/// Ties resolve to the first group in declaration order.
pub fn plurality_group(region_group_counts: &HashMap<RegionGroup, u32>) -> RegionGroup {
    let mut groups: Vec<(RegionGroup, u32)> = region_group_counts.iter()
        .map(|(&group, &count)| (group, count))
        .collect();
    groups.sort();
    // min_by_key keeps the first of equally-counted groups
    groups.into_iter()
        .min_by_key(|&(_, count)| Reverse(count))
        .map(|(group, _)| group)
        .unwrap_or(RegionGroup::EU)
}

/// Orders the available server groups by the summed cost of serving the given
/// player population, cheapest first. A server group with no defined distance
/// to any player group is excluded rather than treated as free.
pub fn order_server_groups(
    region_group_counts: &HashMap<RegionGroup, u32>,
    available_server_groups: &[RegionGroup],
    distance_map: &DistanceMap,
) -> Vec<RegionGroup> {
    let mut groups = available_server_groups.to_vec();
    groups.sort();
    groups.dedup();

    let mut costs: Vec<(RegionGroup, f64)> = Vec::new();
    for &server_group in &groups {
        let mut cost = 0.0;
        let mut reachable = false;
        for (&player_group, &count) in region_group_counts {
            if let Some(distance) = distance_map.distance(server_group, player_group) {
                cost += distance * f64::from(count);
                reachable = true;
            }
        }
        if reachable {
            costs.push((server_group, cost));
        }
    }

    if env::var_os("DEBUG_REGION_DISTANCES").is_some() {
        log::debug!("server group costs: {:?}", costs);
    }

    costs.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    costs.into_iter().map(|(group, _)| group).collect()
}
