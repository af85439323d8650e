use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Error as FmtError};
use crate::game::region::RegionGroup;

/// Opaque player identifier minted by the platform upstream of matchmaking.
/// Authentication already happened by the time a request reaches us, so the
/// id is trusted as-is.
#[derive(Serialize, Deserialize, Hash, PartialEq, Eq, Clone, Debug)]
pub struct PlayerID(pub String);

impl Display for PlayerID {
    fn fmt(&self, f: &mut Formatter) -> std::result::Result<(), FmtError> {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerID {
    fn from(id: &str) -> Self { Self(id.to_string()) }
}

pub const GAME_FACTIONS: [&str; 2] = ["Loyalists", "Renegades"];

pub const MAX_PARTY_SIZE: usize = 4;

/// Mission sub-catalog a player votes for when entering the queue.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MatchGroup {
    PoolAlpha,
    PoolBeta,
    PoolGamma,
    Vein,
    Inferno,
    Abyss,
}

/// Queue entry stored under `player:{pool_id}:{player_id}`. The enqueue and
/// last-seen timestamps live as sorted-set scores, not in the blob.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QueuedPlayer {
    pub desired_match_group: MatchGroup,
    pub faction: String,
    /// Leader first, at most `MAX_PARTY_SIZE` members including them.
    pub party_members: Vec<PlayerID>,
    pub region_group: RegionGroup,
}

impl QueuedPlayer {
    pub fn party_size(&self) -> usize {
        self.party_members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_blob_round_trip() {
        let player = QueuedPlayer {
            desired_match_group: MatchGroup::Vein,
            faction: GAME_FACTIONS[0].to_string(),
            party_members: vec![PlayerID::from("p1"), PlayerID::from("p2")],
            region_group: RegionGroup::RU,
        };
        let blob = serde_json::to_string(&player).unwrap();
        let parsed: QueuedPlayer = serde_json::from_str(&blob).unwrap();
        assert_eq!(2, parsed.party_size());
        assert_eq!(PlayerID::from("p1"), parsed.party_members[0]);
        assert_eq!(RegionGroup::RU, parsed.region_group);
    }
}
