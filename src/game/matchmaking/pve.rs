use crate::game::matchmaking::formation::{
    try_create_pve_match_common, FormationOutcome, MatchType, ModeMissionsConfig, TeamSizes,
};
use crate::game::player::{PlayerID, QueuedPlayer};

pub const MAX_GROUP_SIZE_PVE: u32 = 4;

const TIME_THRESHOLD_FOR_MATCH_ALONE: f64 = 360.0;
const TIME_THRESHOLD_FOR_MATCH_WITH_NOT_FULL_GROUP: f64 = 180.0;

/// Determines the raid group size from the queued count and how long the
/// oldest candidate has been waiting.
pub fn determine_team_size_pve(faction1_count: u32, oldest_player_queue_time: f64) -> Option<TeamSizes> {
    let team_size = faction1_count.min(MAX_GROUP_SIZE_PVE);

    if team_size < 1 {
        None
    } else if team_size < 2 {
        // Player is alone in queue
        if oldest_player_queue_time >= TIME_THRESHOLD_FOR_MATCH_ALONE {
            Some(TeamSizes {
                team_size,
                min_team_size: 1,
                max_team_size: MAX_GROUP_SIZE_PVE,
                match_type: MatchType::Raid4,
            })
        } else {
            None
        }
    } else if team_size < MAX_GROUP_SIZE_PVE {
        // Not a full group: [2, 4)
        if oldest_player_queue_time >= TIME_THRESHOLD_FOR_MATCH_WITH_NOT_FULL_GROUP {
            Some(TeamSizes {
                team_size,
                min_team_size: 2,
                max_team_size: MAX_GROUP_SIZE_PVE,
                match_type: MatchType::Raid4,
            })
        } else {
            None
        }
    } else {
        Some(TeamSizes {
            team_size: MAX_GROUP_SIZE_PVE,
            min_team_size: MAX_GROUP_SIZE_PVE,
            max_team_size: MAX_GROUP_SIZE_PVE,
            match_type: MatchType::Raid4,
        })
    }
}

/// Instantly assigns whoever is queued to a raid.
pub fn determine_team_size_instant_pve(faction1_count: u32, _oldest_player_queue_time: f64) -> Option<TeamSizes> {
    let team_size = faction1_count.min(MAX_GROUP_SIZE_PVE);
    if team_size < 1 {
        return None;
    }
    Some(TeamSizes {
        team_size,
        min_team_size: 1,
        max_team_size: MAX_GROUP_SIZE_PVE,
        match_type: MatchType::Raid4,
    })
}

pub fn try_create_pve_match(
    players: &[(PlayerID, QueuedPlayer)],
    oldest_player_queue_time: f64,
    config_for_mode: &ModeMissionsConfig,
    instant_creation: bool,
) -> FormationOutcome {
    let determine = if instant_creation {
        determine_team_size_instant_pve
    } else {
        determine_team_size_pve
    };
    try_create_pve_match_common(players, oldest_player_queue_time, config_for_mode, determine)
}
