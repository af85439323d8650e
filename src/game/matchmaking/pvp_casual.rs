use crate::game::matchmaking::formation::{
    try_create_pvp_match_common, FormationOutcome, MatchType, ModeMissionsConfig, TeamSizes,
};
use crate::game::player::{PlayerID, QueuedPlayer};

pub const MAX_TEAM_SIZE_CASUAL: u32 = 20;

const TIME_THRESHOLD_FOR_SMALL_MATCH: f64 = 60.0;
const TIME_THRESHOLD_FOR_MEDIUM_SIZED_MATCH: f64 = 45.0;
/// Bursty late arrivals hold formation back until the newest candidate has
/// waited at least this long.
const NEWEST_PLAYER_TIME_THRESHOLD: f64 = 20.0;

/// Determines appropriate team size based on player count and time elapsed
/// since the oldest and newest players queued.
pub fn determine_team_size_casual(
    faction1_count: u32,
    faction2_count: u32,
    oldest_player_queue_time: f64,
    newest_player_queue_time: f64,
) -> Option<TeamSizes> {
    let team_size = faction1_count.min(faction2_count).min(MAX_TEAM_SIZE_CASUAL);
    let max_team_size = faction1_count.max(faction2_count);

    if team_size < 1 {
        // Not enough for any match: [0, 1)
        None
    } else if team_size < 5 {
        if oldest_player_queue_time >= TIME_THRESHOLD_FOR_SMALL_MATCH
            && newest_player_queue_time >= NEWEST_PLAYER_TIME_THRESHOLD
        {
            // Enough only for a small skirmish: [1, 5)
            Some(TeamSizes {
                team_size: max_team_size.min(MAX_TEAM_SIZE_CASUAL),
                min_team_size: 1,
                max_team_size: MAX_TEAM_SIZE_CASUAL,
                match_type: MatchType::Low,
            })
        } else {
            None // Wait for more players
        }
    } else if team_size < 8 {
        if oldest_player_queue_time >= TIME_THRESHOLD_FOR_MEDIUM_SIZED_MATCH
            && newest_player_queue_time >= NEWEST_PLAYER_TIME_THRESHOLD
        {
            // Enough for a medium-sized match (e.g. Hold The Line): [5, 8)
            Some(TeamSizes {
                team_size: max_team_size.min(MAX_TEAM_SIZE_CASUAL),
                min_team_size: 5,
                max_team_size: MAX_TEAM_SIZE_CASUAL,
                match_type: MatchType::Medium,
            })
        } else {
            None
        }
    } else {
        // Large battles: [8, 20]
        Some(TeamSizes {
            team_size: max_team_size.min(MAX_TEAM_SIZE_CASUAL),
            min_team_size: 8,
            max_team_size: MAX_TEAM_SIZE_CASUAL,
            match_type: MatchType::Large,
        })
    }
}

/// Instantly starts a PvP match with whoever is around.
pub fn determine_team_size_instant_pvp(
    faction1_count: u32,
    faction2_count: u32,
    _oldest_player_queue_time: f64,
    _newest_player_queue_time: f64,
) -> Option<TeamSizes> {
    let max_team_size = faction1_count.max(faction2_count);
    if max_team_size == 0 {
        return None;
    }
    Some(TeamSizes {
        team_size: max_team_size,
        min_team_size: 0,
        max_team_size: MAX_TEAM_SIZE_CASUAL,
        match_type: MatchType::Medium,
    })
}

pub fn try_create_pvp_match_casual(
    players: &[(PlayerID, QueuedPlayer)],
    oldest_player_queue_time: f64,
    newest_player_queue_time: f64,
    config_for_mode: &ModeMissionsConfig,
    instant_creation: bool,
) -> FormationOutcome {
    let determine = if instant_creation {
        determine_team_size_instant_pvp
    } else {
        determine_team_size_casual
    };
    try_create_pvp_match_common(
        players,
        oldest_player_queue_time,
        newest_player_queue_time,
        config_for_mode,
        determine,
        instant_creation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::matchmaking::formation::tests::{ids, queued, single_mission_config};
    use crate::game::player::MatchGroup;

    const ALL_CASUAL_TYPES: [MatchType; 3] = [MatchType::Low, MatchType::Medium, MatchType::Large];

    #[test]
    fn test_determine_team_size() {
        // Not enough players
        assert_eq!(None, determine_team_size_casual(1, 0, 100.0, 100.0));

        // Enough for a small match, past threshold
        assert_eq!(
            Some(TeamSizes { team_size: 2, min_team_size: 1, max_team_size: 20, match_type: MatchType::Low }),
            determine_team_size_casual(2, 2, 61.0, 61.0),
        );

        // Enough for a small match, but waiting
        assert_eq!(None, determine_team_size_casual(2, 2, 30.0, 30.0));

        // Old enough queue, held back by a fresh arrival
        assert_eq!(None, determine_team_size_casual(2, 2, 61.0, 5.0));

        // Medium match, past threshold
        assert_eq!(
            Some(TeamSizes { team_size: 6, min_team_size: 5, max_team_size: 20, match_type: MatchType::Medium }),
            determine_team_size_casual(6, 6, 46.0, 46.0),
        );

        // Large battle forms with no waiting
        assert_eq!(
            Some(TeamSizes { team_size: 12, min_team_size: 8, max_team_size: 20, match_type: MatchType::Large }),
            determine_team_size_casual(10, 12, 0.0, 0.0),
        );

        // Cap at max team size
        assert_eq!(
            Some(TeamSizes { team_size: 20, min_team_size: 8, max_team_size: 20, match_type: MatchType::Large }),
            determine_team_size_casual(24, 22, 100.0, 100.0),
        );
    }

    #[test]
    fn test_small_match_past_threshold() {
        let players = vec![
            (PlayerID::from("p1"), queued("A", &["p1"], MatchGroup::PoolAlpha)),
            (PlayerID::from("p2"), queued("A", &["p2"], MatchGroup::PoolAlpha)),
            (PlayerID::from("p3"), queued("B", &["p3", "p4"], MatchGroup::PoolAlpha)),
        ];
        let config = single_mission_config(&ALL_CASUAL_TYPES);
        let (players_in_match, formed) =
            try_create_pvp_match_casual(&players, 61.0, 61.0, &config, false).unwrap();

        let mut admitted = ids(&players_in_match);
        admitted.sort();
        assert_eq!(vec!["p1", "p2", "p3", "p4"], admitted);
        assert_eq!("m1", formed.mission);
        assert_eq!(MatchType::Low, formed.match_type);
    }

    #[test]
    fn test_single_faction_declines() {
        let players = vec![
            (PlayerID::from("p1"), queued("A", &["p1"], MatchGroup::PoolAlpha)),
            (PlayerID::from("p2"), queued("A", &["p2"], MatchGroup::PoolAlpha)),
        ];
        let config = single_mission_config(&ALL_CASUAL_TYPES);
        assert!(try_create_pvp_match_casual(&players, 100.0, 100.0, &config, false).is_none());
    }

    #[test]
    fn test_medium_sized_match() {
        let players = vec![
            (PlayerID::from("p1"), queued("A", &["p1"], MatchGroup::PoolAlpha)),
            (PlayerID::from("p2"), queued("A", &["p2", "p3", "p4"], MatchGroup::PoolAlpha)),
            (PlayerID::from("p5"), queued("A", &["p5"], MatchGroup::PoolAlpha)),
            (PlayerID::from("p6"), queued("B", &["p6"], MatchGroup::PoolAlpha)),
            (PlayerID::from("p7"), queued("B", &["p7", "p8", "p9", "p10"], MatchGroup::PoolAlpha)),
        ];
        let config = single_mission_config(&ALL_CASUAL_TYPES);
        let (players_in_match, formed) =
            try_create_pvp_match_casual(&players, 50.0, 50.0, &config, false).unwrap();

        let mut admitted = ids(&players_in_match);
        admitted.sort();
        let mut expected: Vec<String> = (1..=10).map(|n| format!("p{}", n)).collect();
        expected.sort();
        assert_eq!(expected, admitted);
        assert_eq!(MatchType::Medium, formed.match_type);
        assert_eq!("m1", formed.mission);
    }

    #[test]
    fn test_large_match_caps_sides_and_keeps_parties_whole() {
        // Side A: 10 singles. Side B: parties of 4, 4, 4, 4, 3, 3 = 22; the
        // last three-member party would push B past the cap and is dropped
        // whole, leaving 19
        let mut players = Vec::new();
        for n in 1..=10 {
            let id = format!("a{}", n);
            players.push((PlayerID::from(id.as_str()), queued("A", &[id.as_str()], MatchGroup::PoolAlpha)));
        }
        let b_parties: [&[&str]; 6] = [
            &["b1", "b2", "b3", "b4"],
            &["b5", "b6", "b7", "b8"],
            &["b9", "b10", "b11", "b12"],
            &["b13", "b14", "b15", "b16"],
            &["b17", "b18", "b19"],
            &["b20", "b21", "b22"],
        ];
        for party in &b_parties {
            players.push((PlayerID::from(party[0]), queued("B", party, MatchGroup::PoolAlpha)));
        }

        let config = single_mission_config(&ALL_CASUAL_TYPES);
        let (players_in_match, formed) =
            try_create_pvp_match_casual(&players, 50.0, 50.0, &config, false).unwrap();

        assert_eq!(MatchType::Large, formed.match_type);
        let admitted = ids(&players_in_match);
        assert_eq!(29, admitted.len());
        assert_eq!(10, formed.faction_counts["A"]);
        assert_eq!(19, formed.faction_counts["B"]);
        // The dropped party is absent as a unit
        for member in &["b20", "b21", "b22"] {
            assert!(!admitted.contains(&member.to_string()));
        }
    }

    #[test]
    fn test_instant_match_with_single_player() {
        let players = vec![
            (PlayerID::from("p1"), queued("Loyalists", &["p1"], MatchGroup::PoolAlpha)),
        ];
        let config = single_mission_config(&[MatchType::Medium]);
        let (players_in_match, formed) =
            try_create_pvp_match_casual(&players, 0.0, 0.0, &config, true).unwrap();

        assert_eq!(MatchType::Medium, formed.match_type);
        assert_eq!(2, players_in_match.len());
        assert_eq!(Some(PlayerID::from("p1")), players_in_match[0]);
        assert_eq!(None, players_in_match[1]);
    }

    #[test]
    fn test_instant_match_with_empty_queue_declines() {
        let config = single_mission_config(&[MatchType::Medium]);
        assert!(try_create_pvp_match_casual(&[], 0.0, 0.0, &config, true).is_none());
    }
}
