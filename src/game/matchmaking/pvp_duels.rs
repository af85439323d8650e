use crate::game::matchmaking::formation::{
    try_create_pvp_match_common, FormationOutcome, MatchType, ModeMissionsConfig, TeamSizes,
};
use crate::game::matchmaking::pvp_casual::MAX_TEAM_SIZE_CASUAL;
use crate::game::player::{PlayerID, QueuedPlayer};

const DUEL_TEAM_SIZE: u32 = 5;
const MIN_DUEL_TEAM_SIZE: u32 = 2;

/// Duels only make sense with enough players for rotating pairs, so the pool
/// waits for five a side and never forms anything smaller.
pub fn determine_team_size_duel(
    faction1_count: u32,
    faction2_count: u32,
    _oldest_player_queue_time: f64,
    _newest_player_queue_time: f64,
) -> Option<TeamSizes> {
    let team_size = faction1_count.min(faction2_count).min(MAX_TEAM_SIZE_CASUAL);
    let max_team_size = faction1_count.max(faction2_count);

    if team_size < DUEL_TEAM_SIZE {
        // Not enough: [0, 5)
        None
    } else {
        Some(TeamSizes {
            team_size: max_team_size.min(DUEL_TEAM_SIZE),
            min_team_size: MIN_DUEL_TEAM_SIZE,
            max_team_size: DUEL_TEAM_SIZE,
            match_type: MatchType::Duel,
        })
    }
}

pub fn try_create_pvp_match_duel(
    players: &[(PlayerID, QueuedPlayer)],
    oldest_player_queue_time: f64,
    newest_player_queue_time: f64,
    config_for_mode: &ModeMissionsConfig,
) -> FormationOutcome {
    try_create_pvp_match_common(
        players,
        oldest_player_queue_time,
        newest_player_queue_time,
        config_for_mode,
        determine_team_size_duel,
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::matchmaking::formation::tests::{ids, queued, single_mission_config};
    use crate::game::player::MatchGroup;

    #[test]
    fn test_determine_team_size() {
        assert_eq!(None, determine_team_size_duel(4, 5, 500.0, 500.0));
        assert_eq!(
            Some(TeamSizes { team_size: 5, min_team_size: 2, max_team_size: 5, match_type: MatchType::Duel }),
            determine_team_size_duel(5, 5, 0.0, 0.0),
        );
        // The larger side is capped to the duel roster size
        assert_eq!(
            Some(TeamSizes { team_size: 5, min_team_size: 2, max_team_size: 5, match_type: MatchType::Duel }),
            determine_team_size_duel(5, 9, 0.0, 0.0),
        );
    }

    #[test]
    fn test_duel_forms_at_five_a_side() {
        let mut players = Vec::new();
        for n in 1..=5 {
            let id = format!("a{}", n);
            players.push((PlayerID::from(id.as_str()), queued("A", &[id.as_str()], MatchGroup::PoolBeta)));
        }
        for n in 1..=5 {
            let id = format!("b{}", n);
            players.push((PlayerID::from(id.as_str()), queued("B", &[id.as_str()], MatchGroup::PoolBeta)));
        }
        let config = single_mission_config(&[MatchType::Duel]);
        // Votes go to PoolBeta, which is not configured; the single
        // configured group still wins through the fallback
        assert!(config.get(&MatchGroup::PoolBeta).is_none());

        let (players_in_match, formed) =
            try_create_pvp_match_duel(&players, 10.0, 10.0, &config).unwrap();
        assert_eq!(MatchType::Duel, formed.match_type);
        assert_eq!(10, ids(&players_in_match).len());
    }

    #[test]
    fn test_duel_declines_below_five() {
        let players = vec![
            (PlayerID::from("a1"), queued("A", &["a1", "a2", "a3", "a4"], MatchGroup::PoolAlpha)),
            (PlayerID::from("b1"), queued("B", &["b1", "b2", "b3", "b4"], MatchGroup::PoolAlpha)),
        ];
        let config = single_mission_config(&[MatchType::Duel]);
        assert!(try_create_pvp_match_duel(&players, 600.0, 600.0, &config).is_none());
    }
}
