use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Error as FmtError};
use crate::game::player::{MatchGroup, PlayerID, QueuedPlayer, GAME_FACTIONS};

/// Size tier of a formed match; selects the mission sub-catalog and the
/// resource-unit cost of launching it.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Duel,
    Low,
    Medium,
    Large,
    Raid4,
}

impl Display for MatchType {
    fn fmt(&self, f: &mut Formatter) -> std::result::Result<(), FmtError> {
        let name = match self {
            MatchType::Duel => "duel",
            MatchType::Low => "low",
            MatchType::Medium => "medium",
            MatchType::Large => "large",
            MatchType::Raid4 => "raid4",
        };
        write!(f, "{}", name)
    }
}

/// Mission weight tree for one game mode: match group, then match type, then
/// `{mission: weight}` leaves.
pub type ModeMissionsConfig = HashMap<MatchGroup, HashMap<MatchType, HashMap<String, f64>>>;

/// What a mode's team-size policy decided for the current queue state.
/// `team_size` caps greedy admission per side, `min_team_size` is the
/// viability floor checked after admission.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TeamSizes {
    pub team_size: u32,
    pub min_team_size: u32,
    pub max_team_size: u32,
    pub match_type: MatchType,
}

/// A match ready to be handed to the dispatcher.
#[derive(Clone, Debug)]
pub struct FormedMatch {
    pub mission: String,
    pub match_type: MatchType,
    /// Colon-joined attacking/defending factions for PvP, a single faction
    /// for PvE.
    pub faction_setup: String,
    pub max_team_size: u32,
    pub faction_counts: HashMap<String, u32>,
}

/// `None` when no match can be formed from the snapshot yet. A `None` entry
/// in the player list is the synthetic empty side of an instant match and
/// must be filtered before any per-player write.
pub type FormationOutcome = Option<(Vec<Option<PlayerID>>, FormedMatch)>;

type FactionBucket = Vec<(Option<PlayerID>, u32)>;

fn bucket_by_faction(
    players: &[(PlayerID, QueuedPlayer)],
) -> (Vec<(String, FactionBucket)>, HashMap<PlayerID, Vec<PlayerID>>) {
    let mut faction_buckets: Vec<(String, FactionBucket)> = Vec::new();
    let mut party_map = HashMap::new();

    for (player_id, info) in players {
        let party_size = info.party_size() as u32;
        party_map.insert(player_id.clone(), info.party_members.clone());
        match faction_buckets.iter_mut().find(|(faction, _)| *faction == info.faction) {
            Some((_, bucket)) => bucket.push((Some(player_id.clone()), party_size)),
            None => faction_buckets.push((info.faction.clone(), vec![(Some(player_id.clone()), party_size)])),
        }
    }
    (faction_buckets, party_map)
}

fn bucket_total(bucket: &[(Option<PlayerID>, u32)]) -> u32 {
    bucket.iter().map(|(_, size)| *size).sum()
}

/// Walks a faction's candidates in order and admits each party whole while it
/// fits under `team_size`. Returns the admitted players and the used count.
fn admit_parties(
    candidates: &[(Option<PlayerID>, u32)],
    party_map: &HashMap<PlayerID, Vec<PlayerID>>,
    team_size: u32,
) -> (Vec<Option<PlayerID>>, u32) {
    let mut selected = Vec::new();
    let mut used = 0;

    for (leader, party_size) in candidates {
        if used + party_size <= team_size {
            match leader {
                Some(id) => {
                    let party = party_map.get(id)
                        .map(|party| party.as_slice())
                        .unwrap_or_else(|| std::slice::from_ref(id));
                    selected.extend(party.iter().cloned().map(Some));
                }
                None => selected.push(None),
            }
            used += party_size;
        }
    }
    (selected, used)
}

/// Plurality vote on the admitted leaders' desired match groups, then a
/// weighted mission draw from the winning group's sub-catalog. Vote ties
/// resolve to the first-voted group; a winner missing from the configuration
/// falls back to a uniformly random configured group.
fn choose_mission(
    players: &[(PlayerID, QueuedPlayer)],
    players_in_match: &[Option<PlayerID>],
    config_for_mode: &ModeMissionsConfig,
    match_type: MatchType,
) -> Option<String> {
    let mut votes: Vec<(MatchGroup, u32)> = Vec::new();
    for admitted in players_in_match {
        let leader = match admitted {
            Some(id) => id,
            None => continue,
        };
        // Party members who are not leaders carry no vote of their own
        let info = match players.iter().find(|(id, _)| id == leader) {
            Some((_, info)) => info,
            None => continue,
        };
        match votes.iter_mut().find(|(group, _)| *group == info.desired_match_group) {
            Some((_, count)) => *count += 1,
            None => votes.push((info.desired_match_group, 1)),
        }
    }

    let mut winner = None;
    let mut best = 0;
    for &(group, count) in &votes {
        if count > best {
            best = count;
            winner = Some(group);
        }
    }

    let mut rng = thread_rng();
    let group = match winner {
        Some(group) if config_for_mode.contains_key(&group) => group,
        _ => {
            let configured: Vec<MatchGroup> = config_for_mode.keys().copied().collect();
            *configured.choose(&mut rng)?
        }
    };

    let weights = config_for_mode.get(&group)?.get(&match_type)?;
    let missions: Vec<(&String, f64)> = weights.iter().map(|(mission, &weight)| (mission, weight)).collect();
    missions.choose_weighted(&mut rng, |(_, weight)| *weight)
        .ok()
        .map(|(mission, _)| (*mission).clone())
}

/// Attempts to create a PvP match by balancing the two largest factions and
/// keeping parties whole. With `ignore_faction_min_amount` a missing side is
/// synthesized as an empty entry so single-faction snapshots can still form
/// an instant match.
pub fn try_create_pvp_match_common(
    players: &[(PlayerID, QueuedPlayer)],
    oldest_player_queue_time: f64,
    newest_player_queue_time: f64,
    config_for_mode: &ModeMissionsConfig,
    determine_team_size: impl Fn(u32, u32, f64, f64) -> Option<TeamSizes>,
    ignore_faction_min_amount: bool,
) -> FormationOutcome {
    let (mut faction_buckets, party_map) = bucket_by_faction(players);

    if faction_buckets.len() < 2 {
        if !ignore_faction_min_amount {
            return None;
        }
        for faction in GAME_FACTIONS.iter() {
            if faction_buckets.len() >= 2 {
                break;
            }
            if !faction_buckets.iter().any(|(present, _)| present == faction) {
                faction_buckets.push((faction.to_string(), vec![(None, 0)]));
            }
        }
    }

    faction_buckets.sort_by_key(|(_, bucket)| Reverse(bucket_total(bucket)));
    let mut largest = faction_buckets.into_iter();
    let (faction1, mut faction1_players) = largest.next()?;
    let (faction2, mut faction2_players) = largest.next()?;

    // Larger parties first; the sort is stable so equal-sized parties keep
    // their queue order
    faction1_players.sort_by_key(|&(_, size)| Reverse(size));
    faction2_players.sort_by_key(|&(_, size)| Reverse(size));

    let faction1_count = bucket_total(&faction1_players);
    let faction2_count = bucket_total(&faction2_players);

    let sizes = determine_team_size(
        faction1_count,
        faction2_count,
        oldest_player_queue_time,
        newest_player_queue_time,
    )?;

    let (mut players_in_match, faction1_used) = admit_parties(&faction1_players, &party_map, sizes.team_size);
    let (selected2, faction2_used) = admit_parties(&faction2_players, &party_map, sizes.team_size);
    players_in_match.extend(selected2);

    if faction1_used < sizes.min_team_size || faction2_used < sizes.min_team_size {
        return None;
    }

    let mission = choose_mission(players, &players_in_match, config_for_mode, sizes.match_type)?;

    let faction_setup = if thread_rng().gen_bool(0.5) {
        format!("{}:{}", faction1, faction2)
    } else {
        format!("{}:{}", faction2, faction1)
    };
    let mut faction_counts = HashMap::new();
    faction_counts.insert(faction1, faction1_used);
    faction_counts.insert(faction2, faction2_used);

    Some((players_in_match, FormedMatch {
        mission,
        match_type: sizes.match_type,
        faction_setup,
        max_team_size: sizes.max_team_size,
        faction_counts,
    }))
}

/// Attempts to create a PvE match from the single largest faction, keeping
/// parties whole.
pub fn try_create_pve_match_common(
    players: &[(PlayerID, QueuedPlayer)],
    oldest_player_queue_time: f64,
    config_for_mode: &ModeMissionsConfig,
    determine_team_size: impl Fn(u32, f64) -> Option<TeamSizes>,
) -> FormationOutcome {
    let (mut faction_buckets, party_map) = bucket_by_faction(players);
    if faction_buckets.is_empty() {
        return None;
    }

    faction_buckets.sort_by_key(|(_, bucket)| Reverse(bucket_total(bucket)));
    let (faction1, mut faction1_players) = faction_buckets.into_iter().next()?;

    faction1_players.sort_by_key(|&(_, size)| Reverse(size));
    let faction1_count = bucket_total(&faction1_players);

    let sizes = determine_team_size(faction1_count, oldest_player_queue_time)?;

    let (players_in_match, faction1_used) = admit_parties(&faction1_players, &party_map, sizes.team_size);

    if faction1_used < sizes.min_team_size {
        return None;
    }

    let mission = choose_mission(players, &players_in_match, config_for_mode, sizes.match_type)?;

    let mut faction_counts = HashMap::new();
    faction_counts.insert(faction1.clone(), faction1_used);

    Some((players_in_match, FormedMatch {
        mission,
        match_type: sizes.match_type,
        faction_setup: faction1,
        max_team_size: sizes.max_team_size,
        faction_counts,
    }))
}
