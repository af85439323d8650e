use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Error as FmtError};
use std::fs::File;
use uuid::Uuid;
use crate::{
    game::dispatch::{self, LaunchRequest},
    game::player::{PlayerID, QueuedPlayer, GAME_FACTIONS, MAX_PARTY_SIZE, MatchGroup},
    game::{queue, server_registry},
    lib::{error::InternalError, Ack, Result},
    AppState,
};

pub mod formation;
pub mod pve;
pub mod pvp_casual;
pub mod pvp_duels;

use self::formation::{FormationOutcome, MatchType, ModeMissionsConfig};

/// How many registry candidates a formation attempt considers.
const MAX_LAUNCH_CANDIDATES: isize = 10;

/// Mission weight trees per game mode.
#[derive(Deserialize, Clone)]
pub struct MissionsConfig {
    pub pvp: ModeMissionsConfig,
    pub pve: ModeMissionsConfig,
}

/// Static matchmaking configuration loaded at startup.
#[derive(Deserialize, Clone)]
pub struct MatchmakingConfig {
    pub missions: MissionsConfig,
    /// Resource units a game host spends per match of each type.
    pub resource_units: HashMap<MatchType, u32>,
}

impl MatchmakingConfig {
    pub fn load(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum PoolName {
    PvpCasual,
    PvpDuels,
    Pve,
}

impl Display for PoolName {
    fn fmt(&self, f: &mut Formatter) -> std::result::Result<(), FmtError> {
        let name = match self {
            PoolName::PvpCasual => "pvp_casual",
            PoolName::PvpDuels => "pvp_duels",
            PoolName::Pve => "pve",
        };
        write!(f, "{}", name)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum GameContour {
    Prod,
    Dev,
}

impl Display for GameContour {
    fn fmt(&self, f: &mut Formatter) -> std::result::Result<(), FmtError> {
        let name = match self {
            GameContour::Prod => "prod",
            GameContour::Dev => "dev",
        };
        write!(f, "{}", name)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ReenterMatchmakingRequest {
    pub player_id: PlayerID,
    pub region: String,
    pub pool_name: PoolName,
    pub game_version: String,
    pub game_contour: GameContour,

    // Fields expected to be set only on first entry
    pub desired_match_group: Option<MatchGroup>,
    pub faction: Option<String>,
    pub party_members: Option<Vec<PlayerID>>,
}

#[derive(Deserialize)]
pub struct LeaveMatchmakingRequest {
    pub player_id: PlayerID,
}

/// Terminal states of one matchmaking poll. The `Match` shape is also what
/// gets stored under `match:{player_id}` once a launch succeeds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchmakingStatus {
    Match {
        match_id: Uuid,
        mission: String,
    },
    Waiting {
        faction_counts: HashMap<String, u32>,
    },
    ServerError,
}

/// Four dot-separated numbers of at most three digits each.
fn is_valid_game_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|part| {
            !part.is_empty() && part.len() <= 3 && part.chars().all(|c| c.is_ascii_digit())
        })
}

/// Puts the requesting player at the head of their party, whether or not
/// they listed themselves, and enforces the size cap leader included.
fn normalize_party(player_id: &PlayerID, party_members: &[PlayerID]) -> Result<Vec<PlayerID>> {
    let mut party: Vec<PlayerID> = party_members.iter()
        .filter(|member| *member != player_id)
        .cloned()
        .collect();
    party.insert(0, player_id.clone());
    if party.len() > MAX_PARTY_SIZE {
        Err(InternalError::PartyTooLarge)?
    }
    Ok(party)
}

/// Validates the request before anything touches the store and returns the
/// self-normalized party when the request carries one.
fn validate_reenter_request(data: &ReenterMatchmakingRequest) -> Result<Option<Vec<PlayerID>>> {
    if !is_valid_game_version(&data.game_version) {
        Err(InternalError::InvalidGameVersion)?
    }
    if let Some(faction) = &data.faction {
        if !GAME_FACTIONS.contains(&faction.as_str()) {
            Err(InternalError::InvalidFaction)?
        }
    }
    data.party_members.as_deref()
        .map(|party_members| normalize_party(&data.player_id, party_members))
        .transpose()
}

#[post("/reenter_matchmaking_queue")]
pub async fn reenter_matchmaking_queue(
    state: web::Data<AppState>,
    data: web::Json<ReenterMatchmakingRequest>,
) -> Result<HttpResponse> {
    let data = data.into_inner();
    let normalized_party = validate_reenter_request(&data)?;

    let pool_id = format!("{}-{}:{}", data.game_version, data.game_contour, data.pool_name);
    let mut redis = state.redis();

    // A player already bound to a match is served their assignment
    // regardless of queue state
    if let Some(blob) = queue::assigned_match(&mut redis, &data.player_id).await? {
        if let Ok(assignment) = serde_json::from_str::<MatchmakingStatus>(&blob) {
            return Ok(HttpResponse::Ok().json(assignment));
        }
    }

    match (&data.desired_match_group, &data.faction, normalized_party) {
        (Some(desired_match_group), Some(faction), Some(party_members)) => {
            let entry = QueuedPlayer {
                desired_match_group: *desired_match_group,
                faction: faction.clone(),
                party_members,
                region_group: state.region_mapper().region_group(&data.region),
            };
            queue::add_player_to_queue(&mut redis, &data.player_id, &pool_id, &entry).await?;
        }
        _ => {
            if !queue::is_queued(&mut redis, &pool_id, &data.player_id).await? {
                Err(InternalError::NotQueued)?
            }
        }
    }

    queue::touch_player(&mut redis, &pool_id, &data.player_id).await?;

    let response = if queue::acquire_match_creation_lock(&mut redis, &pool_id).await? {
        let result = try_create_match(&state, &pool_id).await;
        if let Err(e) = queue::release_match_creation_lock(&mut redis, &pool_id).await {
            log::error!("Failed to release match creation lock for {}: {:?}", pool_id, e);
        }
        match result {
            Ok(status) => status,
            Err(e) => {
                log::error!("Match creation failed for {}: {:?}", pool_id, e);
                MatchmakingStatus::ServerError
            }
        }
    } else {
        // Someone else is forming a match for this pool; echo the counts we
        // last saw there
        MatchmakingStatus::Waiting { faction_counts: state.cached_faction_counts(&pool_id) }
    };

    Ok(HttpResponse::Ok().json(response))
}

#[post("/leave_matchmaking_queue")]
pub async fn leave_matchmaking_queue(
    state: web::Data<AppState>,
    data: web::Json<LeaveMatchmakingRequest>,
) -> Result<HttpResponse> {
    let mut redis = state.redis();
    queue::remove_player_from_all_queues(&mut redis, &data.player_id).await?;
    queue::clear_match_assignment(&mut redis, &data.player_id).await?;
    Ok(HttpResponse::Ok().json(Ack::success("Player removed from queue")))
}

fn form_from_snapshot(
    pool_name: &str,
    snapshot: &queue::QueueSnapshot,
    config: &MatchmakingConfig,
) -> Result<FormationOutcome> {
    let outcome = match pool_name {
        "pvp_casual" => pvp_casual::try_create_pvp_match_casual(
            &snapshot.players,
            snapshot.oldest_player_queue_time,
            snapshot.newest_player_queue_time,
            &config.missions.pvp,
            false,
        ),
        "pvp_instant" => pvp_casual::try_create_pvp_match_casual(
            &snapshot.players,
            snapshot.oldest_player_queue_time,
            snapshot.newest_player_queue_time,
            &config.missions.pvp,
            true,
        ),
        "pvp_duels" => pvp_duels::try_create_pvp_match_duel(
            &snapshot.players,
            snapshot.oldest_player_queue_time,
            snapshot.newest_player_queue_time,
            &config.missions.pvp,
        ),
        "pve" => pve::try_create_pve_match(
            &snapshot.players,
            snapshot.oldest_player_queue_time,
            &config.missions.pve,
            false,
        ),
        "pve_instant" => pve::try_create_pve_match(
            &snapshot.players,
            snapshot.oldest_player_queue_time,
            &config.missions.pve,
            true,
        ),
        _ => Err(InternalError::UnknownPool)?,
    };
    Ok(outcome)
}

/// One match-formation attempt for the pool. Runs with the pool's creation
/// lock held; everything that fails softly resolves to a `waiting` answer
/// and leaves the queue untouched.
async fn try_create_match(state: &AppState, pool_id: &str) -> Result<MatchmakingStatus> {
    let (version_and_contour, pool_name) = pool_id.split_once(':').ok_or(InternalError::UnknownPool)?;

    let mut redis = state.redis();
    let snapshot = queue::snapshot_queue(&mut redis, pool_id).await?;
    state.cache_faction_counts(pool_id, snapshot.faction_counts.clone());

    let config = state.matchmaking_config();
    let (players_in_match, formed) = match form_from_snapshot(pool_name, &snapshot, config)? {
        Some(outcome) => outcome,
        None => return Ok(MatchmakingStatus::Waiting { faction_counts: snapshot.faction_counts }),
    };

    let missions = state.missions();
    let mission_data = match missions.get(&formed.mission) {
        Some(data) => data.clone(),
        None => {
            log::error!("Couldn't find mission data for {}", formed.mission);
            return Ok(MatchmakingStatus::Waiting { faction_counts: snapshot.faction_counts });
        }
    };

    let resource_units = config.resource_units
        .get(&formed.match_type)
        .copied()
        .ok_or(InternalError::IncompleteConfig)?;

    let available_servers = server_registry::candidates(&mut redis, resource_units, MAX_LAUNCH_CANDIDATES).await?;
    log::debug!("Retrieved {} available servers for match creation", available_servers.len());

    if available_servers.is_empty() {
        // No servers available, a new one needs to come up
        log::error!("No servers available to handle match creation, need to launch");
        return Ok(MatchmakingStatus::Waiting { faction_counts: snapshot.faction_counts });
    }

    // Metadata reads are independent; fetch them concurrently, keeping the
    // registry order
    let metadata = futures::future::join_all(available_servers.into_iter().map(|server_addr| {
        let mut redis = state.redis();
        async move {
            let data = server_registry::server_data(&mut redis, &server_addr).await;
            (server_addr, data)
        }
    })).await;

    let mut candidates = Vec::new();
    for (server_addr, data) in metadata {
        match data? {
            Some(data) if data.free_instances_amount > 0 => candidates.push((server_addr, data.region_group)),
            Some(data) => log::warn!(
                "Skipping server {} because of low free instances: {}",
                server_addr, data.free_instances_amount,
            ),
            None => {}
        }
    }

    let match_id = Uuid::new_v4();
    let (game_version, game_contour) = version_and_contour.split_once('-').ok_or(InternalError::UnknownPool)?;
    let request = LaunchRequest {
        game_version: game_version.to_string(),
        game_contour: game_contour.to_string(),
        game_map: mission_data.map,
        game_mode: mission_data.mode,
        game_mission: formed.mission.clone(),
        resource_units,
        match_unique_id: match_id.to_string(),
        faction_setup: formed.faction_setup.clone(),
        max_team_size: formed.max_team_size,
    };

    let launched = dispatch::try_to_launch_match(
        state.http_client(),
        &snapshot.region_group_counts,
        &candidates,
        &request,
    ).await;

    let (server_addr, server_response) = match launched {
        Some(launched) => launched,
        None => {
            log::error!("No server could handle match launch request");
            return Ok(MatchmakingStatus::Waiting { faction_counts: snapshot.faction_counts });
        }
    };

    log::debug!(
        "Match {} launched on {}: {} {} with sides {:?}",
        match_id, server_addr, formed.match_type, formed.mission, formed.faction_counts,
    );

    // Notify the players and retire their queue entries
    let assignment = MatchmakingStatus::Match { match_id, mission: formed.mission.clone() };
    let assignment_blob = serde_json::to_string(&assignment)?;
    for player_id in players_in_match.iter().flatten() {
        queue::bind_player_to_match(&mut redis, pool_id, player_id, &assignment_blob).await?;
    }

    // The launch response is the freshest word on the server's capacity
    server_registry::register_server(
        &mut redis,
        &server_addr,
        state.region_mapper().region_group(&server_response.region),
        server_response.free_resource_units,
        server_response.free_instances_amount,
    ).await?;

    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_version_format() {
        assert!(is_valid_game_version("1.0.0.0"));
        assert!(is_valid_game_version("999.123.0.7"));
        assert!(!is_valid_game_version("1.0.0"));
        assert!(!is_valid_game_version("1.0.0.0.0"));
        assert!(!is_valid_game_version("1.0.0.1000"));
        assert!(!is_valid_game_version("1.0.0.a"));
        assert!(!is_valid_game_version("1..0.0"));
    }

    #[test]
    fn test_normalize_party_puts_leader_first() {
        let leader = PlayerID::from("p1");
        let party = normalize_party(&leader, &[PlayerID::from("p2"), PlayerID::from("p1"), PlayerID::from("p3")]).unwrap();
        assert_eq!(
            vec![PlayerID::from("p1"), PlayerID::from("p2"), PlayerID::from("p3")],
            party,
        );

        // The leader is added even when the party did not mention them
        let party = normalize_party(&leader, &[PlayerID::from("p2")]).unwrap();
        assert_eq!(vec![PlayerID::from("p1"), PlayerID::from("p2")], party);
    }

    #[test]
    fn test_normalize_party_rejects_oversized() {
        let leader = PlayerID::from("p1");
        let others: Vec<PlayerID> = ["p2", "p3", "p4", "p5"].iter().map(|id| PlayerID::from(*id)).collect();
        assert!(normalize_party(&leader, &others).is_err());

        // Four members including the leader is the cap, and it fits
        let exactly_four: Vec<PlayerID> = ["p1", "p2", "p3", "p4"].iter().map(|id| PlayerID::from(*id)).collect();
        assert_eq!(4, normalize_party(&leader, &exactly_four).unwrap().len());
    }

    #[test]
    fn test_validation_normalizes_party_before_any_store_access() {
        let mut request = ReenterMatchmakingRequest {
            player_id: PlayerID::from("p1"),
            region: "eu".to_string(),
            pool_name: PoolName::PvpCasual,
            game_version: "1.0.0.0".to_string(),
            game_contour: GameContour::Prod,
            desired_match_group: None,
            faction: None,
            party_members: Some(["p2", "p3", "p4", "p5"].iter().map(|id| PlayerID::from(*id)).collect()),
        };
        // Five members leader included is over the cap, and it fails even
        // with the other first-entry fields absent
        assert!(validate_reenter_request(&request).is_err());

        request.party_members = Some(vec![PlayerID::from("p2")]);
        let party = validate_reenter_request(&request).unwrap().unwrap();
        assert_eq!(vec![PlayerID::from("p1"), PlayerID::from("p2")], party);

        request.party_members = None;
        assert!(validate_reenter_request(&request).unwrap().is_none());
    }

    #[test]
    fn test_pool_id_format() {
        let pool_id = format!("{}-{}:{}", "1.0.3.77", GameContour::Prod, PoolName::PvpCasual);
        assert_eq!("1.0.3.77-prod:pvp_casual", pool_id);
        assert_eq!(Some(("1.0.3.77-prod", "pvp_casual")), pool_id.split_once(':'));
        assert_eq!("1.0.3.77-dev:pve", format!("{}-{}:{}", "1.0.3.77", GameContour::Dev, PoolName::Pve));
    }

    #[test]
    fn test_status_wire_shapes() {
        let waiting = MatchmakingStatus::Waiting { faction_counts: HashMap::new() };
        assert_eq!(
            r#"{"status":"waiting","faction_counts":{}}"#,
            serde_json::to_string(&waiting).unwrap(),
        );

        let match_id = Uuid::new_v4();
        let assigned = MatchmakingStatus::Match { match_id, mission: "m1".to_string() };
        let blob = serde_json::to_string(&assigned).unwrap();
        assert!(blob.contains(r#""status":"match""#));
        let parsed: MatchmakingStatus = serde_json::from_str(&blob).unwrap();
        assert_eq!(assigned, parsed);

        assert_eq!(
            r#"{"status":"server_error"}"#,
            serde_json::to_string(&MatchmakingStatus::ServerError).unwrap(),
        );
    }

    #[test]
    fn test_config_parses() {
        let raw = r#"{
            "missions": {
                "pvp": {
                    "PoolAlpha": {
                        "low": {"outpost_skirmish": 1.0},
                        "medium": {"bastion_siege": 2.0, "relay_assault": 1.0},
                        "large": {"fortress_storm": 1.0},
                        "duel": {"proving_grounds": 1.0}
                    }
                },
                "pve": {
                    "Vein": {
                        "raid4": {"vein_descent": 1.0}
                    }
                }
            },
            "resource_units": {"duel": 4, "low": 4, "medium": 8, "large": 16, "raid4": 4}
        }"#;
        let config: MatchmakingConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(Some(&8), config.resource_units.get(&MatchType::Medium));
        let pvp_alpha = &config.missions.pvp[&MatchGroup::PoolAlpha];
        assert_eq!(Some(&2.0), pvp_alpha[&MatchType::Medium].get("bastion_siege"));
        assert!(config.missions.pve.contains_key(&MatchGroup::Vein));
    }
}
