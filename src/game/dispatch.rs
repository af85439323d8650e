use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use crate::game::region::{self, RegionGroup};
use crate::lib::Result;

/// Payload of the launch request a game host receives for a formed match.
#[derive(Serialize, Clone, Debug)]
pub struct LaunchRequest {
    pub game_version: String,
    pub game_contour: String,
    pub game_map: String,
    pub game_mode: String,
    pub game_mission: String,
    pub resource_units: u32,
    pub match_unique_id: String,
    pub faction_setup: String,
    pub max_team_size: u32,
}

/// What a game host reports back after accepting a launch.
#[derive(Deserialize, Clone, Debug)]
pub struct LaunchResponse {
    pub region: String,
    pub free_resource_units: i64,
    pub free_instances_amount: i64,
}

async fn launch_on(client: &reqwest::Client, server_addr: &str, request: &LaunchRequest) -> Result<LaunchResponse> {
    let response = client
        .post(format!("http://{}/launch", server_addr))
        .json(request)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}

/// Walks the candidate servers in order of regional preference and launches
/// the match on the first one that accepts. Candidates keep their registry
/// order (least free capacity first) within each region group.
pub async fn try_to_launch_match(
    client: &reqwest::Client,
    region_group_counts: &HashMap<RegionGroup, u32>,
    candidates: &[(String, RegionGroup)],
    request: &LaunchRequest,
) -> Option<(String, LaunchResponse)> {
    let distance_map = region::plurality_group(region_group_counts).distance_map();
    let available: Vec<RegionGroup> = candidates.iter().map(|(_, group)| *group).collect();
    let ordered_server_groups = region::order_server_groups(region_group_counts, &available, distance_map);

    if ordered_server_groups.is_empty() {
        log::error!(
            "Trying to create match, but no server group is reachable: {:?} available for players in {:?}",
            available, region_group_counts,
        );
        return None;
    }

    for preferred_group in ordered_server_groups {
        for (server_addr, server_group) in candidates {
            if *server_group != preferred_group {
                continue;
            }
            match launch_on(client, server_addr, request).await {
                Ok(response) => return Some((server_addr.clone(), response)),
                Err(e) => log::error!("Error during server launch request to {}: {:?}", server_addr, e),
            }
        }
    }

    None
}
