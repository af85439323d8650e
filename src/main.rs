#![allow(clippy::clone_on_copy)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_inception)]

#![warn(clippy::imprecise_flops)]
#![warn(clippy::suboptimal_flops)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::cognitive_complexity)]
#![warn(clippy::float_cmp_const)]
#![warn(clippy::implicit_hasher)]
#![warn(clippy::implicit_saturating_sub)]
#![warn(clippy::large_types_passed_by_value)]
#![warn(clippy::manual_ok_or)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::non_ascii_literal)]
#![warn(clippy::trivially_copy_pass_by_ref)]
#![warn(clippy::type_repetition_in_bounds)]
#![warn(clippy::unreadable_literal)]
#![warn(clippy::unseparated_literal_suffix)]
#![warn(clippy::unused_self)]


use actix_web::{web, App, HttpServer};
use actix_web::middleware::Logger;
use std::collections::HashMap;
use std::env;
use std::sync::{Arc, RwLock};
use std::time::Duration;

mod game;
mod lib;

use game::{
    matchmaking,
    matchmaking::MatchmakingConfig,
    mission,
    mission::MissionCatalog,
    region::RegionMapper,
    server_registry,
};
use lib::Result;

/// Timeout of every outbound call to game servers and the content store.
const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Global state of the service, shared with every request handler. All
/// durable-enough matchmaking state lives in Redis; the two cells here are
/// in-process caches where stale reads are acceptable.
pub struct AppState {
    redis: redis::aio::MultiplexedConnection,
    http_client: reqwest::Client,
    matchmaking_config: MatchmakingConfig,
    region_mapper: RegionMapper,
    mission_data_url: String,
    missions: RwLock<Arc<MissionCatalog>>,
    faction_counts: RwLock<HashMap<String, HashMap<String, u32>>>,
}

impl AppState {
    /// A connection handle for the current task; the underlying connection
    /// is multiplexed.
    pub fn redis(&self) -> redis::aio::MultiplexedConnection {
        self.redis.clone()
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    pub fn matchmaking_config(&self) -> &MatchmakingConfig {
        &self.matchmaking_config
    }

    pub fn region_mapper(&self) -> &RegionMapper {
        &self.region_mapper
    }

    pub fn mission_data_url(&self) -> &str {
        &self.mission_data_url
    }

    pub fn missions(&self) -> Arc<MissionCatalog> {
        self.missions.read().expect("AppState::missions() RwLock poisoned").clone()
    }

    pub fn set_missions(&self, catalog: MissionCatalog) {
        *self.missions.write().expect("AppState::set_missions() RwLock poisoned") = Arc::new(catalog);
    }

    /// Faction counts last seen by a formation attempt for this pool, echoed
    /// to callers that miss the creation lock.
    pub fn cached_faction_counts(&self, pool_id: &str) -> HashMap<String, u32> {
        self.faction_counts.read().expect("AppState::cached_faction_counts() RwLock poisoned")
            .get(pool_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn cache_faction_counts(&self, pool_id: &str, counts: HashMap<String, u32>) {
        self.faction_counts.write().expect("AppState::cache_faction_counts() RwLock poisoned")
            .insert(pool_id.to_string(), counts);
    }
}

fn config(cfg: &mut web::ServiceConfig) {
    cfg
        .service(matchmaking::reenter_matchmaking_queue)
        .service(matchmaking::leave_matchmaking_queue)
        .service(server_registry::register_or_update_game_server)
        .service(server_registry::unregister_game_server)
        .service(server_registry::register_game_server_stats)
        .service(mission::update_mission_data);
}

fn get_env(key: &str, default: &str) -> String {
    match env::var_os(key) {
        Some(val) => val.into_string().unwrap(),
        None => String::from(default)
    }
}

async fn create_redis_connection() -> Result<redis::aio::MultiplexedConnection> {
    let host = get_env("REDIS_HOST", "localhost");
    let password = get_env("REDIS_PASSWORD", "");
    let url = if password.is_empty() {
        format!("redis://{}:6379/", host)
    } else {
        format!("redis://:{}@{}:6379/", password, host)
    };
    let client = redis::Client::open(url)?;
    Ok(client.get_multiplexed_tokio_connection().await?)
}

async fn generate_state() -> Result<AppState> {
    let http_client = reqwest::Client::builder()
        .timeout(HTTP_CLIENT_TIMEOUT)
        .build()?;

    Ok(AppState {
        redis: create_redis_connection().await?,
        http_client,
        matchmaking_config: MatchmakingConfig::load(&get_env("MATCHMAKING_CONFIG", "matchmaking_config.json"))?,
        region_mapper: RegionMapper::load(&get_env("REGION_GROUPS", "region_groups.json"))?,
        mission_data_url: get_env(
            "MISSION_DATA_URL",
            "https://storage.example-cdn.net/game-service/server_data/match_data.json",
        ),
        missions: RwLock::new(Arc::new(MissionCatalog::new())),
        faction_counts: RwLock::new(HashMap::new()),
    })
}

#[actix_rt::main]
async fn main() -> std::io::Result<()> {
    env::set_var("RUST_LOG", get_env("RUST_LOG", "debug,actix_web=info"));
    env_logger::init();

    let state = web::Data::new(generate_state().await.expect("Could not initialize service state"));

    // Prime the mission catalog; a failed fetch only delays match formation
    // until the next refresh
    mission::refresh_mission_catalog(&state).await;

    HttpServer::new(move || App::new()
        .wrap(Logger::default())
        .app_data(state.clone()).configure(config))
        .bind(get_env("LISTENING_URL", "127.0.0.1:8080"))?
        .run()
        .await
}
