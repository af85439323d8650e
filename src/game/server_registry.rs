use actix_web::{post, web, HttpRequest, HttpResponse};
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use crate::{
    game::region::RegionGroup,
    lib::{error::InternalError, Ack, Result},
    AppState,
};

/// In this sorted set game servers are registered, scored by their amount of
/// free resource units.
pub const GAME_SERVERS_QUEUE_KEY: &str = "game_servers";

/// Stores information about one game server.
pub fn game_server_key(server_addr: &str) -> String {
    format!("game_server:{}", server_addr)
}

/// Registry metadata kept per server, next to its sorted-set score.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GameServerData {
    pub region_group: RegionGroup,
    pub free_instances_amount: i64,
}

/// Upserts the server's score and metadata record.
pub async fn register_server(
    redis: &mut MultiplexedConnection,
    server_addr: &str,
    region_group: RegionGroup,
    free_resource_units: i64,
    free_instances_amount: i64,
) -> Result<()> {
    let _: () = redis.zadd(GAME_SERVERS_QUEUE_KEY, server_addr, free_resource_units).await?;
    let data = GameServerData { region_group, free_instances_amount };
    let _: () = redis.set(game_server_key(server_addr), serde_json::to_string(&data)?).await?;
    Ok(())
}

pub async fn unregister_server(redis: &mut MultiplexedConnection, server_addr: &str) -> Result<()> {
    let _: () = redis.zrem(GAME_SERVERS_QUEUE_KEY, server_addr).await?;
    let _: () = redis.del(game_server_key(server_addr)).await?;
    Ok(())
}

pub async fn server_data(redis: &mut MultiplexedConnection, server_addr: &str) -> Result<Option<GameServerData>> {
    let blob: Option<String> = redis.get(game_server_key(server_addr)).await?;
    Ok(blob.as_deref().and_then(|blob| serde_json::from_str(blob).ok()))
}

/// Up to `limit` servers with at least `min_free_units` free, least loaded
/// first.
pub async fn candidates(
    redis: &mut MultiplexedConnection,
    min_free_units: u32,
    limit: isize,
) -> Result<Vec<String>> {
    let servers: Vec<String> = redis.zrangebyscore_limit(
        GAME_SERVERS_QUEUE_KEY,
        min_free_units as f64,
        "+inf",
        0,
        limit,
    ).await?;
    Ok(servers)
}

/// The server address is the caller's network identity; payloads never carry
/// it.
fn caller_addr(req: &HttpRequest) -> Result<String> {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .ok_or_else(|| InternalError::UnknownCaller.into())
}

#[derive(Deserialize)]
pub struct RegisterGameServerRequest {
    pub region: String,
    pub resource_units: i64,
    pub free_resource_units: i64,
    pub free_instances_amount: i64,
}

#[derive(Deserialize)]
pub struct RegisterGameServerStats {
    pub region: String,
    pub match_id: String,
    pub stats: serde_json::Value,
}

#[post("/register_or_update_game_server")]
pub async fn register_or_update_game_server(
    state: web::Data<AppState>,
    req: HttpRequest,
    data: web::Json<RegisterGameServerRequest>,
) -> Result<HttpResponse> {
    let server_addr = caller_addr(&req)?;
    let region_group = state.region_mapper().region_group(&data.region);

    log::debug!(
        "Registering game server {} ({}): {}/{} free resource units, {} free instances",
        server_addr, region_group, data.free_resource_units, data.resource_units, data.free_instances_amount,
    );

    let mut redis = state.redis();
    register_server(&mut redis, &server_addr, region_group, data.free_resource_units, data.free_instances_amount).await?;

    Ok(HttpResponse::Ok().json(Ack::success("Server registered")))
}

#[post("/unregister_game_server")]
pub async fn unregister_game_server(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let server_addr = caller_addr(&req)?;

    log::debug!("Unregistering game server {}", server_addr);

    let mut redis = state.redis();
    unregister_server(&mut redis, &server_addr).await?;

    Ok(HttpResponse::Ok().json(Ack::success("Server unregistered")))
}

/// Stats are only logged for now; they play no part in match formation.
#[post("/register_game_server_stats")]
pub async fn register_game_server_stats(
    req: HttpRequest,
    data: web::Json<RegisterGameServerStats>,
) -> Result<HttpResponse> {
    let server_addr = caller_addr(&req)?;
    log::debug!(
        "Received game server stats from {} ({}): {}: {}",
        server_addr, data.region, data.match_id, data.stats,
    );
    Ok(HttpResponse::Ok().json(Ack::success("Stats registered")))
}
