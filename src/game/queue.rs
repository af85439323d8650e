use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::HashMap;
use crate::game::player::{PlayerID, QueuedPlayer};
use crate::game::region::RegionGroup;
use crate::lib::{time::Time, Result};

/// A player stays queued this long without additional requests.
pub const PLAYER_EXPIRATION: u64 = 30;
/// Match assignments expire after 5 minutes.
pub const MATCH_EXPIRATION: u64 = 300;
/// A match creation attempt locks other attempts out for 10 seconds.
pub const MATCH_CREATION_LOCK_TIMEOUT: u64 = 10;

/// Snapshot rank range: enough players to balance two factions of 16 each.
const SNAPSHOT_LAST_RANK: isize = 32;

/// Expired members are removed from the queue in batches to bound command size.
const EXPIRE_SWEEP_BATCH: usize = 1000;

/// This key stores data about the player until it expires.
pub fn player_key(pool_id: &str, player_id: &PlayerID) -> String {
    format!("player:{}:{}", pool_id, player_id)
}

/// This sorted set stores queued players by the time they entered matchmaking.
pub fn player_queue_key(pool_id: &str) -> String {
    format!("player_queue:{}", pool_id)
}

/// This sorted set stores queued players by the time they last connected to
/// matchmaking (for expiration of those who stopped connecting).
pub fn player_expire_queue_key(pool_id: &str) -> String {
    format!("player_expire_queue:{}", pool_id)
}

/// This key stores data about the match assigned to a player.
pub fn match_key(player_id: &PlayerID) -> String {
    format!("match:{}", player_id)
}

/// Allows only one match creation at a time per pool.
pub fn match_creation_lock_key(pool_id: &str) -> String {
    format!("matchmaking_lock:{}", pool_id)
}

/// Locks match creation for the pool; returns false when already locked.
pub async fn acquire_match_creation_lock(redis: &mut MultiplexedConnection, pool_id: &str) -> Result<bool> {
    let acquired: Option<String> = redis::cmd("SET")
        .arg(match_creation_lock_key(pool_id))
        .arg("locked")
        .arg("NX")
        .arg("EX")
        .arg(MATCH_CREATION_LOCK_TIMEOUT)
        .query_async(redis)
        .await?;
    Ok(acquired.is_some())
}

/// Unlocks match creation for the pool.
pub async fn release_match_creation_lock(redis: &mut MultiplexedConnection, pool_id: &str) -> Result<()> {
    let _: () = redis.del(match_creation_lock_key(pool_id)).await?;
    Ok(())
}

/// Writes the player blob with its expiration and queues the player by
/// enqueue time.
pub async fn add_player_to_queue(
    redis: &mut MultiplexedConnection,
    player_id: &PlayerID,
    pool_id: &str,
    data: &QueuedPlayer,
) -> Result<()> {
    let blob = serde_json::to_string(data)?;
    let _: () = redis.set_ex(player_key(pool_id, player_id), blob, PLAYER_EXPIRATION).await?;
    let _: () = redis.zadd(player_queue_key(pool_id), player_id.0.as_str(), Time::now().epoch_secs()).await?;
    Ok(())
}

pub async fn is_queued(redis: &mut MultiplexedConnection, pool_id: &str, player_id: &PlayerID) -> Result<bool> {
    let exists: bool = redis.exists(player_key(pool_id, player_id)).await?;
    Ok(exists)
}

/// Heartbeat: extends the blob expiration and refreshes the last-seen score.
pub async fn touch_player(redis: &mut MultiplexedConnection, pool_id: &str, player_id: &PlayerID) -> Result<()> {
    let _: () = redis.expire(player_key(pool_id, player_id), PLAYER_EXPIRATION as i64).await?;
    let _: () = redis.zadd(player_expire_queue_key(pool_id), player_id.0.as_str(), Time::now().epoch_secs()).await?;
    Ok(())
}

/// Serialized assignment of the match a player was placed into, if any.
pub async fn assigned_match(redis: &mut MultiplexedConnection, player_id: &PlayerID) -> Result<Option<String>> {
    let blob: Option<String> = redis.get(match_key(player_id)).await?;
    Ok(blob)
}

pub async fn clear_match_assignment(redis: &mut MultiplexedConnection, player_id: &PlayerID) -> Result<()> {
    let _: () = redis.del(match_key(player_id)).await?;
    Ok(())
}

/// Writes the match assignment, then retires the queue entry. The assignment
/// lands first so a crash in between leaves only a ghost queue entry for the
/// expire sweep.
pub async fn bind_player_to_match(
    redis: &mut MultiplexedConnection,
    pool_id: &str,
    player_id: &PlayerID,
    assignment_blob: &str,
) -> Result<()> {
    let _: () = redis.set_ex(match_key(player_id), assignment_blob, MATCH_EXPIRATION).await?;
    let _: () = redis.del(player_key(pool_id, player_id)).await?;
    let _: () = redis.zrem(player_queue_key(pool_id), player_id.0.as_str()).await?;
    Ok(())
}

/// Removes the player from every pool they are queued in.
pub async fn remove_player_from_all_queues(redis: &mut MultiplexedConnection, player_id: &PlayerID) -> Result<()> {
    let pattern = format!("player:*:{}", player_id);
    let keys = {
        let mut iter: redis::AsyncIter<String> = redis.scan_match(pattern.as_str()).await?;
        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        keys
    };

    let suffix = format!(":{}", player_id);
    for key in keys {
        let _: () = redis.del(key.as_str()).await?;
        let pool_id = key.strip_prefix("player:").and_then(|rest| rest.strip_suffix(suffix.as_str()));
        if let Some(pool_id) = pool_id {
            let _: () = redis.zrem(player_queue_key(pool_id), player_id.0.as_str()).await?;
            let _: () = redis.zrem(player_expire_queue_key(pool_id), player_id.0.as_str()).await?;
        }
    }
    Ok(())
}

/// Read-only copy of the head of a pool queue, assembled for match formation.
pub struct QueueSnapshot {
    /// Candidates in enqueue order; only party leaders appear.
    pub players: Vec<(PlayerID, QueuedPlayer)>,
    pub faction_counts: HashMap<String, u32>,
    pub region_group_counts: HashMap<RegionGroup, u32>,
    /// How long the longest-waiting candidate has queued, in seconds.
    pub oldest_player_queue_time: f64,
    /// How long the most recently enqueued candidate has queued, in seconds.
    pub newest_player_queue_time: f64,
}

/// Sweeps expired members out of the queue, then assembles the formation
/// snapshot. Members whose blob already expired or does not parse are
/// skipped rather than failing the snapshot.
pub async fn snapshot_queue(redis: &mut MultiplexedConnection, pool_id: &str) -> Result<QueueSnapshot> {
    let now = Time::now().epoch_secs();

    let expired: Vec<String> = redis.zrangebyscore(
        player_expire_queue_key(pool_id),
        "-inf",
        now - PLAYER_EXPIRATION as f64,
    ).await?;
    for batch in expired.chunks(EXPIRE_SWEEP_BATCH) {
        let _: () = redis.zrem(player_queue_key(pool_id), batch.to_vec()).await?;
    }

    let members: Vec<(String, f64)> = redis.zrange_withscores(player_queue_key(pool_id), 0, SNAPSHOT_LAST_RANK).await?;

    let mut players = Vec::new();
    let mut faction_counts = HashMap::new();
    let mut region_group_counts = HashMap::new();
    let mut oldest_ts = f64::INFINITY;
    let mut newest_ts = f64::NEG_INFINITY;

    for (member, enqueued_ts) in members {
        let player_id = PlayerID(member);
        let blob: Option<String> = redis.get(player_key(pool_id, &player_id)).await?;
        let info: QueuedPlayer = match blob.as_deref().map(serde_json::from_str) {
            Some(Ok(info)) => info,
            // Skip expired or corrupted players
            _ => continue,
        };
        *faction_counts.entry(info.faction.clone()).or_insert(0) += 1;
        *region_group_counts.entry(info.region_group).or_insert(0) += 1;
        oldest_ts = oldest_ts.min(enqueued_ts);
        newest_ts = newest_ts.max(enqueued_ts);
        players.push((player_id, info));
    }

    let (oldest, newest) = if players.is_empty() {
        (0.0, 0.0)
    } else {
        ((now - oldest_ts).max(0.0), (now - newest_ts).max(0.0))
    };

    Ok(QueueSnapshot {
        players,
        faction_counts,
        region_group_counts,
        oldest_player_queue_time: oldest,
        newest_player_queue_time: newest,
    })
}
