//! # Redis
//!
//! RAM database holding every portal document.
//!
//! ## Requirements
//!
//! - Fast lookups by id
//! - Read-modify-write without lost updates
//! - Small documents, a hackathon with its participant records is the largest
//!
//! ## Implementation
//!
//! - Redis hash per collection: 1 big key, then id-json pairs
//! - Inserts use `HSETNX` so ids are never overwritten
//! - Swaps and conditional removes run as Lua scripts, Redis executes each script atomically
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::info;

use crate::{
    error::StoreError,
    store::{Collection, DocumentStore},
};

const SWAP_SCRIPT: &str = r"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[3])
    return 1
end
return 0
";

const REMOVE_IF_SCRIPT: &str = r"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
    redis.call('HDEL', KEYS[1], ARGV[1])
    return 1
end
return 0
";

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, StoreError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    info!("Connected to Redis at {redis_url}");
    Ok(connection_manager)
}

pub struct RedisStore {
    connection: ConnectionManager,
    swap_script: Script,
    remove_if_script: Script,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(init_redis(redis_url).await?))
    }

    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            swap_script: Script::new(SWAP_SCRIPT),
            remove_if_script: Script::new(REMOVE_IF_SCRIPT),
        }
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn fetch(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();
        let json: Option<String> = connection.hget(collection.key(), id).await?;

        Ok(json)
    }

    async fn fetch_all(&self, collection: Collection) -> Result<Vec<String>, StoreError> {
        let mut connection = self.connection.clone();
        let documents: Vec<String> = connection.hvals(collection.key()).await?;

        Ok(documents)
    }

    async fn insert(
        &self,
        collection: Collection,
        id: &str,
        json: &str,
    ) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let inserted: bool = connection.hset_nx(collection.key(), id, json).await?;

        Ok(inserted)
    }

    async fn swap(
        &self,
        collection: Collection,
        id: &str,
        expected: &str,
        json: &str,
    ) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let swapped: i32 = self
            .swap_script
            .key(collection.key())
            .arg(id)
            .arg(expected)
            .arg(json)
            .invoke_async(&mut connection)
            .await?;

        Ok(swapped == 1)
    }

    async fn remove(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let removed: i64 = connection.hdel(collection.key(), id).await?;

        Ok(removed > 0)
    }

    async fn remove_if(
        &self,
        collection: Collection,
        id: &str,
        expected: &str,
    ) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let removed: i32 = self
            .remove_if_script
            .key(collection.key())
            .arg(id)
            .arg(expected)
            .invoke_async(&mut connection)
            .await?;

        Ok(removed == 1)
    }
}
