use fred::prelude::*;
use log::info;
use once_cell::sync::OnceCell;

/// Shared Redis handle. Exposes exactly the primitives the wagering
/// backend persists through: plain keys, sets and lists.
#[derive(Clone)]
pub struct RedisManager {
    client: RedisClient,
}

static INSTANCE: OnceCell<RedisManager> = OnceCell::new();

impl RedisManager {
    pub fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;
        let client = RedisClient::new(config, None, None, None);

        Ok(Self { client })
    }

    pub fn init_global(redis_url: &str) -> Result<&'static RedisManager, RedisError> {
        INSTANCE.get_or_try_init(|| Self::new(redis_url))
    }

    pub fn global() -> Option<&'static RedisManager> {
        INSTANCE.get()
    }

    pub fn client(&self) -> RedisClient {
        self.client.clone()
    }

    pub async fn connect(&self) -> Result<(), RedisError> {
        self.client.connect();
        self.client.wait_for_connect().await?;
        info!("Connected to Redis");
        Ok(())
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), RedisError> {
        self.client
            .set::<(), _, _>(key, value, None, None, false)
            .await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    pub async fn delete(&self, key: &str) -> Result<(), RedisError> {
        self.client.del::<(), _>(key).await
    }

    pub async fn set_add(&self, key: &str, member: &str) -> Result<(), RedisError> {
        self.client.sadd::<(), _, _>(key, member).await
    }

    pub async fn set_remove(&self, key: &str, member: &str) -> Result<(), RedisError> {
        self.client.srem::<(), _, _>(key, member).await
    }

    pub async fn set_members(&self, key: &str) -> Result<Vec<String>, RedisError> {
        let members: Vec<String> = self.client.smembers(key).await?;
        Ok(members)
    }

    pub async fn list_push(&self, key: &str, value: &str) -> Result<(), RedisError> {
        self.client.lpush::<(), _, _>(key, value).await
    }

    pub async fn list_remove(&self, key: &str, value: &str) -> Result<(), RedisError> {
        self.client.lrem::<(), _, _>(key, 0, value).await
    }

    pub async fn list_range(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<Vec<String>, RedisError> {
        let values: Vec<String> = self.client.lrange(key, start, stop).await?;
        Ok(values)
    }
}
