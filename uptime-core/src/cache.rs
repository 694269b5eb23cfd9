use async_trait::async_trait;
use redis::{Client, Script};
use tracing::warn;
use uuid::Uuid;

use crate::{config::RedisConfig, error::Result, trigger::CycleLock};

pub type RedisPool = Client;

pub async fn create_redis_pool(config: &RedisConfig) -> Result<RedisPool> {
    let client = Client::open(config.url.as_str())?;
    Ok(client)
}

const CYCLE_LOCK_KEY: &str = "uptime:check-cycle:lock";

// Only the holder's token may delete the key.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Cross-process cycle lease. Expires on its own if the holder dies.
pub struct RedisCycleLock {
    client: RedisPool,
    ttl_secs: u64,
}

impl RedisCycleLock {
    pub fn new(client: RedisPool, ttl_secs: u64) -> Self {
        Self { client, ttl_secs }
    }
}

#[async_trait]
impl CycleLock for RedisCycleLock {
    async fn try_acquire(&self) -> Result<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let token = Uuid::new_v4().to_string();

        let acquired: Option<String> = redis::cmd("SET")
            .arg(CYCLE_LOCK_KEY)
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;

        Ok(acquired.map(|_| token))
    }

    async fn release(&self, token: &str) -> Result<()> {
        release_lock(&self.client, token).await
    }

    // Best effort; the key's TTL covers the case where this never runs.
    fn abandon(&self, token: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = self.client.clone();
        let token = token.to_string();
        handle.spawn(async move {
            if let Err(e) = release_lock(&client, &token).await {
                warn!("Failed to release abandoned cycle lock: {}", e);
            }
        });
    }
}

async fn release_lock(client: &RedisPool, token: &str) -> Result<()> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: i64 = Script::new(RELEASE_SCRIPT)
        .key(CYCLE_LOCK_KEY)
        .arg(token)
        .invoke_async(&mut conn)
        .await?;
    Ok(())
}
