use redis::{Client, RedisError, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use uuid::Uuid;

/// Redis read cache for the public gig views.
///
/// Strictly an accelerator: every value has a TTL and every gig/bid
/// mutation invalidates the affected keys, so a cache outage degrades to
/// plain database reads.
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let client = Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    /// Get a value from cache
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> redis::RedisResult<Option<T>> {
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.connection.clone())
            .await?;

        match value {
            Some(v) => {
                let deserialized = serde_json::from_str(&v).map_err(|e| {
                    redis::RedisError::from((
                        redis::ErrorKind::TypeError,
                        "Deserialization error",
                        e.to_string(),
                    ))
                })?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    /// Set a value in cache with optional TTL (in seconds)
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> redis::RedisResult<()> {
        let serialized = serde_json::to_string(value).map_err(|e| {
            redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "Serialization error",
                e.to_string(),
            ))
        })?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(serialized);

        if let Some(ttl) = ttl_seconds {
            cmd.arg("EX").arg(ttl);
        }

        cmd.query_async(&mut self.connection.clone()).await
    }

    /// Delete a key from cache
    pub async fn delete(&self, key: &str) -> redis::RedisResult<()> {
        redis::cmd("DEL")
            .arg(key)
            .query_async(&mut self.connection.clone())
            .await
    }

    /// Delete multiple keys matching a pattern
    pub async fn delete_pattern(&self, pattern: &str) -> redis::RedisResult<()> {
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(pattern)
            .query_async(&mut self.connection.clone())
            .await?;

        if !keys.is_empty() {
            let _: () = redis::cmd("DEL")
                .arg(&keys)
                .query_async(&mut self.connection.clone())
                .await?;
        }

        Ok(())
    }

    /// Drop every cached view that includes this gig. Invalidation failures
    /// are ignored; the TTL bounds how stale a view can get.
    pub async fn invalidate_gig(&self, gig_id: Uuid) {
        let _ = self.delete(&keys::gig(&gig_id.to_string())).await;
        let _ = self.delete_pattern("gigs:list:*").await;
    }
}

/// Cache key generators
pub mod keys {
    /// Key for the open-gig listing, per search filter.
    pub fn gig_list(filter: &str) -> String {
        format!("gigs:list:{}", filter)
    }

    /// Key for a single gig's detail view.
    pub fn gig(id: &str) -> String {
        format!("gig:{}", id)
    }
}

/// Cache TTL configuration, overridable via env.
pub struct CacheConfig {
    pub gig_list_ttl: Duration,
    pub gig_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            gig_list_ttl: Duration::from_secs(300), // 5 minutes
            gig_ttl: Duration::from_secs(600),      // 10 minutes
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            gig_list_ttl: parse_duration_secs("CACHE_TTL_GIGS", 300),
            gig_ttl: parse_duration_secs("CACHE_TTL_GIG_DETAIL", 600),
        }
    }
}

fn parse_duration_secs(env_var: &str, default: u64) -> Duration {
    std::env::var(env_var)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(keys::gig_list("all"), "gigs:list:all");
        assert_eq!(keys::gig_list("logo"), "gigs:list:logo");
        assert_eq!(keys::gig("abc"), "gig:abc");
    }

    #[test]
    fn config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.gig_list_ttl, Duration::from_secs(300));
        assert_eq!(config.gig_ttl, Duration::from_secs(600));
    }
}
