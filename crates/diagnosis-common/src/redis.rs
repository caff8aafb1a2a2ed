/// Optional Redis cache that never fails the caller.
///
/// Every operation returns `Option<T>` or `bool`. Redis errors are logged as warnings and
/// reported as a miss, so callers fall through to the remote service. Without a
/// `REDIS_URL` every call is a no-op.
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::warn;

#[derive(Clone, Default)]
pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    /// Returns a disabled cache when `url` is `None` or cannot be parsed.
    pub fn new(url: Option<&str>) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, cache disabled"))
                .ok()
        });
        Self { client }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Sends a PING.
    pub async fn is_available(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()
            .flatten()
    }

    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SETEX failed"))
            .is_ok()
    }

    /// Deletes every key starting with `prefix`, walking the keyspace with SCAN.
    pub async fn delete_by_prefix(&self, prefix: &str) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, pattern, "redis SCAN failed");
                    return false;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    warn!(error = %e, "redis batch DEL failed during prefix delete");
                    return false;
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        true
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        let client = self.client.as_ref()?;
        client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::RedisCache;

    #[tokio::test]
    async fn disabled_cache_degrades_to_misses() {
        let cache = RedisCache::disabled();
        assert!(!cache.is_enabled());
        assert!(!cache.is_available().await);
        assert_eq!(cache.get("sdx:v1:catalog").await, None);
        assert!(!cache.set_with_ttl("sdx:v1:catalog", "[]", 60).await);
        assert!(!cache.delete_by_prefix("sdx:v1:").await);
    }

    #[test]
    fn unparseable_url_disables_cache() {
        let cache = RedisCache::new(Some("not-a-redis-url"));
        assert!(!cache.is_enabled());
    }
}
