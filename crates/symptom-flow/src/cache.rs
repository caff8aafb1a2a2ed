/// Redis caching layer for symptom lookups.
///
/// All operations return `Option<T>` for graceful degradation.
///
/// Key schema:
/// - `sdx:v1:catalog`: JSON Vec<String>, every symptom the service knows (TTL configurable)
/// - `sdx:v1:suggest:{sha256(normalized query)}`: JSON Vec<String> (TTL 300s)
use sha2::{Digest, Sha256};
use tracing::warn;

use diagnosis_common::redis::RedisCache;

const KEY_PREFIX: &str = "sdx:v1:";
const SUGGEST_TTL_SECS: u64 = 300;

pub struct SymptomCache {
    redis: RedisCache,
    catalog_ttl_secs: u64,
}

impl SymptomCache {
    pub fn new(redis: RedisCache, catalog_ttl_secs: u64) -> Self {
        Self {
            redis,
            catalog_ttl_secs,
        }
    }

    pub async fn get_catalog(&self) -> Option<Vec<String>> {
        let key = format!("{KEY_PREFIX}catalog");
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_catalog(&self, symptoms: &[String]) {
        let key = format!("{KEY_PREFIX}catalog");
        if let Ok(json) = serde_json::to_string(symptoms) {
            self.redis
                .set_with_ttl(&key, &json, self.catalog_ttl_secs)
                .await;
        }
    }

    pub async fn get_suggestions(&self, query: &str) -> Option<Vec<String>> {
        let key = suggest_key(query);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_suggestions(&self, query: &str, suggestions: &[String]) {
        let key = suggest_key(query);
        if let Ok(json) = serde_json::to_string(suggestions) {
            self.redis.set_with_ttl(&key, &json, SUGGEST_TTL_SECS).await;
        }
    }

    pub async fn invalidate_all(&self) -> bool {
        self.redis.delete_by_prefix(KEY_PREFIX).await
    }
}

/// Suggestions are case-insensitive, so queries differing only in case share a key.
fn suggest_key(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.trim().to_lowercase().as_bytes());
    let hash = hasher.finalize();
    format!("{KEY_PREFIX}suggest:{:x}", hash)
}
