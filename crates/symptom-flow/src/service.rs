//! The remote side of the symptom flow.
//!
//! `SymptomFlow` only talks to a `SymptomService`, so the flow can be driven against the
//! real diagnosis service or an in-process fake.
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use diagnosis_common::api::DiagnoseRequest;
use diagnosis_common::client::DiagnosisClient;
use diagnosis_common::error::ClientError;
use diagnosis_common::model::DiagnosisResponse;

use crate::cache::SymptomCache;
use crate::error::AppError;

pub trait SymptomService: Send + Sync {
    /// Symptom names matching `query` (case-insensitive substring).
    fn suggest(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<String>, ClientError>> + Send;

    fn diagnose(
        &self,
        request: DiagnoseRequest,
    ) -> impl Future<Output = Result<DiagnosisResponse, ClientError>> + Send;
}

/// Where suggestions come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuggestSource {
    /// `GET /symptoms/suggest?q=` per query.
    #[default]
    Remote,
    /// `GET /symptoms` once, filtered locally.
    Catalog,
}

impl FromStr for SuggestSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(SuggestSource::Remote),
            "catalog" => Ok(SuggestSource::Catalog),
            other => Err(AppError::Config(format!(
                "SDX_SUGGEST_SOURCE must be \"remote\" or \"catalog\", got {other:?}"
            ))),
        }
    }
}

pub struct RemoteService {
    client: Arc<DiagnosisClient>,
    cache: Arc<SymptomCache>,
    source: SuggestSource,
    catalog: RwLock<Option<Arc<Vec<String>>>>,
}

impl RemoteService {
    pub fn new(client: Arc<DiagnosisClient>, cache: Arc<SymptomCache>, source: SuggestSource) -> Self {
        Self {
            client,
            cache,
            source,
            catalog: RwLock::new(None),
        }
    }

    /// Every symptom the service knows, from memory, then Redis, then the service.
    pub async fn catalog(&self) -> Result<Arc<Vec<String>>, ClientError> {
        if let Some(catalog) = self.catalog.read().await.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let symptoms = match self.cache.get_catalog().await {
            Some(cached) => {
                debug!(count = cached.len(), "symptom catalog cache hit");
                cached
            }
            None => {
                let fetched = self.client.list_symptoms().await?;
                info!(count = fetched.len(), "symptom catalog loaded");
                self.cache.set_catalog(&fetched).await;
                fetched
            }
        };

        let catalog = Arc::new(symptoms);
        *self.catalog.write().await = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Drops every cached lookup and loads the catalog again.
    pub async fn refresh_catalog(&self) -> Result<Arc<Vec<String>>, ClientError> {
        self.cache.invalidate_all().await;
        *self.catalog.write().await = None;
        self.catalog().await
    }
}

impl SymptomService for RemoteService {
    async fn suggest(&self, query: &str) -> Result<Vec<String>, ClientError> {
        match self.source {
            SuggestSource::Catalog => {
                let catalog = self.catalog().await?;
                Ok(filter_symptoms(&catalog, query))
            }
            SuggestSource::Remote => {
                if let Some(cached) = self.cache.get_suggestions(query).await {
                    debug!(query, "suggestion cache hit");
                    return Ok(cached);
                }
                let suggestions = self.client.suggest_symptoms(query.trim()).await?;
                self.cache.set_suggestions(query, &suggestions).await;
                Ok(suggestions)
            }
        }
    }

    async fn diagnose(&self, request: DiagnoseRequest) -> Result<DiagnosisResponse, ClientError> {
        self.client.diagnose(&request).await
    }
}

/// Case-insensitive substring filter that keeps catalog order.
pub fn filter_symptoms(catalog: &[String], query: &str) -> Vec<String> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .filter(|s| s.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
