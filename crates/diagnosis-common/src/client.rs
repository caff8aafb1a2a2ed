use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{
    AnalyticsResponse, ConsultationCreated, ConsultationListResponse, ConsultationRecord,
    ConsultationRequest, DashboardAnalytics, DiagnoseRequest, DiagnoseResponse, DiseaseInfo,
    DiseaseListResponse, HealthReport, LoginRequest, PatientListResponse, PatientRecord,
    PatientRegistration, PatientSummary, RegistrationResponse, SymptomListResponse, UserProfile,
    UserResponse,
};
use crate::error::ClientError;
use crate::model::DiagnosisResponse;

#[derive(Clone, Debug)]
pub struct DiagnosisClientConfig {
    pub base_url: String,
    pub default_timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for DiagnosisClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            default_timeout: Duration::from_secs(30),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

/// HTTP client for the remote diagnosis service.
///
/// The cookie store is enabled so the session cookie issued by `/auth/login` is sent on
/// every later request made through the same client.
#[derive(Clone)]
pub struct DiagnosisClient {
    config: DiagnosisClientConfig,
    base: Url,
    http: reqwest::Client,
}

impl DiagnosisClient {
    pub fn new(config: DiagnosisClientConfig) -> Result<Self, ClientError> {
        // A trailing slash makes every endpoint a child of the base path.
        let base = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .user_agent("diagnosis-common/symptom-flow")
            .cookie_store(true)
            .timeout(config.default_timeout)
            .build()?;
        Ok(Self { config, base, http })
    }

    pub fn config(&self) -> &DiagnosisClientConfig {
        &self.config
    }

    pub async fn list_symptoms(&self) -> Result<Vec<String>, ClientError> {
        let resp: SymptomListResponse = self.get(&["symptoms"], &[]).await?;
        Ok(resp.symptoms)
    }

    pub async fn suggest_symptoms(&self, query: &str) -> Result<Vec<String>, ClientError> {
        let resp: SymptomListResponse = self.get(&["symptoms", "suggest"], &[("q", query)]).await?;
        Ok(resp.symptoms)
    }

    pub async fn list_diseases(&self) -> Result<Vec<DiseaseInfo>, ClientError> {
        let resp: DiseaseListResponse = self.get(&["diseases"], &[]).await?;
        Ok(resp.diseases)
    }

    /// Returns the registration id assigned by the service.
    pub async fn register_patient(
        &self,
        patient: &PatientRegistration,
    ) -> Result<String, ClientError> {
        let resp: RegistrationResponse = self.post(&["patient", "register"], patient).await?;
        Ok(resp.registration_id)
    }

    pub async fn diagnose(
        &self,
        request: &DiagnoseRequest,
    ) -> Result<DiagnosisResponse, ClientError> {
        let resp: DiagnoseResponse = self.post(&["diagnose"], request).await?;
        Ok(resp.into())
    }

    pub async fn create_consultation(
        &self,
        request: &ConsultationRequest,
    ) -> Result<Option<i64>, ClientError> {
        let resp: ConsultationCreated = self.post(&["consultations"], request).await?;
        Ok(resp.consultation_id)
    }

    pub async fn patient_consultations(
        &self,
        patient_id: &str,
    ) -> Result<Vec<ConsultationRecord>, ClientError> {
        let resp: ConsultationListResponse = self.get(&["consultations", patient_id], &[]).await?;
        Ok(resp.consultations)
    }

    pub async fn list_patients(&self) -> Result<Vec<PatientRecord>, ClientError> {
        let resp: PatientListResponse = self.get(&["patients"], &[]).await?;
        Ok(resp.patients)
    }

    pub async fn patient_summary(&self, patient_id: &str) -> Result<PatientSummary, ClientError> {
        self.get(&["patients", patient_id, "summary"], &[]).await
    }

    pub async fn dashboard_analytics(&self) -> Result<DashboardAnalytics, ClientError> {
        let resp: AnalyticsResponse = self.get(&["analytics", "dashboard"], &[]).await?;
        Ok(resp.analytics)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp: UserResponse = self.post(&["auth", "login"], &body).await?;
        Ok(resp.user)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .post(&["auth", "logout"], &serde_json::json!({}))
            .await?;
        Ok(())
    }

    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        let resp: UserResponse = self.get(&["auth", "profile"], &[]).await?;
        Ok(resp.user)
    }

    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        let url = self.endpoint(&["health"])?;
        let resp = self.http.get(url).send().await?;
        let bytes = Self::success_body(resp, self.config.max_error_body_bytes).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ClientError::InvalidUrl(self.config.base_url.clone()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let mut request = self.http.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let resp = request.send().await?;
        Self::parse_envelope(resp, self.config.max_error_body_bytes).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");
        let resp = self.http.post(url).json(body).send().await?;
        Self::parse_envelope(resp, self.config.max_error_body_bytes).await
    }

    async fn parse_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<T, ClientError> {
        let bytes = Self::success_body(resp, max_error_body_bytes).await?;
        let status: EnvelopeStatus = serde_json::from_slice(&bytes)?;
        if !status.success {
            return Err(ClientError::Rejected {
                message: status.reason(),
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn success_body(
        resp: reqwest::Response,
        max_error_body_bytes: usize,
    ) -> Result<Vec<u8>, ClientError> {
        if resp.status().is_success() {
            return Ok(resp.bytes().await?.to_vec());
        }
        Err(Self::to_status_error(resp, max_error_body_bytes).await)
    }

    async fn to_status_error(resp: reqwest::Response, max_error_body_bytes: usize) -> ClientError {
        let status = resp.status();
        let body = read_limited_text(resp, max_error_body_bytes).await;
        status_error(status, body)
    }
}

fn status_error(status: StatusCode, body: String) -> ClientError {
    match serde_json::from_str::<EnvelopeStatus>(&body)
        .ok()
        .and_then(EnvelopeStatus::reason)
    {
        Some(message) => ClientError::Status { status, message },
        None => ClientError::StatusBody { status, body },
    }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read service error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnvelopeStatus {
    #[serde(default)]
    success: bool,
    error: Option<String>,
    message: Option<String>,
}

impl EnvelopeStatus {
    /// `error` wins; some endpoints only send `message`.
    fn reason(self) -> Option<String> {
        self.error.or(self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> DiagnosisClient {
        DiagnosisClient::new(DiagnosisClientConfig {
            base_url: base_url.to_string(),
            ..DiagnosisClientConfig::default()
        })
        .expect("client builds")
    }

    #[test]
    fn endpoints_extend_the_base_path() {
        let c = client("http://localhost:8000/api");
        assert_eq!(
            c.endpoint(&["symptoms", "suggest"]).unwrap().as_str(),
            "http://localhost:8000/api/symptoms/suggest"
        );

        let trailing = client("http://localhost:8000/api/");
        assert_eq!(
            trailing.endpoint(&["diagnose"]).unwrap().as_str(),
            "http://localhost:8000/api/diagnose"
        );
    }

    #[test]
    fn caller_segments_are_percent_encoded() {
        let c = client("http://localhost:8000/api");
        assert_eq!(
            c.endpoint(&["patients", "AB/12 34", "summary"]).unwrap().as_str(),
            "http://localhost:8000/api/patients/AB%2F12%2034/summary"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = DiagnosisClient::new(DiagnosisClientConfig {
            base_url: "not a url".to_string(),
            ..DiagnosisClientConfig::default()
        });
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn json_error_bodies_keep_the_service_message() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"success": false, "error": "Symptoms are required"}"#.to_string(),
        );
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Symptoms are required");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down".to_string());
        assert!(matches!(err, ClientError::StatusBody { .. }));
    }

    #[test]
    fn message_field_is_used_when_error_is_absent() {
        let err = status_error(
            StatusCode::NOT_FOUND,
            r#"{"success": false, "message": "Patient not found"}"#.to_string(),
        );
        assert_eq!(
            err.user_message("Failed to load patient summary"),
            "Failed to load patient summary: Patient not found"
        );

        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Symptoms are required", "message": "Bad request"}"#.to_string(),
        );
        assert!(matches!(
            err,
            ClientError::Status { ref message, .. } if message == "Symptoms are required"
        ));

        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"success": false}"#.to_string(),
        );
        assert!(matches!(err, ClientError::StatusBody { .. }));
    }
}
