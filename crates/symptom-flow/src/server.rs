/// MCP server driving the symptom flow.
///
/// Each tool is one user action on the diagnosis screen (type, pick, remove, analyse,
/// reset) or one of the surrounding screens (patient registration, login, patient
/// records, dashboard). Flow tools return the full `FlowView` so the client can
/// re-render from a single response.
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use diagnosis_common::api::{
    ConsultationRecord, DashboardAnalytics, DiseaseInfo, HealthReport, PatientRecord,
    PatientRegistration, PatientSummary, UserProfile,
};
use diagnosis_common::client::{DiagnosisClient, DiagnosisClientConfig};
use diagnosis_common::error::ClientError;

use crate::cache::SymptomCache;
use crate::flow::{Submitted, SymptomFlow};
use crate::render::{self, DiagnosisView, FlowView};
use crate::service::{RemoteService, SuggestSource};
use crate::session::Session;

/// Builds one server per MCP connection.
///
/// Every server gets its own HTTP client (and so its own session cookie), flow and
/// login. Only the Redis-backed symptom cache is shared between them.
#[derive(Clone)]
pub struct ServerFactory {
    client_config: DiagnosisClientConfig,
    cache: Arc<SymptomCache>,
    source: SuggestSource,
}

impl ServerFactory {
    pub fn new(
        client_config: DiagnosisClientConfig,
        cache: Arc<SymptomCache>,
        source: SuggestSource,
    ) -> Self {
        Self {
            client_config,
            cache,
            source,
        }
    }

    pub fn build(&self) -> Result<SymptomFlowServer, ClientError> {
        let client = Arc::new(DiagnosisClient::new(self.client_config.clone())?);
        let service = RemoteService::new(Arc::clone(&client), Arc::clone(&self.cache), self.source);
        let flow = Arc::new(SymptomFlow::new(service));
        let session = Arc::new(Session::new(Arc::clone(&client)));
        Ok(SymptomFlowServer::new(flow, session, client))
    }
}

#[derive(Clone)]
pub struct SymptomFlowServer {
    flow: Arc<SymptomFlow<RemoteService>>,
    session: Arc<Session>,
    client: Arc<DiagnosisClient>,
    tool_router: ToolRouter<SymptomFlowServer>,
}

impl SymptomFlowServer {
    pub fn new(
        flow: Arc<SymptomFlow<RemoteService>>,
        session: Arc<Session>,
        client: Arc<DiagnosisClient>,
    ) -> Self {
        Self {
            flow,
            session,
            client,
            tool_router: Self::tool_router(),
        }
    }

    async fn view(&self) -> Json<FlowView> {
        Json(render::flow_view(&self.flow.snapshot().await))
    }

    /// Records the consultation when a clinician analysed symptoms for a known patient.
    /// Failures are logged only; the diagnosis is shown regardless.
    async fn record_if_clinician(&self, submitted: &Submitted) -> Option<i64> {
        let patient_id = submitted.patient_id.as_deref()?;
        if !self.session.is_clinician().await {
            return None;
        }
        self.session
            .record_consultation(patient_id, &submitted.symptoms, &submitted.response)
            .await
            .inspect_err(|e| warn!(error = %e, patient_id, "failed to record consultation"))
            .ok()
            .flatten()
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct QueryParams {
    /// Current contents of the symptom search box.
    text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SymptomParams {
    /// Symptom name exactly as suggested (e.g. "fever").
    name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PatientParams {
    /// Registration id issued at patient registration.
    patient_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PatientSearchParams {
    /// Optional filter on patient name or registration id (case-insensitive).
    query: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct LoginParams {
    username: String,
    password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct AnalysisResponse {
    diagnosis: DiagnosisView,
    symptoms: Vec<String>,
    /// Set when a consultation record was created for a logged-in clinician.
    consultation_id: Option<i64>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RegistrationOutcome {
    registration_id: String,
    message: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ProfileResponse {
    logged_in: bool,
    user: Option<UserProfile>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct SymptomCatalogResponse {
    count: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
struct DiseaseListView {
    diseases: Vec<DiseaseInfo>,
    count: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
struct PatientListView {
    patients: Vec<PatientRecord>,
    count: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ConsultationListView {
    patient_id: String,
    consultations: Vec<ConsultationRecord>,
    count: usize,
}

#[derive(Debug, Serialize, JsonSchema)]
struct DashboardView {
    analytics: DashboardAnalytics,
    diseases: Vec<DiseaseInfo>,
}

fn required(value: &str, field: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(value.to_string())
}

fn filter_patients(patients: Vec<PatientRecord>, query: &str) -> Vec<PatientRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return patients;
    }
    patients
        .into_iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.registration_id.to_lowercase().contains(&needle)
        })
        .collect()
}

#[tool_router]
impl SymptomFlowServer {
    #[tool(description = "Update the symptom search text. Returns the flow with refreshed suggestions; blank text clears them. Suggestion failures are not errors.")]
    async fn update_query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> Result<Json<FlowView>, String> {
        self.flow.update_query(&params.text).await;
        Ok(self.view().await)
    }

    #[tool(description = "Add a symptom to the selection (no-op if already selected). Clears the search text.")]
    async fn add_symptom(
        &self,
        Parameters(params): Parameters<SymptomParams>,
    ) -> Result<Json<FlowView>, String> {
        if params.name.trim().is_empty() {
            return Err("symptom name must not be empty".to_string());
        }
        self.flow.add_symptom(&params.name).await;
        Ok(self.view().await)
    }

    #[tool(description = "Remove a symptom from the selection (no-op if not selected).")]
    async fn remove_symptom(
        &self,
        Parameters(params): Parameters<SymptomParams>,
    ) -> Result<Json<FlowView>, String> {
        self.flow.remove_symptom(&params.name).await;
        Ok(self.view().await)
    }

    #[tool(description = "Send the selected symptoms for diagnosis and return ranked results. The selection is kept so the request can be retried or refined.")]
    async fn analyze_symptoms(&self) -> Result<Json<AnalysisResponse>, String> {
        let submitted = self.flow.submit().await.map_err(|e| e.user_message())?;
        let consultation_id = self.record_if_clinician(&submitted).await;
        Ok(Json(AnalysisResponse {
            diagnosis: render::diagnosis_view(&submitted.response),
            symptoms: submitted.symptoms,
            consultation_id,
        }))
    }

    #[tool(description = "Start over: clear the search text, selection and last result. The selected patient is kept.")]
    async fn reset_flow(&self) -> Result<Json<FlowView>, String> {
        self.flow.reset().await;
        Ok(self.view().await)
    }

    #[tool(description = "Show the current state of the symptom flow.")]
    async fn view_flow(&self) -> Result<Json<FlowView>, String> {
        Ok(self.view().await)
    }

    #[tool(description = "Reload the symptom catalog from the service, dropping cached suggestions.")]
    async fn refresh_symptoms(&self) -> Result<Json<SymptomCatalogResponse>, String> {
        let catalog = self
            .flow
            .service()
            .refresh_catalog()
            .await
            .map_err(|e| e.user_message("Failed to load symptoms"))?;
        Ok(Json(SymptomCatalogResponse {
            count: catalog.len(),
        }))
    }

    #[tool(description = "Register a new patient. On success the patient becomes the subject of the next diagnosis.")]
    async fn register_patient(
        &self,
        Parameters(params): Parameters<PatientRegistration>,
    ) -> Result<Json<RegistrationOutcome>, String> {
        if params.age == 0 {
            return Err("age must be greater than zero".to_string());
        }
        let patient = PatientRegistration {
            name: required(&params.name, "name")?,
            age: params.age,
            gender: required(&params.gender, "gender")?,
            contact: required(&params.contact, "contact")?,
        };

        let registration_id = self
            .client
            .register_patient(&patient)
            .await
            .map_err(|e| e.user_message("Registration failed"))?;
        info!(registration_id = %registration_id, "patient registered");
        self.flow.set_patient(Some(registration_id.clone())).await;

        Ok(Json(RegistrationOutcome {
            message: format!("Patient registered successfully! ID: {registration_id}"),
            registration_id,
        }))
    }

    #[tool(description = "Make an existing patient the subject of the next diagnosis.")]
    async fn select_patient(
        &self,
        Parameters(params): Parameters<PatientParams>,
    ) -> Result<Json<FlowView>, String> {
        let patient_id = required(&params.patient_id, "patient_id")?;
        self.flow.set_patient(Some(patient_id)).await;
        Ok(self.view().await)
    }

    #[tool(description = "Log in to the diagnosis service. Clinicians (doctor, nurse, admin) get consultation records created after each analysis.")]
    async fn login(
        &self,
        Parameters(params): Parameters<LoginParams>,
    ) -> Result<Json<UserProfile>, String> {
        let username = required(&params.username, "username")?;
        if params.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        let user = self
            .session
            .login(&username, &params.password)
            .await
            .map_err(|e| e.user_message("Login failed"))?;
        Ok(Json(user))
    }

    #[tool(description = "Log out of the diagnosis service.")]
    async fn logout(&self) -> Result<Json<OkResponse>, String> {
        self.session
            .logout()
            .await
            .map_err(|e| e.user_message("Logout failed"))?;
        Ok(Json(OkResponse { ok: true }))
    }

    #[tool(description = "Show the logged-in user, if any.")]
    async fn profile(&self) -> Result<Json<ProfileResponse>, String> {
        let user = self.session.restore().await;
        Ok(Json(ProfileResponse {
            logged_in: user.is_some(),
            user,
        }))
    }

    #[tool(description = "List every disease known to the service.")]
    async fn list_diseases(&self) -> Result<Json<DiseaseListView>, String> {
        let diseases = self
            .client
            .list_diseases()
            .await
            .map_err(|e| e.user_message("Failed to load diseases"))?;
        Ok(Json(DiseaseListView {
            count: diseases.len(),
            diseases,
        }))
    }

    #[tool(description = "List registered patients, optionally filtered by name or registration id. Requires a clinician login.")]
    async fn list_patients(
        &self,
        Parameters(params): Parameters<PatientSearchParams>,
    ) -> Result<Json<PatientListView>, String> {
        let patients = self
            .client
            .list_patients()
            .await
            .map_err(|e| e.user_message("Failed to load patients"))?;
        let patients = filter_patients(patients, params.query.as_deref().unwrap_or_default());
        Ok(Json(PatientListView {
            count: patients.len(),
            patients,
        }))
    }

    #[tool(description = "Show a patient's details and consultation history summary. Requires a clinician login.")]
    async fn patient_summary(
        &self,
        Parameters(params): Parameters<PatientParams>,
    ) -> Result<Json<PatientSummary>, String> {
        let patient_id = required(&params.patient_id, "patient_id")?;
        let summary = self
            .client
            .patient_summary(&patient_id)
            .await
            .map_err(|e| e.user_message("Failed to load patient summary"))?;
        Ok(Json(summary))
    }

    #[tool(description = "List a patient's consultations, newest first. Requires a clinician login.")]
    async fn patient_consultations(
        &self,
        Parameters(params): Parameters<PatientParams>,
    ) -> Result<Json<ConsultationListView>, String> {
        let patient_id = required(&params.patient_id, "patient_id")?;
        let consultations = self
            .client
            .patient_consultations(&patient_id)
            .await
            .map_err(|e| e.user_message("Failed to load consultations"))?;
        Ok(Json(ConsultationListView {
            patient_id,
            count: consultations.len(),
            consultations,
        }))
    }

    #[tool(description = "Dashboard: patient and consultation counts, common diseases, recent consultations and the disease list. Requires a clinician login.")]
    async fn dashboard(&self) -> Result<Json<DashboardView>, String> {
        let (analytics, diseases) = futures::try_join!(
            self.client.dashboard_analytics(),
            self.client.list_diseases()
        )
        .map_err(|e| e.user_message("Failed to load dashboard data"))?;
        Ok(Json(DashboardView {
            analytics,
            diseases,
        }))
    }

    #[tool(description = "Check that the diagnosis service and its database are reachable.")]
    async fn service_health(&self) -> Result<Json<HealthReport>, String> {
        let report = self
            .client
            .health()
            .await
            .map_err(|e| e.user_message("Health check failed"))?;
        Ok(Json(report))
    }
}

#[tool_handler]
impl ServerHandler for SymptomFlowServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "symptom-flow".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Symptom-to-diagnosis assistant. Type with update_query, pick suggestions with \
add_symptom, drop them with remove_symptom, then call analyze_symptoms. register_patient or \
select_patient sets the patient the diagnosis is recorded for; login as a clinician to have \
consultations recorded automatically."
                    .to_string(),
            ),
        }
    }
}
