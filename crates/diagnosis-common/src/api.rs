//! Wire types for the remote diagnosis service.
//!
//! Every response is wrapped in `{ "success": bool, "error"?: string, ... }`. The
//! envelope fields are checked by the client before these payload types are decoded,
//! so the structs below only describe the payload fields.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::Medicine;

#[derive(Debug, Clone, Deserialize)]
pub struct SymptomListResponse {
    #[serde(alias = "suggestions")]
    pub symptoms: Vec<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiseaseInfo {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiseaseListResponse {
    pub diseases: Vec<DiseaseInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PatientRegistration {
    /// Full name of the patient.
    pub name: String,
    /// Age in years.
    pub age: u32,
    pub gender: String,
    /// Phone number or email address.
    pub contact: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationResponse {
    pub registration_id: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnoseRequest {
    pub symptoms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
}

/// Some service versions send a list of ranked results, the simpler one a single object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnoseResponse {
    #[serde(default, alias = "diagnosis")]
    pub results: OneOrMany<DiagnosisResult>,
    pub top_disease: Option<DiseaseMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosisResult {
    pub disease: DiseaseMatch,
    pub weighted_score: Option<f64>,
    pub match_percentage: Option<f64>,
    pub patient_match_percentage: Option<f64>,
    pub matched_symptoms: Option<Vec<String>>,
    pub medicines: Option<Vec<Medicine>>,
    pub precautions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiseaseMatch {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub confidence: Option<f64>,
    #[serde(default)]
    pub matched_symptoms: Vec<String>,
    #[serde(default)]
    pub medicines: Vec<Medicine>,
    #[serde(default)]
    pub precautions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultationRequest {
    pub patient_id: String,
    pub symptoms: Vec<String>,
    pub diagnosis_results: serde_json::Value,
    pub confidence_score: f64,
    pub doctor_notes: String,
    /// `YYYY-MM-DD`.
    pub follow_up_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsultationCreated {
    pub consultation_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConsultationRecord {
    pub consultation_id: i64,
    pub consultation_date: Option<String>,
    #[serde(default)]
    pub symptoms_analyzed: Vec<String>,
    #[serde(default)]
    pub diagnosis_results: serde_json::Value,
    #[serde(default)]
    pub confidence_score: f64,
    pub doctor_notes: Option<String>,
    pub follow_up_date: Option<String>,
    pub status: Option<String>,
    pub doctor_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsultationListResponse {
    pub consultations: Vec<ConsultationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PatientRecord {
    pub registration_id: String,
    pub name: String,
    pub gender: Option<String>,
    pub age: Option<u32>,
    pub contact: Option<String>,
    pub consultation_count: Option<u64>,
    pub last_visit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientListResponse {
    pub patients: Vec<PatientRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PatientDetails {
    pub registration_id: String,
    pub name: String,
    pub gender: Option<String>,
    pub age: Option<u32>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConsultationBrief {
    pub date: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub diagnosis: serde_json::Value,
    #[serde(default)]
    pub confidence: f64,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PatientSummary {
    pub patient: PatientDetails,
    #[serde(default)]
    pub consultations: Vec<ConsultationBrief>,
    #[serde(default)]
    pub total_consultations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DiseaseFrequency {
    pub disease: String,
    pub frequency: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecentConsultation {
    pub date: Option<String>,
    pub patient_name: Option<String>,
    #[serde(default)]
    pub confidence: f64,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DashboardAnalytics {
    pub total_patients: u64,
    pub today_consultations: u64,
    pub month_consultations: u64,
    #[serde(default)]
    pub common_diseases: Vec<DiseaseFrequency>,
    #[serde(default)]
    pub recent_consultations: Vec<RecentConsultation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsResponse {
    pub analytics: DashboardAnalytics,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserProfile {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub full_name: String,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

/// `GET /health` is the only endpoint without the success envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthReport {
    pub status: String,
    pub service: Option<String>,
    pub version: Option<String>,
    pub database: Option<serde_json::Value>,
    #[serde(default)]
    pub features: Vec<String>,
    pub error: Option<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
