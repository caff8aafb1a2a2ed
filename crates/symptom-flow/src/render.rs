//! Plain data describing what the UI should display.
use schemars::JsonSchema;
use serde::Serialize;

use diagnosis_common::model::{DiagnosisCandidate, DiagnosisResponse, Medicine};

use crate::flow::FlowSnapshot;

const NO_DESCRIPTION: &str = "No description available";
const NO_DIAGNOSIS: &str = "No specific diagnosis found for the given symptoms. \
Please consult a healthcare professional for proper evaluation.";

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FlowView {
    pub query: String,
    pub suggestions: Vec<String>,
    pub selected: Vec<String>,
    /// Whether the analyse action should be enabled.
    pub can_submit: bool,
    pub submitting: bool,
    pub patient_id: Option<String>,
    /// User-facing message from the last failed action.
    pub error: Option<String>,
    pub diagnosis: Option<DiagnosisView>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DiagnosisView {
    pub primary: Option<CandidateView>,
    pub alternatives: Vec<AlternativeView>,
    /// Shown instead of a primary diagnosis when nothing matched.
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CandidateView {
    pub name: String,
    pub description: String,
    /// e.g. "82.0%"
    pub confidence_percent: String,
    pub matched_symptoms: Vec<String>,
    /// "name - dosage"
    pub medicines: Vec<String>,
    pub precautions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AlternativeView {
    pub name: String,
    pub confidence_percent: String,
}

pub fn flow_view(snapshot: &FlowSnapshot) -> FlowView {
    FlowView {
        query: snapshot.query.clone(),
        suggestions: snapshot.suggestions.clone(),
        selected: snapshot.selected.clone(),
        can_submit: snapshot.can_submit,
        submitting: snapshot.submitting,
        patient_id: snapshot.patient_id.clone(),
        error: snapshot.last_error.clone(),
        diagnosis: snapshot.last_diagnosis.as_ref().map(diagnosis_view),
    }
}

pub fn diagnosis_view(response: &DiagnosisResponse) -> DiagnosisView {
    let Some((best, rest)) = response.candidates.split_first() else {
        return DiagnosisView {
            primary: None,
            alternatives: Vec::new(),
            notice: Some(NO_DIAGNOSIS.to_string()),
        };
    };

    DiagnosisView {
        primary: Some(candidate_view(best)),
        alternatives: rest
            .iter()
            .map(|c| AlternativeView {
                name: c.name.clone(),
                confidence_percent: format_percent(c.confidence),
            })
            .collect(),
        notice: None,
    }
}

fn candidate_view(candidate: &DiagnosisCandidate) -> CandidateView {
    CandidateView {
        name: candidate.name.clone(),
        description: candidate
            .description
            .clone()
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        confidence_percent: format_percent(candidate.confidence),
        matched_symptoms: candidate.matched_symptoms.clone(),
        medicines: candidate.medicines.iter().map(medicine_line).collect(),
        precautions: candidate.precautions.clone(),
    }
}

fn medicine_line(medicine: &Medicine) -> String {
    match medicine.dosage.as_deref().map(str::trim) {
        Some(dosage) if !dosage.is_empty() => format!("{} - {dosage}", medicine.name),
        _ => medicine.name.clone(),
    }
}

pub fn format_percent(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}
