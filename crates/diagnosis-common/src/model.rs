//! Normalized diagnosis results.
//!
//! Service versions disagree on where candidate details live (on the result entry or on
//! the nested disease) and on the score scale (0-1 or 0-100). Everything is folded into
//! one shape here so callers never see the differences.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::{DiagnoseResponse, DiagnosisResult, DiseaseMatch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Medicine {
    pub name: String,
    pub dosage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisCandidate {
    pub name: String,
    pub description: Option<String>,
    /// Always within `0.0..=1.0`.
    pub confidence: f64,
    pub match_percentage: Option<f64>,
    pub matched_symptoms: Vec<String>,
    pub medicines: Vec<Medicine>,
    pub precautions: Vec<String>,
}

/// Ranked candidates, best match first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResponse {
    pub candidates: Vec<DiagnosisCandidate>,
}

impl DiagnosisResponse {
    pub fn best(&self) -> Option<&DiagnosisCandidate> {
        self.candidates.first()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl From<DiagnoseResponse> for DiagnosisResponse {
    fn from(wire: DiagnoseResponse) -> Self {
        let mut candidates: Vec<DiagnosisCandidate> = wire
            .results
            .into_vec()
            .into_iter()
            .map(DiagnosisCandidate::from)
            .collect();

        if candidates.is_empty() {
            if let Some(top) = wire.top_disease {
                candidates.push(DiagnosisCandidate::from_disease(top, None, None));
            }
        }

        Self { candidates }
    }
}

impl From<DiagnosisResult> for DiagnosisCandidate {
    fn from(result: DiagnosisResult) -> Self {
        let DiagnosisResult {
            mut disease,
            weighted_score,
            match_percentage,
            patient_match_percentage: _,
            matched_symptoms,
            medicines,
            precautions,
        } = result;

        if let Some(v) = matched_symptoms {
            disease.matched_symptoms = v;
        }
        if let Some(v) = medicines {
            disease.medicines = v;
        }
        if let Some(v) = precautions {
            disease.precautions = v;
        }
        DiagnosisCandidate::from_disease(disease, weighted_score, match_percentage)
    }
}

impl DiagnosisCandidate {
    fn from_disease(
        disease: DiseaseMatch,
        weighted_score: Option<f64>,
        match_percentage: Option<f64>,
    ) -> Self {
        let confidence = disease
            .confidence
            .or(weighted_score)
            .map(normalize_score)
            .unwrap_or(0.0);
        Self {
            name: disease.name,
            description: disease.description.filter(|d| !d.trim().is_empty()),
            confidence,
            match_percentage,
            matched_symptoms: disease.matched_symptoms,
            medicines: disease.medicines,
            precautions: disease.precautions,
        }
    }
}

/// Scores above 1.0 are percentages.
pub fn normalize_score(raw: f64) -> f64 {
    if !raw.is_finite() {
        return 0.0;
    }
    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    scaled.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> DiagnosisResponse {
        let wire: DiagnoseResponse = serde_json::from_str(json).expect("valid diagnose payload");
        wire.into()
    }

    #[test]
    fn percentage_scores_are_scaled() {
        assert_eq!(normalize_score(82.0), 0.82);
        assert_eq!(normalize_score(0.5), 0.5);
        assert_eq!(normalize_score(1.0), 1.0);
        assert_eq!(normalize_score(250.0), 1.0);
        assert_eq!(normalize_score(-3.0), 0.0);
        assert_eq!(normalize_score(f64::NAN), 0.0);
    }

    #[test]
    fn nested_disease_details_are_used() {
        let response = decode(
            r#"{
                "success": true,
                "results": [
                    {
                        "disease": {
                            "id": 3,
                            "name": "Influenza",
                            "description": "Viral infection",
                            "confidence": 0.76,
                            "matched_symptoms": ["fever", "cough"],
                            "medicines": [{"name": "Oseltamivir", "dosage": "75mg twice daily"}],
                            "precautions": ["Rest", "Hydrate"]
                        },
                        "match_percentage": 50.0,
                        "patient_match_percentage": 100.0,
                        "weighted_score": 65.0
                    },
                    {
                        "disease": {"id": 4, "name": "Common Cold", "description": null},
                        "weighted_score": 40.0,
                        "matched_symptoms": ["cough"],
                        "medicines": [{"name": "Rest", "dosage": null}],
                        "precautions": []
                    }
                ],
                "top_disease": {"id": 3, "name": "Influenza"}
            }"#,
        );

        assert_eq!(response.candidates.len(), 2);
        let best = response.best().expect("best candidate");
        assert_eq!(best.name, "Influenza");
        assert_eq!(best.confidence, 0.76);
        assert_eq!(best.match_percentage, Some(50.0));
        assert_eq!(best.matched_symptoms, vec!["fever", "cough"]);
        assert_eq!(best.medicines[0].dosage.as_deref(), Some("75mg twice daily"));

        let second = &response.candidates[1];
        assert_eq!(second.name, "Common Cold");
        assert_eq!(second.confidence, 0.4);
        assert_eq!(second.description, None);
        assert_eq!(second.matched_symptoms, vec!["cough"]);
        assert_eq!(second.medicines[0].dosage, None);
    }

    #[test]
    fn single_object_diagnosis_decodes() {
        let response = decode(
            r#"{
                "success": true,
                "diagnosis": {
                    "disease": {"name": "Pneumonia", "description": "Lung infection"},
                    "weighted_score": 0.82,
                    "matched_symptoms": ["fever", "cough"]
                }
            }"#,
        );
        assert_eq!(response.candidates.len(), 1);
        assert_eq!(response.candidates[0].name, "Pneumonia");
        assert_eq!(response.candidates[0].confidence, 0.82);
    }

    #[test]
    fn top_disease_used_when_results_missing() {
        let response = decode(
            r#"{"success": true, "top_disease": {"name": "Malaria", "confidence": 0.6}}"#,
        );
        assert_eq!(response.best().map(|c| c.name.as_str()), Some("Malaria"));
    }

    #[test]
    fn empty_results_mean_no_candidates() {
        let response = decode(r#"{"success": true, "results": [], "top_disease": null}"#);
        assert!(response.is_empty());
        assert!(response.best().is_none());
    }
}
