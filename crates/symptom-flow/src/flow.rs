//! Symptom selection and diagnosis request flow.
//!
//! One `SymptomFlow` exists per user session. The UI layer drives it through
//! `update_query`, `add_symptom`, `remove_symptom` and `submit`, and renders
//! `snapshot()`; the flow itself knows nothing about presentation.
//!
//! Suggestion responses may resolve out of order. Every query change takes a new
//! sequence number and a response is only applied if its sequence is still the latest,
//! so a slow answer for an old query never overwrites fresher suggestions.
//!
//! At most one diagnosis request is in flight per flow. The flag is an atomic released
//! by a drop guard, so a cancelled submit cannot leave the flow stuck.
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use diagnosis_common::api::DiagnoseRequest;
use diagnosis_common::error::ClientError;
use diagnosis_common::model::DiagnosisResponse;

use crate::model::SelectedSymptoms;
use crate::service::SymptomService;

const DIAGNOSIS_FAILED: &str = "Diagnosis failed";

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("no symptoms selected")]
    NothingSelected,

    #[error("a diagnosis request is already in flight")]
    SubmissionInFlight,

    #[error("diagnosis request failed: {0}")]
    Remote(#[from] ClientError),
}

impl FlowError {
    pub fn user_message(&self) -> String {
        match self {
            FlowError::NothingSelected => "Please select at least one symptom".to_string(),
            FlowError::SubmissionInFlight => {
                "Your symptoms are already being analysed, please wait".to_string()
            }
            FlowError::Remote(e) => e.user_message(DIAGNOSIS_FAILED),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionOutcome {
    /// The query was blank and suggestions were cleared.
    Cleared,
    /// Suggestions were replaced with this many entries.
    Applied(usize),
    /// A newer query was issued while this one was pending; the response was dropped.
    Stale,
    /// The service failed; suggestions were left as they were.
    Failed,
}

/// The result of a successful `submit`.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub symptoms: Vec<String>,
    pub patient_id: Option<String>,
    pub response: DiagnosisResponse,
}

#[derive(Debug, Clone)]
pub struct FlowSnapshot {
    pub query: String,
    pub suggestions: Vec<String>,
    pub selected: Vec<String>,
    pub patient_id: Option<String>,
    pub submitting: bool,
    pub can_submit: bool,
    pub last_error: Option<String>,
    pub last_diagnosis: Option<DiagnosisResponse>,
}

#[derive(Debug, Default)]
struct FlowState {
    query: String,
    suggestions: Vec<String>,
    selected: SelectedSymptoms,
    patient_id: Option<String>,
    last_error: Option<String>,
    last_diagnosis: Option<DiagnosisResponse>,
    suggest_seq: u64,
    generation: u64,
}

impl FlowState {
    fn next_suggest_seq(&mut self) -> u64 {
        self.suggest_seq += 1;
        self.suggest_seq
    }
}

pub struct SymptomFlow<S> {
    service: S,
    state: Mutex<FlowState>,
    in_flight: AtomicBool,
}

impl<S: SymptomService> SymptomFlow<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            state: Mutex::new(FlowState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub async fn update_query(&self, text: &str) -> SuggestionOutcome {
        let seq = {
            let mut state = self.state.lock().await;
            state.query = text.to_string();
            let seq = state.next_suggest_seq();
            if text.trim().is_empty() {
                state.suggestions.clear();
                return SuggestionOutcome::Cleared;
            }
            seq
        };

        let result = self.service.suggest(text.trim()).await;

        let mut state = self.state.lock().await;
        if state.suggest_seq != seq {
            debug!(query = text, seq, latest = state.suggest_seq, "discarding stale suggestions");
            return SuggestionOutcome::Stale;
        }
        match result {
            Ok(suggestions) => {
                let count = suggestions.len();
                state.suggestions = suggestions;
                SuggestionOutcome::Applied(count)
            }
            Err(e) => {
                warn!(error = %e, query = text, "symptom suggestions unavailable");
                SuggestionOutcome::Failed
            }
        }
    }

    /// Adds `name` to the selection and clears the query. Returns whether the selection
    /// changed; blank names and duplicates are ignored.
    pub async fn add_symptom(&self, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        let mut state = self.state.lock().await;
        let added = state.selected.insert(name);
        state.query.clear();
        state.suggestions.clear();
        state.next_suggest_seq();
        added
    }

    pub async fn remove_symptom(&self, name: &str) -> bool {
        self.state.lock().await.selected.remove(name)
    }

    pub async fn can_submit(&self) -> bool {
        let state = self.state.lock().await;
        !state.selected.is_empty() && !self.in_flight.load(Ordering::Acquire)
    }

    pub async fn set_patient(&self, patient_id: Option<String>) {
        self.state.lock().await.patient_id = patient_id;
    }

    pub async fn patient_id(&self) -> Option<String> {
        self.state.lock().await.patient_id.clone()
    }

    /// Forgets everything the user entered except the patient context.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.query.clear();
        state.suggestions.clear();
        state.selected.clear();
        state.last_error = None;
        state.last_diagnosis = None;
        state.next_suggest_seq();
        state.generation += 1;
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        let state = self.state.lock().await;
        let submitting = self.in_flight.load(Ordering::Acquire);
        FlowSnapshot {
            query: state.query.clone(),
            suggestions: state.suggestions.clone(),
            selected: state.selected.to_vec(),
            patient_id: state.patient_id.clone(),
            submitting,
            can_submit: !state.selected.is_empty() && !submitting,
            last_error: state.last_error.clone(),
            last_diagnosis: state.last_diagnosis.clone(),
        }
    }

    /// Sends the current selection for diagnosis.
    ///
    /// The selection is never modified here; after a failure the user can retry as-is.
    pub async fn submit(&self) -> Result<Submitted, FlowError> {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            debug!("diagnosis already in flight, rejecting submit");
            return Err(FlowError::SubmissionInFlight);
        };

        let (symptoms, patient_id, generation) = {
            let mut state = self.state.lock().await;
            if state.selected.is_empty() {
                state.last_error = Some(FlowError::NothingSelected.user_message());
                return Err(FlowError::NothingSelected);
            }
            state.last_error = None;
            (
                state.selected.to_vec(),
                state.patient_id.clone(),
                state.generation,
            )
        };

        info!(
            symptoms = symptoms.len(),
            patient_id = patient_id.as_deref().unwrap_or("-"),
            "requesting diagnosis"
        );
        let result = self
            .service
            .diagnose(DiagnoseRequest {
                symptoms: symptoms.clone(),
                patient_id: patient_id.clone(),
            })
            .await;

        let mut state = self.state.lock().await;
        let current = state.generation == generation;
        match result {
            Ok(response) => {
                info!(
                    candidates = response.candidates.len(),
                    best = response.best().map(|c| c.name.as_str()).unwrap_or("-"),
                    "diagnosis received"
                );
                if current {
                    state.last_diagnosis = Some(response.clone());
                }
                Ok(Submitted {
                    symptoms,
                    patient_id,
                    response,
                })
            }
            Err(e) => {
                warn!(error = %e, transport = e.is_transport(), "diagnosis request failed");
                let err = FlowError::Remote(e);
                if current {
                    state.last_error = Some(err.user_message());
                }
                Err(err)
            }
        }
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
