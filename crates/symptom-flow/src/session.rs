//! Logged-in user context and consultation recording.
//!
//! Authentication itself is a session cookie held by the connection's `DiagnosisClient`; this
//! module only remembers who the service says is logged in.
use std::sync::Arc;

use chrono::{Days, Local, NaiveDate};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use diagnosis_common::api::{ConsultationRequest, UserProfile};
use diagnosis_common::client::DiagnosisClient;
use diagnosis_common::error::{ClientError, StatusCode};
use diagnosis_common::model::DiagnosisResponse;

use crate::error::AppError;

const CLINICAL_ROLES: [&str; 3] = ["doctor", "nurse", "admin"];
const FOLLOW_UP_DAYS: u64 = 7;

pub struct Session {
    client: Arc<DiagnosisClient>,
    user: RwLock<Option<UserProfile>>,
}

impl Session {
    pub fn new(client: Arc<DiagnosisClient>) -> Self {
        Self {
            client,
            user: RwLock::new(None),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ClientError> {
        let user = self.client.login(username, password).await?;
        info!(role = %user.role, "user logged in");
        *self.user.write().await = Some(user.clone());
        Ok(user)
    }

    /// The local user is only forgotten once the service confirms the logout.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.client.logout().await?;
        *self.user.write().await = None;
        info!("user logged out");
        Ok(())
    }

    /// Asks the service who owns the current session cookie.
    ///
    /// The known user is only forgotten when the service answers that nobody is logged
    /// in. If the service cannot be reached the last known user is returned.
    pub async fn restore(&self) -> Option<UserProfile> {
        match self.client.profile().await {
            Ok(user) => {
                *self.user.write().await = Some(user.clone());
                Some(user)
            }
            Err(e) if is_unauthenticated(&e) => {
                debug!(error = %e, "no authenticated session");
                *self.user.write().await = None;
                None
            }
            Err(e) => {
                warn!(error = %e, "could not confirm session, keeping last known user");
                self.current_user().await
            }
        }
    }

    pub async fn current_user(&self) -> Option<UserProfile> {
        self.user.read().await.clone()
    }

    pub async fn is_clinician(&self) -> bool {
        self.user
            .read()
            .await
            .as_ref()
            .is_some_and(|u| is_clinical_role(&u.role))
    }

    pub async fn record_consultation(
        &self,
        patient_id: &str,
        symptoms: &[String],
        diagnosis: &DiagnosisResponse,
    ) -> Result<Option<i64>, AppError> {
        let user = self.current_user().await.ok_or(AppError::NotLoggedIn)?;
        let today = Local::now().date_naive();
        let request = consultation_request(&user, patient_id, symptoms, diagnosis, today)?;
        let id = self.client.create_consultation(&request).await?;
        info!(patient_id, consultation_id = ?id, "consultation recorded");
        Ok(id)
    }
}

fn is_unauthenticated(err: &ClientError) -> bool {
    match err {
        ClientError::Rejected { .. } => true,
        ClientError::Status { status, .. } | ClientError::StatusBody { status, .. } => matches!(
            *status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ),
        _ => false,
    }
}

pub fn is_clinical_role(role: &str) -> bool {
    CLINICAL_ROLES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(role.trim()))
}

fn consultation_request(
    user: &UserProfile,
    patient_id: &str,
    symptoms: &[String],
    diagnosis: &DiagnosisResponse,
    today: NaiveDate,
) -> Result<ConsultationRequest, serde_json::Error> {
    let follow_up = today
        .checked_add_days(Days::new(FOLLOW_UP_DAYS))
        .map(|d| d.format("%Y-%m-%d").to_string());

    Ok(ConsultationRequest {
        patient_id: patient_id.to_string(),
        symptoms: symptoms.to_vec(),
        diagnosis_results: serde_json::to_value(diagnosis)?,
        confidence_score: diagnosis.best().map(|c| c.confidence).unwrap_or(0.0),
        doctor_notes: format!("Diagnosis performed by {} ({})", user.full_name, user.role),
        follow_up_date: follow_up,
    })
}
