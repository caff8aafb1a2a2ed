//! In-process stand-in for the diagnosis service, shared by the unit tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use diagnosis_common::client::DiagnosisClientConfig;

pub const CATALOG: [&str; 4] = ["Chest Pain", "cough", "fatigue", "fever"];

/// Records what the service was asked and lets a test switch failures on.
#[derive(Default)]
pub struct DiagnosisStub {
    symptom_lists: AtomicUsize,
    suggest_queries: Mutex<Vec<String>>,
    consultations: Mutex<Vec<Value>>,
    pub logout_fails: AtomicBool,
    pub profile_outage: AtomicBool,
}

impl DiagnosisStub {
    pub fn symptom_lists(&self) -> usize {
        self.symptom_lists.load(Ordering::SeqCst)
    }

    pub fn suggest_queries(&self) -> Vec<String> {
        self.suggest_queries.lock().unwrap().clone()
    }

    pub fn consultations(&self) -> Vec<Value> {
        self.consultations.lock().unwrap().clone()
    }
}

type Stub = State<Arc<DiagnosisStub>>;

fn user(username: &str) -> Option<Value> {
    match username {
        "drsmith" => Some(json!({
            "id": 1, "username": "drsmith", "role": "doctor", "full_name": "Dr. Smith"
        })),
        "frontdesk" => Some(json!({
            "id": 2, "username": "frontdesk", "role": "receptionist", "full_name": "Front Desk"
        })),
        _ => None,
    }
}

fn session_user(headers: &HeaderMap) -> Option<Value> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .and_then(user)
}

async fn symptoms(State(stub): Stub) -> Json<Value> {
    stub.symptom_lists.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "success": true, "symptoms": CATALOG, "count": CATALOG.len() }))
}

async fn suggest(State(stub): Stub, Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    stub.suggest_queries.lock().unwrap().push(q.clone());
    let needle = q.to_lowercase();
    let suggestions: Vec<&str> = CATALOG
        .iter()
        .copied()
        .filter(|s| s.to_lowercase().contains(&needle))
        .collect();
    Json(json!({ "success": true, "suggestions": suggestions }))
}

async fn diagnose(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "results": [{
            "disease": {
                "id": 7,
                "name": "Pneumonia",
                "description": "Lung infection",
                "confidence": 0.82,
                "matched_symptoms": body["symptoms"],
                "medicines": [{ "name": "Amoxicillin", "dosage": "500mg" }],
                "precautions": ["Rest"]
            },
            "match_percentage": 66.7
        }]
    }))
}

async fn login(Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    match user(username) {
        Some(profile) if body["password"] == "secret" => (
            [(header::SET_COOKIE, format!("session={username}; Path=/"))],
            Json(json!({ "success": true, "user": profile })),
        )
            .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Invalid credentials" })),
        )
            .into_response(),
    }
}

async fn logout(State(stub): Stub) -> Response {
    if stub.logout_fails.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    (
        [(header::SET_COOKIE, "session=; Path=/; Max-Age=0")],
        Json(json!({ "success": true, "message": "Logged out" })),
    )
        .into_response()
}

async fn profile(State(stub): Stub, headers: HeaderMap) -> Response {
    if stub.profile_outage.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "upstream unavailable").into_response();
    }
    match session_user(&headers) {
        Some(profile) => Json(json!({ "success": true, "user": profile })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Authentication required" })),
        )
            .into_response(),
    }
}

async fn consultations(State(stub): Stub, Json(body): Json<Value>) -> Json<Value> {
    let mut recorded = stub.consultations.lock().unwrap();
    recorded.push(body);
    Json(json!({ "success": true, "consultation_id": recorded.len() }))
}

/// Serves the stub on an ephemeral port and returns a client config pointing at it.
pub async fn spawn_stub() -> (Arc<DiagnosisStub>, DiagnosisClientConfig) {
    let stub = Arc::new(DiagnosisStub::default());
    let api = Router::new()
        .route("/symptoms", get(symptoms))
        .route("/symptoms/suggest", get(suggest))
        .route("/diagnose", post(diagnose))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/profile", get(profile))
        .route("/consultations", post(consultations))
        .with_state(Arc::clone(&stub));
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    let config = DiagnosisClientConfig {
        base_url: format!("http://{addr}/api"),
        ..DiagnosisClientConfig::default()
    };
    (stub, config)
}

/// A config for an address nothing listens on.
pub async fn unreachable_config() -> DiagnosisClientConfig {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    DiagnosisClientConfig {
        base_url: format!("http://{addr}/api"),
        ..DiagnosisClientConfig::default()
    }
}
