//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use vault_wizard_core::{
    Action, Event, Feature, FeatureProgress, FlowParams, MachineDefinition, ProgressSegment,
    StateId, TransitionResult, TutorialProgress, WizardController, WizardError,
    primitives::{MAX_MOUNT_TYPE_LENGTH, MAX_NAME_LENGTH, MAX_ROUTE_LENGTH},
};

/// Session identifier handed out by `POST /sessions`.
pub type SessionId = u64;

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Handler failure, mapped to a status code.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(SessionId),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::NotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("No wizard session {}", id),
            ),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
        };
        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// MACHINES RESPONSE
// =============================================================================

/// Shape of one machine, for clients building their own UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSummary {
    pub key: String,
    pub initial: String,
    pub states: Vec<String>,
    pub global_events: Vec<String>,
}

impl From<&MachineDefinition> for MachineSummary {
    fn from(machine: &MachineDefinition) -> Self {
        Self {
            key: machine.key().to_string(),
            initial: machine.initial().to_string(),
            states: machine.states().map(|(id, _)| id.to_string()).collect(),
            global_events: machine.global_events().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachinesResponse {
    pub tutorial: MachineSummary,
    pub features: Vec<MachineSummary>,
}

// =============================================================================
// SESSION REQUEST/RESPONSE
// =============================================================================

/// `POST /sessions` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Start the tour for a logged-in operator (`idle --AUTH-->`). When
    /// false the session stays at `idle`, ready for the initialization tour.
    #[serde(default = "default_true")]
    pub authenticated: bool,

    /// Plan to start with; the configured default when omitted.
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

/// Snapshot of a session plus the intents produced by the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: SessionId,
    pub tutorial_state: String,
    pub current_machine: Option<Feature>,
    pub current_state: Option<String>,
    pub history: Vec<String>,
    pub feature_list: Vec<Feature>,
    pub completed_features: Vec<Feature>,
    pub show_when_unauthenticated: bool,
    pub next_step: Option<String>,
    pub next_feature: Option<Feature>,
    pub intents: Vec<Action>,
}

impl SessionResponse {
    /// Describe `wizard` and hand over `intents`.
    #[must_use]
    pub fn new(id: SessionId, wizard: &WizardController, intents: Vec<Action>) -> Self {
        let state = wizard.state();
        Self {
            id,
            tutorial_state: state.tutorial_state.to_string(),
            current_machine: state.current_machine,
            current_state: state.current_state.as_ref().map(StateId::to_string),
            history: state
                .feature_machine_history
                .iter()
                .map(StateId::to_string)
                .collect(),
            feature_list: state.feature_list.clone(),
            completed_features: state.completed_features.iter().copied().collect(),
            show_when_unauthenticated: state.show_when_unauthenticated,
            next_step: wizard.next_step().map(|s| s.to_string()),
            next_feature: wizard.next_feature(),
            intents,
        }
    }
}

// =============================================================================
// FEATURE SELECTION
// =============================================================================

/// `PUT /sessions/{id}/features` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesRequest {
    pub features: Vec<String>,
}

impl FeaturesRequest {
    pub fn to_features(&self) -> Result<Vec<Feature>, WizardError> {
        parse_features(&self.features)
    }
}

/// Parse wire feature names, rejecting unknown ones.
pub fn parse_features(names: &[String]) -> Result<Vec<Feature>, WizardError> {
    names.iter().map(|name| name.parse()).collect()
}

// =============================================================================
// EVENTS
// =============================================================================

/// `POST /sessions/{id}/tutorial` and `/feature` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    pub event: String,

    /// State the client believes it is in; the session's own state when
    /// omitted. A stale value makes the event a no-op.
    #[serde(default)]
    pub state: Option<String>,

    /// Mount type chosen on the secrets enable screen.
    #[serde(default)]
    pub mount_type: Option<String>,
}

impl EventRequest {
    /// Validate lengths and build the event.
    pub fn to_event(&self) -> Result<Event, WizardError> {
        validate_name("event", &self.event)?;
        Ok(Event::new(self.event.clone()))
    }

    pub fn to_state(&self) -> Result<Option<StateId>, WizardError> {
        match &self.state {
            Some(state) => {
                validate_name("state", state)?;
                Ok(Some(StateId::new(state.clone())))
            }
            None => Ok(None),
        }
    }

    pub fn to_params(&self) -> Result<Option<FlowParams>, WizardError> {
        match &self.mount_type {
            Some(mount) if mount.len() > MAX_MOUNT_TYPE_LENGTH => {
                Err(WizardError::DeserializationError(format!(
                    "mount_type length {} exceeds maximum {} bytes",
                    mount.len(),
                    MAX_MOUNT_TYPE_LENGTH
                )))
            }
            Some(mount) => Ok(Some(FlowParams::mount(mount.clone()))),
            None => Ok(None),
        }
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), WizardError> {
    if value.is_empty() {
        return Err(WizardError::DeserializationError(format!("{} is empty", field)));
    }
    if value.len() > MAX_NAME_LENGTH {
        return Err(WizardError::DeserializationError(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            value.len(),
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Result of dispatching one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionResponse {
    pub result: TransitionResult,
    pub session: SessionResponse,
}

// =============================================================================
// ROUTE OBSERVATION
// =============================================================================

/// `POST /sessions/{id}/route` body: the router navigated on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub route: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl RouteRequest {
    pub fn validate(&self) -> Result<(), WizardError> {
        let too_long = std::iter::once(&self.route)
            .chain(&self.params)
            .find(|s| s.len() > MAX_ROUTE_LENGTH);
        if self.route.is_empty() {
            return Err(WizardError::DeserializationError("route is empty".to_string()));
        }
        match too_long {
            Some(s) => Err(WizardError::DeserializationError(format!(
                "route segment of {} bytes exceeds maximum {} bytes",
                s.len(),
                MAX_ROUTE_LENGTH
            ))),
            None => Ok(()),
        }
    }
}

// =============================================================================
// PROGRESS RESPONSE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub feature: Option<FeatureProgress>,
    pub bar: Vec<ProgressSegment>,
    pub tutorial: Option<TutorialProgress>,
    pub plan_minutes: u32,
}
