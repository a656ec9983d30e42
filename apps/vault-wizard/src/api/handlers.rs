//! # API Endpoint Handlers
//!
//! Every session handler takes the write lock for exactly one synchronous
//! controller call, so events for a session apply in arrival order.

use super::{
    AppState,
    types::{
        ApiError, CreateSessionRequest, EventRequest, FeaturesRequest, HealthResponse,
        MachineSummary, MachinesResponse, ProgressResponse, RouteRequest, SessionId,
        SessionResponse, TransitionResponse, parse_features,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use vault_wizard_core::{
    WizardController, current_feature_progress, plan_minutes, progress_bar, tutorial_progress,
};

// =============================================================================
// HEALTH & MACHINES
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Describe the machine table.
pub async fn machines_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = &state.registry;
    Json(MachinesResponse {
        tutorial: MachineSummary::from(registry.tutorial()),
        features: registry
            .features()
            .map(|(_, machine)| MachineSummary::from(machine))
            .collect(),
    })
}

// =============================================================================
// SESSION LIFECYCLE
// =============================================================================

/// Open a wizard session.
pub async fn create_session_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let features = match &request.features {
        Some(names) => parse_features(names)?,
        None => state.default_features.as_ref().clone(),
    };

    let mut sessions = state.sessions.write().await;
    if sessions.len() >= state.max_sessions {
        tracing::warn!(
            event = "session_cap",
            limit = state.max_sessions,
            "Refusing new wizard session"
        );
        return Err(ApiError::Unavailable(format!(
            "Session limit of {} reached",
            state.max_sessions
        )));
    }

    let mut wizard = WizardController::new(Arc::clone(&state.registry));
    if request.authenticated {
        wizard.restart_guide();
        if !features.is_empty() {
            wizard.save_features(&features);
        }
    }

    let id: SessionId = state.next_id.fetch_add(1, Ordering::Relaxed);
    let intents = wizard.take_intents();
    let response = SessionResponse::new(id, &wizard, intents);
    sessions.insert(id, wizard);
    tracing::info!(session = id, "wizard session opened");

    Ok((StatusCode::CREATED, Json(response)))
}

/// Describe a session without draining its intents.
pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionResponse>, ApiError> {
    let sessions = state.sessions.read().await;
    let wizard = sessions.get(&id).ok_or(ApiError::NotFound(id))?;
    Ok(Json(SessionResponse::new(
        id,
        wizard,
        wizard.pending_intents().to_vec(),
    )))
}

/// Close a session.
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    let mut sessions = state.sessions.write().await;
    sessions.remove(&id).ok_or(ApiError::NotFound(id))?;
    tracing::info!(session = id, "wizard session closed");
    Ok(StatusCode::NO_CONTENT)
}

/// Start the tour over.
pub async fn restart_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<TransitionResponse>, ApiError> {
    with_session(&state, id, |wizard| wizard.restart_guide()).await
}

// =============================================================================
// FEATURES & EVENTS
// =============================================================================

/// Store the selected plan.
pub async fn save_features_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<FeaturesRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let features = request.to_features()?;

    let mut sessions = state.sessions.write().await;
    let wizard = sessions.get_mut(&id).ok_or(ApiError::NotFound(id))?;
    wizard.save_features(&features);
    let intents = wizard.take_intents();
    Ok(Json(SessionResponse::new(id, wizard, intents)))
}

/// Dispatch an event to the tutorial machine.
pub async fn tutorial_event_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<EventRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let event = request.to_event()?;
    let current = request.to_state()?;

    with_session(&state, id, |wizard| match current {
        Some(current) => wizard.transition_tutorial_machine(&current, &event),
        None => wizard.send_tutorial(&event),
    })
    .await
}

/// Dispatch an event to the active feature flow.
pub async fn feature_event_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<EventRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let event = request.to_event()?;
    let current = request.to_state()?;
    let params = request.to_params()?;

    with_session(&state, id, |wizard| match current {
        Some(current) => wizard.transition_feature_machine(&current, &event, params),
        None => wizard.send_feature(&event, params),
    })
    .await
}

/// Record navigation the router did on its own.
pub async fn route_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<RouteRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;

    let mut sessions = state.sessions.write().await;
    let wizard = sessions.get_mut(&id).ok_or(ApiError::NotFound(id))?;
    wizard.observe_route(request.route, request.params);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Progress figures for a session.
pub async fn progress_handler(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let sessions = state.sessions.read().await;
    let wizard = sessions.get(&id).ok_or(ApiError::NotFound(id))?;
    let wizard_state = wizard.state();

    Ok(Json(ProgressResponse {
        feature: current_feature_progress(wizard_state),
        bar: progress_bar(wizard_state),
        tutorial: tutorial_progress(wizard_state),
        plan_minutes: plan_minutes(wizard_state),
    }))
}

// =============================================================================
// HELPERS
// =============================================================================

/// Run one controller operation under the session's write lock.
async fn with_session<F>(
    state: &AppState,
    id: SessionId,
    op: F,
) -> Result<Json<TransitionResponse>, ApiError>
where
    F: FnOnce(&mut WizardController) -> vault_wizard_core::TransitionResult,
{
    let mut sessions = state.sessions.write().await;
    let wizard = sessions.get_mut(&id).ok_or(ApiError::NotFound(id))?;

    let result = op(wizard);
    tracing::debug!(
        session = id,
        state = %result.value,
        handled = result.handled,
        "event applied"
    );
    let intents = wizard.take_intents();
    Ok(Json(TransitionResponse {
        result,
        session: SessionResponse::new(id, wizard, intents),
    }))
}
