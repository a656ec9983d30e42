//! # Wizard Controller
//!
//! One [`WizardController`] per operator session. It owns the mutable
//! [`WizardState`], feeds events through the shared [`MachineRegistry`] and
//! applies the resulting actions.
//!
//! ## Actions
//!
//! Bookkeeping actions (completion, dismissal, pause/resume, visibility)
//! are applied to the state immediately. Render and route actions are
//! intents: the controller records what they ask for and queues them for
//! the render tree and router, which drain the queue with
//! [`WizardController::take_intents`]. Nothing here mounts a component or
//! navigates.
//!
//! ## Flow History
//!
//! The states visited in the active feature flow, used for guards and
//! progress:
//! - `RESET` restarts the history at the reset target
//! - re-entering a recorded state truncates the history back to it
//! - terminal states are never recorded
//! - anything else is appended

use crate::machine::{TransitionContext, TransitionResult};
use crate::primitives;
use crate::{
    Action, ComponentName, Event, Feature, FlowParams, Level, MachineRegistry, StateId,
    WizardError,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Prefix of tutorial states during which feature flows may advance.
const ACTIVE_PREFIX: &str = "active.";

/// Tutorial state waiting for a feature selection.
const SELECT_STATE: StateId = StateId::from_static("active.select");

// =============================================================================
// WIZARD STATE
// =============================================================================

/// A named route plus positional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub route: String,
    pub params: Vec<String>,
}

impl RouteTarget {
    fn to_action(&self) -> Action {
        Action::RouteTransition {
            route: Cow::Owned(self.route.clone()),
            params: self.params.iter().cloned().map(Cow::Owned).collect(),
        }
    }
}

/// Everything the wizard remembers for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardState {
    /// Current state of the tutorial machine.
    pub tutorial_state: StateId,
    /// Active feature flow.
    pub current_machine: Option<Feature>,
    /// State within the active flow; `None` exactly when no flow is active.
    pub current_state: Option<StateId>,
    /// States visited in the active flow.
    pub feature_machine_history: Vec<StateId>,
    /// Features whose flow has reached completion.
    pub completed_features: BTreeSet<Feature>,
    /// The selected plan, deduplicated, in selection order.
    pub feature_list: Vec<Feature>,
    /// Last flow params supplied with a feature event.
    pub params: FlowParams,
    /// Component currently mounted in each region.
    pub regions: BTreeMap<Level, ComponentName>,
    /// Whether the wizard shows before login.
    pub show_when_unauthenticated: bool,
    /// Last route requested or observed.
    pub current_route: Option<RouteTarget>,
    /// Route to return to when a paused tour resumes.
    pub resume_route: Option<RouteTarget>,
}

impl WizardState {
    /// Fresh state: tutorial at its initial state, nothing selected.
    #[must_use]
    pub fn new(registry: &MachineRegistry) -> Self {
        Self {
            tutorial_state: registry.tutorial().initial().clone(),
            current_machine: None,
            current_state: None,
            feature_machine_history: Vec::new(),
            completed_features: BTreeSet::new(),
            feature_list: Vec::new(),
            params: FlowParams::default(),
            regions: BTreeMap::new(),
            show_when_unauthenticated: false,
            current_route: None,
            resume_route: None,
        }
    }

    /// Check that the state could have been produced by `registry`.
    pub fn validate(&self, registry: &MachineRegistry) -> Result<(), WizardError> {
        let invalid = |reason: String| Err(WizardError::InvalidSnapshot(reason));

        if !registry.tutorial().contains(&self.tutorial_state) {
            return invalid(format!("unknown tutorial state '{}'", self.tutorial_state));
        }

        let mut seen = BTreeSet::new();
        if let Some(dup) = self.feature_list.iter().find(|f| !seen.insert(**f)) {
            return invalid(format!("feature '{}' listed twice", dup));
        }

        match (self.current_machine, &self.current_state) {
            (None, None) => {
                if !self.feature_machine_history.is_empty() {
                    return invalid("history recorded without an active flow".to_string());
                }
            }
            (Some(feature), Some(state)) => {
                let machine = registry.feature(feature);
                if !machine.contains(state) {
                    return invalid(format!("'{}' is not a state of {}", state, feature));
                }
                if !self.feature_list.contains(&feature) {
                    return invalid(format!("active feature '{}' is not in the plan", feature));
                }
                let history = &self.feature_machine_history;
                if let Some(bad) = history
                    .iter()
                    .find(|s| !machine.contains(s) || machine.is_terminal(s))
                {
                    return invalid(format!("history entry '{}' is not recordable", bad));
                }
                if !machine.is_terminal(state) && history.last() != Some(state) {
                    return invalid(format!(
                        "history does not end at the current state '{}'",
                        state
                    ));
                }
                // completed_features may name features outside the plan:
                // a new selection keeps earlier completions.
                let total = primitives::total_steps(feature, history);
                if history.len() > total {
                    return invalid(format!(
                        "history of {} entries exceeds {} steps of {}",
                        history.len(),
                        total,
                        feature
                    ));
                }
            }
            _ => return invalid("flow and flow state must be set together".to_string()),
        }

        Ok(())
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Per-session wizard context.
#[derive(Debug, Clone)]
pub struct WizardController {
    registry: Arc<MachineRegistry>,
    state: WizardState,
    intents: Vec<Action>,
}

impl WizardController {
    /// New session with the tutorial at its initial state.
    ///
    /// The initial state's entry actions run immediately, so the idle
    /// screen's renders and route are the first pending intents.
    #[must_use]
    pub fn new(registry: Arc<MachineRegistry>) -> Self {
        let state = WizardState::new(&registry);
        let mut wizard = Self {
            registry,
            state,
            intents: Vec::new(),
        };
        wizard.enter_tutorial();
        wizard
    }

    /// Resume a session from a previously captured state.
    ///
    /// The state is checked against `registry` first, so a snapshot taken
    /// with a different machine table is rejected instead of corrupting
    /// the session.
    pub fn restore(registry: Arc<MachineRegistry>, state: WizardState) -> Result<Self, WizardError> {
        state.validate(&registry)?;
        Ok(Self {
            registry,
            state,
            intents: Vec::new(),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &MachineRegistry {
        &self.registry
    }

    /// Read-only view of the session state.
    #[must_use]
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    #[must_use]
    pub fn tutorial_state(&self) -> &StateId {
        &self.state.tutorial_state
    }

    #[must_use]
    pub fn current_machine(&self) -> Option<Feature> {
        self.state.current_machine
    }

    #[must_use]
    pub fn current_state(&self) -> Option<&StateId> {
        self.state.current_state.as_ref()
    }

    #[must_use]
    pub fn get_completed_features(&self) -> &BTreeSet<Feature> {
        &self.state.completed_features
    }

    /// Intents queued since the last drain.
    #[must_use]
    pub fn pending_intents(&self) -> &[Action] {
        &self.intents
    }

    /// Hand queued intents to the caller, oldest first.
    pub fn take_intents(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.intents)
    }

    // -------------------------------------------------------------------------
    // Tutorial
    // -------------------------------------------------------------------------

    /// Dispatch `event` to the tutorial machine from `current`.
    ///
    /// A `current` that is not the session's tutorial state is stale and
    /// the call is a no-op, as is any event the state does not handle.
    pub fn transition_tutorial_machine(&mut self, current: &StateId, event: &Event) -> TransitionResult {
        if *current != self.state.tutorial_state {
            tracing::debug!(expected = %self.state.tutorial_state, got = %current, "stale tutorial state");
            return TransitionResult::unhandled(current.clone());
        }

        let registry = Arc::clone(&self.registry);
        let result = registry
            .tutorial()
            .transition(current, event, &TransitionContext::default());
        if !result.handled {
            return result;
        }

        self.state.tutorial_state = result.value.clone();
        self.apply(&result.actions);
        result
    }

    /// Dispatch `event` to the tutorial machine from its current state.
    pub fn send_tutorial(&mut self, event: &Event) -> TransitionResult {
        let current = self.state.tutorial_state.clone();
        self.transition_tutorial_machine(&current, event)
    }

    // -------------------------------------------------------------------------
    // Feature flows
    // -------------------------------------------------------------------------

    /// Store the selected plan and start its first flow.
    ///
    /// Duplicates are dropped, keeping the first occurrence. An empty
    /// selection clears all feature data. If the tutorial is waiting on the
    /// selection screen it moves on to the feature.
    pub fn save_features(&mut self, features: &[Feature]) {
        let mut seen = BTreeSet::new();
        let plan: Vec<Feature> = features.iter().copied().filter(|f| seen.insert(*f)).collect();

        let Some(first) = plan.first().copied() else {
            self.clear_feature_data();
            return;
        };

        tracing::info!(features = ?plan, "feature plan saved");
        self.state.feature_list = plan;
        self.start_feature(first);

        if self.state.tutorial_state == SELECT_STATE {
            self.send_tutorial(&Event::CONTINUE);
        }
    }

    /// Dispatch `event` to the active feature flow from `current`.
    ///
    /// No-op when no flow is active, when the tutorial is not in an
    /// `active.*` state, when `current` is not the flow's current state, or
    /// when the state does not handle `event`. `params`, when given,
    /// replaces the stored flow params before guards are evaluated.
    pub fn transition_feature_machine(
        &mut self,
        current: &StateId,
        event: &Event,
        params: Option<FlowParams>,
    ) -> TransitionResult {
        let Some(feature) = self.state.current_machine else {
            return TransitionResult::unhandled(current.clone());
        };
        if !self.state.tutorial_state.as_str().starts_with(ACTIVE_PREFIX) {
            tracing::debug!(tutorial = %self.state.tutorial_state, "feature event while tutorial inactive");
            return TransitionResult::unhandled(current.clone());
        }
        if self.state.current_state.as_ref() != Some(current) {
            return TransitionResult::unhandled(current.clone());
        }

        let registry = Arc::clone(&self.registry);
        let machine = registry.feature(feature);
        let ctx_params = params.as_ref().unwrap_or(&self.state.params);
        let result = machine.transition(
            current,
            event,
            &TransitionContext::new(Some(ctx_params), &self.state.feature_machine_history),
        );
        if !result.handled {
            return result;
        }

        if let Some(params) = params {
            self.state.params = params;
        }
        self.record(event, &result.value, machine.is_terminal(&result.value));
        self.state.current_state = Some(result.value.clone());
        self.apply(&result.actions);
        result
    }

    /// Dispatch `event` to the active feature flow from its current state.
    ///
    /// With no active flow the result is unhandled and carries the
    /// tutorial state.
    pub fn send_feature(&mut self, event: &Event, params: Option<FlowParams>) -> TransitionResult {
        match self.state.current_state.clone() {
            Some(current) => self.transition_feature_machine(&current, event, params),
            None => TransitionResult::unhandled(self.state.tutorial_state.clone()),
        }
    }

    /// State the active flow would move to on `CONTINUE` (or, failing
    /// that, `REPEAT`). Does not change anything.
    #[must_use]
    pub fn next_step(&self) -> Option<StateId> {
        let feature = self.state.current_machine?;
        let current = self.state.current_state.as_ref()?;
        let machine = self.registry.feature(feature);
        let ctx = TransitionContext::new(Some(&self.state.params), &self.state.feature_machine_history);

        [Event::CONTINUE, Event::REPEAT]
            .iter()
            .map(|event| machine.transition(current, event, &ctx))
            .find(|result| result.handled)
            .map(|result| result.value)
    }

    /// Feature after the active one in the plan; `None` when the active
    /// one is last or nothing is active.
    #[must_use]
    pub fn next_feature(&self) -> Option<Feature> {
        let current = self.state.current_machine?;
        let list = &self.state.feature_list;
        let position = list.iter().position(|f| *f == current)?;
        list.get(position + 1).copied()
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    /// Start the tour over for an authenticated operator.
    pub fn restart_guide(&mut self) -> TransitionResult {
        tracing::info!("restarting guide");
        self.state = WizardState::new(&self.registry);
        self.intents.clear();
        self.send_tutorial(&Event::AUTH)
    }

    /// Close the tour for good.
    pub fn dismiss(&mut self) -> TransitionResult {
        self.send_tutorial(&Event::DISMISS)
    }

    /// Forget everything (operator logged out) and show the idle screen.
    pub fn reset(&mut self) {
        self.state = WizardState::new(&self.registry);
        self.intents.clear();
        self.enter_tutorial();
    }

    /// Record navigation the router performed on its own.
    pub fn observe_route(&mut self, route: impl Into<String>, params: Vec<String>) {
        self.state.current_route = Some(RouteTarget {
            route: route.into(),
            params,
        });
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn record(&mut self, event: &Event, target: &StateId, terminal: bool) {
        let history = &mut self.state.feature_machine_history;
        if terminal {
            return;
        }
        if *event == Event::RESET {
            history.clear();
            history.push(target.clone());
            return;
        }
        match history.iter().position(|s| s == target) {
            Some(pos) => history.truncate(pos + 1),
            None => history.push(target.clone()),
        }
    }

    fn enter_tutorial(&mut self) {
        let registry = Arc::clone(&self.registry);
        let tutorial = registry.tutorial();
        if let Some(node) = tutorial.state(tutorial.initial()) {
            self.apply(node.entry_actions());
        }
    }

    fn start_feature(&mut self, feature: Feature) {
        let registry = Arc::clone(&self.registry);
        let machine = registry.feature(feature);
        let initial = machine.initial().clone();

        tracing::debug!(feature = %feature, state = %initial, "starting feature flow");
        self.state.current_machine = Some(feature);
        self.state.current_state = Some(initial.clone());
        self.state.params = FlowParams::default();
        self.state.feature_machine_history = vec![initial.clone()];

        if let Some(node) = machine.state(&initial) {
            self.apply(node.entry_actions());
        }
    }

    fn complete_feature(&mut self) {
        let Some(feature) = self.state.current_machine else {
            return;
        };
        if self.state.completed_features.insert(feature) {
            tracing::info!(feature = %feature, "feature completed");
        }

        match self.next_feature() {
            Some(next) => self.start_feature(next),
            None => {
                self.state.current_machine = None;
                self.state.current_state = None;
                self.state.feature_machine_history.clear();
                self.send_tutorial(&Event::DONE);
            }
        }
    }

    fn clear_feature_data(&mut self) {
        self.state.feature_list.clear();
        self.state.current_machine = None;
        self.state.current_state = None;
        self.state.feature_machine_history.clear();
        self.state.params = FlowParams::default();
    }

    fn apply(&mut self, actions: &[Action]) {
        for action in actions {
            match action {
                Action::Render { level, component } => {
                    match component {
                        Some(component) => {
                            self.state.regions.insert(*level, component.clone());
                        }
                        None => {
                            self.state.regions.remove(level);
                        }
                    }
                    self.intents.push(action.clone());
                }
                Action::RouteTransition { route, params } => {
                    self.state.current_route = Some(RouteTarget {
                        route: route.to_string(),
                        params: params.iter().map(|p| p.to_string()).collect(),
                    });
                    self.intents.push(action.clone());
                }
                Action::CompleteFeature => self.complete_feature(),
                Action::HandleDismissed | Action::ClearFeatureData => self.clear_feature_data(),
                Action::HandlePaused => {
                    self.state.resume_route = self.state.current_route.clone();
                }
                Action::HandleResume => {
                    if let Some(target) = self.state.resume_route.take() {
                        self.intents.push(target.to_action());
                        self.state.current_route = Some(target);
                    }
                }
                Action::ShowTutorialAlways => self.state.show_when_unauthenticated = true,
                Action::ShowTutorialWhenAuthenticated => {
                    self.state.show_when_unauthenticated = false;
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
