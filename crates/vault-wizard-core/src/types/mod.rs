//! # Core Type Definitions
//!
//! This module contains all core types for the wizard engine:
//! - Machine identifiers (`StateId`, `Event`, `Feature`)
//! - Render plumbing (`Level`, `ComponentName`)
//! - Action intents (`Action`)
//! - Extended state supplied with events (`FlowParams`)
//! - Error types (`WizardError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types implement `Ord` so they can key `BTreeMap`/`BTreeSet`,
//! which keeps iteration order (and therefore every derived output) stable.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// STATE & EVENT IDENTIFIERS
// =============================================================================

/// Name of a state within one machine (e.g. `idle`, `init.active.setup`).
///
/// Built-in tables borrow `'static` strings; states decoded from a snapshot
/// or an API request own theirs. Equality and ordering are by content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(Cow<'static, str>);

impl StateId {
    /// Create a state id from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a state id from any string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the state name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for StateId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// A named event dispatched into a machine.
///
/// Events are plain strings: any name can be dispatched, and a name the
/// current state does not declare is a no-op rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Cow<'static, str>);

impl Event {
    pub const CONTINUE: Event = Event::from_static("CONTINUE");
    pub const RESET: Event = Event::from_static("RESET");
    pub const DONE: Event = Event::from_static("DONE");
    pub const DISMISS: Event = Event::from_static("DISMISS");
    pub const PAUSE: Event = Event::from_static("PAUSE");
    pub const INIT: Event = Event::from_static("INIT");
    pub const AUTH: Event = Event::from_static("AUTH");
    pub const START: Event = Event::from_static("START");
    pub const INITDONE: Event = Event::from_static("INITDONE");
    pub const TOSAVE: Event = Event::from_static("TOSAVE");
    pub const TOUNSEAL: Event = Event::from_static("TOUNSEAL");
    pub const TOLOGIN: Event = Event::from_static("TOLOGIN");
    pub const REPEAT: Event = Event::from_static("REPEAT");
    pub const ENABLEREPLICATION: Event = Event::from_static("ENABLEREPLICATION");
    pub const LOOKUP: Event = Event::from_static("LOOKUP");
    pub const REWRAP: Event = Event::from_static("REWRAP");
    pub const UNWRAP: Event = Event::from_static("UNWRAP");

    /// Create an event from a static string.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create an event from any string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the event name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// FEATURES
// =============================================================================

/// A product area with its own guided flow.
///
/// The set is closed: every variant must have a machine definition and a
/// step count, and both lookups are exhaustive matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Secrets,
    Authentication,
    Policies,
    Replication,
    Tools,
}

impl Feature {
    /// Every feature, in the order the selection screen lists them.
    pub const ALL: [Feature; 5] = [
        Feature::Secrets,
        Feature::Authentication,
        Feature::Policies,
        Feature::Replication,
        Feature::Tools,
    ];

    /// Wire name of the feature.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Secrets => "secrets",
            Feature::Authentication => "authentication",
            Feature::Policies => "policies",
            Feature::Replication => "replication",
            Feature::Tools => "tools",
        }
    }

    /// Human-readable title shown as the "next feature" label.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Feature::Secrets => "Secrets",
            Feature::Authentication => "Authentication",
            Feature::Policies => "Policies",
            Feature::Replication => "Replication",
            Feature::Tools => "Tools",
        }
    }

    /// Rough time, in minutes, the flow takes to walk through.
    #[must_use]
    pub fn estimated_minutes(&self) -> u32 {
        match self {
            Feature::Secrets => 7,
            Feature::Authentication => 5,
            Feature::Policies => 5,
            Feature::Replication => 5,
            Feature::Tools => 8,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secrets" => Ok(Feature::Secrets),
            "authentication" | "auth" => Ok(Feature::Authentication),
            "policies" => Ok(Feature::Policies),
            "replication" => Ok(Feature::Replication),
            "tools" => Ok(Feature::Tools),
            _ => Err(WizardError::UnknownFeature(s.to_string())),
        }
    }
}

// =============================================================================
// RENDER PLUMBING
// =============================================================================

/// UI region a render intent targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Tutorial,
    Feature,
    Step,
    Detail,
}

/// Name of a UI component to mount in a region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentName(Cow<'static, str>);

impl ComponentName {
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// An action attached to a transition or a state's entry/exit.
///
/// `Render` and `RouteTransition` are intents for external collaborators
/// (render tree, router). Every other variant is bookkeeping the controller
/// applies to its own state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    /// Mount `component` in the `level` region (`None` clears the region).
    Render {
        level: Level,
        component: Option<ComponentName>,
    },
    /// Ask the router to navigate.
    RouteTransition {
        route: Cow<'static, str>,
        #[serde(default)]
        params: Vec<Cow<'static, str>>,
    },
    /// The active feature flow has finished.
    CompleteFeature,
    /// The tutorial was dismissed; drop all feature data.
    HandleDismissed,
    /// Remember where the operator was so the tour can resume there.
    HandlePaused,
    /// Navigate back to the remembered location.
    HandleResume,
    /// Show the wizard even before login (initialization flow).
    ShowTutorialAlways,
    /// Show the wizard only to authenticated operators.
    ShowTutorialWhenAuthenticated,
    /// Drop feature list, feature state and history.
    ClearFeatureData,
}

impl Action {
    /// Render `component` at `level`.
    #[must_use]
    pub const fn render(level: Level, component: &'static str) -> Self {
        Action::Render {
            level,
            component: Some(ComponentName::from_static(component)),
        }
    }

    /// Clear the `level` region.
    #[must_use]
    pub const fn clear(level: Level) -> Self {
        Action::Render {
            level,
            component: None,
        }
    }

    /// Navigate to `route` without parameters.
    #[must_use]
    pub const fn route(route: &'static str) -> Self {
        Action::RouteTransition {
            route: Cow::Borrowed(route),
            params: Vec::new(),
        }
    }

    /// Navigate to `route` with positional parameters.
    #[must_use]
    pub fn route_with(route: &'static str, params: &[&'static str]) -> Self {
        Action::RouteTransition {
            route: Cow::Borrowed(route),
            params: params.iter().map(|p| Cow::Borrowed(*p)).collect(),
        }
    }

    /// Whether the action is meant for an external collaborator.
    #[must_use]
    pub fn is_intent(&self) -> bool {
        matches!(self, Action::Render { .. } | Action::RouteTransition { .. })
    }
}

// =============================================================================
// FLOW PARAMETERS
// =============================================================================

/// Extended state supplied alongside feature events.
///
/// Guards read it to pick between branches (e.g. which secrets engine was
/// selected). The controller keeps the last value supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowParams {
    /// Mount type chosen on the enable screen (`kv`, `pki`, `transit`, ...).
    #[serde(default)]
    pub mount_type: Option<String>,
}

impl FlowParams {
    /// Params carrying a mount type.
    #[must_use]
    pub fn mount(mount_type: impl Into<String>) -> Self {
        Self {
            mount_type: Some(mount_type.into()),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the wizard engine.
///
/// Undeclared events are NOT errors; they are no-op transitions. Errors are
/// reserved for configuration problems (caught when the registry is built)
/// and for decoding untrusted input.
#[derive(Debug, Error)]
pub enum WizardError {
    /// A feature name did not match any known feature.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// The registry has no machine for a feature.
    #[error("No machine definition for feature '{0}'")]
    MissingMachine(Feature),

    /// A machine definition is internally inconsistent.
    #[error("Invalid machine '{machine}': {reason}")]
    InvalidMachine { machine: String, reason: String },

    /// A snapshot does not describe a reachable wizard state.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Application configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_parses_wire_names_and_alias() {
        assert_eq!("secrets".parse::<Feature>().expect("parse"), Feature::Secrets);
        assert_eq!(
            "auth".parse::<Feature>().expect("parse"),
            Feature::Authentication
        );
        assert_eq!(" Tools ".parse::<Feature>().expect("parse"), Feature::Tools);
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let result = "kubernetes".parse::<Feature>();
        assert!(matches!(result, Err(WizardError::UnknownFeature(name)) if name == "kubernetes"));
    }

    #[test]
    fn static_and_owned_ids_compare_by_content() {
        assert_eq!(StateId::from_static("idle"), StateId::new("idle"));
        assert_eq!(Event::CONTINUE, Event::new("CONTINUE"));
        assert!(StateId::from_static("a") < StateId::new("b"));
    }

    #[test]
    fn action_serializes_with_type_tag() {
        let json = serde_json::to_string(&Action::render(Level::Step, "auth-enable"))
            .expect("serialize");
        assert!(json.contains("\"type\":\"render\""));
        assert!(json.contains("\"level\":\"step\""));
        assert!(json.contains("\"component\":\"auth-enable\""));

        let json = serde_json::to_string(&Action::CompleteFeature).expect("serialize");
        assert_eq!(json, "{\"type\":\"completeFeature\"}");

        let json = serde_json::to_string(&Action::route_with("vault.cluster.tools.tool", &["lookup"]))
            .expect("serialize");
        assert!(json.contains("\"type\":\"routeTransition\""));
        assert!(json.contains("\"params\":[\"lookup\"]"));
    }

    #[test]
    fn cleared_region_serializes_null_component() {
        let json = serde_json::to_string(&Action::clear(Level::Detail)).expect("serialize");
        assert!(json.contains("\"component\":null"));
    }

    #[test]
    fn only_render_and_route_are_intents() {
        assert!(Action::render(Level::Feature, "x").is_intent());
        assert!(Action::route("vault.cluster").is_intent());
        assert!(!Action::CompleteFeature.is_intent());
        assert!(!Action::HandleDismissed.is_intent());
    }
}
