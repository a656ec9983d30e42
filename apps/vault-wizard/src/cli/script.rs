//! # Event Scripts
//!
//! A replay script is a JSON array of steps:
//!
//! ```json
//! [
//!   {"op": "restart"},
//!   {"op": "select", "features": ["secrets"]},
//!   {"op": "feature", "event": "CONTINUE"},
//!   {"op": "feature", "event": "CONTINUE", "mount_type": "kv"},
//!   {"op": "route", "route": "vault.cluster.secrets"},
//!   {"op": "tutorial", "event": "PAUSE"}
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use vault_wizard_core::{
    Event, Feature, FlowParams, TransitionResult, WizardController, WizardError,
    primitives::MAX_SCRIPT_STEPS,
};

/// Largest script file accepted.
pub const MAX_SCRIPT_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// One operator input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ScriptStep {
    /// Event for the tutorial machine.
    Tutorial { event: String },
    /// Event for the active feature flow.
    Feature {
        event: String,
        #[serde(default)]
        mount_type: Option<String>,
    },
    /// Save a feature plan.
    Select { features: Vec<Feature> },
    /// Router navigation.
    Route {
        route: String,
        #[serde(default)]
        params: Vec<String>,
    },
    /// Start the tour over.
    Restart,
    /// Logout.
    Reset,
}

impl ScriptStep {
    /// Apply the step. Steps that are not events report no transition.
    pub fn apply(&self, wizard: &mut WizardController) -> Option<TransitionResult> {
        match self {
            ScriptStep::Tutorial { event } => Some(wizard.send_tutorial(&Event::new(event.clone()))),
            ScriptStep::Feature { event, mount_type } => Some(wizard.send_feature(
                &Event::new(event.clone()),
                mount_type.clone().map(FlowParams::mount),
            )),
            ScriptStep::Select { features } => {
                wizard.save_features(features);
                None
            }
            ScriptStep::Route { route, params } => {
                wizard.observe_route(route.clone(), params.clone());
                None
            }
            ScriptStep::Restart => Some(wizard.restart_guide()),
            ScriptStep::Reset => {
                wizard.reset();
                None
            }
        }
    }
}

/// Parse a script document.
pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>, WizardError> {
    let steps: Vec<ScriptStep> = serde_json::from_str(text)
        .map_err(|e| WizardError::DeserializationError(format!("Invalid script: {}", e)))?;
    if steps.len() > MAX_SCRIPT_STEPS {
        return Err(WizardError::DeserializationError(format!(
            "Script has {} steps, maximum is {}",
            steps.len(),
            MAX_SCRIPT_STEPS
        )));
    }
    Ok(steps)
}

/// Read and parse a script file.
pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>, WizardError> {
    let bytes = super::commands::read_bounded(path, MAX_SCRIPT_FILE_SIZE)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| WizardError::DeserializationError(format!("Script is not UTF-8: {}", e)))?;
    parse_script(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vault_wizard_core::{MachineRegistry, StateId};

    #[test]
    fn parses_every_op() {
        let steps = parse_script(
            r#"[
                {"op": "restart"},
                {"op": "select", "features": ["policies"]},
                {"op": "feature", "event": "CONTINUE"},
                {"op": "feature", "event": "CONTINUE", "mount_type": "kv"},
                {"op": "route", "route": "vault.cluster"},
                {"op": "tutorial", "event": "PAUSE"},
                {"op": "reset"}
            ]"#,
        )
        .expect("parse");
        assert_eq!(steps.len(), 7);
        assert_eq!(
            steps[3],
            ScriptStep::Feature {
                event: "CONTINUE".to_string(),
                mount_type: Some("kv".to_string())
            }
        );
    }

    #[test]
    fn unknown_op_and_feature_rejected() {
        assert!(parse_script(r#"[{"op": "jump"}]"#).is_err());
        assert!(parse_script(r#"[{"op": "select", "features": ["database"]}]"#).is_err());
    }

    #[test]
    fn steps_drive_the_controller() {
        let registry = Arc::new(MachineRegistry::builtin().expect("builtin"));
        let mut wizard = WizardController::new(registry);
        let steps = parse_script(
            r#"[
                {"op": "restart"},
                {"op": "select", "features": ["policies"]},
                {"op": "feature", "event": "CONTINUE"}
            ]"#,
        )
        .expect("parse");

        let results: Vec<_> = steps.iter().map(|s| s.apply(&mut wizard)).collect();
        assert!(results[1].is_none());
        assert_eq!(wizard.current_state(), Some(&StateId::from_static("create")));
    }
}
