//! Secrets flow: enable an engine, then walk the branch for its kind.
//!
//! The branch is chosen from the mount type in the flow params. `REPEAT`
//! from `display` returns to the head of whichever branch was walked, which
//! keeps the history inside that branch's step budget.

use crate::machine::{Guard, MachineDefinition, StateNode};
use crate::{Action, Event, Level, StateId, WizardError};

/// Engines with a role/credentials walkthrough.
pub const ROLE_ENGINES: &[&str] = &["pki", "aws", "ssh"];

/// Engines with a write-a-secret walkthrough.
pub const SECRET_ENGINES: &[&str] = &["kv"];

/// Engines with an encryption-key walkthrough.
pub const ENCRYPTION_ENGINES: &[&str] = &["transit"];

/// Every engine with a guided branch.
pub const SUPPORTED_ENGINES: &[&str] = &["pki", "aws", "ssh", "kv", "transit"];

fn screen(step: &'static str) -> StateNode {
    StateNode::new()
        .entry(Action::render(Level::Feature, "mounts-wizard"))
        .entry(Action::render(Level::Step, step))
}

pub fn definition() -> Result<MachineDefinition, WizardError> {
    MachineDefinition::builder("secrets", "idle")
        .global(Event::RESET, "idle")
        .global(Event::DONE, "complete")
        .state(
            "idle",
            StateNode::new()
                .entry(Action::route("vault.cluster.settings.mount-secret-backend"))
                .entry(Action::render(Level::Feature, "mounts-wizard"))
                .entry(Action::render(Level::Step, "secrets-idle"))
                .on(Event::CONTINUE, "enable"),
        )
        .state(
            "enable",
            screen("secrets-enable")
                .on_when(Event::CONTINUE, "details", Guard::MountTypeIn(SUPPORTED_ENGINES))
                .on_when(Event::CONTINUE, "list", Guard::MountTypeNotIn(SUPPORTED_ENGINES)),
        )
        .state(
            "details",
            screen("secrets-details")
                .on_when(Event::CONTINUE, "role", Guard::MountTypeIn(ROLE_ENGINES))
                .on_when(Event::CONTINUE, "secret", Guard::MountTypeIn(SECRET_ENGINES))
                .on_when(Event::CONTINUE, "encryption", Guard::MountTypeIn(ENCRYPTION_ENGINES)),
        )
        .state("role", screen("secrets-role").on(Event::CONTINUE, "displayRole"))
        .state(
            "displayRole",
            screen("secrets-display-role").on(Event::CONTINUE, "credentials"),
        )
        .state(
            "credentials",
            screen("secrets-credentials").on(Event::CONTINUE, "display"),
        )
        .state("secret", screen("secrets-secret").on(Event::CONTINUE, "display"))
        .state(
            "encryption",
            screen("secrets-encryption").on(Event::CONTINUE, "display"),
        )
        .state("list", screen("secrets-list").on(Event::CONTINUE, "display"))
        .state(
            "display",
            screen("secrets-display")
                .on_when(Event::REPEAT, "role", Guard::Visited(StateId::from_static("role")))
                .on_when(Event::REPEAT, "secret", Guard::Visited(StateId::from_static("secret")))
                .on_when(
                    Event::REPEAT,
                    "encryption",
                    Guard::Visited(StateId::from_static("encryption")),
                )
                .on(Event::RESET, "idle")
                .on(Event::DONE, "complete"),
        )
        .state("complete", StateNode::new().entry(Action::CompleteFeature))
        .build()
}
