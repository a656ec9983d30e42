//! Authentication flow: enable an auth method, configure it, review it.

use crate::machine::{MachineDefinition, StateNode};
use crate::{Action, Event, Level, WizardError};

pub fn definition() -> Result<MachineDefinition, WizardError> {
    MachineDefinition::builder("authentication", "idle")
        .global(Event::RESET, "idle")
        .global(Event::DONE, "complete")
        .state(
            "idle",
            StateNode::new()
                .entry(Action::route("vault.cluster.settings.auth.enable"))
                .entry(Action::render(Level::Feature, "mounts-wizard"))
                .entry(Action::render(Level::Step, "auth-idle"))
                .on(Event::CONTINUE, "enable"),
        )
        .state(
            "enable",
            StateNode::new()
                .entry(Action::render(Level::Feature, "mounts-wizard"))
                .entry(Action::render(Level::Step, "auth-enable"))
                .on(Event::CONTINUE, "config"),
        )
        .state(
            "config",
            StateNode::new()
                .entry(Action::render(Level::Feature, "mounts-wizard"))
                .entry(Action::render(Level::Step, "auth-config"))
                .on(Event::CONTINUE, "details"),
        )
        .state(
            "details",
            StateNode::new()
                .entry(Action::render(Level::Step, "auth-details"))
                .entry(Action::render(Level::Feature, "mounts-wizard"))
                .on(Event::CONTINUE, "complete")
                .on(Event::RESET, "idle"),
        )
        .state("complete", StateNode::new().entry(Action::CompleteFeature))
        .build()
}
