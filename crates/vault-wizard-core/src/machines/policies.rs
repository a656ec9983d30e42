//! Policies flow: tour of the ACL policy screens.

use crate::machine::{MachineDefinition, StateNode};
use crate::{Action, Event, Level, WizardError};

pub fn definition() -> Result<MachineDefinition, WizardError> {
    MachineDefinition::builder("policies", "idle")
        .global(Event::RESET, "idle")
        .global(Event::DONE, "complete")
        .state(
            "idle",
            StateNode::new()
                .entry(Action::route_with("vault.cluster.policies.index", &["acl"]))
                .entry(Action::render(Level::Feature, "policies-intro"))
                .on(Event::CONTINUE, "create"),
        )
        .state(
            "create",
            StateNode::new()
                .entry(Action::render(Level::Feature, "policies-create"))
                .on(Event::CONTINUE, "details"),
        )
        .state(
            "details",
            StateNode::new()
                .entry(Action::render(Level::Feature, "policies-details"))
                .on(Event::CONTINUE, "delete"),
        )
        .state(
            "delete",
            StateNode::new()
                .entry(Action::render(Level::Feature, "policies-delete"))
                .on(Event::CONTINUE, "others"),
        )
        .state(
            "others",
            StateNode::new()
                .entry(Action::render(Level::Feature, "policies-others"))
                .on(Event::CONTINUE, "complete"),
        )
        .state("complete", StateNode::new().entry(Action::CompleteFeature))
        .build()
}
