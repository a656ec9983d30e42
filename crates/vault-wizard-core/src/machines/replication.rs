//! Replication flow: enable replication, then review the cluster details.

use crate::machine::{MachineDefinition, StateNode};
use crate::{Action, Event, Level, WizardError};

pub fn definition() -> Result<MachineDefinition, WizardError> {
    MachineDefinition::builder("replication", "setup")
        .global(Event::RESET, "setup")
        .global(Event::DONE, "complete")
        .state(
            "setup",
            StateNode::new()
                .entry(Action::route("vault.cluster.replication"))
                .entry(Action::render(Level::Feature, "replication-setup"))
                .on(Event::ENABLEREPLICATION, "details"),
        )
        .state(
            "details",
            StateNode::new()
                .entry(Action::render(Level::Feature, "replication-details"))
                .on(Event::CONTINUE, "complete"),
        )
        .state("complete", StateNode::new().entry(Action::CompleteFeature))
        .build()
}
