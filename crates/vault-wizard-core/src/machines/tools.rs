//! Tools flow: wrap a token, look it up, rewrap it, unwrap it.

use crate::machine::{MachineDefinition, StateNode};
use crate::{Action, Event, Level, WizardError};

fn tool(name: &'static str, component: &'static str) -> StateNode {
    StateNode::new()
        .entry(Action::route_with("vault.cluster.tools.tool", &[name]))
        .entry(Action::render(Level::Feature, component))
}

pub fn definition() -> Result<MachineDefinition, WizardError> {
    MachineDefinition::builder("tools", "wrap")
        .global(Event::RESET, "wrap")
        .global(Event::DONE, "complete")
        .state(
            "wrap",
            StateNode::new()
                .entry(Action::route("vault.cluster.tools"))
                .entry(Action::render(Level::Feature, "tools-wrap"))
                .on(Event::CONTINUE, "wrapped"),
        )
        .state(
            "wrapped",
            StateNode::new()
                .entry(Action::render(Level::Feature, "tools-wrapped"))
                .on(Event::LOOKUP, "lookup"),
        )
        .state(
            "lookup",
            tool("lookup", "tools-lookup").on(Event::CONTINUE, "info"),
        )
        .state(
            "info",
            StateNode::new()
                .entry(Action::render(Level::Feature, "tools-info"))
                .on(Event::REWRAP, "rewrap"),
        )
        .state(
            "rewrap",
            tool("rewrap", "tools-rewrap").on(Event::CONTINUE, "rewrapped"),
        )
        .state(
            "rewrapped",
            StateNode::new()
                .entry(Action::render(Level::Feature, "tools-rewrapped"))
                .on(Event::UNWRAP, "unwrap"),
        )
        .state(
            "unwrap",
            tool("unwrap", "tools-unwrap").on(Event::CONTINUE, "unwrapped"),
        )
        .state(
            "unwrapped",
            StateNode::new()
                .entry(Action::render(Level::Feature, "tools-unwrapped"))
                .on(Event::CONTINUE, "complete"),
        )
        .state("complete", StateNode::new().entry(Action::CompleteFeature))
        .build()
}
