//! Tutorial machine: sequences the initialization tour, feature selection,
//! the active feature flows, pausing, dismissal and completion.
//!
//! Nested states are flattened into dotted names (`init.active.setup`), so
//! entry actions of a parent region are repeated on each child.

use crate::machine::{Guard, MachineDefinition, StateNode};
use crate::{Action, Event, Level, WizardError};

/// Key of the tutorial machine.
pub const TUTORIAL_KEY: &str = "tutorial";

/// Leaving the initialization tour switches the wizard to authenticated-only
/// display and drops any feature data collected before login.
fn leave_init() -> Vec<Action> {
    vec![
        Action::ShowTutorialWhenAuthenticated,
        Action::ClearFeatureData,
    ]
}

fn init_active(feature_component: &'static str) -> StateNode {
    StateNode::new()
        .entry(Action::ShowTutorialAlways)
        .entry(Action::render(Level::Tutorial, "tutorial-active"))
        .entry(Action::render(Level::Feature, feature_component))
        .on_with(Event::INITDONE, "active.select", Guard::Always, leave_init())
}

pub fn definition() -> Result<MachineDefinition, WizardError> {
    MachineDefinition::builder(TUTORIAL_KEY, "idle")
        .global(Event::DISMISS, "dismissed")
        .global(Event::DONE, "complete")
        .global(Event::PAUSE, "paused")
        .state(
            "idle",
            StateNode::new()
                .entry(Action::route("vault.cluster"))
                .entry(Action::render(Level::Feature, "features-selection"))
                .entry(Action::render(Level::Tutorial, "tutorial-idle"))
                .on(Event::INIT, "init.idle")
                .on(Event::AUTH, "active.select")
                .on(Event::CONTINUE, "active.select"),
        )
        .state(
            "init.idle",
            StateNode::new()
                .entry(Action::ShowTutorialAlways)
                .entry(Action::render(Level::Tutorial, "tutorial-idle"))
                .entry(Action::clear(Level::Feature))
                .on(Event::START, "init.active.setup")
                .on_with(Event::INITDONE, "active.select", Guard::Always, leave_init()),
        )
        .state(
            "init.active.setup",
            init_active("init-setup").on(Event::TOSAVE, "init.active.save"),
        )
        .state(
            "init.active.save",
            init_active("init-save-keys")
                .on(Event::TOUNSEAL, "init.active.unseal")
                .on(Event::TOLOGIN, "init.active.login"),
        )
        .state(
            "init.active.unseal",
            init_active("init-unseal").on(Event::TOLOGIN, "init.active.login"),
        )
        .state("init.active.login", init_active("init-login"))
        .state(
            "active.select",
            StateNode::new()
                .entry(Action::render(Level::Tutorial, "tutorial-active"))
                .entry(Action::render(Level::Feature, "features-selection"))
                .on(Event::CONTINUE, "active.feature"),
        )
        .state(
            "active.feature",
            StateNode::new().entry(Action::render(Level::Tutorial, "tutorial-active")),
        )
        .state(
            "paused",
            StateNode::new()
                .entry(Action::clear(Level::Feature))
                .entry(Action::clear(Level::Step))
                .entry(Action::clear(Level::Detail))
                .entry(Action::render(Level::Tutorial, "tutorial-paused"))
                .entry(Action::HandlePaused)
                .exit(Action::HandleResume)
                .on(Event::CONTINUE, "active.feature")
                .ignore(Event::PAUSE),
        )
        .state(
            "dismissed",
            StateNode::new()
                .entry(Action::clear(Level::Tutorial))
                .entry(Action::clear(Level::Feature))
                .entry(Action::clear(Level::Step))
                .entry(Action::clear(Level::Detail))
                .entry(Action::HandleDismissed)
                .on(Event::DISMISS, "dismissed")
                .absorbing(),
        )
        .state(
            "complete",
            StateNode::new()
                .entry(Action::clear(Level::Feature))
                .entry(Action::clear(Level::Step))
                .entry(Action::clear(Level::Detail))
                .entry(Action::render(Level::Tutorial, "tutorial-complete")),
        )
        .build()
}
