//! # Scenario Tier Tests (T0-T3)
//!
//! End-to-end walks through the built-in machines.
//!
//! ## Tiers
//! - T0: Machine Table Integrity
//! - T1: Single Transitions
//! - T2: Whole Flows
//! - T3: Tutorial Lifecycle

use std::collections::BTreeMap;
use std::sync::Arc;
use vault_wizard_core::{
    Action, Event, Feature, FlowParams, Level, MachineRegistry, StateId, TransitionContext,
    WizardController, WizardError,
};

fn id(name: &'static str) -> StateId {
    StateId::from_static(name)
}

fn registry() -> Arc<MachineRegistry> {
    Arc::new(MachineRegistry::builtin().expect("builtin machines validate"))
}

/// Controller with the tutorial active and `features` selected.
fn planned(features: &[Feature]) -> WizardController {
    let mut wizard = WizardController::new(registry());
    wizard.restart_guide();
    wizard.save_features(features);
    wizard.take_intents();
    wizard
}

// =============================================================================
// TIER T0: MACHINE TABLE INTEGRITY
// =============================================================================

mod t0_table_integrity {
    use super::*;

    /// T0.1: Every initial state exists and is not terminal.
    #[test]
    fn initial_states_are_live() {
        let registry = registry();
        for (feature, machine) in registry.features() {
            assert!(
                !machine.is_terminal(machine.initial()),
                "{} starts terminal",
                feature
            );
        }
    }

    /// T0.2: A registry without a flow for every feature is refused.
    #[test]
    fn registry_missing_feature_fails_at_construction() {
        let full = registry();
        let partial: BTreeMap<_, _> = full
            .features()
            .filter(|(f, _)| *f != Feature::Tools)
            .map(|(f, m)| (f, m.clone()))
            .collect();

        let result = MachineRegistry::new(full.tutorial().clone(), partial);
        assert!(matches!(result, Err(WizardError::MissingMachine(Feature::Tools))));
    }
}

// =============================================================================
// TIER T1: SINGLE TRANSITIONS
// =============================================================================

mod t1_single_transitions {
    use super::*;

    fn auth(from: &'static str, event: Event) -> (StateId, Vec<Action>) {
        let registry = registry();
        let result = registry.feature(Feature::Authentication).transition(
            &id(from),
            &event,
            &TransitionContext::default(),
        );
        (result.value, result.actions)
    }

    /// T1.1: auth idle --CONTINUE--> enable.
    #[test]
    fn auth_idle_continue() {
        assert_eq!(
            auth("idle", Event::CONTINUE),
            (
                id("enable"),
                vec![
                    Action::render(Level::Feature, "mounts-wizard"),
                    Action::render(Level::Step, "auth-enable"),
                ]
            )
        );
    }

    /// T1.2: auth details --RESET--> idle, routing back to the enable page.
    #[test]
    fn auth_details_reset() {
        assert_eq!(
            auth("details", Event::RESET),
            (
                id("idle"),
                vec![
                    Action::route("vault.cluster.settings.auth.enable"),
                    Action::render(Level::Feature, "mounts-wizard"),
                    Action::render(Level::Step, "auth-idle"),
                ]
            )
        );
    }

    /// T1.3: auth details --CONTINUE--> complete.
    #[test]
    fn auth_details_continue() {
        assert_eq!(
            auth("details", Event::CONTINUE),
            (id("complete"), vec![Action::CompleteFeature])
        );
    }

    /// T1.4: Undeclared events leave the state alone and emit nothing.
    #[test]
    fn undeclared_event_is_noop() {
        let (state, actions) = auth("config", Event::REWRAP);
        assert_eq!(state, id("config"));
        assert!(actions.is_empty());

        let mut wizard = planned(&[Feature::Authentication]);
        let before = wizard.state().clone();
        let result = wizard.send_feature(&Event::new("TELEPORT"), None);
        assert!(!result.handled);
        assert_eq!(wizard.state(), &before);
        assert!(wizard.pending_intents().is_empty());
    }
}

// =============================================================================
// TIER T2: WHOLE FLOWS
// =============================================================================

mod t2_whole_flows {
    use super::*;

    fn walk(wizard: &mut WizardController, steps: &[(Event, Option<&str>)]) {
        for (event, mount) in steps {
            let result = wizard.send_feature(event, mount.map(FlowParams::mount));
            assert!(result.handled, "{} was not handled", event);
        }
    }

    /// T2.1: Completing a feature that already completed counts it once.
    #[test]
    fn completion_is_counted_once() {
        let mut state = planned(&[Feature::Authentication]).state().clone();
        state.completed_features.insert(Feature::Authentication);
        let mut wizard = WizardController::restore(registry(), state).expect("valid state");

        for _ in 0..4 {
            wizard.send_feature(&Event::CONTINUE, None);
        }
        assert_eq!(
            wizard.get_completed_features().iter().collect::<Vec<_>>(),
            vec![&Feature::Authentication]
        );
        assert_eq!(wizard.tutorial_state(), &id("complete"));
    }

    /// T2.2: The kv branch of secrets, then REPEAT back to the secret screen.
    #[test]
    fn secrets_kv_branch_and_repeat() {
        let mut wizard = planned(&[Feature::Secrets]);
        walk(
            &mut wizard,
            &[
                (Event::CONTINUE, None),
                (Event::CONTINUE, Some("kv")),
                (Event::CONTINUE, None),
                (Event::CONTINUE, None),
            ],
        );
        assert_eq!(wizard.current_state(), Some(&id("display")));
        assert_eq!(
            wizard.state().feature_machine_history,
            vec![id("idle"), id("enable"), id("details"), id("secret"), id("display")]
        );

        walk(&mut wizard, &[(Event::REPEAT, None)]);
        assert_eq!(wizard.current_state(), Some(&id("secret")));
        assert_eq!(wizard.state().feature_machine_history.len(), 4);
    }

    /// T2.3: The role branch walks seven screens.
    #[test]
    fn secrets_role_branch() {
        let mut wizard = planned(&[Feature::Secrets]);
        walk(
            &mut wizard,
            &[
                (Event::CONTINUE, Some("pki")),
                (Event::CONTINUE, None),
                (Event::CONTINUE, None),
                (Event::CONTINUE, None),
                (Event::CONTINUE, None),
                (Event::CONTINUE, None),
            ],
        );
        assert_eq!(wizard.current_state(), Some(&id("display")));
        let progress =
            vault_wizard_core::current_feature_progress(wizard.state()).expect("active flow");
        assert_eq!((progress.step, progress.total_steps, progress.percentage), (7, 7, 100));
    }

    /// T2.4: Tools walks wrap to unwrap, then hands over to the tutorial.
    #[test]
    fn tools_flow_finishes_tutorial() {
        let mut wizard = planned(&[Feature::Tools]);
        walk(
            &mut wizard,
            &[
                (Event::CONTINUE, None),
                (Event::LOOKUP, None),
                (Event::CONTINUE, None),
                (Event::REWRAP, None),
                (Event::CONTINUE, None),
                (Event::UNWRAP, None),
                (Event::CONTINUE, None),
            ],
        );
        assert_eq!(wizard.state().feature_machine_history.len(), 8);

        walk(&mut wizard, &[(Event::CONTINUE, None)]);
        assert_eq!(wizard.current_machine(), None);
        assert_eq!(wizard.tutorial_state(), &id("complete"));
        assert!(wizard.get_completed_features().contains(&Feature::Tools));
    }

    /// T2.5: Plans run in order and the bar tracks them.
    #[test]
    fn multi_feature_plan() {
        let mut wizard = planned(&[Feature::Replication, Feature::Authentication]);
        walk(&mut wizard, &[(Event::ENABLEREPLICATION, None), (Event::CONTINUE, None)]);
        assert_eq!(wizard.current_machine(), Some(Feature::Authentication));

        let intents = wizard.take_intents();
        assert!(intents.contains(&Action::route("vault.cluster.settings.auth.enable")));

        let bar = vault_wizard_core::progress_bar(wizard.state());
        assert_eq!(bar.len(), 2);
        assert_eq!(bar[0].percentage, 100);
        assert_eq!(bar[1].percentage, 25);
    }
}

// =============================================================================
// TIER T3: TUTORIAL LIFECYCLE
// =============================================================================

mod t3_tutorial_lifecycle {
    use super::*;

    /// T3.1: DISMISS reaches `dismissed` from every tutorial state, and
    /// nothing leaves it.
    #[test]
    fn dismiss_from_anywhere_is_final() {
        let registry = registry();
        let tutorial = registry.tutorial();
        let ctx = TransitionContext::default();

        for (state, _) in tutorial.states() {
            let result = tutorial.transition(state, &Event::DISMISS, &ctx);
            assert_eq!(result.value, id("dismissed"), "from {}", state);

            for event in [Event::CONTINUE, Event::PAUSE, Event::DONE, Event::INIT, Event::AUTH] {
                let after = tutorial.transition(&result.value, &event, &ctx);
                assert!(!after.handled);
                assert_eq!(after.value, id("dismissed"));
            }
        }
    }

    /// T3.2: The initialization tour, then a feature, then done.
    #[test]
    fn init_tour_into_features() {
        let mut wizard = WizardController::new(registry());
        for event in [Event::INIT, Event::START, Event::TOSAVE, Event::TOUNSEAL, Event::TOLOGIN] {
            assert!(wizard.send_tutorial(&event).handled, "{}", event);
        }
        assert_eq!(wizard.tutorial_state(), &id("init.active.login"));
        let progress = vault_wizard_core::tutorial_progress(wizard.state()).expect("init tour");
        assert_eq!(progress.text, "Step 4 of 4");

        wizard.send_tutorial(&Event::INITDONE);
        wizard.save_features(&[Feature::Replication]);
        assert_eq!(wizard.tutorial_state(), &id("active.feature"));
        wizard.send_feature(&Event::DONE, None);
        assert_eq!(wizard.tutorial_state(), &id("complete"));
    }

    /// T3.3: Pausing freezes the flow until CONTINUE.
    #[test]
    fn paused_tour_ignores_feature_events() {
        let mut wizard = planned(&[Feature::Policies]);
        wizard.send_tutorial(&Event::PAUSE);

        assert!(!wizard.send_feature(&Event::CONTINUE, None).handled);
        wizard.send_tutorial(&Event::CONTINUE);
        assert!(wizard.send_feature(&Event::CONTINUE, None).handled);
        assert_eq!(wizard.current_state(), Some(&id("create")));
    }

    /// T3.4: Sessions are independent.
    #[test]
    fn controllers_do_not_share_state() {
        let registry = registry();
        let mut a = WizardController::new(Arc::clone(&registry));
        let b = WizardController::new(registry);
        a.restart_guide();
        assert_ne!(a.tutorial_state(), b.tutorial_state());
    }
}
