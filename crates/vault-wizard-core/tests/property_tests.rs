//! # Property-Based Tests
//!
//! Invariants of the wizard controller under arbitrary event sequences.

use proptest::collection::vec;
use proptest::prelude::*;
use std::sync::Arc;
use vault_wizard_core::{
    Event, Feature, FlowParams, MachineRegistry, WizardController, primitives, progress_bar,
    state_from_bytes, state_to_bytes,
};

const EVENTS: [Event; 17] = [
    Event::CONTINUE,
    Event::RESET,
    Event::DONE,
    Event::DISMISS,
    Event::PAUSE,
    Event::INIT,
    Event::AUTH,
    Event::START,
    Event::INITDONE,
    Event::TOSAVE,
    Event::TOUNSEAL,
    Event::TOLOGIN,
    Event::REPEAT,
    Event::ENABLEREPLICATION,
    Event::LOOKUP,
    Event::REWRAP,
    Event::UNWRAP,
];

const MOUNTS: [&str; 7] = ["kv", "pki", "aws", "ssh", "transit", "database", "totp"];

/// One operator input.
#[derive(Debug, Clone)]
enum Input {
    Tutorial(usize),
    Feature(usize, Option<usize>),
    Select(Vec<usize>),
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        1 => (0..EVENTS.len()).prop_map(Input::Tutorial),
        4 => (0..EVENTS.len(), proptest::option::of(0..MOUNTS.len()))
            .prop_map(|(e, m)| Input::Feature(e, m)),
        1 => vec(0..Feature::ALL.len(), 0..6).prop_map(Input::Select),
    ]
}

fn plan() -> impl Strategy<Value = Vec<Feature>> {
    vec(0..Feature::ALL.len(), 0..8).prop_map(|ix| ix.into_iter().map(|i| Feature::ALL[i]).collect())
}

fn registry() -> Arc<MachineRegistry> {
    Arc::new(MachineRegistry::builtin().expect("builtin machines validate"))
}

fn apply(wizard: &mut WizardController, input: &Input) {
    match input {
        Input::Tutorial(e) => {
            wizard.send_tutorial(&EVENTS[*e]);
        }
        Input::Feature(e, mount) => {
            let params = mount.map(|m| FlowParams::mount(MOUNTS[m]));
            wizard.send_feature(&EVENTS[*e], params);
        }
        Input::Select(ix) => {
            let features: Vec<Feature> = ix.iter().map(|i| Feature::ALL[*i]).collect();
            wizard.save_features(&features);
        }
    }
}

fn started(features: &[Feature]) -> WizardController {
    let mut wizard = WizardController::new(registry());
    wizard.restart_guide();
    wizard.save_features(features);
    wizard
}

proptest! {
    /// An event nobody declares changes nothing, wherever the session is.
    #[test]
    fn unknown_events_are_idempotent_noops(
        inputs in vec(input(), 0..40),
        name in "[a-z]{1,12}",
    ) {
        let mut wizard = started(&[Feature::Secrets]);
        for input in &inputs {
            apply(&mut wizard, input);
        }
        wizard.take_intents();
        let before = wizard.state().clone();
        let event = Event::new(name);

        for _ in 0..2 {
            let tutorial = wizard.send_tutorial(&event);
            let feature = wizard.send_feature(&event, None);
            prop_assert!(!tutorial.handled && !feature.handled);
            prop_assert!(tutorial.actions.is_empty() && feature.actions.is_empty());
        }
        prop_assert_eq!(wizard.state(), &before);
        prop_assert!(wizard.pending_intents().is_empty());
    }

    /// History never outgrows the active flow's step count, and the state
    /// stays restorable.
    #[test]
    fn history_stays_within_step_bound(
        features in plan(),
        inputs in vec(input(), 0..120),
    ) {
        let mut wizard = started(&features);
        for input in &inputs {
            apply(&mut wizard, input);
            let state = wizard.state();
            if let Some(feature) = state.current_machine {
                let history = &state.feature_machine_history;
                prop_assert!(history.len() <= primitives::total_steps(feature, history));
            }
            prop_assert!(state.validate(wizard.registry()).is_ok());
        }
    }

    /// One bar segment per planned feature.
    #[test]
    fn progress_bar_matches_plan(features in plan(), inputs in vec(input(), 0..30)) {
        let mut wizard = started(&features);
        for input in &inputs {
            apply(&mut wizard, input);
        }
        let state = wizard.state();
        prop_assert_eq!(progress_bar(state).len(), state.feature_list.len());
    }

    /// A restored snapshot replays exactly like the live session.
    #[test]
    fn snapshot_then_replay_is_deterministic(
        features in plan(),
        prefix in vec(input(), 0..30),
        suffix in vec(input(), 0..30),
    ) {
        let mut live = started(&features);
        for input in &prefix {
            apply(&mut live, input);
        }

        let bytes = state_to_bytes(live.state()).expect("encode");
        let decoded = state_from_bytes(&bytes).expect("decode");
        let mut resumed = WizardController::restore(registry(), decoded).expect("restore");

        live.take_intents();
        for input in &suffix {
            apply(&mut live, input);
            apply(&mut resumed, input);
        }
        prop_assert_eq!(live.state(), resumed.state());
        prop_assert_eq!(live.take_intents(), resumed.take_intents());
    }
}
