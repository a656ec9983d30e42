//! # Machine Definitions
//!
//! Declarative finite state machines and the pure transition function over
//! them.
//!
//! A machine is a key, an initial state, machine-wide ("global") transitions
//! and a table of states. Each state maps event names to an ordered list of
//! guarded candidates; the first candidate whose guard holds is taken.
//!
//! ## Transition Semantics
//!
//! - Lookup order: the state's own candidates, then global candidates.
//!   Absorbing states never consult global candidates; a state can also
//!   shield itself from individual global events with [`StateNode::ignore`].
//! - Resulting actions: source `on_exit`, then candidate actions, then target
//!   `on_entry`. Self-transitions re-run entry actions.
//! - An event with no passing candidate is a no-op: the state is unchanged
//!   and the action list is empty. This is not an error.
//!
//! Definitions are validated once by [`MachineBuilder::build`]; a definition
//! that references an unknown state never reaches transition time.

use crate::{Action, Event, FlowParams, StateId, WizardError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GUARDS
// =============================================================================

/// Condition attached to a transition candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Always passes.
    Always,
    /// Passes when the selected mount type is one of the listed types.
    MountTypeIn(&'static [&'static str]),
    /// Passes when no mount type is selected or it is not listed.
    MountTypeNotIn(&'static [&'static str]),
    /// Passes when the state was recorded in the current flow history.
    Visited(StateId),
}

impl Guard {
    /// Evaluate the guard against a transition context.
    #[must_use]
    pub fn holds(&self, ctx: &TransitionContext<'_>) -> bool {
        match self {
            Guard::Always => true,
            Guard::MountTypeIn(types) => ctx
                .mount_type()
                .is_some_and(|selected| types.iter().any(|t| *t == selected)),
            Guard::MountTypeNotIn(types) => ctx
                .mount_type()
                .is_none_or(|selected| types.iter().all(|t| *t != selected)),
            Guard::Visited(state) => ctx.history.contains(state),
        }
    }
}

/// Inputs guards may read besides the current state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionContext<'a> {
    /// Extended state supplied with the event.
    pub params: Option<&'a FlowParams>,
    /// States recorded so far in the active flow.
    pub history: &'a [StateId],
}

impl<'a> TransitionContext<'a> {
    #[must_use]
    pub fn new(params: Option<&'a FlowParams>, history: &'a [StateId]) -> Self {
        Self { params, history }
    }

    fn mount_type(&self) -> Option<&str> {
        self.params.and_then(|p| p.mount_type.as_deref())
    }
}

// =============================================================================
// STATE NODES
// =============================================================================

/// One guarded way out of a state.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub target: StateId,
    pub guard: Guard,
    pub actions: Vec<Action>,
}

/// A state: its transition table plus entry and exit actions.
#[derive(Debug, Clone, Default)]
pub struct StateNode {
    on: BTreeMap<Event, Vec<Candidate>>,
    on_entry: Vec<Action>,
    on_exit: Vec<Action>,
    ignored: BTreeSet<Event>,
    absorbing: bool,
}

impl StateNode {
    /// Create a state with no transitions and no actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry action.
    #[must_use]
    pub fn entry(mut self, action: Action) -> Self {
        self.on_entry.push(action);
        self
    }

    /// Append an exit action.
    #[must_use]
    pub fn exit(mut self, action: Action) -> Self {
        self.on_exit.push(action);
        self
    }

    /// Unconditional transition on `event`.
    #[must_use]
    pub fn on(self, event: Event, target: &'static str) -> Self {
        self.on_with(event, target, Guard::Always, Vec::new())
    }

    /// Guarded transition on `event`. Candidates are tried in the order added.
    #[must_use]
    pub fn on_when(self, event: Event, target: &'static str, guard: Guard) -> Self {
        self.on_with(event, target, guard, Vec::new())
    }

    /// Guarded transition carrying its own actions.
    #[must_use]
    pub fn on_with(
        mut self,
        event: Event,
        target: &'static str,
        guard: Guard,
        actions: Vec<Action>,
    ) -> Self {
        self.on.entry(event).or_default().push(Candidate {
            target: StateId::from_static(target),
            guard,
            actions,
        });
        self
    }

    /// Stop the global transition on `event` from applying to this state.
    #[must_use]
    pub fn ignore(mut self, event: Event) -> Self {
        self.ignored.insert(event);
        self
    }

    /// Stop global transitions from applying to this state.
    #[must_use]
    pub fn absorbing(mut self) -> Self {
        self.absorbing = true;
        self
    }

    /// Actions run when the state is entered.
    #[must_use]
    pub fn entry_actions(&self) -> &[Action] {
        &self.on_entry
    }

    /// Events this state declares itself (globals excluded).
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.on.keys()
    }

    /// A terminal state declares no transitions of its own, or absorbs.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.on.is_empty() || self.absorbing
    }

    #[must_use]
    pub fn is_absorbing(&self) -> bool {
        self.absorbing
    }
}

// =============================================================================
// TRANSITION RESULT
// =============================================================================

/// Outcome of dispatching one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResult {
    /// State after the event (unchanged when unhandled).
    pub value: StateId,
    /// Actions in execution order.
    pub actions: Vec<Action>,
    /// Whether any candidate matched.
    pub handled: bool,
}

impl TransitionResult {
    /// The no-op result for `state`.
    #[must_use]
    pub fn unhandled(state: StateId) -> Self {
        Self {
            value: state,
            actions: Vec::new(),
            handled: false,
        }
    }
}

// =============================================================================
// MACHINE DEFINITION
// =============================================================================

/// An immutable, validated state machine.
#[derive(Debug, Clone)]
pub struct MachineDefinition {
    key: String,
    initial: StateId,
    global: BTreeMap<Event, Vec<Candidate>>,
    states: BTreeMap<StateId, StateNode>,
}

impl MachineDefinition {
    /// Start building a machine.
    #[must_use]
    pub fn builder(key: impl Into<String>, initial: &'static str) -> MachineBuilder {
        MachineBuilder {
            def: MachineDefinition {
                key: key.into(),
                initial: StateId::from_static(initial),
                global: BTreeMap::new(),
                states: BTreeMap::new(),
            },
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn initial(&self) -> &StateId {
        &self.initial
    }

    /// Look up a state node.
    #[must_use]
    pub fn state(&self, id: &StateId) -> Option<&StateNode> {
        self.states.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &StateId) -> bool {
        self.states.contains_key(id)
    }

    /// All states in deterministic (lexical) order.
    pub fn states(&self) -> impl Iterator<Item = (&StateId, &StateNode)> {
        self.states.iter()
    }

    /// Events handled machine-wide.
    pub fn global_events(&self) -> impl Iterator<Item = &Event> {
        self.global.keys()
    }

    /// Whether `id` names a terminal state of this machine.
    #[must_use]
    pub fn is_terminal(&self, id: &StateId) -> bool {
        self.states.get(id).is_some_and(StateNode::is_terminal)
    }

    /// Compute the transition for `event` from `current`.
    ///
    /// Pure: the definition is not mutated and the same inputs always give
    /// the same result. Unknown states and undeclared events yield
    /// [`TransitionResult::unhandled`].
    #[must_use]
    pub fn transition(
        &self,
        current: &StateId,
        event: &Event,
        ctx: &TransitionContext<'_>,
    ) -> TransitionResult {
        let Some(node) = self.states.get(current) else {
            tracing::debug!(machine = %self.key, state = %current, "transition from unknown state ignored");
            return TransitionResult::unhandled(current.clone());
        };

        let own = node.on.get(event).into_iter().flatten();
        let global = if node.absorbing || node.ignored.contains(event) {
            None
        } else {
            self.global.get(event)
        };
        let chosen = own
            .chain(global.into_iter().flatten())
            .find(|candidate| candidate.guard.holds(ctx));

        let Some(candidate) = chosen else {
            tracing::trace!(machine = %self.key, state = %current, event = %event, "no transition");
            return TransitionResult::unhandled(current.clone());
        };

        // Targets are checked by MachineBuilder::build.
        let Some(target) = self.states.get(&candidate.target) else {
            return TransitionResult::unhandled(current.clone());
        };

        let mut actions = Vec::with_capacity(
            node.on_exit.len() + candidate.actions.len() + target.on_entry.len(),
        );
        actions.extend(node.on_exit.iter().cloned());
        actions.extend(candidate.actions.iter().cloned());
        actions.extend(target.on_entry.iter().cloned());

        tracing::debug!(
            machine = %self.key,
            from = %current,
            event = %event,
            to = %candidate.target,
            actions = actions.len(),
            "transition"
        );

        TransitionResult {
            value: candidate.target.clone(),
            actions,
            handled: true,
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Assembles and validates a [`MachineDefinition`].
#[derive(Debug)]
pub struct MachineBuilder {
    def: MachineDefinition,
}

impl MachineBuilder {
    /// Machine-wide unconditional transition.
    #[must_use]
    pub fn global(mut self, event: Event, target: &'static str) -> Self {
        self.def.global.entry(event).or_default().push(Candidate {
            target: StateId::from_static(target),
            guard: Guard::Always,
            actions: Vec::new(),
        });
        self
    }

    /// Add (or replace) a state.
    #[must_use]
    pub fn state(mut self, name: &'static str, node: StateNode) -> Self {
        self.def.states.insert(StateId::from_static(name), node);
        self
    }

    /// Validate and freeze the definition.
    pub fn build(self) -> Result<MachineDefinition, WizardError> {
        let def = self.def;
        let invalid = |reason: String| WizardError::InvalidMachine {
            machine: def.key.clone(),
            reason,
        };

        if def.key.is_empty() {
            return Err(invalid("machine key is empty".to_string()));
        }
        if !def.states.contains_key(&def.initial) {
            return Err(invalid(format!("initial state '{}' is not defined", def.initial)));
        }

        let tables = def
            .states
            .iter()
            .map(|(id, node)| (id.as_str(), &node.on))
            .chain(std::iter::once(("<global>", &def.global)));

        for (source, table) in tables {
            for (event, candidates) in table {
                if event.as_str().is_empty() {
                    return Err(invalid(format!("state '{}' has an unnamed event", source)));
                }
                if candidates.is_empty() {
                    return Err(invalid(format!(
                        "state '{}' declares {} without a target",
                        source, event
                    )));
                }
                for candidate in candidates {
                    if !def.states.contains_key(&candidate.target) {
                        return Err(invalid(format!(
                            "{} --{}--> '{}': target is not defined",
                            source, event, candidate.target
                        )));
                    }
                    if let Guard::Visited(state) = &candidate.guard {
                        if !def.states.contains_key(state) {
                            return Err(invalid(format!(
                                "{} --{}-->: guard names unknown state '{}'",
                                source, event, state
                            )));
                        }
                    }
                }
            }
        }

        for (id, node) in &def.states {
            if let Some(event) = node.ignored.iter().find(|e| !def.global.contains_key(*e)) {
                return Err(invalid(format!(
                    "state '{}' ignores {}, which is not a global event",
                    id, event
                )));
            }
        }

        Ok(def)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;

    fn door() -> MachineDefinition {
        MachineDefinition::builder("door", "closed")
            .global(Event::RESET, "closed")
            .state(
                "closed",
                StateNode::new()
                    .entry(Action::render(Level::Step, "door-closed"))
                    .on(Event::new("OPEN"), "open"),
            )
            .state(
                "open",
                StateNode::new()
                    .entry(Action::render(Level::Step, "door-open"))
                    .exit(Action::clear(Level::Detail))
                    .on_with(
                        Event::new("CLOSE"),
                        "closed",
                        Guard::Always,
                        vec![Action::route("hallway")],
                    ),
            )
            .state("locked", StateNode::new().on(Event::DISMISS, "locked").absorbing())
            .build()
            .expect("valid machine")
    }

    #[test]
    fn declared_event_moves_and_collects_entry_actions() {
        let machine = door();
        let result = machine.transition(
            &StateId::from_static("closed"),
            &Event::new("OPEN"),
            &TransitionContext::default(),
        );

        assert!(result.handled);
        assert_eq!(result.value, StateId::from_static("open"));
        assert_eq!(result.actions, vec![Action::render(Level::Step, "door-open")]);
    }

    #[test]
    fn actions_are_exit_then_transition_then_entry() {
        let machine = door();
        let result = machine.transition(
            &StateId::from_static("open"),
            &Event::new("CLOSE"),
            &TransitionContext::default(),
        );

        assert_eq!(
            result.actions,
            vec![
                Action::clear(Level::Detail),
                Action::route("hallway"),
                Action::render(Level::Step, "door-closed"),
            ]
        );
    }

    #[test]
    fn undeclared_event_is_noop() {
        let machine = door();
        let state = StateId::from_static("closed");
        let result = machine.transition(&state, &Event::new("KICK"), &TransitionContext::default());

        assert_eq!(result, TransitionResult::unhandled(state));
    }

    #[test]
    fn unknown_state_is_noop() {
        let machine = door();
        let state = StateId::new("ajar");
        let result = machine.transition(&state, &Event::new("OPEN"), &TransitionContext::default());

        assert!(!result.handled);
        assert_eq!(result.value, state);
    }

    #[test]
    fn global_transition_applies_except_in_absorbing_states() {
        let machine = door();
        let ctx = TransitionContext::default();

        let from_open = machine.transition(&StateId::from_static("open"), &Event::RESET, &ctx);
        assert_eq!(from_open.value, StateId::from_static("closed"));

        let from_locked = machine.transition(&StateId::from_static("locked"), &Event::RESET, &ctx);
        assert!(!from_locked.handled);
    }

    #[test]
    fn ignored_global_is_a_noop_in_that_state_only() {
        let machine = MachineDefinition::builder("lamp", "off")
            .global(Event::PAUSE, "dim")
            .state("off", StateNode::new().on(Event::new("ON"), "on"))
            .state("on", StateNode::new().on(Event::new("OFF"), "off"))
            .state(
                "dim",
                StateNode::new()
                    .exit(Action::route("bright"))
                    .on(Event::CONTINUE, "on")
                    .ignore(Event::PAUSE),
            )
            .build()
            .expect("valid machine");
        let ctx = TransitionContext::default();

        let dimmed = machine.transition(&StateId::from_static("on"), &Event::PAUSE, &ctx);
        assert_eq!(dimmed.value, StateId::from_static("dim"));

        let again = machine.transition(&StateId::from_static("dim"), &Event::PAUSE, &ctx);
        assert!(!again.handled);
        assert!(again.actions.is_empty());
    }

    #[test]
    fn build_rejects_ignoring_a_non_global_event() {
        let result = MachineDefinition::builder("lamp", "off")
            .state("off", StateNode::new().ignore(Event::PAUSE))
            .build();
        assert!(matches!(result, Err(WizardError::InvalidMachine { .. })));
    }

    #[test]
    fn guards_pick_first_passing_candidate() {
        let machine = MachineDefinition::builder("pick", "start")
            .state(
                "start",
                StateNode::new()
                    .on_when(Event::CONTINUE, "kv", Guard::MountTypeIn(&["kv"]))
                    .on_when(Event::CONTINUE, "other", Guard::MountTypeNotIn(&["kv"])),
            )
            .state("kv", StateNode::new())
            .state("other", StateNode::new())
            .build()
            .expect("valid machine");

        let kv = FlowParams::mount("kv");
        let pki = FlowParams::mount("pki");
        let start = StateId::from_static("start");

        let to_kv = machine.transition(&start, &Event::CONTINUE, &TransitionContext::new(Some(&kv), &[]));
        let to_other =
            machine.transition(&start, &Event::CONTINUE, &TransitionContext::new(Some(&pki), &[]));
        let no_params = machine.transition(&start, &Event::CONTINUE, &TransitionContext::default());

        assert_eq!(to_kv.value, StateId::from_static("kv"));
        assert_eq!(to_other.value, StateId::from_static("other"));
        assert_eq!(no_params.value, StateId::from_static("other"));
    }

    #[test]
    fn visited_guard_reads_history() {
        let guard = Guard::Visited(StateId::from_static("role"));
        let history = [StateId::from_static("idle"), StateId::from_static("role")];

        assert!(guard.holds(&TransitionContext::new(None, &history)));
        assert!(!guard.holds(&TransitionContext::new(None, &history[..1])));
    }

    #[test]
    fn build_rejects_missing_initial_state() {
        let result = MachineDefinition::builder("broken", "nowhere")
            .state("somewhere", StateNode::new())
            .build();

        assert!(matches!(result, Err(WizardError::InvalidMachine { machine, .. }) if machine == "broken"));
    }

    #[test]
    fn build_rejects_unknown_target() {
        let result = MachineDefinition::builder("broken", "a")
            .state("a", StateNode::new().on(Event::CONTINUE, "b"))
            .build();

        assert!(matches!(result, Err(WizardError::InvalidMachine { .. })));
    }

    #[test]
    fn build_rejects_unknown_global_target() {
        let result = MachineDefinition::builder("broken", "a")
            .global(Event::DONE, "complete")
            .state("a", StateNode::new())
            .build();

        assert!(matches!(result, Err(WizardError::InvalidMachine { .. })));
    }

    #[test]
    fn terminal_states_have_no_own_transitions() {
        let machine = door();
        assert!(!machine.is_terminal(&StateId::from_static("closed")));
        assert!(machine.is_terminal(&StateId::from_static("locked")));
    }
}
