//! # vault-wizard-core
//!
//! The guided-tour engine behind the Vault console - THE LOGIC.
//!
//! A top-level tutorial machine sequences the tour; one feature machine per
//! product area walks the operator through that area's screens. This crate
//! holds the machine table, the per-session controller that drives it, and
//! the progress figures derived from wizard state.
//!
//! ## Architectural Constraints
//!
//! - Pure: no async, no network, no I/O
//! - Deterministic: ordered collections, integer arithmetic
//! - Intent-only: render and route actions are queued for the caller, never
//!   executed
//! - Closed: machine tables are compiled in and validated once at startup

// =============================================================================
// MODULES
// =============================================================================

pub mod controller;
pub mod formats;
pub mod machine;
pub mod machines;
pub mod primitives;
pub mod progress;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Action, ComponentName, Event, Feature, FlowParams, Level, StateId, WizardError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use controller::{RouteTarget, WizardController, WizardState};
pub use machine::{Guard, MachineBuilder, MachineDefinition, StateNode, TransitionContext, TransitionResult};
pub use machines::MachineRegistry;
pub use primitives::SecretsBranch;

// =============================================================================
// RE-EXPORTS: Progress & Formats
// =============================================================================

pub use formats::{MAX_SNAPSHOT_SIZE, SnapshotHeader, state_from_bytes, state_to_bytes};
pub use progress::{
    FeatureProgress, ProgressSegment, SegmentStatus, TutorialProgress, current_feature_progress,
    percent_of, plan_minutes, progress_bar, tutorial_progress,
};
