//! # Wizard Primitives
//!
//! Compiled-in constants: step counts per flow, the initialization steps,
//! snapshot format markers and input limits.
//!
//! Step counts are a typed mapping. Every [`Feature`] has an arm in
//! [`total_steps`], and the secrets flow picks its denominator from the
//! branch recorded in history ([`SecretsBranch`]). An unrecognized feature
//! cannot fall through silently.

use crate::{Feature, StateId};

// =============================================================================
// STEP COUNTS
// =============================================================================

/// Steps in the authentication flow: idle, enable, config, details.
pub const AUTHENTICATION_STEPS: usize = 4;

/// Steps in the policies flow: idle, create, details, delete, others.
pub const POLICIES_STEPS: usize = 5;

/// Steps in the replication flow: setup, details.
pub const REPLICATION_STEPS: usize = 2;

/// Steps in the response-wrapping tools flow.
pub const TOOLS_STEPS: usize = 8;

/// Steps of the cluster initialization tour, in order.
pub const INIT_STEPS: [&str; 4] = ["setup", "save", "unseal", "login"];

/// Sub-path taken through the secrets flow.
///
/// The flow forks after the engine is enabled; each branch visits a
/// different number of screens, so progress needs to know which one is
/// being walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsBranch {
    /// Role-based engines (pki, aws, ssh): role, displayRole, credentials.
    Role,
    /// Key/value engines: secret.
    Secret,
    /// Engines without a guided path: the mounts list.
    List,
    /// Transit: encryption key.
    Encryption,
}

impl SecretsBranch {
    /// State whose presence in history marks the branch.
    #[must_use]
    pub fn marker(&self) -> &'static str {
        match self {
            SecretsBranch::Role => "role",
            SecretsBranch::Secret => "secret",
            SecretsBranch::List => "list",
            SecretsBranch::Encryption => "encryption",
        }
    }

    /// Total screens on this branch, from `idle` to `display`.
    #[must_use]
    pub fn steps(&self) -> usize {
        match self {
            SecretsBranch::Role => 7,
            SecretsBranch::Secret => 5,
            SecretsBranch::List => 4,
            SecretsBranch::Encryption => 5,
        }
    }

    /// Branch recorded in `history`; before the fork, the longest branch.
    #[must_use]
    pub fn detect(history: &[StateId]) -> Self {
        [
            SecretsBranch::List,
            SecretsBranch::Secret,
            SecretsBranch::Encryption,
            SecretsBranch::Role,
        ]
        .into_iter()
        .find(|branch| history.iter().any(|s| s.as_str() == branch.marker()))
        .unwrap_or(SecretsBranch::Role)
    }
}

/// Total steps of `feature`'s flow given the history walked so far.
#[must_use]
pub fn total_steps(feature: Feature, history: &[StateId]) -> usize {
    match feature {
        Feature::Secrets => SecretsBranch::detect(history).steps(),
        Feature::Authentication => AUTHENTICATION_STEPS,
        Feature::Policies => POLICIES_STEPS,
        Feature::Replication => REPLICATION_STEPS,
        Feature::Tools => TOOLS_STEPS,
    }
}

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the wizard snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"VWIZ";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to `WizardState`.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of an event or state name accepted from outside.
pub const MAX_NAME_LENGTH: usize = 64;

/// Maximum length of a mount type accepted in flow params.
pub const MAX_MOUNT_TYPE_LENGTH: usize = 128;

/// Maximum length of a route name (and of each route parameter).
pub const MAX_ROUTE_LENGTH: usize = 256;

/// Maximum number of steps in a replay script.
pub const MAX_SCRIPT_STEPS: usize = 10_000;
