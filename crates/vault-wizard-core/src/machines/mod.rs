//! # Built-in Machines
//!
//! The tutorial machine plus one flow per [`Feature`], bundled in a
//! [`MachineRegistry`].
//!
//! The registry is built once, at startup. Every feature must have a
//! definition and every definition must validate; a broken table is
//! reported then, never when an event arrives.

mod auth;
mod policies;
mod replication;
mod secrets;
mod tools;
mod tutorial;

pub use secrets::{ENCRYPTION_ENGINES, ROLE_ENGINES, SECRET_ENGINES, SUPPORTED_ENGINES};
pub use tutorial::TUTORIAL_KEY;

use crate::machine::MachineDefinition;
use crate::{Feature, WizardError};
use std::collections::BTreeMap;

/// One definition per feature. Field access is an exhaustive match, so a
/// new [`Feature`] variant cannot compile without a flow.
#[derive(Debug, Clone)]
struct FeatureMachines {
    secrets: MachineDefinition,
    authentication: MachineDefinition,
    policies: MachineDefinition,
    replication: MachineDefinition,
    tools: MachineDefinition,
}

/// The immutable machine table shared by every wizard session.
#[derive(Debug, Clone)]
pub struct MachineRegistry {
    tutorial: MachineDefinition,
    features: FeatureMachines,
}

impl MachineRegistry {
    /// Assemble a registry from explicit definitions.
    ///
    /// Fails with [`WizardError::MissingMachine`] for the first feature
    /// (in [`Feature::ALL`] order) without a definition.
    pub fn new(
        tutorial: MachineDefinition,
        mut features: BTreeMap<Feature, MachineDefinition>,
    ) -> Result<Self, WizardError> {
        let mut take = |feature: Feature| {
            features
                .remove(&feature)
                .ok_or(WizardError::MissingMachine(feature))
        };

        let features = FeatureMachines {
            secrets: take(Feature::Secrets)?,
            authentication: take(Feature::Authentication)?,
            policies: take(Feature::Policies)?,
            replication: take(Feature::Replication)?,
            tools: take(Feature::Tools)?,
        };

        tracing::debug!(tutorial = tutorial.key(), "machine registry assembled");
        Ok(Self { tutorial, features })
    }

    /// Build and validate the compiled-in machine table.
    pub fn builtin() -> Result<Self, WizardError> {
        let features = BTreeMap::from([
            (Feature::Secrets, secrets::definition()?),
            (Feature::Authentication, auth::definition()?),
            (Feature::Policies, policies::definition()?),
            (Feature::Replication, replication::definition()?),
            (Feature::Tools, tools::definition()?),
        ]);
        Self::new(tutorial::definition()?, features)
    }

    #[must_use]
    pub fn tutorial(&self) -> &MachineDefinition {
        &self.tutorial
    }

    /// Definition of `feature`'s flow.
    #[must_use]
    pub fn feature(&self, feature: Feature) -> &MachineDefinition {
        match feature {
            Feature::Secrets => &self.features.secrets,
            Feature::Authentication => &self.features.authentication,
            Feature::Policies => &self.features.policies,
            Feature::Replication => &self.features.replication,
            Feature::Tools => &self.features.tools,
        }
    }

    /// Every feature flow, in [`Feature::ALL`] order.
    pub fn features(&self) -> impl Iterator<Item = (Feature, &MachineDefinition)> {
        Feature::ALL.into_iter().map(|f| (f, self.feature(f)))
    }
}
