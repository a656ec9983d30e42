//! # Progress
//!
//! Pure figures derived from a [`WizardState`]: where the operator is in the
//! active flow, a bar over the whole plan, and the position within the
//! initialization tour.
//!
//! Integer arithmetic only. Percentages round down and are capped at 100.

use crate::controller::WizardState;
use crate::primitives::{self, INIT_STEPS};
use crate::Feature;
use serde::{Deserialize, Serialize};

/// Tutorial states of the initialization tour share this prefix.
const INIT_ACTIVE_PREFIX: &str = "init.active.";

/// `part` out of `whole` as a whole percentage.
///
/// A flow with no steps has nothing left to do, so a zero denominator
/// reads as complete.
#[must_use]
pub fn percent_of(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 100;
    }
    (part.saturating_mul(100) / whole).min(100) as u8
}

// =============================================================================
// ACTIVE FLOW
// =============================================================================

/// Position within the active feature flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureProgress {
    pub feature: Feature,
    pub step: usize,
    pub total_steps: usize,
    pub percentage: u8,
    pub text: String,
}

/// Progress of the active flow, or `None` when no flow is active.
#[must_use]
pub fn current_feature_progress(state: &WizardState) -> Option<FeatureProgress> {
    let feature = state.current_machine?;
    let history = &state.feature_machine_history;
    let total_steps = primitives::total_steps(feature, history);
    let step = history.len().min(total_steps);

    Some(FeatureProgress {
        feature,
        step,
        total_steps,
        percentage: percent_of(history.len(), total_steps),
        text: format!("Step {} of {}", step, total_steps),
    })
}

// =============================================================================
// PLAN BAR
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Pending,
    Active,
    Completed,
}

/// One bar segment per planned feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSegment {
    pub feature: Feature,
    pub label: String,
    pub percentage: u8,
    pub status: SegmentStatus,
}

/// Segments for every feature in the plan, in plan order.
///
/// Only features in `completed_features` are `Completed`; the active flow
/// stays `Active` even once its history fills the step count.
#[must_use]
pub fn progress_bar(state: &WizardState) -> Vec<ProgressSegment> {
    let active = current_feature_progress(state);

    state
        .feature_list
        .iter()
        .map(|&feature| {
            let (percentage, status) = match &active {
                Some(progress) if progress.feature == feature => {
                    (progress.percentage, SegmentStatus::Active)
                }
                _ if state.completed_features.contains(&feature) => {
                    (100, SegmentStatus::Completed)
                }
                _ => (0, SegmentStatus::Pending),
            };
            ProgressSegment {
                feature,
                label: feature.title().to_string(),
                percentage,
                status,
            }
        })
        .collect()
}

/// Estimated minutes for the whole plan.
#[must_use]
pub fn plan_minutes(state: &WizardState) -> u32 {
    state
        .feature_list
        .iter()
        .map(Feature::estimated_minutes)
        .sum()
}

// =============================================================================
// INITIALIZATION TOUR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialProgress {
    pub step: usize,
    pub total_steps: usize,
    pub percentage: u8,
    pub text: String,
}

/// Position within the initialization tour, while it is running.
#[must_use]
pub fn tutorial_progress(state: &WizardState) -> Option<TutorialProgress> {
    let name = state
        .tutorial_state
        .as_str()
        .strip_prefix(INIT_ACTIVE_PREFIX)?;
    let index = INIT_STEPS.iter().position(|s| *s == name)?;
    let step = index + 1;
    let total_steps = INIT_STEPS.len();

    Some(TutorialProgress {
        step,
        total_steps,
        percentage: percent_of(step, total_steps),
        text: format!("Step {} of {}", step, total_steps),
    })
}
