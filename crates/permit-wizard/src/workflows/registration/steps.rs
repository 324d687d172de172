use serde::{Deserialize, Serialize};

use super::domain::FormRecord;
use super::validation::{self, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Taxpayer,
    Business,
    Requirements,
    Summary,
}

impl WizardStep {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Taxpayer,
            Self::Business,
            Self::Requirements,
            Self::Summary,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Taxpayer => "Taxpayer Information",
            Self::Business => "Business Information",
            Self::Requirements => "Requirements",
            Self::Summary => "Summary",
        }
    }

    /// One-based position in the flow.
    pub const fn index(self) -> usize {
        match self {
            Self::Taxpayer => 1,
            Self::Business => 2,
            Self::Requirements => 3,
            Self::Summary => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ordered().into_iter().find(|step| step.index() == index)
    }

    pub fn first() -> Self {
        Self::Taxpayer
    }

    pub fn last() -> Self {
        Self::Summary
    }

    fn following(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    fn preceding(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Complete,
    Current,
    Incomplete,
}

impl StepStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Current => "current",
            Self::Incomplete => "incomplete",
        }
    }
}

/// Result of asking the controller to move forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Advanced(WizardStep),
    Refused(ValidationErrors),
    /// The terminal step validated; the caller hands off to submission.
    ReadyToSubmit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    pub step: WizardStep,
    pub label: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepController {
    current: WizardStep,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            current: WizardStep::first(),
        }
    }
}

impl StepController {
    pub fn current(&self) -> WizardStep {
        self.current
    }

    /// Validate the current step and advance when it is clean.
    pub fn next(&mut self, record: &FormRecord) -> Transition {
        let errors = validation::validate(self.current, record);
        if !errors.is_empty() {
            return Transition::Refused(errors);
        }
        match self.current.following() {
            Some(step) => {
                self.current = step;
                Transition::Advanced(step)
            }
            None => Transition::ReadyToSubmit,
        }
    }

    /// Step back without re-validating; stays put on the first step.
    pub fn prev(&mut self) -> WizardStep {
        if let Some(step) = self.current.preceding() {
            self.current = step;
        }
        self.current
    }

    /// Jump to an earlier (or the current) step. Forward jumps are refused.
    pub fn jump_back(&mut self, target: WizardStep) -> bool {
        if target > self.current {
            return false;
        }
        self.current = target;
        true
    }

    pub fn status_of(&self, step: WizardStep) -> StepStatus {
        match step.cmp(&self.current) {
            std::cmp::Ordering::Less => StepStatus::Complete,
            std::cmp::Ordering::Equal => StepStatus::Current,
            std::cmp::Ordering::Greater => StepStatus::Incomplete,
        }
    }

    pub fn progress(&self) -> Vec<StepProgress> {
        WizardStep::ordered()
            .into_iter()
            .map(|step| StepProgress {
                step,
                label: step.label(),
                status: self.status_of(step),
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.current = WizardStep::first();
    }
}
