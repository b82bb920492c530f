//! Finite state machine for wizard navigation

use serde::{Deserialize, Serialize};

use crate::errors::ClientError;

/// Wizard step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    /// Pick a template
    Template,

    /// Deployment name, courses and students
    Basics,

    /// Grouping strategy and group count
    Grouping,

    /// Student to group assignment
    Assignment,

    /// Configuration variables
    Variables,

    /// Summary before submission
    Review,

    /// Create request in flight
    Submitting,
}

/// Wizard event
#[derive(Debug, Clone)]
pub enum WizardEvent {
    /// Go to the next step
    Next,

    /// Go to the previous step
    Back,

    /// Send the create request
    Submit,

    /// Backend accepted the deployment
    SubmitSucceeded,

    /// Create request failed
    SubmitFailed(String),

    /// Start over
    Reset,
}

/// Wizard FSM
#[derive(Debug, Clone)]
pub struct WizardFsm {
    step: WizardStep,
    error: Option<String>,
    attempts: u32,
}

impl WizardFsm {
    /// Create a new FSM on the template step
    pub fn new() -> Self {
        Self {
            step: WizardStep::Template,
            error: None,
            attempts: 0,
        }
    }

    /// Get current step
    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Error of the last failed submission, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of submission attempts since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: WizardEvent) -> Result<WizardStep, ClientError> {
        use WizardStep::*;

        let new_step = match (self.step, &event) {
            (_, WizardEvent::Reset) => {
                self.error = None;
                self.attempts = 0;
                Template
            }

            (Template, WizardEvent::Next) => Basics,
            (Basics, WizardEvent::Next) => Grouping,
            (Grouping, WizardEvent::Next) => Assignment,
            (Assignment, WizardEvent::Next) => Variables,
            (Variables, WizardEvent::Next) => Review,

            (Basics, WizardEvent::Back) => Template,
            (Grouping, WizardEvent::Back) => Basics,
            (Assignment, WizardEvent::Back) => Grouping,
            (Variables, WizardEvent::Back) => Assignment,
            (Review, WizardEvent::Back) => Variables,

            (Review, WizardEvent::Submit) => {
                self.error = None;
                self.attempts += 1;
                Submitting
            }
            (Submitting, WizardEvent::SubmitSucceeded) => {
                self.attempts = 0;
                Template
            }
            (Submitting, WizardEvent::SubmitFailed(err)) => {
                self.error = Some(err.clone());
                Review
            }

            // Invalid transitions
            (step, event) => {
                return Err(ClientError::ValidationError(format!(
                    "Invalid wizard transition: {:?} -> {:?}",
                    step, event
                )));
            }
        };

        self.step = new_step;
        Ok(new_step)
    }
}

impl Default for WizardFsm {
    fn default() -> Self {
        Self::new()
    }
}
