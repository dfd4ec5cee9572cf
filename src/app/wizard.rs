//! Step state machine
//!
//! Owns the current step, the credential and the committed storyboard.
//! Every entry into a step that needs data runs a guard; a failed guard heals
//! the machine instead of entering the step.

use crate::models::{Credential, Storyboard};

/// The four screens of the wizard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    CredentialEntry,
    Ideation,
    StoryboardReview,
    Generation,
}

impl Step {
    pub fn number(&self) -> usize {
        match self {
            Step::CredentialEntry => 1,
            Step::Ideation => 2,
            Step::StoryboardReview => 3,
            Step::Generation => 4,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Step::CredentialEntry => "API Key",
            Step::Ideation => "Ideation",
            Step::StoryboardReview => "Storyboard",
            Step::Generation => "Generation",
        }
    }

    fn needs_credential(&self) -> bool {
        !matches!(self, Step::CredentialEntry)
    }

    fn needs_storyboard(&self) -> bool {
        matches!(self, Step::StoryboardReview | Step::Generation)
    }
}

/// What a transition did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Moved to the step
    Entered(Step),
    /// A guard failed; the machine corrected itself and now sits on the step
    Healed(Step),
    /// Not applicable from the current step, nothing changed
    Ignored,
}

#[derive(Debug)]
pub struct Wizard {
    step: Step,
    credential: Option<Credential>,
    storyboard: Option<Storyboard>,
}

impl Wizard {
    pub fn new(stored: Option<Credential>) -> Self {
        let step = if stored.is_some() {
            Step::Ideation
        } else {
            Step::CredentialEntry
        };
        Wizard {
            step,
            credential: stored,
            storyboard: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn storyboard(&self) -> Option<&Storyboard> {
        self.storyboard.as_ref()
    }

    pub fn submit_credential(&mut self, value: &str) -> Transition {
        match Credential::parse(value) {
            Some(credential) => {
                self.credential = Some(credential);
                self.enter(Step::Ideation)
            }
            None => Transition::Ignored,
        }
    }

    pub fn clear_credential(&mut self) -> Transition {
        self.credential = None;
        self.storyboard = None;
        self.step = Step::CredentialEntry;
        Transition::Entered(Step::CredentialEntry)
    }

    pub fn storyboard_generated(&mut self, storyboard: Storyboard) -> Transition {
        if self.step != Step::Ideation {
            return Transition::Ignored;
        }
        self.storyboard = Some(storyboard);
        self.enter(Step::StoryboardReview)
    }

    pub fn storyboard_confirmed(&mut self, storyboard: Storyboard) -> Transition {
        self.storyboard = Some(storyboard);
        self.enter(Step::Generation)
    }

    pub fn go_back(&mut self) -> Transition {
        if self.step != Step::StoryboardReview {
            return Transition::Ignored;
        }
        self.enter(Step::Ideation)
    }

    pub fn reset(&mut self) -> Transition {
        self.storyboard = None;
        self.step = if self.credential.is_some() {
            Step::Ideation
        } else {
            Step::CredentialEntry
        };
        Transition::Entered(self.step)
    }

    fn enter(&mut self, target: Step) -> Transition {
        if target.needs_credential() && self.credential.is_none() {
            tracing::warn!(?target, "No credential held, returning to key entry");
            self.clear_credential();
            return Transition::Healed(self.step);
        }
        if target.needs_storyboard() && self.storyboard.is_none() {
            tracing::warn!(?target, "No storyboard held, resetting");
            self.reset();
            return Transition::Healed(self.step);
        }
        self.step = target;
        Transition::Entered(target)
    }
}
