//! Multi-step form controller
//!
//! A wizard walks an ordered list of steps. Moving forward requires the
//! current step's validator to report no errors; moving back never
//! re-validates.

pub mod intake;
pub mod registration;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// Field name to human-readable message
pub type FieldErrors = BTreeMap<&'static str, String>;

pub trait WizardStep: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Steps in the order they are walked
    const ORDER: &'static [Self];

    /// Short name shown in the progress bar
    fn label(&self) -> &'static str;
}

/// Progress-bar state of one step relative to the current position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Done,
    Current,
    Upcoming,
}

#[derive(Debug, Clone)]
pub struct Wizard<S: WizardStep> {
    index: usize,
    errors: FieldErrors,
    _step: PhantomData<S>,
}

impl<S: WizardStep> Default for Wizard<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WizardStep> Wizard<S> {
    pub fn new() -> Self {
        Self {
            index: 0,
            errors: FieldErrors::new(),
            _step: PhantomData,
        }
    }

    pub fn current(&self) -> S {
        S::ORDER[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == S::ORDER.len()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// Forget the error attached to one field, as when the user edits it
    pub fn clear_error(&mut self, field: &str) {
        self.errors.remove(field);
    }

    /// Replace the error set without moving
    pub fn reject(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }

    /// Move one step forward if `errors` is empty, otherwise keep position and
    /// remember the errors. Returns whether the wizard moved.
    pub fn advance(&mut self, errors: FieldErrors) -> bool {
        if !errors.is_empty() {
            self.errors = errors;
            return false;
        }
        self.errors.clear();
        if self.is_last() {
            return false;
        }
        self.index += 1;
        true
    }

    /// Always allowed; the previous step is not re-validated
    pub fn back(&mut self) -> bool {
        self.errors.clear();
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.errors.clear();
    }

    pub fn progress(&self) -> Vec<(S, StepState)> {
        S::ORDER
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let state = match i.cmp(&self.index) {
                    std::cmp::Ordering::Less => StepState::Done,
                    std::cmp::Ordering::Equal => StepState::Current,
                    std::cmp::Ordering::Greater => StepState::Upcoming,
                };
                (*step, state)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Demo {
        One,
        Two,
        Three,
    }

    impl WizardStep for Demo {
        const ORDER: &'static [Self] = &[Demo::One, Demo::Two, Demo::Three];

        fn label(&self) -> &'static str {
            match self {
                Demo::One => "One",
                Demo::Two => "Two",
                Demo::Three => "Three",
            }
        }
    }

    fn error(field: &'static str) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.insert(field, "required".to_string());
        errors
    }

    #[test]
    fn test_errors_block_advance() {
        let mut wizard = Wizard::<Demo>::new();
        assert!(!wizard.advance(error("name")));
        assert_eq!(wizard.current(), Demo::One);
        assert_eq!(wizard.error("name"), Some("required"));

        assert!(wizard.advance(FieldErrors::new()));
        assert_eq!(wizard.current(), Demo::Two);
        assert!(wizard.errors().is_empty());
    }

    #[test]
    fn test_back_does_not_validate() {
        let mut wizard = Wizard::<Demo>::new();
        wizard.advance(FieldErrors::new());
        wizard.reject(error("x"));
        assert!(wizard.back());
        assert_eq!(wizard.current(), Demo::One);
        assert!(wizard.errors().is_empty());
        assert!(!wizard.back());
    }

    #[test]
    fn test_stops_at_last_step() {
        let mut wizard = Wizard::<Demo>::new();
        wizard.advance(FieldErrors::new());
        wizard.advance(FieldErrors::new());
        assert!(wizard.is_last());
        assert!(!wizard.advance(FieldErrors::new()));
        assert_eq!(wizard.current(), Demo::Three);
    }

    #[test]
    fn test_progress() {
        let mut wizard = Wizard::<Demo>::new();
        wizard.advance(FieldErrors::new());
        let states: Vec<StepState> = wizard.progress().into_iter().map(|(_, s)| s).collect();
        assert_eq!(states, vec![StepState::Done, StepState::Current, StepState::Upcoming]);
        assert_eq!(wizard.progress()[2].0.label(), "Three");
        wizard.reset();
        assert!(wizard.is_first());
    }
}
