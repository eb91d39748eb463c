//! Medical intake questionnaire
//!
//! personal-info -> medical-history -> ailments -> review. Submitting from the
//! review step hands a typed [`IntakeSubmission`] to the intake service. A
//! failed submission is logged and otherwise ignored: the patient stays on the
//! review step with no message.

use serde::{Deserialize, Serialize};

use super::{FieldErrors, Wizard, WizardStep};
use crate::mock_data::AILMENTS;
use crate::models::IntakeReceipt;
use crate::search;
use crate::service::IntakeService;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntakeStep {
    PersonalInfo,
    MedicalHistory,
    Ailments,
    Review,
}

impl WizardStep for IntakeStep {
    const ORDER: &'static [Self] = &[
        IntakeStep::PersonalInfo,
        IntakeStep::MedicalHistory,
        IntakeStep::Ailments,
        IntakeStep::Review,
    ];

    fn label(&self) -> &'static str {
        match self {
            IntakeStep::PersonalInfo => "Personal Info",
            IntakeStep::MedicalHistory => "Medical History",
            IntakeStep::Ailments => "Ailments",
            IntakeStep::Review => "Review",
        }
    }
}

impl IntakeStep {
    pub fn title(&self) -> &'static str {
        match self {
            IntakeStep::PersonalInfo => "Step 1 - Personal Information",
            IntakeStep::MedicalHistory => "Step 2 - Medical History",
            IntakeStep::Ailments => "Step 3 - Ailments & Complaints",
            IntakeStep::Review => "Step 4 - Review & Submit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[serde(rename = "Would rather not say")]
    RatherNotSay,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::RatherNotSay];

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::RatherNotSay => "Would rather not say",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.label() == label)
    }
}

/// Raw questionnaire state, exactly as typed by the patient
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntakeForm {
    pub gender: String,
    pub age_confirm: bool,
    pub age: String,
    pub medical_history: String,
    /// "Yes", "No" or unanswered
    pub chronic_condition: String,
    pub cause_of_infection: String,
    pub current_condition: String,
    pub other_treatments: String,
    pub ailments: Vec<String>,
}

/// One edit to the questionnaire
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeUpdate {
    Gender(String),
    AgeConfirm(bool),
    Age(String),
    MedicalHistory(String),
    ChronicCondition(String),
    CauseOfInfection(String),
    CurrentCondition(String),
    OtherTreatments(String),
    ToggleAilment(String),
    SetAilments(Vec<String>),
}

impl IntakeUpdate {
    fn field(&self) -> &'static str {
        match self {
            IntakeUpdate::Gender(_) => "gender",
            IntakeUpdate::AgeConfirm(_) => "ageConfirm",
            IntakeUpdate::Age(_) => "age",
            IntakeUpdate::MedicalHistory(_) => "medicalHistory",
            IntakeUpdate::ChronicCondition(_) => "chronicCondition",
            IntakeUpdate::CauseOfInfection(_) => "causeOfInfection",
            IntakeUpdate::CurrentCondition(_) => "currentCondition",
            IntakeUpdate::OtherTreatments(_) => "otherTreatments",
            IntakeUpdate::ToggleAilment(_) | IntakeUpdate::SetAilments(_) => "ailments",
        }
    }
}

/// Validated questionnaire, the only shape the intake service accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSubmission {
    pub gender: Gender,
    pub age: u32,
    pub medical_history: String,
    pub chronic_condition: bool,
    pub cause_of_infection: Option<String>,
    pub current_condition: String,
    pub other_treatments: Option<String>,
    pub ailments: Vec<String>,
}

impl TryFrom<&IntakeForm> for IntakeSubmission {
    type Error = FieldErrors;

    fn try_from(form: &IntakeForm) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::new();
        for step in [
            IntakeStep::PersonalInfo,
            IntakeStep::MedicalHistory,
            IntakeStep::Ailments,
        ] {
            errors.extend(validate_step(step, form));
        }

        let gender = Gender::from_label(&form.gender);
        let age = parse_age(&form.age);
        let ailments: Vec<String> = form
            .ailments
            .iter()
            .filter(|a| AILMENTS.contains(&a.as_str()))
            .cloned()
            .collect();
        if ailments.is_empty() {
            errors.insert("ailments", "Please select at least one ailment".to_string());
        }

        match (gender, age) {
            (Some(gender), Some(age)) if errors.is_empty() => Ok(Self {
                gender,
                age,
                medical_history: form.medical_history.trim().to_string(),
                chronic_condition: form.chronic_condition == "Yes",
                cause_of_infection: non_blank(&form.cause_of_infection),
                current_condition: form.current_condition.trim().to_string(),
                other_treatments: non_blank(&form.other_treatments),
                ailments,
            }),
            _ => Err(errors),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_age(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
}

/// Required-field check for one step. Review has nothing of its own to check.
pub fn validate_step(step: IntakeStep, form: &IntakeForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    match step {
        IntakeStep::PersonalInfo => {
            if Gender::from_label(&form.gender).is_none() {
                errors.insert("gender", "Please select your gender".to_string());
            }
            if !form.age_confirm {
                errors.insert("ageConfirm", "You must confirm you are 18 or older".to_string());
            }
            if form.age.trim().is_empty() {
                errors.insert("age", "Please enter your age".to_string());
            } else if parse_age(&form.age).is_none() {
                errors.insert("age", "Age must be between 18 and 80".to_string());
            }
        }
        IntakeStep::MedicalHistory => {
            if form.medical_history.trim().is_empty() {
                errors.insert("medicalHistory", "Please describe your medical history".to_string());
            }
            if form.chronic_condition != "Yes" && form.chronic_condition != "No" {
                errors.insert("chronicCondition", "Please select yes or no".to_string());
            }
            if form.current_condition.trim().is_empty() {
                errors.insert("currentCondition", "Please describe your current condition".to_string());
            }
        }
        IntakeStep::Ailments => {
            if form.ailments.is_empty() {
                errors.insert("ailments", "Please select at least one ailment".to_string());
            }
        }
        IntakeStep::Review => {}
    }
    errors
}

#[derive(Debug, Clone, Default)]
pub struct IntakeWizard {
    wizard: Wizard<IntakeStep>,
    form: IntakeForm,
    ailment_query: String,
    receipt: Option<IntakeReceipt>,
}

impl IntakeWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> IntakeStep {
        self.wizard.current()
    }

    pub fn wizard(&self) -> &Wizard<IntakeStep> {
        &self.wizard
    }

    pub fn form(&self) -> &IntakeForm {
        &self.form
    }

    pub fn errors(&self) -> &FieldErrors {
        self.wizard.errors()
    }

    /// Set once the submission went through
    pub fn receipt(&self) -> Option<&IntakeReceipt> {
        self.receipt.as_ref()
    }

    pub fn is_submitted(&self) -> bool {
        self.receipt.is_some()
    }

    pub fn update(&mut self, update: IntakeUpdate) {
        self.wizard.clear_error(update.field());
        match update {
            IntakeUpdate::Gender(v) => self.form.gender = v,
            IntakeUpdate::AgeConfirm(v) => self.form.age_confirm = v,
            IntakeUpdate::Age(v) => self.form.age = v,
            IntakeUpdate::MedicalHistory(v) => self.form.medical_history = v,
            IntakeUpdate::ChronicCondition(v) => self.form.chronic_condition = v,
            IntakeUpdate::CauseOfInfection(v) => self.form.cause_of_infection = v,
            IntakeUpdate::CurrentCondition(v) => self.form.current_condition = v,
            IntakeUpdate::OtherTreatments(v) => self.form.other_treatments = v,
            IntakeUpdate::ToggleAilment(ailment) => {
                if let Some(pos) = self.form.ailments.iter().position(|a| *a == ailment) {
                    self.form.ailments.remove(pos);
                } else if AILMENTS.contains(&ailment.as_str()) {
                    self.form.ailments.push(ailment);
                }
            }
            IntakeUpdate::SetAilments(ailments) => {
                let mut selected: Vec<String> = Vec::new();
                for ailment in ailments {
                    if AILMENTS.contains(&ailment.as_str()) && !selected.contains(&ailment) {
                        selected.push(ailment);
                    }
                }
                self.form.ailments = selected;
            }
        }
    }

    pub fn ailment_query(&self) -> &str {
        &self.ailment_query
    }

    pub fn set_ailment_query(&mut self, query: &str) {
        self.ailment_query = query.to_string();
    }

    /// Catalog entries matching the current ailment search
    pub fn filtered_ailments(&self) -> Vec<&'static str> {
        search::filter_ailments(AILMENTS, &self.ailment_query)
    }

    /// Validate the current step and move on if it is clean
    pub fn next(&mut self) -> bool {
        let errors = validate_step(self.step(), &self.form);
        self.wizard.advance(errors)
    }

    pub fn back(&mut self) -> bool {
        self.wizard.back()
    }

    /// Send the questionnaire. Only reachable from the review step.
    pub async fn submit<S: IntakeService>(&mut self, service: &S) {
        if self.step() != IntakeStep::Review || self.is_submitted() {
            return;
        }

        let submission = match IntakeSubmission::try_from(&self.form) {
            Ok(submission) => submission,
            Err(errors) => {
                self.wizard.reject(errors);
                return;
            }
        };

        match service.submit_medical_intake(&submission).await {
            Ok(receipt) => self.receipt = Some(receipt),
            Err(e) => log::warn!("Medical intake submission failed: {}", e),
        }
    }

    /// Clear everything for another questionnaire
    pub fn start_over(&mut self) {
        *self = Self::default();
    }
}
