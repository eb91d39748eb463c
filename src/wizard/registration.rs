//! Sign-up with plan selection and payment
//!
//! account -> plan -> payment -> success. Unlike the intake flow, every
//! service failure here is shown inline and the wizard stays where it is.

use serde::Serialize;

use super::{FieldErrors, Wizard, WizardStep};
use crate::models::{MembershipPlan, UserRole};
use crate::service::PaymentService;
use crate::session::SessionStore;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    Account,
    Plan,
    Payment,
    Success,
}

impl WizardStep for RegistrationStep {
    const ORDER: &'static [Self] = &[
        RegistrationStep::Account,
        RegistrationStep::Plan,
        RegistrationStep::Payment,
        RegistrationStep::Success,
    ];

    fn label(&self) -> &'static str {
        match self {
            RegistrationStep::Account => "Account",
            RegistrationStep::Plan => "Plan",
            RegistrationStep::Payment => "Payment",
            RegistrationStep::Success => "Done",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentForm {
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
    pub card_name: String,
}

/// What the success step shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub plan_name: String,
    pub amount: String,
    pub period: String,
    pub transaction_id: String,
}

pub fn validate_account(form: &AccountForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if form.name.trim().is_empty() {
        errors.insert("name", "Name is required".to_string());
    }
    if form.email.trim().is_empty() {
        errors.insert("email", "Email is required".to_string());
    }
    if form.password.is_empty() {
        errors.insert("password", "Password is required".to_string());
    } else if form.password != form.confirm_password {
        errors.insert("confirmPassword", "Passwords do not match".to_string());
    } else if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.insert("password", "Password must be at least 6 characters".to_string());
    }
    errors
}

pub fn validate_plan(selected: &str, plans: &[MembershipPlan]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if !plans.iter().any(|p| p.id == selected) {
        errors.insert("plan", "Please select a plan".to_string());
    }
    errors
}

pub fn validate_payment(form: &PaymentForm) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if form.card_name.trim().is_empty() {
        errors.insert("cardName", "Name on card is required".to_string());
    }
    if form.card_number.trim().is_empty() {
        errors.insert("cardNumber", "Card number is required".to_string());
    }
    if form.expiry.trim().is_empty() {
        errors.insert("expiry", "Expiry date is required".to_string());
    }
    if form.cvv.trim().is_empty() {
        errors.insert("cvv", "CVV is required".to_string());
    }
    errors
}

/// Digits only, at most 16, grouped by four: `4242 4242 4242 4242`
pub fn format_card_number(value: &str) -> String {
    let digits: Vec<char> = value.chars().filter(|c| c.is_ascii_digit()).take(16).collect();
    digits
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Digits only, at most 4, `MM/YY` once the year starts
pub fn format_expiry(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).take(4).collect();
    if digits.len() >= 3 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationWizard {
    wizard: Wizard<RegistrationStep>,
    account: AccountForm,
    selected_plan: String,
    payment: PaymentForm,
    error: Option<String>,
    payment_error: bool,
    confirmation: Option<Confirmation>,
}

impl RegistrationWizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a plan already chosen, as when arriving from the pricing page
    pub fn with_plan(plan_id: &str) -> Self {
        Self {
            selected_plan: plan_id.to_string(),
            ..Self::default()
        }
    }

    pub fn step(&self) -> RegistrationStep {
        self.wizard.current()
    }

    pub fn wizard(&self) -> &Wizard<RegistrationStep> {
        &self.wizard
    }

    pub fn errors(&self) -> &FieldErrors {
        self.wizard.errors()
    }

    pub fn account(&self) -> &AccountForm {
        &self.account
    }

    pub fn payment(&self) -> &PaymentForm {
        &self.payment
    }

    pub fn selected_plan(&self) -> &str {
        &self.selected_plan
    }

    /// Inline message from the last failed service call
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_payment_error(&self) -> bool {
        self.payment_error
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn set_account(&mut self, account: AccountForm) {
        self.account = account;
    }

    pub fn select_plan(&mut self, plan_id: &str) {
        self.wizard.clear_error("plan");
        self.selected_plan = plan_id.to_string();
    }

    /// Store card details, normalising number and expiry the way the inputs display them
    pub fn set_payment(&mut self, payment: PaymentForm) {
        self.payment = PaymentForm {
            card_number: format_card_number(&payment.card_number),
            expiry: format_expiry(&payment.expiry),
            cvv: payment.cvv.chars().filter(|c| c.is_ascii_digit()).take(4).collect(),
            card_name: payment.card_name,
        };
    }

    /// Validate the account step and create the patient account
    pub async fn submit_account(&mut self, session: &mut SessionStore) -> bool {
        if self.step() != RegistrationStep::Account {
            return false;
        }
        let errors = validate_account(&self.account);
        if !errors.is_empty() {
            return self.wizard.advance(errors);
        }

        self.error = None;
        match session
            .register(
                self.account.name.trim(),
                self.account.email.trim(),
                &self.account.password,
                UserRole::Patient,
            )
            .await
        {
            Ok(_) => self.wizard.advance(FieldErrors::new()),
            Err(e) => {
                log::warn!("Registration failed: {}", e);
                self.error = Some("Registration failed. Please try again.".to_string());
                false
            }
        }
    }

    pub fn confirm_plan(&mut self, plans: &[MembershipPlan]) -> bool {
        if self.step() != RegistrationStep::Plan {
            return false;
        }
        self.error = None;
        self.wizard.advance(validate_plan(&self.selected_plan, plans))
    }

    /// Charge the card for the selected plan
    pub async fn pay<S: PaymentService>(&mut self, service: &S, plans: &[MembershipPlan]) -> bool {
        if self.step() != RegistrationStep::Payment {
            return false;
        }
        let errors = validate_payment(&self.payment);
        if !errors.is_empty() {
            return self.wizard.advance(errors);
        }
        let Some(plan) = plans.iter().find(|p| p.id == self.selected_plan) else {
            self.wizard.reject(validate_plan(&self.selected_plan, plans));
            return false;
        };

        self.error = None;
        self.payment_error = false;
        let card_digits: String = self
            .payment
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        match service
            .process_payment(&card_digits, &self.payment.expiry, &self.payment.cvv, &plan.id)
            .await
        {
            Ok(receipt) => {
                self.confirmation = Some(Confirmation {
                    plan_name: plan.name.clone(),
                    amount: plan.amount(),
                    period: plan.period.clone(),
                    transaction_id: receipt.transaction_id,
                });
                self.wizard.advance(FieldErrors::new())
            }
            Err(e) => {
                self.payment_error = true;
                self.error = Some(e.to_string());
                false
            }
        }
    }

    /// Step back. Leaving the payment step clears its error; the success step is final.
    pub fn back(&mut self) -> bool {
        if self.step() == RegistrationStep::Success {
            return false;
        }
        self.error = None;
        self.payment_error = false;
        self.wizard.back()
    }
}
