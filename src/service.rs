//! Mock service layer
//!
//! Stands in for a real backend: every accessor waits an artificial delay and
//! then answers from the in-memory seed data. Messages and health categories
//! can be changed at runtime; the changes live only as long as the process.

use chrono::{Local, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use crate::config::DEFAULT_DECLINE_RATE;
use crate::error::{AppError, AppResult};
use crate::mock_data;
use crate::models::*;
use crate::wizard::intake::IntakeSubmission;

/// Scales the simulated network delay of every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Latency {
    scale: f64,
}

impl Latency {
    /// Non-finite scales fall back to real-time delays
    pub fn new(scale: f64) -> Self {
        let scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
        Self { scale }
    }

    /// No delay at all
    pub fn none() -> Self {
        Self::new(0.0)
    }

    pub fn scaled(&self, base_ms: u64) -> Duration {
        Duration::from_millis((base_ms as f64 * self.scale).round() as u64)
    }

    pub async fn pause(&self, base_ms: u64) {
        let duration = self.scaled(base_ms);
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Simulated card processor. Declines a configurable share of otherwise valid payments.
pub struct PaymentGateway {
    decline_rate: f64,
    rng: Mutex<StdRng>,
}

impl PaymentGateway {
    pub fn new(decline_rate: f64) -> Self {
        Self {
            decline_rate: bounded_rate(decline_rate),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence of decline decisions
    pub fn with_seed(decline_rate: f64, seed: u64) -> Self {
        Self {
            decline_rate: bounded_rate(decline_rate),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn decline_rate(&self) -> f64 {
        self.decline_rate
    }

    fn should_decline(&self) -> bool {
        if self.decline_rate <= 0.0 {
            return false;
        }
        if self.decline_rate >= 1.0 {
            return true;
        }
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(self.decline_rate),
            Err(_) => false,
        }
    }
}

fn bounded_rate(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        DEFAULT_DECLINE_RATE
    }
}

/// Receives a finished intake questionnaire
pub trait IntakeService {
    fn submit_medical_intake(
        &self,
        submission: &IntakeSubmission,
    ) -> impl Future<Output = AppResult<IntakeReceipt>> + Send;
}

/// Charges a card for a membership plan
pub trait PaymentService {
    fn process_payment(
        &self,
        card_number: &str,
        expiry: &str,
        cvv: &str,
        plan: &str,
    ) -> impl Future<Output = AppResult<PaymentReceipt>> + Send;
}

pub struct MockBackend {
    latency: Latency,
    gateway: PaymentGateway,
    plans: Vec<MembershipPlan>,
    patients: Vec<PatientRecord>,
    reports: Vec<SalesReport>,
    testimonials: Vec<Testimonial>,
    messages: Mutex<Vec<Message>>,
    categories: Mutex<Vec<HealthCategory>>,
}

impl MockBackend {
    pub fn new(latency: Latency, gateway: PaymentGateway) -> Self {
        Self {
            latency,
            gateway,
            plans: mock_data::plans(),
            patients: mock_data::patients(),
            reports: mock_data::sales_reports(),
            testimonials: mock_data::testimonials(),
            messages: Mutex::new(mock_data::messages()),
            categories: Mutex::new(mock_data::health_categories()),
        }
    }

    pub fn latency(&self) -> Latency {
        self.latency
    }

    fn messages_lock(&self) -> AppResult<MutexGuard<'_, Vec<Message>>> {
        self.messages
            .lock()
            .map_err(|_| AppError::Custom("Message store lock error".to_string()))
    }

    fn categories_lock(&self) -> AppResult<MutexGuard<'_, Vec<HealthCategory>>> {
        self.categories
            .lock()
            .map_err(|_| AppError::Custom("Category store lock error".to_string()))
    }

    // ============ Auth ============

    /// Credential presence check. The session store's `login` does not call this.
    pub async fn api_login(&self, email: &str, password: &str, role: UserRole) -> AppResult<UserRole> {
        self.latency.pause(1000).await;
        if email.is_empty() || password.is_empty() {
            return Err(AppError::MissingField("Email and password required"));
        }
        Ok(role)
    }

    pub async fn api_register(&self, name: &str, email: &str, password: &str) -> AppResult<()> {
        self.latency.pause(1200).await;
        if name.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AppError::MissingField("All fields required"));
        }
        Ok(())
    }

    // ============ Membership ============

    pub async fn get_membership_plans(&self) -> AppResult<Vec<MembershipPlan>> {
        self.latency.pause(600).await;
        Ok(self.plans.clone())
    }

    /// Plan lookup without the simulated delay
    pub fn find_plan(&self, id: &str) -> Option<&MembershipPlan> {
        self.plans.iter().find(|p| p.id == id)
    }

    // ============ Patient dashboard ============

    pub async fn get_patient_overview(&self, patient_id: &str) -> AppResult<PatientOverview> {
        self.latency.pause(700).await;
        let patient = self
            .patients
            .iter()
            .find(|p| p.patient_id == patient_id)
            .or_else(|| self.patients.first())
            .ok_or_else(|| AppError::NotFound(format!("patient {}", patient_id)))?;

        Ok(PatientOverview {
            subscription_status: patient.membership_status,
            plan: patient.membership_plan.clone(),
            consultation_status: patient.consultation_status,
            submitted_records: 1,
            next_appointment: NaiveDate::from_ymd_opt(2026, 2, 15).unwrap_or_default(),
        })
    }

    pub async fn get_patient_records(&self, patient_id: &str) -> AppResult<Vec<PatientRecord>> {
        self.latency.pause(700).await;
        Ok(self
            .patients
            .iter()
            .filter(|p| p.patient_id == patient_id)
            .cloned()
            .collect())
    }

    // ============ Admin dashboard ============

    pub async fn get_admin_stats(&self) -> AppResult<AdminStats> {
        self.latency.pause(800).await;
        Ok(AdminStats {
            total_patients: self.patients.len(),
            active_subscriptions: self
                .patients
                .iter()
                .filter(|p| p.membership_status == MembershipStatus::Active)
                .count(),
            monthly_sales: self.reports.last().map(|r| r.revenue).unwrap_or(0),
            pending_consultations: self
                .patients
                .iter()
                .filter(|p| p.consultation_status == ConsultationStatus::Pending)
                .count(),
        })
    }

    pub async fn get_all_patients(&self) -> AppResult<Vec<PatientRecord>> {
        self.latency.pause(700).await;
        Ok(self.patients.clone())
    }

    /// Match on either the record id or the patient id
    pub async fn get_patient_by_id(&self, id: &str) -> AppResult<Option<PatientRecord>> {
        self.latency.pause(500).await;
        Ok(self
            .patients
            .iter()
            .find(|p| p.id == id || p.patient_id == id)
            .cloned())
    }

    pub async fn get_sales_reports(&self) -> AppResult<Vec<SalesReport>> {
        self.latency.pause(600).await;
        Ok(self.reports.clone())
    }

    // ============ Messages ============

    pub async fn get_messages(&self, patient_id: Option<&str>) -> AppResult<Vec<Message>> {
        self.latency.pause(600).await;
        let messages = self.messages_lock()?;
        Ok(match patient_id {
            Some(id) => messages.iter().filter(|m| m.patient_id == id).cloned().collect(),
            None => messages.clone(),
        })
    }

    /// Record an outbound message. The patient id is not validated.
    pub async fn send_message(&self, patient_id: &str, channel: Channel, content: &str) -> AppResult<Message> {
        self.latency.pause(1000).await;
        let patient_name = self
            .patients
            .iter()
            .find(|p| p.patient_id == patient_id)
            .map(|p| p.patient_name.clone())
            .unwrap_or_else(|| "Unknown".to_string());
        self.append_message(patient_id, &patient_name, channel, content, Direction::Outbound)
    }

    /// Record a message a patient wrote to the care team
    pub async fn receive_message(
        &self,
        patient_id: &str,
        patient_name: &str,
        channel: Channel,
        content: &str,
    ) -> AppResult<Message> {
        self.latency.pause(1000).await;
        self.append_message(patient_id, patient_name, channel, content, Direction::Inbound)
    }

    fn append_message(
        &self,
        patient_id: &str,
        patient_name: &str,
        channel: Channel,
        content: &str,
        direction: Direction,
    ) -> AppResult<Message> {
        if content.trim().is_empty() {
            return Err(AppError::MissingField("Message cannot be empty"));
        }

        let message = Message {
            id: format!("msg-{}", Uuid::new_v4().simple()),
            patient_id: patient_id.to_string(),
            patient_name: patient_name.to_string(),
            channel,
            content: content.to_string(),
            sent_at: Local::now().naive_local(),
            direction,
        };

        self.messages_lock()?.insert(0, message.clone());
        log::info!("Message {} ({:?}) for {} via {}", message.id, direction, patient_id, channel.as_str());
        Ok(message)
    }

    // ============ Health categories ============

    pub async fn get_health_categories(&self) -> AppResult<Vec<HealthCategory>> {
        self.latency.pause(500).await;
        Ok(self.categories_lock()?.clone())
    }

    /// Update the category with `id`, or append a new one when `id` is `None`
    pub async fn save_health_category(
        &self,
        id: Option<&str>,
        name: &str,
        description: &str,
    ) -> AppResult<HealthCategory> {
        self.latency.pause(800).await;
        let mut categories = self.categories_lock()?;

        match id {
            Some(id) => {
                let category = categories
                    .iter_mut()
                    .find(|c| c.id == id)
                    .ok_or_else(|| AppError::NotFound(format!("category {}", id)))?;
                category.name = name.to_string();
                category.description = description.to_string();
                log::info!("Health category {} updated", id);
                Ok(category.clone())
            }
            None => {
                let category = HealthCategory {
                    id: Uuid::new_v4().simple().to_string(),
                    name: name.to_string(),
                    description: description.to_string(),
                    icon: "activity".to_string(),
                };
                categories.push(category.clone());
                log::info!("Health category {} added", category.id);
                Ok(category)
            }
        }
    }

    pub fn delete_health_category(&self, id: &str) -> AppResult<()> {
        let mut categories = self.categories_lock()?;
        let before = categories.len();
        categories.retain(|c| c.id != id);
        if categories.len() == before {
            return Err(AppError::NotFound(format!("category {}", id)));
        }
        log::info!("Health category {} deleted", id);
        Ok(())
    }

    // ============ Marketing ============

    pub async fn get_testimonials(&self) -> AppResult<Vec<Testimonial>> {
        self.latency.pause(400).await;
        Ok(self.testimonials.clone())
    }

    pub async fn submit_contact_form(&self, form: &ContactForm) -> AppResult<()> {
        self.latency.pause(1000).await;
        if form.name.is_empty() || form.email.is_empty() || form.message.is_empty() {
            return Err(AppError::MissingField("All fields required"));
        }
        log::info!("Contact form received from {}", form.email);
        Ok(())
    }

    pub fn ailments(&self) -> Vec<String> {
        mock_data::AILMENTS.iter().map(|a| a.to_string()).collect()
    }
}

impl IntakeService for MockBackend {
    async fn submit_medical_intake(&self, submission: &IntakeSubmission) -> AppResult<IntakeReceipt> {
        self.latency.pause(1500).await;
        log::debug!("Medical intake submitted: {:?}", submission);
        let receipt = IntakeReceipt {
            success: true,
            record_id: format!("rec-{}", Utc::now().timestamp_millis()),
        };
        log::info!("Medical intake accepted as {}", receipt.record_id);
        Ok(receipt)
    }
}

impl PaymentService for MockBackend {
    async fn process_payment(
        &self,
        card_number: &str,
        expiry: &str,
        cvv: &str,
        plan: &str,
    ) -> AppResult<PaymentReceipt> {
        self.latency.pause(2000).await;

        let digits = card_number.chars().filter(|c| !c.is_whitespace()).count();
        if digits != 16 {
            return Err(AppError::InvalidCardNumber);
        }
        if expiry.is_empty() || cvv.is_empty() {
            return Err(AppError::MissingField("All payment fields required"));
        }
        if self.gateway.should_decline() {
            log::warn!("Payment for plan {} declined", plan);
            return Err(AppError::PaymentDeclined);
        }

        let receipt = PaymentReceipt {
            success: true,
            transaction_id: format!("TXN-{}", Utc::now().timestamp_millis()),
        };
        log::info!("Payment for plan {} accepted: {}", plan, receipt.transaction_id);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(decline_rate: f64) -> MockBackend {
        MockBackend::new(Latency::none(), PaymentGateway::new(decline_rate))
    }

    #[test]
    fn test_latency_scaling() {
        assert_eq!(Latency::new(0.5).scaled(1000), Duration::from_millis(500));
        assert!(Latency::none().scaled(2000).is_zero());
        assert!(Latency::new(-3.0).scaled(100).is_zero());
        assert_eq!(Latency::new(f64::INFINITY).scaled(100), Duration::from_millis(100));
        assert!(Latency::new(f64::NAN).scaled(100) <= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_non_finite_decline_rate_does_not_panic() {
        let gateway = PaymentGateway::with_seed(f64::NAN, 7);
        assert_eq!(gateway.decline_rate(), DEFAULT_DECLINE_RATE);
        assert_eq!(PaymentGateway::new(f64::INFINITY).decline_rate(), DEFAULT_DECLINE_RATE);

        let backend = MockBackend::new(Latency::none(), gateway);
        for _ in 0..20 {
            let result = backend.process_payment("4242424242424242", "12/28", "123", "family").await;
            assert!(matches!(result, Ok(_) | Err(AppError::PaymentDeclined)));
        }
    }

    #[tokio::test]
    async fn test_payment_rejects_wrong_digit_count() {
        let backend = backend(0.0);
        for card in ["", "4242", "4242 4242 4242 424", "4242 4242 4242 4242 4"] {
            let err = backend.process_payment(card, "12/28", "123", "family").await.unwrap_err();
            assert!(matches!(err, AppError::InvalidCardNumber), "{}", card);
        }
    }

    #[tokio::test]
    async fn test_payment_requires_expiry_and_cvv() {
        let backend = backend(0.0);
        let err = backend
            .process_payment("4242424242424242", "", "123", "family")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "All payment fields required");
    }

    #[tokio::test]
    async fn test_payment_success() {
        let backend = backend(0.0);
        let receipt = backend
            .process_payment("4242 4242 4242 4242", "12/28", "123", "family")
            .await
            .unwrap();
        assert!(receipt.success);
        let digits = receipt.transaction_id.strip_prefix("TXN-").unwrap();
        assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_payment_always_declines_at_full_rate() {
        let backend = backend(1.0);
        let err = backend
            .process_payment("4242424242424242", "12/28", "123", "individual")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentDeclined));
    }

    #[test]
    fn test_seeded_gateway_is_repeatable() {
        let a = PaymentGateway::with_seed(0.5, 7);
        let b = PaymentGateway::with_seed(0.5, 7);
        let left: Vec<bool> = (0..32).map(|_| a.should_decline()).collect();
        let right: Vec<bool> = (0..32).map(|_| b.should_decline()).collect();
        assert_eq!(left, right);
        assert!(left.iter().any(|d| *d) && left.iter().any(|d| !*d));
    }

    #[tokio::test]
    async fn test_api_login_requires_credentials() {
        let backend = backend(0.0);
        assert!(backend.api_login("", "pw", UserRole::Patient).await.is_err());
        assert!(backend.api_login("a@b.c", "", UserRole::Patient).await.is_err());
        assert_eq!(
            backend.api_login("a@b.c", "pw", UserRole::Admin).await.unwrap(),
            UserRole::Admin
        );
        assert!(backend.api_register("", "a@b.c", "pw").await.is_err());
    }

    #[tokio::test]
    async fn test_admin_stats() {
        let stats = backend(0.0).get_admin_stats().await.unwrap();
        assert_eq!(stats.total_patients, 5);
        assert_eq!(stats.active_subscriptions, 4);
        assert_eq!(stats.monthly_sales, 4800);
        assert_eq!(stats.pending_consultations, 1);
    }

    #[tokio::test]
    async fn test_patient_lookup() {
        let backend = backend(0.0);
        assert_eq!(
            backend.get_patient_by_id("rec-002").await.unwrap().unwrap().patient_name,
            "Jane Smith"
        );
        assert_eq!(
            backend.get_patient_by_id("patient-003").await.unwrap().unwrap().id,
            "rec-003"
        );
        assert!(backend.get_patient_by_id("nobody").await.unwrap().is_none());
        assert_eq!(backend.get_patient_records("patient-001").await.unwrap().len(), 1);
        assert!(backend.get_patient_records("patient-999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overview_falls_back_to_first_patient() {
        let overview = backend(0.0).get_patient_overview("patient-999").await.unwrap();
        assert_eq!(overview.plan, "Individual");
        assert_eq!(overview.consultation_status, ConsultationStatus::InProgress);
        assert_eq!(overview.next_appointment.to_string(), "2026-02-15");
    }

    #[tokio::test]
    async fn test_send_message_appends_newest_first() {
        let backend = backend(0.0);
        let err = backend.send_message("patient-002", Channel::Email, "   ").await.unwrap_err();
        assert_eq!(err.to_string(), "Message cannot be empty");

        let sent = backend
            .send_message("patient-002", Channel::Whatsapp, "See you soon")
            .await
            .unwrap();
        assert_eq!(sent.patient_name, "Jane Smith");
        assert_eq!(sent.direction, Direction::Outbound);

        let all = backend.get_messages(None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "See you soon");
        assert_eq!(backend.get_messages(Some("patient-002")).await.unwrap().len(), 2);

        let unknown = backend.send_message("ghost", Channel::Email, "hi").await.unwrap();
        assert_eq!(unknown.patient_name, "Unknown");
    }

    #[tokio::test]
    async fn test_patient_message_is_inbound() {
        let backend = backend(0.0);
        let received = backend
            .receive_message("patient-001", "John Doe", Channel::Email, "Feeling better")
            .await
            .unwrap();
        assert_eq!(received.direction, Direction::Inbound);
        let mine = backend.get_messages(Some("patient-001")).await.unwrap();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[0].content, "Feeling better");
        assert!(backend.receive_message("patient-001", "John Doe", Channel::Email, "").await.is_err());
    }

    #[tokio::test]
    async fn test_category_editing() {
        let backend = backend(0.0);
        let added = backend
            .save_health_category(None, "Nutrition", "Diet plans")
            .await
            .unwrap();
        assert_eq!(added.icon, "activity");
        assert_eq!(backend.get_health_categories().await.unwrap().len(), 9);

        let edited = backend
            .save_health_category(Some("1"), "Primary Care", "Updated")
            .await
            .unwrap();
        assert_eq!(edited.name, "Primary Care");
        assert!(backend.save_health_category(Some("404"), "x", "y").await.is_err());

        backend.delete_health_category(&added.id).unwrap();
        assert!(backend.delete_health_category(&added.id).is_err());
        assert_eq!(backend.get_health_categories().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_back_to_back_writes_get_distinct_ids() {
        let backend = backend(0.0);
        let first = backend.save_health_category(None, "Nutrition", "Diet").await.unwrap();
        let second = backend.save_health_category(None, "Sleep", "Rest").await.unwrap();
        assert_ne!(first.id, second.id);

        backend.delete_health_category(&first.id).unwrap();
        let remaining = backend.get_health_categories().await.unwrap();
        assert!(remaining.iter().any(|c| c.id == second.id));
        assert_eq!(remaining.len(), 9);

        let a = backend.send_message("patient-001", Channel::Email, "one").await.unwrap();
        let b = backend.send_message("patient-001", Channel::Email, "two").await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_contact_form_required_fields() {
        let backend = backend(0.0);
        let mut form = ContactForm {
            name: "Ann".into(),
            email: "ann@example.com".into(),
            subject: String::new(),
            message: "Hello".into(),
        };
        assert!(backend.submit_contact_form(&form).await.is_ok());
        form.message.clear();
        assert_eq!(
            backend.submit_contact_form(&form).await.unwrap_err().to_string(),
            "All fields required"
        );
    }
}
