use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Portal role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Admin => "admin",
        }
    }

    /// Landing page after sign-in
    pub fn home_path(&self) -> &'static str {
        match self {
            UserRole::Patient => "/dashboard",
            UserRole::Admin => "/admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(UserRole::Patient),
            "admin" => Ok(UserRole::Admin),
            other => Err(AppError::Custom(format!("Unknown role: {}", other))),
        }
    }
}

/// Membership tier attached to a signed-in user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Individual,
    Family,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Pending,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Inactive => "inactive",
            MembershipStatus::Pending => "pending",
        }
    }
}

/// Signed-in identity. This is the exact JSON shape of the persisted session record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub membership_plan: Option<PlanTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_status: Option<MembershipStatus>,
    pub created_at: NaiveDate,
}

/// Review progress of a submitted intake record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConsultationStatus {
    Pending,
    InProgress,
    Completed,
}

impl ConsultationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Pending => "pending",
            ConsultationStatus::InProgress => "in-progress",
            ConsultationStatus::Completed => "completed",
        }
    }
}

/// Submitted intake record as listed to patients and admins
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub email: String,
    pub gender: String,
    pub age: u32,
    pub membership_plan: String,
    pub membership_status: MembershipStatus,
    pub submitted_at: NaiveDate,
    pub consultation_status: ConsultationStatus,
    pub medical_history: String,
    pub chronic_condition: bool,
    pub cause_of_infection: String,
    pub current_condition: String,
    pub other_treatments: String,
    pub ailments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MembershipPlan {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub period: String,
    pub features: Vec<String>,
    #[serde(default)]
    pub recommended: bool,
}

impl MembershipPlan {
    /// Price as charged, e.g. `$30.00`
    pub fn amount(&self) -> String {
        format!("${:.2}", self.price)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Whatsapp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Whatsapp => "whatsapp",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Channel::Email => "Email",
            Channel::Whatsapp => "WhatsApp",
        }
    }
}

impl FromStr for Channel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Channel::Email),
            "whatsapp" => Ok(Channel::Whatsapp),
            other => Err(AppError::Custom(format!("Unknown channel: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Patient message. `patient_id` is not checked against existing records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub channel: Channel,
    pub content: String,
    pub sent_at: NaiveDateTime,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub month: String,
    pub revenue: u32,
    pub subscriptions: u32,
}

impl SalesReport {
    pub fn revenue_per_subscription(&self) -> u32 {
        if self.subscriptions == 0 {
            return 0;
        }
        (self.revenue as f64 / self.subscriptions as f64).round() as u32
    }
}

/// Aggregates shown above the sales table
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_revenue: u32,
    pub total_subscriptions: u32,
    pub average_revenue: u32,
    pub max_revenue: u32,
}

impl SalesSummary {
    pub fn from_reports(reports: &[SalesReport]) -> Self {
        let total_revenue: u32 = reports.iter().map(|r| r.revenue).sum();
        let total_subscriptions: u32 = reports.iter().map(|r| r.subscriptions).sum();
        let average_revenue = if reports.is_empty() {
            0
        } else {
            (total_revenue as f64 / reports.len() as f64).round() as u32
        };
        let max_revenue = reports.iter().map(|r| r.revenue).max().unwrap_or(0);

        Self {
            total_revenue,
            total_subscriptions,
            average_revenue,
            max_revenue,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub text: String,
    pub rating: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_patients: usize,
    pub active_subscriptions: usize,
    pub monthly_sales: u32,
    pub pending_consultations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientOverview {
    pub subscription_status: MembershipStatus,
    pub plan: String,
    pub consultation_status: ConsultationStatus,
    pub submitted_records: u32,
    pub next_appointment: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub success: bool,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntakeReceipt {
    pub success: bool,
    pub record_id: String,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_json_shape() {
        let user = User {
            id: "patient-001".to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            role: UserRole::Patient,
            membership_plan: Some(PlanTier::Individual),
            membership_status: Some(MembershipStatus::Active),
            created_at: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["role"], "patient");
        assert_eq!(value["membershipPlan"], "individual");
        assert_eq!(value["membershipStatus"], "active");
        assert_eq!(value["createdAt"], "2025-01-15");
    }

    #[test]
    fn test_consultation_status_kebab_case() {
        let json = serde_json::to_string(&ConsultationStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }

    #[test]
    fn test_plan_amount() {
        let plan = MembershipPlan {
            id: "family".to_string(),
            name: "Family Kit".to_string(),
            price: 30.0,
            period: "month".to_string(),
            features: vec![],
            recommended: true,
        };
        assert_eq!(plan.amount(), "$30.00");
    }

    #[test]
    fn test_sales_summary() {
        let reports = vec![
            SalesReport { month: "A".into(), revenue: 2400, subscriptions: 34 },
            SalesReport { month: "B".into(), revenue: 3100, subscriptions: 41 },
        ];
        let summary = SalesSummary::from_reports(&reports);
        assert_eq!(summary.total_revenue, 5500);
        assert_eq!(summary.total_subscriptions, 75);
        assert_eq!(summary.average_revenue, 2750);
        assert_eq!(summary.max_revenue, 3100);
        assert_eq!(reports[0].revenue_per_subscription(), 71);
        assert_eq!(SalesSummary::from_reports(&[]).average_revenue, 0);
    }
}
