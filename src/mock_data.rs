//! Seed dataset for the mock service layer

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::*;

/// Fixed ailment catalog offered by the intake form
pub const AILMENTS: &[&str] = &[
    "Headache (with Migraine)",
    "Stomach ache",
    "Tooth ache",
    "Back ache",
    "Muscle pain",
    "Pain all over the body",
    "Respiratory / pulmonary issues",
    "Kidney / renal problems",
    "Hypertension",
    "Diabetes",
    "Skin disorders, eczema, ulcers",
    "Chronic diabetes wounds",
    "STIs, HIV-related complications & AIDS",
    "Flu, COVID-19 (all variants), Monkeypox, Smallpox",
    "Snake bite, dog bite, mosquito bite, bee sting, scorpion sting",
    "Burns (steam burns, fire burns)",
    "Renal cancer, prostate cancer, throat cancer",
    "Brain tumors, Parkinson's disease",
    "Reproductive disorders",
    "Post-natal care",
    "Weight loss",
    "Weight gain",
    "Infant problems (stunted growth, pellagra)",
    "Rare diseases",
];

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap_or_default()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn plans() -> Vec<MembershipPlan> {
    vec![
        MembershipPlan {
            id: "individual".to_string(),
            name: "Individual".to_string(),
            price: 10.0,
            period: "month".to_string(),
            features: strings(&[
                "Personal health dashboard",
                "Medical intake form",
                "1 consultation per month",
                "Basic health reports",
                "Email support",
            ]),
            recommended: false,
        },
        MembershipPlan {
            id: "family".to_string(),
            name: "Family Kit".to_string(),
            price: 30.0,
            period: "month".to_string(),
            features: strings(&[
                "Up to 5 family members",
                "Shared health dashboard",
                "Unlimited consultations",
                "Comprehensive health reports",
                "Priority WhatsApp & email support",
                "Medical records storage",
            ]),
            recommended: true,
        },
    ]
}

#[allow(clippy::too_many_arguments)]
fn record(
    n: u32,
    name: &str,
    email: &str,
    gender: &str,
    age: u32,
    plan: &str,
    status: MembershipStatus,
    submitted_at: NaiveDate,
    consultation: ConsultationStatus,
    history: &str,
    chronic: bool,
    cause: &str,
    current: &str,
    treatments: &str,
    ailments: &[&str],
) -> PatientRecord {
    PatientRecord {
        id: format!("rec-{:03}", n),
        patient_id: format!("patient-{:03}", n),
        patient_name: name.to_string(),
        email: email.to_string(),
        gender: gender.to_string(),
        age,
        membership_plan: plan.to_string(),
        membership_status: status,
        submitted_at,
        consultation_status: consultation,
        medical_history: history.to_string(),
        chronic_condition: chronic,
        cause_of_infection: cause.to_string(),
        current_condition: current.to_string(),
        other_treatments: treatments.to_string(),
        ailments: strings(ailments),
    }
}

pub fn patients() -> Vec<PatientRecord> {
    vec![
        record(
            1, "John Doe", "john@example.com", "Male", 34, "Individual", MembershipStatus::Active,
            date(2025, 12, 1), ConsultationStatus::InProgress,
            "Mild asthma diagnosed in 2021. Regular medication.", true, "N/A",
            "Stable, managed with inhalers", "None",
            &["Respiratory / pulmonary issues", "Headache"],
        ),
        record(
            2, "Jane Smith", "jane@example.com", "Female", 28, "Family Kit", MembershipStatus::Active,
            date(2025, 11, 15), ConsultationStatus::Completed,
            "Seasonal allergies. Minor surgery in 2022.", false, "Pollen exposure",
            "Good, managed seasonally", "Antihistamines",
            &["Skin disorders, eczema, ulcers", "Flu, COVID-19"],
        ),
        record(
            3, "Michael Johnson", "michael@example.com", "Male", 52, "Individual", MembershipStatus::Active,
            date(2025, 10, 20), ConsultationStatus::Pending,
            "Type 2 Diabetes since 2019. Hypertension.", true, "N/A",
            "Managed with medication and diet", "Metformin, Lisinopril",
            &["Diabetes", "Hypertension"],
        ),
        record(
            4, "Sarah Williams", "sarah@example.com", "Female", 41, "Family Kit", MembershipStatus::Inactive,
            date(2025, 9, 5), ConsultationStatus::Completed,
            "Post-natal complications in 2023.", false, "N/A",
            "Recovered", "Physical therapy",
            &["Post-natal care", "Back ache"],
        ),
        record(
            5, "David Brown", "david@example.com", "Male", 67, "Individual", MembershipStatus::Active,
            date(2025, 8, 12), ConsultationStatus::InProgress,
            "Prostate issues since 2020. Kidney concerns.", true, "N/A",
            "Under monitoring", "Tamsulosin",
            &["Kidney / renal problems", "Prostate cancer"],
        ),
    ]
}

pub fn messages() -> Vec<Message> {
    let message = |n: u32, patient: u32, name: &str, channel, content: &str, sent_at, direction| Message {
        id: format!("msg-{:03}", n),
        patient_id: format!("patient-{:03}", patient),
        patient_name: name.to_string(),
        channel,
        content: content.to_string(),
        sent_at,
        direction,
    };

    vec![
        message(1, 1, "John Doe", Channel::Email,
            "Your lab results are ready. Please check your dashboard.",
            at(2025, 12, 10, 10, 30), Direction::Outbound),
        message(2, 1, "John Doe", Channel::Whatsapp,
            "Thank you doctor, I will review them.",
            at(2025, 12, 10, 11, 15), Direction::Inbound),
        message(3, 2, "Jane Smith", Channel::Email,
            "Your next appointment is scheduled for Jan 5th.",
            at(2025, 12, 8, 9, 0), Direction::Outbound),
        message(4, 3, "Michael Johnson", Channel::Whatsapp,
            "Please remember to take your medication.",
            at(2025, 12, 5, 14, 20), Direction::Outbound),
    ]
}

pub fn sales_reports() -> Vec<SalesReport> {
    [
        ("Jul 2025", 2400, 34),
        ("Aug 2025", 3100, 41),
        ("Sep 2025", 2800, 38),
        ("Oct 2025", 3500, 46),
        ("Nov 2025", 4200, 55),
        ("Dec 2025", 4800, 62),
    ]
    .iter()
    .map(|(month, revenue, subscriptions)| SalesReport {
        month: month.to_string(),
        revenue: *revenue,
        subscriptions: *subscriptions,
    })
    .collect()
}

pub fn health_categories() -> Vec<HealthCategory> {
    [
        ("General Consultation", "Primary care and general health assessments for all ages.", "stethoscope"),
        ("Chronic Disease Management", "Ongoing care for diabetes, hypertension, and other chronic conditions.", "heart-pulse"),
        ("Respiratory Care", "Treatment for asthma, COPD, COVID-19, and other pulmonary issues.", "wind"),
        ("Dermatology", "Skin conditions, eczema, ulcers, and wound care.", "shield"),
        ("Pain Management", "Back pain, migraines, muscle pain, and chronic pain solutions.", "zap"),
        ("Reproductive Health", "Reproductive disorders, post-natal care, and family planning.", "baby"),
        ("Oncology Support", "Support for renal, prostate, throat cancers, and brain tumors.", "activity"),
        ("Emergency & Bites", "Snake bites, dog bites, burns, stings, and emergency response.", "alert-triangle"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (name, description, icon))| HealthCategory {
        id: (i + 1).to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
    })
    .collect()
}

pub fn testimonials() -> Vec<Testimonial> {
    [
        ("Mary K.", "Global Healer Online has completely changed how I manage my diabetes. The consultations are thorough and the doctors genuinely care.", 5),
        ("Peter O.", "Quick, professional, and affordable. I got the care I needed from the comfort of my home.", 5),
        ("Grace N.", "The family plan is incredible value. All five of us are covered and the support is amazing.", 4),
    ]
    .iter()
    .enumerate()
    .map(|(i, (name, text, rating))| Testimonial {
        id: (i + 1).to_string(),
        name: name.to_string(),
        text: text.to_string(),
        rating: *rating,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(AILMENTS.len(), 24);
        assert_eq!(plans().len(), 2);
        assert_eq!(patients().len(), 5);
        assert_eq!(messages().len(), 4);
        assert_eq!(sales_reports().len(), 6);
        assert_eq!(health_categories().len(), 8);
        assert_eq!(testimonials().len(), 3);
    }

    #[test]
    fn test_family_plan() {
        let family = plans().into_iter().find(|p| p.id == "family").unwrap();
        assert_eq!(family.name, "Family Kit");
        assert_eq!(family.price, 30.0);
        assert!(family.recommended);
    }

    #[test]
    fn test_record_ids() {
        let records = patients();
        assert_eq!(records[0].id, "rec-001");
        assert_eq!(records[4].patient_id, "patient-005");
        assert_eq!(messages()[1].sent_at.to_string(), "2025-12-10 11:15:00");
    }

    #[test]
    fn test_record_statuses() {
        let records = patients();
        assert_eq!(records[2].consultation_status, ConsultationStatus::Pending);
        assert_eq!(records[2].membership_status, MembershipStatus::Active);
        assert_eq!(records[3].membership_status, MembershipStatus::Inactive);
        assert_eq!(records[1].consultation_status, ConsultationStatus::Completed);
    }
}
