//! Server-rendered HTML for every portal page
//!
//! Pages are plain strings built with `format!`. Everything that came from a
//! user or from the data set goes through [`escape`] first.

use crate::models::*;
use crate::wizard::intake::{Gender, IntakeStep, IntakeWizard};
use crate::wizard::registration::{RegistrationStep, RegistrationWizard};
use crate::wizard::{FieldErrors, StepState, Wizard, WizardStep};

pub const BRAND: &str = "Global Healer Online";

/// Which chrome wraps the page body
pub enum Nav<'a> {
    /// Marketing header and footer
    Site(Option<&'a User>),
    /// Patient sidebar, with the active path highlighted
    Patient(&'a User, &'a str),
    /// Admin sidebar, with the active path highlighted
    Admin(&'a User, &'a str),
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Short-lived notice text for a `?toast=` code
pub fn toast_message(code: &str) -> Option<&'static str> {
    match code {
        "sent" => Some("Message sent successfully"),
        "sent-to-team" => Some("Message sent to your care team"),
        "send-failed" => Some("Failed to send message"),
        "service-added" => Some("Service added successfully"),
        "service-updated" => Some("Service updated successfully"),
        "service-deleted" => Some("Service deleted successfully"),
        "service-failed" => Some("Failed to save service"),
        _ => None,
    }
}

// ============ Layout ============

fn page(title: &str, nav: Nav<'_>, body: &str) -> String {
    let frame = match nav {
        Nav::Site(user) => site_frame(user, body),
        Nav::Patient(user, active) => shell_frame(user, active, PATIENT_LINKS, body),
        Nav::Admin(user, active) => shell_frame(user, active, ADMIN_LINKS, body),
    };

    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - {}</title>
    <link rel="stylesheet" href="/static/portal.css">
</head>
<body>
{}
</body>
</html>"#, escape(title), BRAND, frame)
}

fn site_frame(user: Option<&User>, body: &str) -> String {
    let account = match user {
        Some(u) => format!(r#"<a href="{}">Dashboard</a>"#, u.role.home_path()),
        None => r#"<a href="/login">Sign In</a><a class="btn" href="/register">Get Started</a>"#.to_string(),
    };

    format!(r#"<header class="site-header">
    <a class="brand" href="/">{}</a>
    <nav>
        <a href="/about">About</a>
        <a href="/services">Services</a>
        <a href="/pricing">Pricing</a>
        <a href="/contact">Contact</a>
        {}
    </nav>
</header>
<main>
{}
</main>
<footer class="site-footer">&copy; 2025 {}. Care from wherever you are.</footer>"#, BRAND, account, body, BRAND)
}

const PATIENT_LINKS: &[(&str, &str)] = &[
    ("/dashboard", "Overview"),
    ("/dashboard/intake", "Medical Intake"),
    ("/dashboard/records", "My Records"),
    ("/dashboard/messages", "Messages"),
];

const ADMIN_LINKS: &[(&str, &str)] = &[
    ("/admin", "Dashboard"),
    ("/admin/patients", "Patients"),
    ("/admin/records", "Records"),
    ("/admin/reports", "Sales Reports"),
    ("/admin/messages", "Messages"),
    ("/admin/services", "Services"),
];

fn shell_frame(user: &User, active: &str, links: &[(&str, &str)], body: &str) -> String {
    let nav: String = links
        .iter()
        .map(|(href, label)| {
            let class = if *href == active { r#" class="active""# } else { "" };
            format!(r#"<a href="{}"{}>{}</a>"#, href, class, label)
        })
        .collect();

    format!(r#"<div class="shell">
<aside class="sidebar">
    <a class="brand" href="/">{}</a>
    {}
    <div class="who">
        <p><strong>{}</strong></p>
        <p>{}</p>
        <form method="post" action="/logout"><button class="btn secondary" type="submit">Sign Out</button></form>
    </div>
</aside>
<section class="content">
{}
</section>
</div>"#, BRAND, nav, escape(&user.name), user.role, body)
}

fn toast_html(toast: Option<&str>) -> String {
    toast
        .map(|t| format!(r#"<div class="toast">{}</div>"#, escape(t)))
        .unwrap_or_default()
}

fn alert_html(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<div class="alert">{}</div>"#, escape(e)))
        .unwrap_or_default()
}

fn field_error(errors: &FieldErrors, field: &str) -> String {
    errors
        .get(field)
        .map(|e| format!(r#"<p class="field-error">{}</p>"#, escape(e)))
        .unwrap_or_default()
}

fn step_bar<S: WizardStep>(wizard: &Wizard<S>) -> String {
    let items: String = wizard
        .progress()
        .into_iter()
        .map(|(step, state)| {
            let class = match state {
                StepState::Done => "done",
                StepState::Current => "current",
                StepState::Upcoming => "upcoming",
            };
            format!(r#"<li class="{}">{}</li>"#, class, step.label())
        })
        .collect();
    format!(r#"<ol class="steps">{}</ol>"#, items)
}

fn empty_state(title: &str, hint: &str) -> String {
    format!(r#"<div class="empty"><h3>{}</h3><p>{}</p></div>"#, title, hint)
}

fn search_form(action: &str, query: &str, placeholder: &str) -> String {
    format!(
        r#"<form method="get" action="{}" class="field"><input type="search" name="q" value="{}" placeholder="{}"></form>"#,
        action,
        escape(query),
        placeholder
    )
}

fn badge(value: &str) -> String {
    format!(r#"<span class="badge {}">{}</span>"#, value, value)
}

fn plan_card(plan: &MembershipPlan, action: &str) -> String {
    let features: String = plan
        .features
        .iter()
        .map(|f| format!("<li>{}</li>", escape(f)))
        .collect();
    let class = if plan.recommended { "card recommended" } else { "card" };
    let tag = if plan.recommended { r#"<span class="badge active">Recommended</span>"# } else { "" };

    format!(r#"<div class="{}">
    {}
    <h3>{}</h3>
    <p class="price">{}<span class="muted"> / {}</span></p>
    <ul>{}</ul>
    {}
</div>"#, class, tag, escape(&plan.name), plan.amount(), escape(&plan.period), features, action)
}

// ============ Marketing pages ============

pub fn home(
    user: Option<&User>,
    plans: &[MembershipPlan],
    categories: &[HealthCategory],
    testimonials: &[Testimonial],
) -> String {
    let category_cards: String = categories
        .iter()
        .take(4)
        .map(|c| format!(r#"<div class="card"><h3>{}</h3><p class="muted">{}</p></div>"#, escape(&c.name), escape(&c.description)))
        .collect();
    let plan_cards: String = plans
        .iter()
        .map(|p| plan_card(p, &format!(r#"<a class="btn" href="/register?plan={}">Choose {}</a>"#, p.id, escape(&p.name))))
        .collect();
    let stories: String = testimonials
        .iter()
        .map(|t| {
            format!(
                r#"<div class="card"><p>{}</p><p class="muted">{} &middot; {}</p></div>"#,
                escape(&t.text),
                escape(&t.name),
                "★".repeat(t.rating as usize)
            )
        })
        .collect();

    let body = format!(r#"<section class="hero">
    <p class="muted">Trusted by 2,000+ patients</p>
    <h1>Healthcare from wherever you are</h1>
    <p>Consult qualified practitioners online, keep your records in one place and stay in touch by email or WhatsApp.</p>
    <p><a class="btn" href="/register">Get Started</a> <a class="btn secondary" href="/services">View Services</a></p>
</section>
<div class="container">
    <h2>How {} Works</h2>
    <div class="grid">
        <div class="card"><h3>1. Choose a plan</h3><p class="muted">Individual or Family Kit membership.</p></div>
        <div class="card"><h3>2. Complete your intake</h3><p class="muted">Tell us about your history and current ailments.</p></div>
        <div class="card"><h3>3. Consult online</h3><p class="muted">Our team reviews your record and reaches out.</p></div>
    </div>
    <h2>Our Health Categories</h2>
    <div class="grid">{}</div>
    <p><a href="/services">View All Services</a></p>
    <h2>Membership</h2>
    <div class="grid">{}</div>
    <h2>What Our Patients Say</h2>
    <div class="grid">{}</div>
</div>"#, BRAND, category_cards, plan_cards, stories);

    page("Home", Nav::Site(user), &body)
}

pub fn about(user: Option<&User>) -> String {
    let body = format!(r#"<div class="container">
    <h1>About {}</h1>
    <p class="muted">We bring licensed practitioners and patients together online so that distance and waiting rooms stop standing between people and care.</p>
    <h2>Meet Our Team</h2>
    <div class="grid">
        <div class="card"><h3>Medical Team</h3><p class="muted">General practitioners and specialists reviewing every intake record.</p></div>
        <div class="card"><h3>Care Coordinators</h3><p class="muted">Keeping in touch with patients over email and WhatsApp.</p></div>
        <div class="card"><h3>Support</h3><p class="muted">Helping families manage memberships and appointments.</p></div>
    </div>
</div>"#, BRAND);
    page("About", Nav::Site(user), &body)
}

pub fn services(user: Option<&User>, categories: &[HealthCategory]) -> String {
    let cards: String = categories
        .iter()
        .map(|c| format!(r#"<div class="card"><h3>{}</h3><p class="muted">{}</p></div>"#, escape(&c.name), escape(&c.description)))
        .collect();
    let body = format!(r#"<div class="container">
    <h1>Our Services</h1>
    <p class="muted">Comprehensive care across all major health areas</p>
    <div class="grid">{}</div>
</div>"#, cards);
    page("Services", Nav::Site(user), &body)
}

pub fn pricing(user: Option<&User>, plans: &[MembershipPlan]) -> String {
    let cards: String = plans
        .iter()
        .map(|p| plan_card(p, &format!(r#"<a class="btn" href="/register?plan={}">Get Started</a>"#, p.id)))
        .collect();
    let body = format!(r#"<div class="container">
    <h1>Simple, Transparent Pricing</h1>
    <p class="muted">Pick the membership that fits you or your family.</p>
    <div class="grid">{}</div>
</div>"#, cards);
    page("Pricing", Nav::Site(user), &body)
}

pub struct ContactView<'a> {
    pub form: &'a ContactForm,
    pub error: Option<&'a str>,
    pub sent: bool,
}

pub fn contact(user: Option<&User>, view: &ContactView<'_>) -> String {
    let panel = if view.sent {
        r#"<div class="card"><h3>Message Sent!</h3><p class="muted">We will get back to you shortly.</p><p><a href="/contact">Send another message</a></p></div>"#.to_string()
    } else {
        format!(r#"<form class="card" method="post" action="/contact">
    {}
    <div class="field"><label for="name">Name</label><input type="text" id="name" name="name" value="{}" placeholder="Your full name"></div>
    <div class="field"><label for="email">Email</label><input type="email" id="email" name="email" value="{}" placeholder="you@example.com"></div>
    <div class="field"><label for="subject">Subject</label><input type="text" id="subject" name="subject" value="{}" placeholder="What is this about?"></div>
    <div class="field"><label for="message">Message</label><textarea id="message" name="message" rows="5" placeholder="Tell us how we can help...">{}</textarea></div>
    <button class="btn" type="submit">Send Message</button>
</form>"#,
            alert_html(view.error),
            escape(&view.form.name),
            escape(&view.form.email),
            escape(&view.form.subject),
            escape(&view.form.message))
    };

    let body = format!(r#"<div class="container">
    <h1>Contact Us</h1>
    <p class="muted">Questions about membership or care? Write to us.</p>
    {}
</div>"#, panel);
    page("Contact", Nav::Site(user), &body)
}

// ============ Authentication ============

pub fn login(role: UserRole, email: &str, error: Option<&str>) -> String {
    let checked = |r: UserRole| if r == role { " checked" } else { "" };
    let body = format!(r#"<div class="container" style="max-width: 440px">
<form class="card" method="post" action="/login">
    <h1>Welcome Back</h1>
    <p class="muted">Sign in to your account</p>
    {}
    <div class="field inline">
        <label><input type="radio" name="role" value="patient"{}> Patient</label>
        <label><input type="radio" name="role" value="admin"{}> Admin</label>
    </div>
    <div class="field"><label for="email">Email</label><input type="email" id="email" name="email" value="{}"></div>
    <div class="field"><label for="password">Password</label><input type="password" id="password" name="password"></div>
    <button class="btn" type="submit">Sign In</button>
    <p class="muted">No account yet? <a href="/register">Register</a></p>
</form>
</div>"#,
        alert_html(error),
        checked(UserRole::Patient),
        checked(UserRole::Admin),
        escape(email));
    page("Sign In", Nav::Site(None), &body)
}

pub fn register(user: Option<&User>, wizard: &RegistrationWizard, plans: &[MembershipPlan]) -> String {
    let errors = wizard.errors();
    let step_body = match wizard.step() {
        RegistrationStep::Account => {
            let account = wizard.account();
            format!(r#"<h2>Create your account</h2>
    <div class="field"><label for="name">Full Name</label><input type="text" id="name" name="name" value="{}">{}</div>
    <div class="field"><label for="email">Email</label><input type="email" id="email" name="email" value="{}">{}</div>
    <div class="field"><label for="password">Password</label><input type="password" id="password" name="password">{}</div>
    <div class="field"><label for="confirmPassword">Confirm Password</label><input type="password" id="confirmPassword" name="confirmPassword">{}</div>
    <div class="actions"><span></span><button class="btn" type="submit" name="action" value="next">Continue</button></div>"#,
                escape(&account.name),
                field_error(errors, "name"),
                escape(&account.email),
                field_error(errors, "email"),
                field_error(errors, "password"),
                field_error(errors, "confirmPassword"))
        }
        RegistrationStep::Plan => {
            let options: String = plans
                .iter()
                .map(|p| {
                    let checked = if p.id == wizard.selected_plan() { " checked" } else { "" };
                    plan_card(p, &format!(r#"<label><input type="radio" name="plan" value="{}"{}> Select {}</label>"#, p.id, checked, escape(&p.name)))
                })
                .collect();
            format!(r#"<h2>Choose your plan</h2>
    <div class="grid">{}</div>
    {}
    <div class="actions">
        <button class="btn secondary" type="submit" name="action" value="back">Back</button>
        <button class="btn" type="submit" name="action" value="next">Continue to Payment</button>
    </div>"#, options, field_error(errors, "plan"))
        }
        RegistrationStep::Payment => {
            let payment = wizard.payment();
            let summary = plans
                .iter()
                .find(|p| p.id == wizard.selected_plan())
                .map(|p| format!(r#"<p class="muted">{} plan: <strong>{}</strong> / {}</p>"#, escape(&p.name), p.amount(), escape(&p.period)))
                .unwrap_or_default();
            format!(r#"<h2>Payment details</h2>
    {}
    <div class="field"><label for="cardName">Name on Card</label><input type="text" id="cardName" name="cardName" value="{}">{}</div>
    <div class="field"><label for="cardNumber">Card Number</label><input type="text" id="cardNumber" name="cardNumber" value="{}" placeholder="1234 5678 9012 3456" maxlength="19">{}</div>
    <div class="field"><label for="expiry">Expiry</label><input type="text" id="expiry" name="expiry" value="{}" placeholder="MM/YY" maxlength="5">{}</div>
    <div class="field"><label for="cvv">CVV</label><input type="password" id="cvv" name="cvv" placeholder="123" maxlength="4">{}</div>
    <div class="actions">
        <button class="btn secondary" type="submit" name="action" value="back">Back</button>
        <button class="btn" type="submit" name="action" value="pay">Pay Now</button>
    </div>"#,
                summary,
                escape(&payment.card_name),
                field_error(errors, "cardName"),
                escape(&payment.card_number),
                field_error(errors, "cardNumber"),
                escape(&payment.expiry),
                field_error(errors, "expiry"),
                field_error(errors, "cvv"))
        }
        RegistrationStep::Success => match wizard.confirmation() {
            Some(c) => format!(r#"<h2>Welcome aboard!</h2>
    <p>Your membership is active.</p>
    <table>
        <tr><th>Plan</th><td>{}</td></tr>
        <tr><th>Amount</th><td>{} / {}</td></tr>
        <tr><th>Transaction ID</th><td>{}</td></tr>
    </table>
    <p><a class="btn" href="/dashboard">Go to Dashboard</a></p>"#,
                escape(&c.plan_name),
                c.amount,
                escape(&c.period),
                escape(&c.transaction_id)),
            None => r#"<p><a class="btn" href="/dashboard">Go to Dashboard</a></p>"#.to_string(),
        },
    };

    let body = format!(r#"<div class="container" style="max-width: 760px">
    <h1>Create Your Account</h1>
    {}
    {}
    <form class="card" method="post" action="/register">
    {}
    </form>
    <p class="muted">Already have an account? <a href="/login">Sign in</a></p>
</div>"#, step_bar(wizard.wizard()), alert_html(wizard.error()), step_body);
    page("Register", Nav::Site(user), &body)
}

// ============ Patient dashboard ============

pub fn patient_dashboard(user: &User, overview: &PatientOverview) -> String {
    let body = format!(r#"<h1>Welcome back, {}</h1>
<p class="muted">Here is an overview of your health account.</p>
<div class="grid">
    <div class="card"><p class="muted">Subscription</p><p class="stat">{}</p>{}</div>
    <div class="card"><p class="muted">Consultation</p>{}</div>
    <div class="card"><p class="muted">Records</p><p class="stat">{}</p></div>
    <div class="card"><p class="muted">Next Appointment</p><p class="stat">{}</p></div>
</div>
<div class="grid" style="margin-top: 1rem">
    <div class="card"><h3>Medical Intake</h3><p class="muted">Complete or update your medical intake form.</p><a class="btn" href="/dashboard/intake">Start Intake</a></div>
    <div class="card"><h3>Messages</h3><p class="muted">Reach your care team by email or WhatsApp.</p><a class="btn secondary" href="/dashboard/messages">Open Messages</a></div>
</div>"#,
        escape(&user.name),
        escape(&overview.plan),
        badge(overview.subscription_status.as_str()),
        badge(overview.consultation_status.as_str()),
        overview.submitted_records,
        overview.next_appointment.format("%b %-d, %Y"));
    page("Dashboard", Nav::Patient(user, "/dashboard"), &body)
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

pub fn intake(user: &User, wizard: &IntakeWizard) -> String {
    if let Some(receipt) = wizard.receipt() {
        let body = format!(r#"<div class="card" style="text-align: center">
    <h2>Form Submitted Successfully!</h2>
    <p class="muted">Your medical intake has been received as {}. Our team will review it shortly.</p>
    <form method="post" action="/dashboard/intake"><button class="btn" type="submit" name="action" value="restart">Submit Another Form</button></form>
</div>"#, escape(&receipt.record_id));
        return page("Medical Intake", Nav::Patient(user, "/dashboard/intake"), &body);
    }

    let form = wizard.form();
    let errors = wizard.errors();
    let step = wizard.step();

    let fields = match step {
        IntakeStep::PersonalInfo => {
            let genders: String = Gender::ALL
                .iter()
                .map(|g| {
                    let checked = if form.gender == g.label() { " checked" } else { "" };
                    format!(r#"<label><input type="radio" name="gender" value="{}"{}> {}</label>"#, g.label(), checked, g.label())
                })
                .collect();
            format!(r#"<div class="field inline"><label>Gender</label><br>{}{}</div>
    <div class="field"><label><input type="checkbox" name="ageConfirm" value="true"{}> I confirm that I am 18 years or older</label>{}</div>
    <div class="field"><label for="age">Age</label><input type="number" id="age" name="age" value="{}" placeholder="Enter your age">{}</div>"#,
                genders,
                field_error(errors, "gender"),
                if form.age_confirm { " checked" } else { "" },
                field_error(errors, "ageConfirm"),
                escape(&form.age),
                field_error(errors, "age"))
        }
        IntakeStep::MedicalHistory => {
            let yes_no: String = ["Yes", "No"]
                .iter()
                .map(|v| {
                    let checked = if form.chronic_condition == *v { " checked" } else { "" };
                    format!(r#"<label><input type="radio" name="chronicCondition" value="{}"{}> {}</label>"#, v, checked, v)
                })
                .collect();
            format!(r#"<div class="field"><label for="medicalHistory">Medical history (last 5 years)</label><textarea id="medicalHistory" name="medicalHistory" rows="4" placeholder="Describe any medical conditions, surgeries, or treatments in the last 5 years...">{}</textarea>{}</div>
    <div class="field inline"><label>Do you have a chronic condition?</label><br>{}{}</div>
    <div class="field"><label for="causeOfInfection">Cause of infection</label><input type="text" id="causeOfInfection" name="causeOfInfection" value="{}" placeholder="Describe cause of infection, or N/A"></div>
    <div class="field"><label for="currentCondition">Current condition</label><textarea id="currentCondition" name="currentCondition" rows="3" placeholder="Describe your current health condition...">{}</textarea>{}</div>
    <div class="field"><label for="otherTreatments">Other treatments</label><textarea id="otherTreatments" name="otherTreatments" rows="3" placeholder="List any other treatments or medications you are currently using...">{}</textarea></div>"#,
                escape(&form.medical_history),
                field_error(errors, "medicalHistory"),
                yes_no,
                field_error(errors, "chronicCondition"),
                escape(&form.cause_of_infection),
                escape(&form.current_condition),
                field_error(errors, "currentCondition"),
                escape(&form.other_treatments))
        }
        IntakeStep::Ailments => {
            let visible = wizard.filtered_ailments();
            let options: String = if visible.is_empty() {
                r#"<p class="muted">No ailments match your search</p>"#.to_string()
            } else {
                visible
                    .iter()
                    .map(|a| {
                        let checked = if form.ailments.iter().any(|s| s == a) { " checked" } else { "" };
                        format!(r#"<label><input type="checkbox" name="ailments" value="{}"{}> {}</label>"#, escape(a), checked, escape(a))
                    })
                    .collect()
            };
            // selections hidden by the current filter still have to be posted back
            let carried: String = form
                .ailments
                .iter()
                .filter(|a| !visible.contains(&a.as_str()))
                .map(|a| format!(r#"<input type="hidden" name="ailments" value="{}">"#, escape(a)))
                .collect();
            format!(r#"<div class="field"><input type="search" name="ailmentQuery" value="{}" placeholder="Search ailments..."> <button class="btn secondary" type="submit" name="action" value="filter">Search</button></div>
    <p class="muted">{} selected</p>
    <div class="ailments">{}</div>{}
    {}"#,
                escape(wizard.ailment_query()),
                form.ailments.len(),
                options,
                carried,
                field_error(errors, "ailments"))
        }
        IntakeStep::Review => {
            let ailments: String = form.ailments.iter().map(|a| format!("<li>{}</li>", escape(a))).collect();
            format!(r#"<table>
        <tr><th>Gender</th><td>{}</td></tr>
        <tr><th>Age</th><td>{}</td></tr>
        <tr><th>Medical history</th><td>{}</td></tr>
        <tr><th>Chronic condition</th><td>{}</td></tr>
        <tr><th>Cause of infection</th><td>{}</td></tr>
        <tr><th>Current condition</th><td>{}</td></tr>
        <tr><th>Other treatments</th><td>{}</td></tr>
        <tr><th>Ailments</th><td><ul>{}</ul></td></tr>
    </table>"#,
                escape(&form.gender),
                escape(&form.age),
                escape(&form.medical_history),
                escape(&form.chronic_condition),
                escape(or_default(&form.cause_of_infection, "N/A")),
                escape(&form.current_condition),
                escape(or_default(&form.other_treatments, "None")),
                ailments)
        }
    };

    let back = if wizard.wizard().is_first() {
        "<span></span>".to_string()
    } else {
        r#"<button class="btn secondary" type="submit" name="action" value="back">Back</button>"#.to_string()
    };
    let forward = if step == IntakeStep::Review {
        r#"<button class="btn" type="submit" name="action" value="submit">Submit Form</button>"#
    } else {
        r#"<button class="btn" type="submit" name="action" value="next">Next</button>"#
    };

    let body = format!(r#"<h1>Medical Intake Form</h1>
<p class="muted">Please complete all steps so our team can review your case.</p>
{}
<form class="card" method="post" action="/dashboard/intake">
    <h2>{}</h2>
    {}
    <div class="actions">{}{}</div>
</form>"#, step_bar(wizard.wizard()), step.title(), fields, back, forward);
    page("Medical Intake", Nav::Patient(user, "/dashboard/intake"), &body)
}

fn record_card(record: &PatientRecord) -> String {
    let ailments: String = record
        .ailments
        .iter()
        .map(|a| format!(r#"<span class="badge">{}</span> "#, escape(a)))
        .collect();
    format!(r#"<div class="card">
    <p class="muted">{} &middot; submitted {}</p>
    <p>{}</p>
    <p><strong>Current condition:</strong> {}</p>
    <p><strong>Other treatments:</strong> {}</p>
    <p>{}</p>
    {}
</div>"#,
        escape(&record.id),
        record.submitted_at,
        escape(&record.medical_history),
        escape(&record.current_condition),
        escape(&record.other_treatments),
        ailments,
        badge(record.consultation_status.as_str()))
}

pub fn patient_records(user: &User, records: &[PatientRecord]) -> String {
    let list = if records.is_empty() {
        empty_state("No Records Yet", r#"Complete your <a href="/dashboard/intake">medical intake form</a> to create your first record."#)
    } else {
        records.iter().map(record_card).collect()
    };
    let body = format!(r#"<h1>My Records</h1>
<p class="muted">Your submitted medical intake records</p>
{}"#, list);
    page("My Records", Nav::Patient(user, "/dashboard/records"), &body)
}

fn message_item(message: &Message) -> String {
    let direction = match message.direction {
        Direction::Outbound => "Sent",
        Direction::Inbound => "Received",
    };
    format!(r#"<div class="message">
    <p class="meta"><strong>{}</strong> &middot; {} &middot; {} &middot; {}</p>
    <p>{}</p>
</div>"#,
        escape(&message.patient_name),
        message.channel.label(),
        direction,
        message.sent_at.format("%b %-d, %Y %H:%M"),
        escape(&message.content))
}

pub fn patient_messages(user: &User, messages: &[Message], toast: Option<&str>) -> String {
    let list = if messages.is_empty() {
        empty_state("No Messages Yet", "Send a message to your care team to get started.")
    } else {
        messages.iter().map(message_item).collect()
    };
    let body = format!(r#"<h1>Messages</h1>
<p class="muted">Communicate with your care team via email and WhatsApp</p>
{}
<form class="card" method="post" action="/dashboard/messages">
    <div class="field"><textarea name="content" rows="3" placeholder="Type your message to your care team..."></textarea></div>
    <button class="btn" type="submit">Send Message</button>
</form>
<div class="card" style="margin-top: 1rem">{}</div>"#, toast_html(toast), list);
    page("Messages", Nav::Patient(user, "/dashboard/messages"), &body)
}

// ============ Admin console ============

fn patient_row(record: &PatientRecord) -> String {
    format!(r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
        escape(&record.patient_name),
        escape(&record.email),
        escape(&record.membership_plan),
        badge(record.membership_status.as_str()),
        badge(record.consultation_status.as_str()),
        record.submitted_at)
}

pub fn admin_dashboard(user: &User, stats: &AdminStats, recent: &[PatientRecord]) -> String {
    let rows: String = recent.iter().take(5).map(patient_row).collect();
    let body = format!(r#"<h1>Admin Dashboard</h1>
<p class="muted">Overview of patients, subscriptions and sales</p>
<div class="grid">
    <div class="card"><p class="muted">Total Patients</p><p class="stat">{}</p></div>
    <div class="card"><p class="muted">Active Subscriptions</p><p class="stat">{}</p></div>
    <div class="card"><p class="muted">Monthly Sales</p><p class="stat">${}</p></div>
    <div class="card"><p class="muted">Pending Consultations</p><p class="stat">{}</p></div>
</div>
<h2>Recent Patients</h2>
<table>
    <tr><th>Name</th><th>Email</th><th>Plan</th><th>Status</th><th>Consultation</th><th>Submitted</th></tr>
    {}
</table>"#,
        stats.total_patients,
        stats.active_subscriptions,
        stats.monthly_sales,
        stats.pending_consultations,
        rows);
    page("Admin", Nav::Admin(user, "/admin"), &body)
}

pub fn admin_patients(user: &User, patients: &[&PatientRecord], query: &str) -> String {
    let rows = if patients.is_empty() {
        r#"<tr><td colspan="6" class="empty">No patients found</td></tr>"#.to_string()
    } else {
        patients.iter().map(|p| patient_row(p)).collect()
    };
    let body = format!(r#"<h1>Patients</h1>
<p class="muted">All registered patients</p>
{}
<table>
    <tr><th>Name</th><th>Email</th><th>Plan</th><th>Status</th><th>Consultation</th><th>Submitted</th></tr>
    {}
</table>"#, search_form("/admin/patients", query, "Search patients..."), rows);
    page("Patients", Nav::Admin(user, "/admin/patients"), &body)
}

fn record_detail(record: &PatientRecord) -> String {
    let ailments: String = record.ailments.iter().map(|a| format!("<li>{}</li>", escape(a))).collect();
    format!(r#"<div class="card" style="margin-bottom: 1rem">
    <h2>{} ({})</h2>
    <table>
        <tr><th>Gender / Age</th><td>{} / {}</td></tr>
        <tr><th>Email</th><td>{}</td></tr>
        <tr><th>Medical history</th><td>{}</td></tr>
        <tr><th>Chronic condition</th><td>{}</td></tr>
        <tr><th>Cause of infection</th><td>{}</td></tr>
        <tr><th>Current condition</th><td>{}</td></tr>
        <tr><th>Other treatments</th><td>{}</td></tr>
        <tr><th>Ailments</th><td><ul>{}</ul></td></tr>
    </table>
    <p><a href="/admin/records">Close</a></p>
</div>"#,
        escape(&record.patient_name),
        escape(&record.id),
        escape(&record.gender),
        record.age,
        escape(&record.email),
        escape(&record.medical_history),
        if record.chronic_condition { "Yes" } else { "No" },
        escape(&record.cause_of_infection),
        escape(&record.current_condition),
        escape(&record.other_treatments),
        ailments)
}

pub fn admin_records(
    user: &User,
    records: &[&PatientRecord],
    query: &str,
    selected: Option<&PatientRecord>,
) -> String {
    let rows = if records.is_empty() {
        r#"<tr><td colspan="5" class="empty">No records found</td></tr>"#.to_string()
    } else {
        records
            .iter()
            .map(|r| {
                format!(r#"<tr><td><a href="/admin/records?id={}">{}</a></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                    escape(&r.id),
                    escape(&r.id),
                    escape(&r.patient_name),
                    escape(&r.ailments.join(", ")),
                    badge(r.consultation_status.as_str()),
                    r.submitted_at)
            })
            .collect()
    };
    let body = format!(r#"<h1>Patient Records</h1>
<p class="muted">Submitted medical intake records</p>
{}
{}
<table>
    <tr><th>Record</th><th>Patient</th><th>Ailments</th><th>Consultation</th><th>Submitted</th></tr>
    {}
</table>"#,
        selected.map(record_detail).unwrap_or_default(),
        search_form("/admin/records", query, "Search records..."),
        rows);
    page("Records", Nav::Admin(user, "/admin/records"), &body)
}

pub fn admin_reports(user: &User, reports: &[SalesReport], summary: &SalesSummary) -> String {
    let bars: String = reports
        .iter()
        .map(|r| {
            let width = if summary.max_revenue == 0 {
                0
            } else {
                r.revenue * 100 / summary.max_revenue
            };
            format!(r#"<tr><td>{}</td><td style="width: 60%"><div class="bar" style="width: {}%"></div></td><td>${}</td></tr>"#,
                escape(&r.month), width, r.revenue)
        })
        .collect();
    let rows: String = reports
        .iter()
        .map(|r| {
            format!("<tr><td>{}</td><td>${}</td><td>{}</td><td>${}</td></tr>",
                escape(&r.month), r.revenue, r.subscriptions, r.revenue_per_subscription())
        })
        .collect();

    let body = format!(r#"<h1>Sales Reports</h1>
<p class="muted">Revenue and subscription trends</p>
<div class="grid">
    <div class="card"><p class="muted">Total Revenue</p><p class="stat">${}</p></div>
    <div class="card"><p class="muted">Total Subscriptions</p><p class="stat">{}</p></div>
    <div class="card"><p class="muted">Average Monthly Revenue</p><p class="stat">${}</p></div>
</div>
<h2>Monthly Revenue</h2>
<table>{}</table>
<h2>Breakdown</h2>
<table>
    <tr><th>Month</th><th>Revenue</th><th>Subscriptions</th><th>Revenue / Subscription</th></tr>
    {}
</table>"#,
        summary.total_revenue,
        summary.total_subscriptions,
        summary.average_revenue,
        bars,
        rows);
    page("Sales Reports", Nav::Admin(user, "/admin/reports"), &body)
}

pub fn admin_messages(
    user: &User,
    messages: &[&Message],
    patients: &[PatientRecord],
    query: &str,
    toast: Option<&str>,
) -> String {
    let options: String = patients
        .iter()
        .map(|p| format!(r#"<option value="{}">{}</option>"#, escape(&p.patient_id), escape(&p.patient_name)))
        .collect();
    let list = if messages.is_empty() {
        empty_state("No Messages", "No messages match your search.")
    } else {
        messages.iter().map(|m| message_item(m)).collect()
    };

    let body = format!(r#"<h1>Messages</h1>
<p class="muted">Send updates to patients by email or WhatsApp</p>
{}
<form class="card" method="post" action="/admin/messages">
    <div class="field"><label for="patientId">Patient</label><select id="patientId" name="patientId"><option value="">Select patient</option>{}</select></div>
    <div class="field inline">
        <label><input type="radio" name="channel" value="email" checked> Email</label>
        <label><input type="radio" name="channel" value="whatsapp"> WhatsApp</label>
    </div>
    <div class="field"><textarea name="content" rows="3" placeholder="Type your message..."></textarea></div>
    <button class="btn" type="submit">Send Message</button>
</form>
<h2>Message History</h2>
{}
<div class="card">{}</div>"#,
        toast_html(toast),
        options,
        search_form("/admin/messages", query, "Search messages..."),
        list);
    page("Messages", Nav::Admin(user, "/admin/messages"), &body)
}

pub fn admin_services(
    user: &User,
    categories: &[HealthCategory],
    editing: Option<&HealthCategory>,
    toast: Option<&str>,
) -> String {
    let (heading, id_field, name, description, submit) = match editing {
        Some(c) => (
            "Edit Service",
            format!(r#"<input type="hidden" name="id" value="{}">"#, escape(&c.id)),
            escape(&c.name),
            escape(&c.description),
            "Update Service",
        ),
        None => ("Add Service", String::new(), String::new(), String::new(), "Add Service"),
    };
    let cards: String = categories
        .iter()
        .map(|c| {
            format!(r#"<div class="card">
    <h3>{}</h3>
    <p class="muted">{}</p>
    <p>
        <a class="btn secondary" href="/admin/services?edit={}">Edit</a>
        <form method="post" action="/admin/services/{}/delete" style="display: inline"><button class="btn danger" type="submit">Delete</button></form>
    </p>
</div>"#, escape(&c.name), escape(&c.description), escape(&c.id), escape(&c.id))
        })
        .collect();

    let body = format!(r#"<h1>Health Services</h1>
<p class="muted">Manage the health categories offered to patients</p>
{}
<form class="card" method="post" action="/admin/services">
    <h2>{}</h2>
    {}
    <div class="field"><label for="svc-name">Name</label><input type="text" id="svc-name" name="name" value="{}" placeholder="Service name"></div>
    <div class="field"><label for="svc-desc">Description</label><textarea id="svc-desc" name="description" rows="3" placeholder="Describe the service...">{}</textarea></div>
    <button class="btn" type="submit">{}</button>
</form>
<div class="grid" style="margin-top: 1rem">{}</div>"#,
        toast_html(toast), heading, id_field, name, description, submit, cards);
    page("Services", Nav::Admin(user, "/admin/services"), &body)
}

pub fn not_found(user: Option<&User>) -> String {
    let body = r#"<div class="container"><div class="empty"><h1>Page not found</h1><p><a href="/">Back to home</a></p></div></div>"#;
    page("Not Found", Nav::Site(user), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_data;
    use chrono::NaiveDate;

    fn admin() -> User {
        User {
            id: "admin-001".into(),
            name: "Dr. Admin".into(),
            email: "admin@example.com".into(),
            role: UserRole::Admin,
            membership_plan: None,
            membership_status: None,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_toast_codes() {
        assert_eq!(toast_message("sent"), Some("Message sent successfully"));
        assert_eq!(toast_message("service-deleted"), Some("Service deleted successfully"));
        assert_eq!(toast_message("<script>"), None);
    }

    #[test]
    fn test_empty_tables() {
        let html = admin_patients(&admin(), &[], "zzz");
        assert!(html.contains("No patients found"));
        assert!(html.contains(r#"value="zzz""#));
        assert!(admin_records(&admin(), &[], "", None).contains("No records found"));
        assert!(admin_messages(&admin(), &[], &[], "", None).contains("No Messages"));
    }

    #[test]
    fn test_reports_page_totals() {
        let reports = mock_data::sales_reports();
        let summary = SalesSummary::from_reports(&reports);
        let html = admin_reports(&admin(), &reports, &summary);
        assert!(html.contains("$20800"));
        assert!(html.contains("width: 100%"));
    }

    #[test]
    fn test_active_nav_link() {
        let html = admin_services(&admin(), &mock_data::health_categories(), None, Some("Service added successfully"));
        assert!(html.contains(r#"<a href="/admin/services" class="active">Services</a>"#));
        assert!(html.contains(r#"<div class="toast">Service added successfully</div>"#));
    }
}
