//! End-to-end walks through the registration and intake wizards over HTTP

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt;

mod common;
use common::{app, form};

const TAB: &str = "wizard-tab";

async fn send(app: &Router, method: &str, uri: &str, pairs: &[(&str, &str)]) -> (StatusCode, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("healer_tab={}", TAB))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form(pairs)))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn transaction_id(html: &str) -> Option<String> {
    let start = html.find("TXN-")?;
    let id: String = html[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    Some(id)
}

#[tokio::test]
async fn test_family_plan_registration() {
    let app = app();

    let (status, html) = send(&app, "GET", "/register?plan=family", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Create your account"));

    // mismatched passwords keep the account step
    let (_, html) = send(
        &app,
        "POST",
        "/register",
        &[("name", "Ada Lovelace"), ("email", "ada@example.com"), ("password", "secret1"), ("confirmPassword", "secret2"), ("action", "next")],
    )
    .await;
    assert!(html.contains("Passwords do not match"));

    let (_, html) = send(
        &app,
        "POST",
        "/register",
        &[("name", "Ada Lovelace"), ("email", "ada@example.com"), ("password", "secret1"), ("confirmPassword", "secret1"), ("action", "next")],
    )
    .await;
    assert!(html.contains("Choose your plan"));
    assert!(html.contains(r#"value="family" checked"#));

    let (_, html) = send(&app, "POST", "/register", &[("plan", "family"), ("action", "next")]).await;
    assert!(html.contains("Payment details"));
    assert!(html.contains("$30.00"));

    // missing CVV is a field error, no charge attempted
    let (_, html) = send(
        &app,
        "POST",
        "/register",
        &[("cardName", "Ada Lovelace"), ("cardNumber", "4242424242424242"), ("expiry", "1228"), ("cvv", ""), ("action", "pay")],
    )
    .await;
    assert!(html.contains("CVV is required"));

    let (_, html) = send(
        &app,
        "POST",
        "/register",
        &[("cardName", "Ada Lovelace"), ("cardNumber", "4242 4242 4242 4242"), ("expiry", "12/28"), ("cvv", "123"), ("action", "pay")],
    )
    .await;
    assert!(html.contains("Family Kit"));
    assert!(html.contains("$30.00"));
    let txn = transaction_id(&html).expect("transaction id shown");
    let digits = txn.strip_prefix("TXN-").unwrap();
    assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));

    // the new account is signed in
    let (status, _) = send(&app, "GET", "/dashboard", &[]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_short_card_number_is_reported_inline() {
    let app = app();
    send(&app, "GET", "/register?plan=individual", &[]).await;
    send(
        &app,
        "POST",
        "/register",
        &[("name", "Bo"), ("email", "bo@example.com"), ("password", "secret1"), ("confirmPassword", "secret1")],
    )
    .await;
    send(&app, "POST", "/register", &[("plan", "individual"), ("action", "next")]).await;

    let (_, html) = send(
        &app,
        "POST",
        "/register",
        &[("cardName", "Bo"), ("cardNumber", "4242 4242"), ("expiry", "12/28"), ("cvv", "123"), ("action", "pay")],
    )
    .await;
    assert!(html.contains("Invalid card number"));
    assert!(html.contains("Payment details"));

    let (_, html) = send(&app, "POST", "/register", &[("action", "back")]).await;
    assert!(html.contains("Choose your plan"));
    assert!(!html.contains("Invalid card number"));
}

#[tokio::test]
async fn test_intake_reaches_success_view() {
    let app = app();
    send(&app, "POST", "/login", &[("email", "john@example.com"), ("password", "pw"), ("role", "patient")]).await;

    let (status, html) = send(&app, "GET", "/dashboard/intake", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Step 1 - Personal Information"));

    let (_, html) = send(&app, "POST", "/dashboard/intake", &[("action", "next")]).await;
    assert!(html.contains("Please select your gender"));
    assert!(html.contains("You must confirm you are 18 or older"));
    assert!(html.contains("Please enter your age"));

    let (_, html) = send(
        &app,
        "POST",
        "/dashboard/intake",
        &[("gender", "Female"), ("ageConfirm", "true"), ("age", "25"), ("action", "next")],
    )
    .await;
    assert!(html.contains("Step 2 - Medical History"));

    let (_, html) = send(
        &app,
        "POST",
        "/dashboard/intake",
        &[
            ("medicalHistory", "Seasonal allergies"),
            ("chronicCondition", "No"),
            ("causeOfInfection", ""),
            ("currentCondition", "Mild congestion"),
            ("otherTreatments", ""),
            ("action", "next"),
        ],
    )
    .await;
    assert!(html.contains("Step 3 - Ailments"));

    // filtering keeps earlier picks
    let (_, html) = send(
        &app,
        "POST",
        "/dashboard/intake",
        &[("ailments", "Headache (with Migraine)"), ("ailmentQuery", "flu"), ("action", "filter")],
    )
    .await;
    assert!(html.contains("Flu, COVID-19"));
    assert!(html.contains(r#"type="hidden" name="ailments" value="Headache (with Migraine)""#));

    let (_, html) = send(
        &app,
        "POST",
        "/dashboard/intake",
        &[("ailments", "Headache (with Migraine)"), ("ailments", "Flu, COVID-19 (all variants), Monkeypox, Smallpox"), ("action", "next")],
    )
    .await;
    assert!(html.contains("Step 4 - Review"));
    assert!(html.contains("Female"));
    assert!(html.contains("N/A"));
    assert!(html.contains("None"));

    let (_, html) = send(&app, "POST", "/dashboard/intake", &[("action", "submit")]).await;
    assert!(html.contains("Form Submitted Successfully!"));

    let (_, html) = send(&app, "POST", "/dashboard/intake", &[("action", "restart")]).await;
    assert!(html.contains("Step 1 - Personal Information"));
}

#[tokio::test]
async fn test_intake_age_bounds() {
    let app = app();
    send(&app, "POST", "/login", &[("email", "john@example.com"), ("password", "pw"), ("role", "patient")]).await;
    send(&app, "GET", "/dashboard/intake", &[]).await;

    for age in ["17", "81", "abc"] {
        let (_, html) = send(
            &app,
            "POST",
            "/dashboard/intake",
            &[("gender", "Male"), ("ageConfirm", "true"), ("age", age), ("action", "next")],
        )
        .await;
        assert!(html.contains("Age must be between 18 and 80"), "{}", age);
    }
}
