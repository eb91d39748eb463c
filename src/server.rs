//! HTTP server (axum)
//!
//! Serves the marketing pages, the patient dashboard and the admin console.
//! Every browser tab is told apart by the `healer_tab` cookie, which scopes
//! its session record and its in-progress wizards.

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use chrono::Utc;
use rust_embed::Embed;
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::PortalConfig;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::render::{self, ContactView};
use crate::search;
use crate::service::MockBackend;
use crate::session::SessionStore;
use crate::storage::KeyValueStore;
use crate::web_api;
use crate::wizard::intake::{IntakeStep, IntakeUpdate, IntakeWizard};
use crate::wizard::registration::{AccountForm, PaymentForm, RegistrationStep, RegistrationWizard};

pub const TAB_COOKIE: &str = "healer_tab";

/// Embedded static files
#[derive(Embed)]
#[folder = "static/"]
struct StaticAssets;

/// How often idle tabs are swept
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Per-tab values stamped with their last use
struct TabSlots<T> {
    slots: Mutex<HashMap<String, (T, Instant)>>,
}

impl<T> TabSlots<T> {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (T, Instant)>> {
        match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn take(&self, scope: &str) -> Option<T> {
        self.lock().remove(scope).map(|(value, _)| value)
    }

    fn put(&self, scope: &str, value: T) {
        self.lock().insert(scope.to_string(), (value, Instant::now()));
    }

    fn remove(&self, scope: &str) {
        self.lock().remove(scope);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn scopes(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Drop entries last used before `cutoff`
    fn sweep(&self, cutoff: Instant) -> usize {
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|_, (_, seen)| *seen >= cutoff);
        before - slots.len()
    }
}

impl<T: Clone> TabSlots<T> {
    fn get(&self, scope: &str) -> Option<T> {
        self.lock().get_mut(scope).map(|(value, seen)| {
            *seen = Instant::now();
            value.clone()
        })
    }
}

/// Server state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub backend: Arc<MockBackend>,
    pub storage: Arc<dyn KeyValueStore>,
    /// Signed-in sessions per tab
    sessions: Arc<TabSlots<SessionStore>>,
    intake_wizards: Arc<TabSlots<IntakeWizard>>,
    registration_wizards: Arc<TabSlots<RegistrationWizard>>,
}

impl AppState {
    pub fn new(config: PortalConfig, backend: MockBackend, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            config: Arc::new(config),
            backend: Arc::new(backend),
            storage,
            sessions: Arc::new(TabSlots::new()),
            intake_wizards: Arc::new(TabSlots::new()),
            registration_wizards: Arc::new(TabSlots::new()),
        }
    }

    /// Session of a tab. Only signed-in sessions are kept in memory; a
    /// signed-out tab is restored from storage on each call.
    pub fn session(&self, scope: &str) -> SessionStore {
        if let Some(session) = self.sessions.get(scope) {
            return session;
        }
        let session = SessionStore::restore(self.storage.clone(), scope, self.backend.latency());
        if session.is_authenticated() {
            self.sessions.put(scope, session.clone());
        }
        session
    }

    /// Keep the tab's session after an identity change
    pub fn store_session(&self, session: SessionStore) {
        if session.is_authenticated() {
            let scope = session.scope().to_string();
            self.sessions.put(&scope, session);
        } else {
            self.sessions.remove(session.scope());
        }
    }

    /// Forget everything held in memory for a tab
    pub fn forget_tab(&self, scope: &str) {
        self.sessions.remove(scope);
        self.intake_wizards.remove(scope);
        self.registration_wizards.remove(scope);
    }

    /// Number of tabs with a session or a wizard held in memory
    pub fn tracked_tabs(&self) -> usize {
        self.sessions.len() + self.intake_wizards.len() + self.registration_wizards.len()
    }

    /// Evict tabs idle longer than `idle` and purge their stored records.
    /// Sessions still in use are touched first so their records survive.
    pub fn sweep_idle(&self, idle: Duration) -> AppResult<usize> {
        let Some(cutoff) = Instant::now().checked_sub(idle) else {
            return Ok(0);
        };
        let evicted = self.sessions.sweep(cutoff)
            + self.intake_wizards.sweep(cutoff)
            + self.registration_wizards.sweep(cutoff);

        for scope in self.sessions.scopes() {
            self.storage.touch(&scope)?;
        }
        let purged = match chrono::Duration::from_std(idle)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        {
            Some(stored_cutoff) => self.storage.purge_before(stored_cutoff)?,
            None => 0,
        };

        if evicted + purged > 0 {
            log::info!("Swept idle tabs: {} in memory, {} stored records", evicted, purged);
        }
        Ok(evicted + purged)
    }

    fn take_intake(&self, scope: &str) -> IntakeWizard {
        self.intake_wizards.take(scope).unwrap_or_default()
    }

    fn put_intake(&self, scope: &str, wizard: IntakeWizard) {
        self.intake_wizards.put(scope, wizard);
    }

    fn take_registration(&self, scope: &str) -> RegistrationWizard {
        self.registration_wizards.take(scope).unwrap_or_default()
    }

    fn put_registration(&self, scope: &str, wizard: RegistrationWizard) {
        self.registration_wizards.put(scope, wizard);
    }
}

/// Storage scope of the requesting tab
#[derive(Debug, Clone)]
pub struct TabScope(pub String);

/// Identity of a request that passed the guard
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Create the router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        // patient dashboard
        .route("/dashboard", get(dashboard_page))
        .route("/dashboard/intake", get(intake_page).post(intake_submit))
        .route("/dashboard/records", get(patient_records_page))
        .route("/dashboard/messages", get(patient_messages_page).post(patient_message_send))
        // admin console
        .route("/admin", get(admin_page))
        .route("/admin/patients", get(admin_patients_page))
        .route("/admin/records", get(admin_records_page))
        .route("/admin/reports", get(admin_reports_page))
        .route("/admin/messages", get(admin_messages_page).post(admin_message_send))
        .route("/admin/services", get(admin_services_page).post(admin_service_save))
        .route("/admin/services/{id}/delete", post(admin_service_delete))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_identity));

    Router::new()
        .route("/health", get(health_handler))
        // marketing pages
        .route("/", get(home_page))
        .route("/about", get(about_page))
        .route("/services", get(services_page))
        .route("/pricing", get(pricing_page))
        .route("/contact", get(contact_page).post(contact_submit))
        // authentication
        .route("/login", get(login_page).post(login_submit))
        .route("/register", get(register_page).post(register_submit))
        .route("/logout", post(logout_handler))
        .merge(protected)
        .nest("/api", web_api::create_web_api_router())
        // static files
        .route("/static/{*path}", get(static_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn(assign_tab_scope))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: AppState) -> AppResult<()> {
    let port = state.config.port;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.sweep_idle(sweeper.config.session_ttl) {
                log::warn!("Idle tab sweep failed: {}", e);
            }
        }
    });

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log::info!("HTTP server listening on http://0.0.0.0:{}", port);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Custom(format!("Server bind error: {}", e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Custom(format!("Server error: {}", e)))?;

    Ok(())
}

// ============ Middleware ============

/// Value of one cookie from the request headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn generate_tab_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Give every tab a scope id, issuing the cookie on first contact
async fn assign_tab_scope(mut req: Request, next: Next) -> Response {
    let existing = cookie_value(req.headers(), TAB_COOKIE);
    let scope = existing.clone().unwrap_or_else(generate_tab_id);
    req.extensions_mut().insert(TabScope(scope.clone()));

    let mut response = next.run(req).await;
    if existing.is_none() {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", TAB_COOKIE, scope);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

/// Dashboard and admin pages need a signed-in tab
async fn require_identity(
    State(state): State<AppState>,
    Extension(TabScope(scope)): Extension<TabScope>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.session(&scope).current_user().cloned() {
        Some(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        None => Redirect::to("/login").into_response(),
    }
}

// ============ Handlers ============

/// Health check
async fn health_handler() -> &'static str {
    "OK"
}

fn error_page(error: &AppError) -> Response {
    log::warn!("Page failed to load: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!(
            r#"<!DOCTYPE html><html lang="en"><head><meta charset="UTF-8"><title>Error</title><link rel="stylesheet" href="/static/portal.css"></head><body><div class="container"><div class="alert">{}</div><p><a href="/">Back to home</a></p></div></body></html>"#,
            render::escape(&error.to_string())
        )),
    )
        .into_response()
}

async fn home_page(State(state): State<AppState>, Extension(TabScope(scope)): Extension<TabScope>) -> Response {
    let session = state.session(&scope);
    let backend = &state.backend;
    let loaded = tokio::try_join!(
        backend.get_membership_plans(),
        backend.get_health_categories(),
        backend.get_testimonials(),
    );
    match loaded {
        Ok((plans, categories, testimonials)) => {
            Html(render::home(session.current_user(), &plans, &categories, &testimonials)).into_response()
        }
        Err(e) => error_page(&e),
    }
}

async fn about_page(State(state): State<AppState>, Extension(TabScope(scope)): Extension<TabScope>) -> Html<String> {
    Html(render::about(state.session(&scope).current_user()))
}

async fn services_page(State(state): State<AppState>, Extension(TabScope(scope)): Extension<TabScope>) -> Response {
    let session = state.session(&scope);
    match state.backend.get_health_categories().await {
        Ok(categories) => Html(render::services(session.current_user(), &categories)).into_response(),
        Err(e) => error_page(&e),
    }
}

async fn pricing_page(State(state): State<AppState>, Extension(TabScope(scope)): Extension<TabScope>) -> Response {
    let session = state.session(&scope);
    match state.backend.get_membership_plans().await {
        Ok(plans) => Html(render::pricing(session.current_user(), &plans)).into_response(),
        Err(e) => error_page(&e),
    }
}

async fn contact_page(State(state): State<AppState>, Extension(TabScope(scope)): Extension<TabScope>) -> Html<String> {
    let form = ContactForm::default();
    let view = ContactView { form: &form, error: None, sent: false };
    Html(render::contact(state.session(&scope).current_user(), &view))
}

async fn contact_submit(
    State(state): State<AppState>,
    Extension(TabScope(scope)): Extension<TabScope>,
    Form(form): Form<ContactForm>,
) -> Html<String> {
    let session = state.session(&scope);
    let result = state.backend.submit_contact_form(&form).await;
    let error = result.as_ref().err().map(|e| e.to_string());
    let view = ContactView {
        form: &form,
        error: error.as_deref(),
        sent: result.is_ok(),
    };
    Html(render::contact(session.current_user(), &view))
}

// ============ Authentication ============

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    role: String,
}

async fn login_page(State(state): State<AppState>, Extension(TabScope(scope)): Extension<TabScope>) -> Response {
    match state.session(&scope).current_user() {
        Some(user) => Redirect::to(user.role.home_path()).into_response(),
        None => Html(render::login(UserRole::Patient, "", None)).into_response(),
    }
}

/// Sign in as the chosen role. Credentials are not checked.
async fn login_submit(
    State(state): State<AppState>,
    Extension(TabScope(scope)): Extension<TabScope>,
    Form(form): Form<LoginForm>,
) -> Response {
    let role = form.role.parse().unwrap_or(UserRole::Patient);
    let mut session = state.session(&scope);
    let result = session.login(&form.email, &form.password, role).await;
    state.store_session(session);

    match result {
        Ok(user) => Redirect::to(user.role.home_path()).into_response(),
        Err(e) => {
            log::warn!("Login failed: {}", e);
            Html(render::login(role, &form.email, Some("Invalid credentials. Please try again."))).into_response()
        }
    }
}

async fn logout_handler(State(state): State<AppState>, Extension(TabScope(scope)): Extension<TabScope>) -> Response {
    let mut session = state.session(&scope);
    if let Err(e) = session.logout() {
        log::warn!("Logout failed: {}", e);
    }
    state.forget_tab(&scope);
    Redirect::to("/").into_response()
}

#[derive(Deserialize)]
struct PlanQuery {
    plan: Option<String>,
}

/// Opening the page starts a fresh sign-up, optionally with a plan chosen
async fn register_page(
    State(state): State<AppState>,
    Extension(TabScope(scope)): Extension<TabScope>,
    Query(query): Query<PlanQuery>,
) -> Response {
    let plans = match state.backend.get_membership_plans().await {
        Ok(plans) => plans,
        Err(e) => return error_page(&e),
    };
    let wizard = match query.plan.as_deref() {
        Some(plan) => RegistrationWizard::with_plan(plan),
        None => RegistrationWizard::new(),
    };
    let html = render::register(state.session(&scope).current_user(), &wizard, &plans);
    state.put_registration(&scope, wizard);
    Html(html).into_response()
}

/// Flatten a posted form into a lookup, keeping the first value of each key
fn first_values(fields: &[(String, String)]) -> HashMap<&str, &str> {
    let mut map = HashMap::new();
    for (key, value) in fields {
        map.entry(key.as_str()).or_insert(value.as_str());
    }
    map
}

async fn register_submit(
    State(state): State<AppState>,
    Extension(TabScope(scope)): Extension<TabScope>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let values = first_values(&fields);
    let field = |name: &str| values.get(name).copied().unwrap_or_default().to_string();
    let action = values.get("action").copied().unwrap_or("next");

    let plans = match state.backend.get_membership_plans().await {
        Ok(plans) => plans,
        Err(e) => return error_page(&e),
    };
    let mut wizard = state.take_registration(&scope);
    let mut session = state.session(&scope);

    match (wizard.step(), action) {
        (RegistrationStep::Account, _) => {
            wizard.set_account(AccountForm {
                name: field("name"),
                email: field("email"),
                password: field("password"),
                confirm_password: field("confirmPassword"),
            });
            wizard.submit_account(&mut session).await;
            state.store_session(session.clone());
        }
        (RegistrationStep::Plan, "back") | (RegistrationStep::Payment, "back") => {
            wizard.back();
        }
        (RegistrationStep::Plan, _) => {
            if let Some(plan) = values.get("plan") {
                wizard.select_plan(plan);
            }
            wizard.confirm_plan(&plans);
        }
        (RegistrationStep::Payment, _) => {
            wizard.set_payment(PaymentForm {
                card_number: field("cardNumber"),
                expiry: field("expiry"),
                cvv: field("cvv"),
                card_name: field("cardName"),
            });
            wizard.pay(state.backend.as_ref(), &plans).await;
        }
        (RegistrationStep::Success, _) => {}
    }

    let html = render::register(session.current_user(), &wizard, &plans);
    state.put_registration(&scope, wizard);
    Html(html).into_response()
}

// ============ Patient dashboard ============

async fn dashboard_page(State(state): State<AppState>, Extension(CurrentUser(user)): Extension<CurrentUser>) -> Response {
    match state.backend.get_patient_overview(&user.id).await {
        Ok(overview) => Html(render::patient_dashboard(&user, &overview)).into_response(),
        Err(e) => error_page(&e),
    }
}

/// Opening the page starts the questionnaire from the first step
async fn intake_page(
    State(state): State<AppState>,
    Extension(TabScope(scope)): Extension<TabScope>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Html<String> {
    let wizard = IntakeWizard::new();
    let html = render::intake(&user, &wizard);
    state.put_intake(&scope, wizard);
    Html(html)
}

/// Apply the fields posted from the current step
fn apply_intake_fields(wizard: &mut IntakeWizard, fields: &[(String, String)]) {
    let values = first_values(fields);
    let text = |name: &str| values.get(name).copied().unwrap_or_default().to_string();

    match wizard.step() {
        IntakeStep::PersonalInfo => {
            wizard.update(IntakeUpdate::Gender(text("gender")));
            wizard.update(IntakeUpdate::AgeConfirm(values.contains_key("ageConfirm")));
            wizard.update(IntakeUpdate::Age(text("age")));
        }
        IntakeStep::MedicalHistory => {
            wizard.update(IntakeUpdate::MedicalHistory(text("medicalHistory")));
            wizard.update(IntakeUpdate::ChronicCondition(text("chronicCondition")));
            wizard.update(IntakeUpdate::CauseOfInfection(text("causeOfInfection")));
            wizard.update(IntakeUpdate::CurrentCondition(text("currentCondition")));
            wizard.update(IntakeUpdate::OtherTreatments(text("otherTreatments")));
        }
        IntakeStep::Ailments => {
            let ailments = fields
                .iter()
                .filter(|(key, _)| key == "ailments")
                .map(|(_, value)| value.clone())
                .collect();
            wizard.update(IntakeUpdate::SetAilments(ailments));
            wizard.set_ailment_query(&text("ailmentQuery"));
        }
        IntakeStep::Review => {}
    }
}

async fn intake_submit(
    State(state): State<AppState>,
    Extension(TabScope(scope)): Extension<TabScope>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Html<String> {
    let action = fields
        .iter()
        .find(|(key, _)| key == "action")
        .map(|(_, value)| value.clone())
        .unwrap_or_else(|| "next".to_string());

    let mut wizard = state.take_intake(&scope);
    match action.as_str() {
        "restart" => wizard.start_over(),
        "back" => {
            apply_intake_fields(&mut wizard, &fields);
            wizard.back();
        }
        "filter" => apply_intake_fields(&mut wizard, &fields),
        "submit" => wizard.submit(state.backend.as_ref()).await,
        _ => {
            apply_intake_fields(&mut wizard, &fields);
            wizard.next();
        }
    }

    let html = render::intake(&user, &wizard);
    state.put_intake(&scope, wizard);
    Html(html)
}

async fn patient_records_page(State(state): State<AppState>, Extension(CurrentUser(user)): Extension<CurrentUser>) -> Response {
    match state.backend.get_patient_records(&user.id).await {
        Ok(records) => Html(render::patient_records(&user, &records)).into_response(),
        Err(e) => error_page(&e),
    }
}

#[derive(Deserialize, Default)]
struct ListQuery {
    #[serde(default)]
    q: String,
    toast: Option<String>,
    id: Option<String>,
    edit: Option<String>,
}

impl ListQuery {
    fn toast(&self) -> Option<&'static str> {
        self.toast.as_deref().and_then(render::toast_message)
    }
}

async fn patient_messages_page(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.backend.get_messages(Some(&user.id)).await {
        Ok(messages) => Html(render::patient_messages(&user, &messages, query.toast())).into_response(),
        Err(e) => error_page(&e),
    }
}

#[derive(Deserialize)]
struct PatientMessageForm {
    #[serde(default)]
    content: String,
}

async fn patient_message_send(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<PatientMessageForm>,
) -> Redirect {
    if form.content.trim().is_empty() {
        return Redirect::to("/dashboard/messages");
    }
    match state
        .backend
        .receive_message(&user.id, &user.name, Channel::Email, &form.content)
        .await
    {
        Ok(_) => Redirect::to("/dashboard/messages?toast=sent-to-team"),
        Err(e) => {
            log::warn!("Patient message failed: {}", e);
            Redirect::to("/dashboard/messages?toast=send-failed")
        }
    }
}

// ============ Admin console ============

async fn admin_page(State(state): State<AppState>, Extension(CurrentUser(user)): Extension<CurrentUser>) -> Response {
    let backend = &state.backend;
    match tokio::try_join!(backend.get_admin_stats(), backend.get_all_patients()) {
        Ok((stats, patients)) => Html(render::admin_dashboard(&user, &stats, &patients)).into_response(),
        Err(e) => error_page(&e),
    }
}

async fn admin_patients_page(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.backend.get_all_patients().await {
        Ok(patients) => {
            let shown = search::filter_patients(&patients, &query.q);
            Html(render::admin_patients(&user, &shown, &query.q)).into_response()
        }
        Err(e) => error_page(&e),
    }
}

async fn admin_records_page(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Response {
    let records = match state.backend.get_all_patients().await {
        Ok(records) => records,
        Err(e) => return error_page(&e),
    };
    let selected = match query.id.as_deref() {
        Some(id) => match state.backend.get_patient_by_id(id).await {
            Ok(record) => record,
            Err(e) => return error_page(&e),
        },
        None => None,
    };
    let shown = search::filter_records(&records, &query.q);
    Html(render::admin_records(&user, &shown, &query.q, selected.as_ref())).into_response()
}

async fn admin_reports_page(State(state): State<AppState>, Extension(CurrentUser(user)): Extension<CurrentUser>) -> Response {
    match state.backend.get_sales_reports().await {
        Ok(reports) => {
            let summary = SalesSummary::from_reports(&reports);
            Html(render::admin_reports(&user, &reports, &summary)).into_response()
        }
        Err(e) => error_page(&e),
    }
}

async fn admin_messages_page(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Response {
    let backend = &state.backend;
    match tokio::try_join!(backend.get_messages(None), backend.get_all_patients()) {
        Ok((messages, patients)) => {
            let shown = search::filter_messages(&messages, &query.q);
            Html(render::admin_messages(&user, &shown, &patients, &query.q, query.toast())).into_response()
        }
        Err(e) => error_page(&e),
    }
}

#[derive(Deserialize)]
struct AdminMessageForm {
    #[serde(default, rename = "patientId")]
    patient_id: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    content: String,
}

async fn admin_message_send(State(state): State<AppState>, Form(form): Form<AdminMessageForm>) -> Redirect {
    if form.patient_id.is_empty() || form.content.trim().is_empty() {
        return Redirect::to("/admin/messages");
    }
    let channel = form.channel.parse().unwrap_or(Channel::Email);
    match state.backend.send_message(&form.patient_id, channel, &form.content).await {
        Ok(_) => Redirect::to("/admin/messages?toast=sent"),
        Err(e) => {
            log::warn!("Message to {} failed: {}", form.patient_id, e);
            Redirect::to("/admin/messages?toast=send-failed")
        }
    }
}

async fn admin_services_page(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Response {
    match state.backend.get_health_categories().await {
        Ok(categories) => {
            let editing = query
                .edit
                .as_deref()
                .and_then(|id| categories.iter().find(|c| c.id == id));
            Html(render::admin_services(&user, &categories, editing, query.toast())).into_response()
        }
        Err(e) => error_page(&e),
    }
}

#[derive(Deserialize)]
struct ServiceForm {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

async fn admin_service_save(State(state): State<AppState>, Form(form): Form<ServiceForm>) -> Redirect {
    if form.name.trim().is_empty() {
        return Redirect::to("/admin/services");
    }
    let id = form.id.as_deref().filter(|id| !id.is_empty());
    match state
        .backend
        .save_health_category(id, form.name.trim(), form.description.trim())
        .await
    {
        Ok(_) if id.is_some() => Redirect::to("/admin/services?toast=service-updated"),
        Ok(_) => Redirect::to("/admin/services?toast=service-added"),
        Err(e) => {
            log::warn!("Saving health category failed: {}", e);
            Redirect::to("/admin/services?toast=service-failed")
        }
    }
}

async fn admin_service_delete(State(state): State<AppState>, Path(id): Path<String>) -> Redirect {
    match state.backend.delete_health_category(&id) {
        Ok(()) => Redirect::to("/admin/services?toast=service-deleted"),
        Err(e) => {
            log::warn!("Deleting health category failed: {}", e);
            Redirect::to("/admin/services")
        }
    }
}

// ============ Static files ============

async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    match StaticAssets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn not_found_handler(State(state): State<AppState>, Extension(TabScope(scope)): Extension<TabScope>) -> Response {
    let session = state.session(&scope);
    (StatusCode::NOT_FOUND, Html(render::not_found(session.current_user()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; healer_tab=abc123"));
        assert_eq!(cookie_value(&headers, TAB_COOKIE), Some("abc123".to_string()));
        assert_eq!(cookie_value(&headers, "missing"), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("healer_tab="));
        assert_eq!(cookie_value(&headers, TAB_COOKIE), None);
    }

    #[test]
    fn test_first_values_keeps_first() {
        let fields = vec![
            ("ailments".to_string(), "Diabetes".to_string()),
            ("ailments".to_string(), "Hypertension".to_string()),
            ("action".to_string(), "next".to_string()),
        ];
        let values = first_values(&fields);
        assert_eq!(values["ailments"], "Diabetes");
        assert_eq!(values["action"], "next");
    }

    #[test]
    fn test_generated_tab_ids_differ() {
        let a = generate_tab_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, generate_tab_id());
    }

    #[tokio::test]
    async fn test_sweep_evicts_idle_tabs() {
        let state = crate::build_state(PortalConfig::for_tests()).unwrap();
        let mut session = state.session("idle");
        session.login("a@b.c", "pw", UserRole::Patient).await.unwrap();
        state.store_session(session);
        state.put_intake("idle", IntakeWizard::new());
        assert_eq!(state.tracked_tabs(), 2);

        assert_eq!(state.sweep_idle(Duration::from_secs(3600)).unwrap(), 0);
        assert_eq!(state.tracked_tabs(), 2);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(state.sweep_idle(Duration::ZERO).unwrap(), 3);
        assert_eq!(state.tracked_tabs(), 0);
        assert!(!state.session("idle").is_authenticated());
    }

    #[tokio::test]
    async fn test_signed_out_sessions_are_not_cached() {
        let state = crate::build_state(PortalConfig::for_tests()).unwrap();
        for n in 0..10 {
            assert!(!state.session(&format!("tab-{}", n)).is_authenticated());
        }
        assert_eq!(state.tracked_tabs(), 0);
    }
}
