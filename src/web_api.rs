//! JSON REST API
//!
//! Exposes the mock service layer and the session store over HTTP. The tab
//! scope comes from `?token=` when given, otherwise from the tab cookie.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::*;
use crate::search;
use crate::server::{AppState, TabScope};
use crate::service::{IntakeService, PaymentService};
use crate::wizard::intake::{IntakeForm, IntakeSubmission};

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

/// Status code for a service error
fn status_of(error: &AppError) -> StatusCode {
    match error {
        AppError::MissingField(_) | AppError::InvalidCardNumber => StatusCode::BAD_REQUEST,
        AppError::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
        AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(result: Result<T, AppError>) -> Response {
    match result {
        Ok(data) => Json(ApiResponse::ok(data)).into_response(),
        Err(e) => (status_of(&e), Json(ApiResponse::<T>::err(e))).into_response(),
    }
}

/// Tab token in the query string
#[derive(Deserialize, Default)]
pub struct AuthQuery {
    pub token: Option<String>,
}

impl AuthQuery {
    fn scope(&self, tab: &TabScope) -> String {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| tab.0.clone())
    }
}

/// Session check helper macro
macro_rules! require_auth {
    ($state:expr, $query:expr, $tab:expr) => {
        match $state.session(&$query.scope(&$tab)).current_user().cloned() {
            Some(user) => user,
            None => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(ApiResponse::<()>::err(AppError::NotAuthenticated)),
                )
                    .into_response()
            }
        }
    };
}

/// Create the API router, nested under `/api`
pub fn create_web_api_router() -> Router<AppState> {
    Router::new()
        // auth
        .route("/auth/login", post(login_api))
        .route("/auth/register", post(register_api))
        .route("/auth/logout", post(logout_api))
        .route("/auth/me", get(me_api))
        // membership
        .route("/plans", get(plans_api))
        .route("/payments", post(payment_api))
        // patient
        .route("/overview", get(overview_api))
        .route("/records", get(records_api))
        .route("/intake", post(intake_api))
        // admin
        .route("/admin/stats", get(admin_stats_api))
        .route("/patients", get(patients_api))
        .route("/patients/{id}", get(patient_api))
        .route("/reports", get(reports_api))
        .route("/messages", get(messages_api).post(send_message_api))
        .route("/categories", get(categories_api).post(create_category_api))
        .route("/categories/{id}", put(update_category_api).delete(delete_category_api))
        // public
        .route("/testimonials", get(testimonials_api))
        .route("/contact", post(contact_api))
        .route("/ailments", get(ailments_api))
}

// ============ Auth API ============

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    role: UserRole,
}

async fn login_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
    Json(payload): Json<LoginRequest>,
) -> Response {
    if let Err(e) = state
        .backend
        .api_login(&payload.email, &payload.password, payload.role)
        .await
    {
        return respond::<User>(Err(e));
    }

    let mut session = state.session(&query.scope(&tab));
    let result = session.login(&payload.email, &payload.password, payload.role).await;
    state.store_session(session);
    respond(result)
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
    Json(payload): Json<RegisterRequest>,
) -> Response {
    if let Err(e) = state
        .backend
        .api_register(&payload.name, &payload.email, &payload.password)
        .await
    {
        return respond::<User>(Err(e));
    }

    let mut session = state.session(&query.scope(&tab));
    let result = session
        .register(&payload.name, &payload.email, &payload.password, UserRole::Patient)
        .await;
    state.store_session(session);
    respond(result)
}

async fn logout_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
) -> Response {
    let scope = query.scope(&tab);
    let mut session = state.session(&scope);
    let result = session.logout();
    state.forget_tab(&scope);
    respond(result)
}

async fn me_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
) -> Response {
    let session = state.session(&query.scope(&tab));
    Json(ApiResponse::ok(session.current_user().cloned())).into_response()
}

// ============ Membership API ============

async fn plans_api(State(state): State<AppState>) -> Response {
    respond(state.backend.get_membership_plans().await)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequest {
    #[serde(default)]
    card_number: String,
    #[serde(default)]
    expiry: String,
    #[serde(default)]
    cvv: String,
    #[serde(default)]
    plan: String,
}

async fn payment_api(State(state): State<AppState>, Json(payload): Json<PaymentRequest>) -> Response {
    respond(
        state
            .backend
            .process_payment(&payload.card_number, &payload.expiry, &payload.cvv, &payload.plan)
            .await,
    )
}

// ============ Patient API ============

async fn overview_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
) -> Response {
    let user = require_auth!(state, query, tab);
    respond(state.backend.get_patient_overview(&user.id).await)
}

async fn records_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
) -> Response {
    let user = require_auth!(state, query, tab);
    respond(state.backend.get_patient_records(&user.id).await)
}

/// Validation problems come back as one message per field
#[derive(Serialize)]
struct IntakeRejection {
    errors: std::collections::BTreeMap<&'static str, String>,
}

async fn intake_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
    Json(form): Json<IntakeForm>,
) -> Response {
    require_auth!(state, query, tab);

    let submission = match IntakeSubmission::try_from(&form) {
        Ok(submission) => submission,
        Err(errors) => {
            let message = errors.values().cloned().collect::<Vec<_>>().join("; ");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse {
                    success: false,
                    data: Some(IntakeRejection { errors }),
                    error: Some(message),
                }),
            )
                .into_response();
        }
    };
    respond(state.backend.submit_medical_intake(&submission).await)
}

// ============ Admin API ============

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    token: Option<String>,
    #[serde(default)]
    q: String,
    patient_id: Option<String>,
}

impl ListQuery {
    fn auth(&self) -> AuthQuery {
        AuthQuery {
            token: self.token.clone(),
        }
    }
}

async fn admin_stats_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
) -> Response {
    require_auth!(state, query, tab);
    respond(state.backend.get_admin_stats().await)
}

async fn patients_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<ListQuery>,
) -> Response {
    require_auth!(state, query.auth(), tab);
    respond(state.backend.get_all_patients().await.map(|patients| {
        search::filter_patients(&patients, &query.q)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>()
    }))
}

async fn patient_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Path(id): Path<String>,
    Query(query): Query<AuthQuery>,
) -> Response {
    require_auth!(state, query, tab);
    respond(state.backend.get_patient_by_id(&id).await)
}

#[derive(Serialize)]
struct ReportsPayload {
    reports: Vec<SalesReport>,
    summary: SalesSummary,
}

async fn reports_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
) -> Response {
    require_auth!(state, query, tab);
    respond(state.backend.get_sales_reports().await.map(|reports| ReportsPayload {
        summary: SalesSummary::from_reports(&reports),
        reports,
    }))
}

async fn messages_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<ListQuery>,
) -> Response {
    require_auth!(state, query.auth(), tab);
    respond(
        state
            .backend
            .get_messages(query.patient_id.as_deref())
            .await
            .map(|messages| {
                search::filter_messages(&messages, &query.q)
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>()
            }),
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest {
    patient_id: String,
    channel: Channel,
    #[serde(default)]
    content: String,
}

async fn send_message_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
    Json(payload): Json<SendMessageRequest>,
) -> Response {
    require_auth!(state, query, tab);
    respond(
        state
            .backend
            .send_message(&payload.patient_id, payload.channel, &payload.content)
            .await,
    )
}

// ============ Category API ============

#[derive(Deserialize)]
struct CategoryRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

async fn categories_api(State(state): State<AppState>) -> Response {
    respond(state.backend.get_health_categories().await)
}

async fn create_category_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Query(query): Query<AuthQuery>,
    Json(payload): Json<CategoryRequest>,
) -> Response {
    require_auth!(state, query, tab);
    if payload.name.trim().is_empty() {
        return respond::<HealthCategory>(Err(AppError::MissingField("Name is required")));
    }
    respond(
        state
            .backend
            .save_health_category(None, payload.name.trim(), payload.description.trim())
            .await,
    )
}

async fn update_category_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Path(id): Path<String>,
    Query(query): Query<AuthQuery>,
    Json(payload): Json<CategoryRequest>,
) -> Response {
    require_auth!(state, query, tab);
    if payload.name.trim().is_empty() {
        return respond::<HealthCategory>(Err(AppError::MissingField("Name is required")));
    }
    respond(
        state
            .backend
            .save_health_category(Some(&id), payload.name.trim(), payload.description.trim())
            .await,
    )
}

async fn delete_category_api(
    State(state): State<AppState>,
    Extension(tab): Extension<TabScope>,
    Path(id): Path<String>,
    Query(query): Query<AuthQuery>,
) -> Response {
    require_auth!(state, query, tab);
    respond(state.backend.delete_health_category(&id))
}

// ============ Public API ============

async fn testimonials_api(State(state): State<AppState>) -> Response {
    respond(state.backend.get_testimonials().await)
}

async fn contact_api(State(state): State<AppState>, Json(form): Json<ContactForm>) -> Response {
    respond(state.backend.submit_contact_form(&form).await)
}

#[derive(Deserialize)]
struct AilmentQuery {
    #[serde(default)]
    q: String,
}

async fn ailments_api(Query(query): Query<AilmentQuery>) -> Json<ApiResponse<Vec<&'static str>>> {
    Json(ApiResponse::ok(search::filter_ailments(
        crate::mock_data::AILMENTS,
        &query.q,
    )))
}
