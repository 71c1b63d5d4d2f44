//! API routes for support-cloud

pub mod analytics;
pub mod attachments;
pub mod auth;
pub mod companies;
pub mod health;
pub mod reports;
pub mod settings;
pub mod tickets;
pub mod webhook;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::error::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::{login_rate_limit, ticket_form_rate_limit};
use crate::auth::staff_auth::staff_auth_middleware;
use crate::services::attachments::MAX_FILE_SIZE;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Inbound mail carries base64 attachments, so the webhook body may be large
const WEBHOOK_BODY_LIMIT: usize = 40 * 1024 * 1024;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Public website form (rate-limited)
    let ticket_form = Router::new()
        .route("/api/tickets", post(tickets::create_ticket))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ticket_form_rate_limit,
        ));

    let login = Router::new()
        .route("/api/auth/login", post(auth::login))
        .layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    // Resend inbound webhook (signature-verified, raw body)
    let webhook = Router::new()
        .route(
            "/api/webhooks/resend",
            post(webhook::receive).get(webhook::liveness),
        )
        .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT));

    // Admin console (staff JWT)
    let staff = Router::new()
        .route("/api/tickets", get(tickets::list_tickets))
        .route(
            "/api/tickets/{id}",
            get(tickets::get_ticket).patch(tickets::update_ticket),
        )
        .route("/api/tickets/{id}/messages", post(tickets::add_message))
        .route(
            "/api/attachments",
            post(attachments::upload).layer(DefaultBodyLimit::max(MAX_FILE_SIZE + 64 * 1024)),
        )
        .route("/api/analytics", get(analytics::get_analytics))
        .route("/api/reports/company/{id}", get(reports::company_report))
        .route(
            "/api/settings/sla",
            get(settings::get_sla).put(settings::update_sla),
        )
        .route("/api/companies", get(companies::list_companies))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            staff_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(ticket_form)
        .merge(login)
        .merge(webhook)
        .merge(staff)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
