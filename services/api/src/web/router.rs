//! services/api/src/web/router.rs
//!
//! Assembles the axum router: public routes, bearer-protected routes, CORS,
//! request tracing and the Swagger UI.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::web::{
    agreements, assignments, auth, middleware::require_auth, payments, properties,
    rest::{health_handler, ApiDoc},
    state::AppState,
};

/// Builds the complete application router over `state`.
pub fn build_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = state
        .config
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/register", post(auth::register_handler))
        .route("/api/login", post(auth::login_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route(
            "/api/properties",
            post(properties::create_property_handler).get(properties::list_properties_handler),
        )
        .route(
            "/api/properties/{property_id}",
            delete(properties::delete_property_handler),
        )
        .route(
            "/api/available-properties",
            get(properties::available_properties_handler),
        )
        .route("/api/tenants", get(properties::list_tenants_handler))
        .route(
            "/api/unassigned-tenants",
            get(properties::unassigned_tenants_handler),
        )
        .route(
            "/api/contact-landlord",
            post(properties::contact_landlord_handler),
        )
        .route("/api/assign-tenant", post(assignments::assign_tenant_handler))
        .route("/api/remove-tenant", post(assignments::remove_tenant_handler))
        .route(
            "/api/tenant-dashboard",
            get(assignments::tenant_dashboard_handler),
        )
        .route(
            "/api/generate-qr/{property_id}",
            get(payments::generate_qr_handler),
        )
        .route("/api/mark-paid", post(payments::mark_paid_handler))
        .route("/api/tenant-payments", get(payments::tenant_payments_handler))
        .route("/api/verify-payment", post(payments::verify_payment_handler))
        .route("/api/payment-history", get(payments::payment_history_handler))
        .route(
            "/api/create-agreement",
            post(agreements::create_agreement_handler),
        )
        .route(
            "/api/request-agreement",
            post(agreements::request_agreement_handler),
        )
        .route("/api/agreements", get(agreements::list_agreements_handler))
        .route(
            "/api/sign-agreement/{agreement_id}",
            post(agreements::sign_agreement_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}
