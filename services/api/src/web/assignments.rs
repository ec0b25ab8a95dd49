//! services/api/src/web/assignments.rs
//!
//! Binding tenants to properties, and the tenant's view of their binding.

use axum::{extract::State, Extension, Json};
use rental_core::{AssignOutcome, Identity};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::extract::AppJson;
use crate::web::models::{
    AssignTenantResponse, DashboardResponse, RemoveTenantResponse, TenantPropertyRequest,
};
use crate::web::state::AppState;

/// POST /api/assign-tenant - Bind a tenant to a vacant property (landlord)
///
/// Re-assigning the tenant already occupying the property succeeds without changes.
#[utoipa::path(
    post,
    path = "/api/assign-tenant",
    request_body = TenantPropertyRequest,
    responses(
        (status = 200, description = "Tenant assigned, or already assigned", body = AssignTenantResponse),
        (status = 403, description = "Not the caller's property"),
        (status = 404, description = "Property or tenant not found"),
        (status = 409, description = "Property occupied or tenant assigned elsewhere")
    ),
    tag = "Assignments"
)]
pub async fn assign_tenant_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppJson(req): AppJson<TenantPropertyRequest>,
) -> Result<Json<AssignTenantResponse>, ApiError> {
    let outcome = state
        .assignments
        .assign(&who, req.property_id, req.tenant_id)
        .await?;
    let response = match outcome {
        AssignOutcome::Assigned {
            property,
            assignment,
        } => AssignTenantResponse {
            message: "Tenant assigned successfully!".to_string(),
            property: Some(property.into()),
            assignment: Some(assignment.into()),
        },
        AssignOutcome::AlreadyAssigned => AssignTenantResponse {
            message: "Tenant is already assigned to this property.".to_string(),
            property: None,
            assignment: None,
        },
    };
    Ok(Json(response))
}

/// POST /api/remove-tenant - Vacate a property and cancel the pair's agreements (landlord)
#[utoipa::path(
    post,
    path = "/api/remove-tenant",
    request_body = TenantPropertyRequest,
    responses(
        (status = 200, description = "Tenant removed", body = RemoveTenantResponse),
        (status = 403, description = "Not the caller's property"),
        (status = 404, description = "Property not found"),
        (status = 409, description = "Tenant is not assigned to this property")
    ),
    tag = "Assignments"
)]
pub async fn remove_tenant_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppJson(req): AppJson<TenantPropertyRequest>,
) -> Result<Json<RemoveTenantResponse>, ApiError> {
    let property = state
        .assignments
        .remove(&who, req.property_id, req.tenant_id)
        .await?;
    Ok(Json(RemoveTenantResponse {
        message: "Tenant removed from property successfully!".to_string(),
        property: property.into(),
    }))
}

/// GET /api/tenant-dashboard - The caller's assignment and property (tenant)
#[utoipa::path(
    get,
    path = "/api/tenant-dashboard",
    responses(
        (status = 200, description = "Current assignment", body = DashboardResponse),
        (status = 403, description = "Caller is not a tenant"),
        (status = 404, description = "No property assigned")
    ),
    tag = "Assignments"
)]
pub async fn tenant_dashboard_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let dashboard = state.assignments.dashboard(&who).await?;
    Ok(Json(dashboard.into()))
}
