//! services/api/src/web/rest.rs
//!
//! The health probe and the master definition for the OpenAPI specification.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::models::HealthResponse;
use crate::web::{agreements, assignments, auth, payments, properties};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        properties::create_property_handler,
        properties::list_properties_handler,
        properties::delete_property_handler,
        properties::available_properties_handler,
        properties::list_tenants_handler,
        properties::unassigned_tenants_handler,
        properties::contact_landlord_handler,
        assignments::assign_tenant_handler,
        assignments::remove_tenant_handler,
        assignments::tenant_dashboard_handler,
        payments::generate_qr_handler,
        payments::mark_paid_handler,
        payments::tenant_payments_handler,
        payments::verify_payment_handler,
        payments::payment_history_handler,
        agreements::create_agreement_handler,
        agreements::request_agreement_handler,
        agreements::list_agreements_handler,
        agreements::sign_agreement_handler,
    ),
    modifiers(&BearerAuth),
    security(("bearer_auth" = [])),
    tags(
        (name = "Health", description = "Service liveness."),
        (name = "Auth", description = "Registration and login for landlords and tenants."),
        (name = "Properties", description = "Landlord listings, tenant browsing and landlord contact."),
        (name = "Tenants", description = "The tenant directory landlords assign from."),
        (name = "Assignments", description = "Binding tenants to properties."),
        (name = "Payments", description = "Rent payment links, status and the payment ledger."),
        (name = "Agreements", description = "Rental agreements and their signatures.")
    )
)]
pub struct ApiDoc;

/// Declares the `Authorization: Bearer <jwt>` scheme every protected route expects.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

//=========================================================================================
// Health
//=========================================================================================

/// GET /health - Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    security(()),
    tag = "Health"
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn every_operation_tag_is_declared() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let declared: BTreeSet<&str> = doc["tags"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();

        let mut used = BTreeSet::new();
        for item in doc["paths"].as_object().unwrap().values() {
            for operation in item.as_object().unwrap().values() {
                if let Some(tags) = operation["tags"].as_array() {
                    used.extend(tags.iter().filter_map(|t| t.as_str()));
                }
            }
        }

        assert!(!used.is_empty());
        assert_eq!(used, declared);
    }
}
