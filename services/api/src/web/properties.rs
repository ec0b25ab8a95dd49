//! services/api/src/web/properties.rs
//!
//! Property listings, the tenant directory and tenant-to-landlord contact.

use axum::{extract::State, http::StatusCode, Extension, Json};
use rental_core::domain::{NewProperty, PropertyFilter, PropertyType, MAX_PROPERTY_COUNT};
use rental_core::Identity;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::extract::{AppJson, AppPath, AppQuery};
use crate::web::models::{
    AvailablePropertiesQuery, AvailablePropertyResponse, ContactLandlordRequest,
    ContactLandlordResponse, ContactPropertyResponse, CreatePropertyRequest, MessageResponse,
    OwnedPropertyResponse, PropertyResponse, UserSummaryResponse,
};
use crate::web::state::AppState;

/// POST /api/properties - Add a listing (landlord)
#[utoipa::path(
    post,
    path = "/api/properties",
    request_body = CreatePropertyRequest,
    responses(
        (status = 201, description = "Property created", body = PropertyResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Caller is not a landlord")
    ),
    tag = "Properties"
)]
pub async fn create_property_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppJson(req): AppJson<CreatePropertyRequest>,
) -> Result<(StatusCode, Json<PropertyResponse>), ApiError> {
    let property_type = req
        .property_type
        .parse::<PropertyType>()
        .map_err(|e| ApiError::bad_request(format!("Invalid property type: {}", e.value)))?;
    let input = NewProperty {
        address: req.address.trim().to_string(),
        rent_amount: req.rent_amount,
        property_type,
        bedrooms: req.bedrooms,
        bathrooms: req.bathrooms,
        area_sq_ft: req.area_sq_ft,
        description: req.description,
    };

    let property = state.properties.create(&who, input).await?;
    Ok((StatusCode::CREATED, Json(property.into())))
}

/// GET /api/properties - The caller's own listings with their tenants (landlord)
#[utoipa::path(
    get,
    path = "/api/properties",
    responses(
        (status = 200, description = "Own properties", body = [OwnedPropertyResponse]),
        (status = 403, description = "Caller is not a landlord")
    ),
    tag = "Properties"
)]
pub async fn list_properties_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
) -> Result<Json<Vec<OwnedPropertyResponse>>, ApiError> {
    let owned = state.properties.list_own(&who).await?;
    Ok(Json(owned.into_iter().map(Into::into).collect()))
}

/// DELETE /api/properties/{property_id} - Delete a vacant listing with no agreements (landlord)
#[utoipa::path(
    delete,
    path = "/api/properties/{property_id}",
    params(("property_id" = Uuid, Path, description = "The property to delete.")),
    responses(
        (status = 200, description = "Property deleted", body = MessageResponse),
        (status = 403, description = "Not the caller's property"),
        (status = 404, description = "Property not found"),
        (status = 409, description = "Property is occupied or has agreements")
    ),
    tag = "Properties"
)]
pub async fn delete_property_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppPath(property_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.properties.delete(&who, property_id).await?;
    Ok(Json(MessageResponse::new("Property deleted successfully!")))
}

/// GET /api/available-properties - Browse vacant listings (tenant)
#[utoipa::path(
    get,
    path = "/api/available-properties",
    params(AvailablePropertiesQuery),
    responses(
        (status = 200, description = "Vacant properties", body = [AvailablePropertyResponse]),
        (status = 400, description = "Non-numeric filter value"),
        (status = 403, description = "Caller is not a tenant")
    ),
    tag = "Properties"
)]
pub async fn available_properties_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppQuery(query): AppQuery<AvailablePropertiesQuery>,
) -> Result<Json<Vec<AvailablePropertyResponse>>, ApiError> {
    let filter = parse_filter(query)?;
    let available = state.properties.list_available(&who, &filter).await?;
    Ok(Json(available.into_iter().map(Into::into).collect()))
}

/// GET /api/tenants - Every registered tenant (landlord)
#[utoipa::path(
    get,
    path = "/api/tenants",
    responses(
        (status = 200, description = "All tenants", body = [UserSummaryResponse]),
        (status = 403, description = "Caller is not a landlord")
    ),
    tag = "Tenants"
)]
pub async fn list_tenants_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
) -> Result<Json<Vec<UserSummaryResponse>>, ApiError> {
    let tenants = state.properties.list_all_tenants(&who).await?;
    Ok(Json(tenants.into_iter().map(Into::into).collect()))
}

/// GET /api/unassigned-tenants - Tenants not occupying any property (landlord)
#[utoipa::path(
    get,
    path = "/api/unassigned-tenants",
    responses(
        (status = 200, description = "Unassigned tenants", body = [UserSummaryResponse]),
        (status = 403, description = "Caller is not a landlord")
    ),
    tag = "Tenants"
)]
pub async fn unassigned_tenants_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
) -> Result<Json<Vec<UserSummaryResponse>>, ApiError> {
    let tenants = state.properties.list_unassigned_tenants(&who).await?;
    Ok(Json(tenants.into_iter().map(Into::into).collect()))
}

/// POST /api/contact-landlord - Simulated contact request (tenant). Nothing is delivered.
#[utoipa::path(
    post,
    path = "/api/contact-landlord",
    request_body = ContactLandlordRequest,
    responses(
        (status = 200, description = "Contact details of both parties", body = ContactLandlordResponse),
        (status = 403, description = "Caller is not a tenant"),
        (status = 404, description = "Property not found")
    ),
    tag = "Properties"
)]
pub async fn contact_landlord_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppJson(req): AppJson<ContactLandlordRequest>,
) -> Result<Json<ContactLandlordResponse>, ApiError> {
    let receipt = state
        .properties
        .contact_landlord(&who, req.property_id, req.message)
        .await?;
    Ok(Json(ContactLandlordResponse {
        message: "Contact request sent successfully!".to_string(),
        landlord: receipt.landlord.into(),
        tenant: receipt.tenant.into(),
        property: ContactPropertyResponse {
            address: receipt.property.address,
            rent: receipt.property.rent_amount,
        },
        contact_message: receipt.message,
    }))
}

//=========================================================================================
// Filter parsing
//=========================================================================================

/// Blank values mean "no filter"; an unknown type is dropped, a malformed number is a 400.
fn parse_filter(query: AvailablePropertiesQuery) -> Result<PropertyFilter, ApiError> {
    Ok(PropertyFilter {
        location: non_blank(query.location),
        property_type: non_blank(query.property_type).and_then(|t| t.parse().ok()),
        min_rent: parse_number("minRent", query.min_rent)?,
        max_rent: parse_number("maxRent", query.max_rent)?,
        min_bedrooms: parse_count("bedrooms", query.bedrooms)?,
        min_bathrooms: parse_count("bathrooms", query.bathrooms)?,
    })
}

fn parse_count(name: &str, value: Option<String>) -> Result<Option<u32>, ApiError> {
    match parse_number::<u32>(name, value)? {
        Some(n) if n > MAX_PROPERTY_COUNT => Err(ApiError::bad_request(format!(
            "Invalid value for {}: must not exceed {}",
            name, MAX_PROPERTY_COUNT
        ))),
        count => Ok(count),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>, ApiError> {
    non_blank(value)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| ApiError::bad_request(format!("Invalid value for {}: '{}'", name, v)))
        })
        .transpose()
}
