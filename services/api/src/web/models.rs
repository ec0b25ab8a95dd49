//! services/api/src/web/models.rs
//!
//! JSON payloads for the REST API. Field names are camelCase on the wire.
//! Every response type has a `From` conversion out of the matching core type.

use chrono::{DateTime, NaiveDate, Utc};
use rental_core::domain::{
    Agreement, Assignment, PaymentRecord, Property, PropertySummary, Signature, User,
    UserSummary,
};
use rental_core::{
    AgreementView, AvailableProperty, OwnedProperty, PaymentHistoryEntry, TenantDashboard,
    TenantPayment,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// `landlord` or `tenant`.
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRequest {
    pub address: String,
    pub rent_amount: f64,
    /// One of `1BHK, 2BHK, 3BHK, Studio, Penthouse, Villa, Other, Commercial`.
    #[serde(rename = "type")]
    pub property_type: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sq_ft: u32,
    #[serde(default)]
    pub description: String,
}

/// Filters for browsing vacant properties. Blank values are ignored.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct AvailablePropertiesQuery {
    /// Case-insensitive substring of the address.
    pub location: Option<String>,
    /// Property type; unknown values are ignored.
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub min_rent: Option<String>,
    pub max_rent: Option<String>,
    /// Minimum number of bedrooms.
    pub bedrooms: Option<String>,
    /// Minimum number of bathrooms.
    pub bathrooms: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantPropertyRequest {
    pub property_id: Uuid,
    pub tenant_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactLandlordRequest {
    pub property_id: Uuid,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(alias = "tenantInfoId")]
    pub assignment_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgreementRequest {
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub rent_amount: f64,
    pub security_deposit: f64,
    /// Lease length in months.
    pub lease_duration: u32,
    pub start_date: NaiveDate,
    pub terms: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestAgreementRequest {
    pub property_id: Uuid,
    pub rent_amount: f64,
    pub security_deposit: f64,
    pub lease_duration: u32,
    pub start_date: NaiveDate,
    pub terms: String,
}

//=========================================================================================
// Responses
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role.as_str().to_string(),
            created_at: u.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserSummaryResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<UserSummary> for UserSummaryResponse {
    fn from(u: UserSummary) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyResponse {
    pub id: Uuid,
    pub address: String,
    pub rent_amount: f64,
    #[serde(rename = "type")]
    pub property_type: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sq_ft: u32,
    pub description: String,
    pub landlord_id: Uuid,
    /// `null` while the property is vacant.
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Property> for PropertyResponse {
    fn from(p: Property) -> Self {
        Self {
            id: p.id,
            address: p.address,
            rent_amount: p.rent_amount,
            property_type: p.property_type.as_str().to_string(),
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            area_sq_ft: p.area_sq_ft,
            description: p.description,
            landlord_id: p.landlord_id,
            tenant_id: p.tenant_id,
            created_at: p.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummaryResponse {
    pub id: Uuid,
    pub address: String,
    pub rent_amount: f64,
    #[serde(rename = "type")]
    pub property_type: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sq_ft: u32,
}

impl From<PropertySummary> for PropertySummaryResponse {
    fn from(p: PropertySummary) -> Self {
        Self {
            id: p.id,
            address: p.address,
            rent_amount: p.rent_amount,
            property_type: p.property_type.as_str().to_string(),
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            area_sq_ft: p.area_sq_ft,
        }
    }
}

/// A landlord's listing with the occupying tenant.
#[derive(Serialize, ToSchema)]
pub struct OwnedPropertyResponse {
    #[serde(flatten)]
    pub property: PropertyResponse,
    pub tenant: Option<UserSummaryResponse>,
}

impl From<OwnedProperty> for OwnedPropertyResponse {
    fn from(o: OwnedProperty) -> Self {
        Self {
            property: o.property.into(),
            tenant: o.tenant.map(Into::into),
        }
    }
}

/// A vacant listing with the landlord to contact.
#[derive(Serialize, ToSchema)]
pub struct AvailablePropertyResponse {
    #[serde(flatten)]
    pub property: PropertyResponse,
    pub landlord: UserSummaryResponse,
}

impl From<AvailableProperty> for AvailablePropertyResponse {
    fn from(a: AvailableProperty) -> Self {
        Self {
            property: a.property.into(),
            landlord: a.landlord.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ContactPropertyResponse {
    pub address: String,
    pub rent: f64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactLandlordResponse {
    pub message: String,
    pub landlord: UserSummaryResponse,
    pub tenant: UserSummaryResponse,
    pub property: ContactPropertyResponse,
    pub contact_message: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    /// `pending`, `paid` or `verified`.
    pub payment_status: String,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(a: Assignment) -> Self {
        Self {
            id: a.id,
            tenant_id: a.tenant_id,
            property_id: a.property_id,
            payment_status: a.payment_status.as_str().to_string(),
            last_payment_date: a.last_payment_date,
            due_date: a.due_date,
            created_at: a.created_at,
        }
    }
}

/// Result of an assignment. `property` and `assignment` are absent when the
/// tenant was already assigned to the property.
#[derive(Serialize, ToSchema)]
pub struct AssignTenantResponse {
    pub message: String,
    pub property: Option<PropertyResponse>,
    pub assignment: Option<AssignmentResponse>,
}

#[derive(Serialize, ToSchema)]
pub struct RemoveTenantResponse {
    pub message: String,
    pub property: PropertyResponse,
}

/// The tenant's assignment with the assigned property populated.
#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    pub property: PropertyResponse,
}

impl From<TenantDashboard> for DashboardResponse {
    fn from(d: TenantDashboard) -> Self {
        Self {
            assignment: d.assignment.into(),
            property: d.property.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQrResponse {
    /// `data:image/svg+xml;base64,...`
    pub qr_code: String,
    pub amount: f64,
    pub upi_link: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecordResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub amount: f64,
    pub payment_date: DateTime<Utc>,
    /// `paid` or `verified`.
    pub status: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentRecordResponse {
    fn from(r: PaymentRecord) -> Self {
        Self {
            id: r.id,
            tenant_id: r.tenant_id,
            property_id: r.property_id,
            amount: r.amount,
            payment_date: r.payment_date,
            status: r.status.as_str().to_string(),
            notes: r.notes,
            created_at: r.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaymentUpdateResponse {
    pub message: String,
    pub assignment: AssignmentResponse,
    pub payment: PaymentRecordResponse,
}

#[derive(Serialize, ToSchema)]
pub struct TenantPaymentResponse {
    #[serde(flatten)]
    pub assignment: AssignmentResponse,
    pub tenant: Option<UserSummaryResponse>,
    pub property: Option<PropertySummaryResponse>,
}

impl From<TenantPayment> for TenantPaymentResponse {
    fn from(p: TenantPayment) -> Self {
        Self {
            assignment: p.assignment.into(),
            tenant: p.tenant.map(Into::into),
            property: p.property.map(Into::into),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaymentHistoryResponse {
    #[serde(flatten)]
    pub record: PaymentRecordResponse,
    pub property: Option<PropertySummaryResponse>,
}

impl From<PaymentHistoryEntry> for PaymentHistoryResponse {
    fn from(e: PaymentHistoryEntry) -> Self {
        Self {
            record: e.record.into(),
            property: e.property.map(Into::into),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResponse {
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
}

impl From<Signature> for SignatureResponse {
    fn from(s: Signature) -> Self {
        Self {
            signed: s.signed,
            signed_at: s.signed_at,
            ip_address: s.ip_address,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgreementResponse {
    pub id: Uuid,
    /// Human-readable reference used in URLs, e.g. `AGR-1704067200000-K3J9QZ`.
    pub agreement_id: String,
    pub tenant_id: Uuid,
    pub landlord_id: Uuid,
    pub property_id: Uuid,
    pub rent_amount: f64,
    pub security_deposit: f64,
    pub lease_duration: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub terms: String,
    pub status: String,
    pub tenant_signature: SignatureResponse,
    pub landlord_signature: SignatureResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Agreement> for AgreementResponse {
    fn from(a: Agreement) -> Self {
        Self {
            id: a.id,
            agreement_id: a.agreement_id,
            tenant_id: a.tenant_id,
            landlord_id: a.landlord_id,
            property_id: a.property_id,
            rent_amount: a.rent_amount,
            security_deposit: a.security_deposit,
            lease_duration: a.lease_duration,
            start_date: a.start_date,
            end_date: a.end_date,
            terms: a.terms,
            status: a.status.as_str().to_string(),
            tenant_signature: a.tenant_signature.into(),
            landlord_signature: a.landlord_signature.into(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AgreementEnvelope {
    pub message: String,
    pub agreement: AgreementResponse,
}

/// An agreement with its parties and property populated.
#[derive(Serialize, ToSchema)]
pub struct AgreementViewResponse {
    #[serde(flatten)]
    pub agreement: AgreementResponse,
    pub tenant: Option<UserSummaryResponse>,
    pub landlord: Option<UserSummaryResponse>,
    pub property: Option<PropertySummaryResponse>,
}

impl From<AgreementView> for AgreementViewResponse {
    fn from(v: AgreementView) -> Self {
        Self {
            agreement: v.agreement.into(),
            tenant: v.tenant.map(Into::into),
            landlord: v.landlord.map(Into::into),
            property: v.property.map(Into::into),
        }
    }
}
