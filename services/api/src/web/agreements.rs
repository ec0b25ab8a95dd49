//! services/api/src/web/agreements.rs
//!
//! Rental agreement endpoints: creation by either party, listing and signing.

use axum::{extract::State, http::StatusCode, Extension, Json};
use rental_core::{AgreementTerms, Identity};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::extract::{AppJson, AppPath, ClientAddr};
use crate::web::models::{
    AgreementEnvelope, AgreementViewResponse, CreateAgreementRequest, RequestAgreementRequest,
};
use crate::web::state::AppState;

/// POST /api/create-agreement - Draft an agreement for the tenant to sign (landlord)
#[utoipa::path(
    post,
    path = "/api/create-agreement",
    request_body = CreateAgreementRequest,
    responses(
        (status = 201, description = "Agreement created, awaiting the tenant's signature", body = AgreementEnvelope),
        (status = 400, description = "Invalid amounts, duration or terms"),
        (status = 403, description = "Caller is not the property's landlord"),
        (status = 404, description = "Property or tenant not found")
    ),
    tag = "Agreements"
)]
pub async fn create_agreement_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppJson(req): AppJson<CreateAgreementRequest>,
) -> Result<(StatusCode, Json<AgreementEnvelope>), ApiError> {
    let terms = AgreementTerms {
        property_id: req.property_id,
        rent_amount: req.rent_amount,
        security_deposit: req.security_deposit,
        lease_duration: req.lease_duration,
        start_date: req.start_date,
        terms: req.terms,
    };
    let agreement = state.agreements.create(&who, req.tenant_id, terms).await?;
    Ok((
        StatusCode::CREATED,
        Json(AgreementEnvelope {
            message: "Rental agreement created successfully!".to_string(),
            agreement: agreement.into(),
        }),
    ))
}

/// POST /api/request-agreement - Ask a property's landlord for an agreement (tenant)
#[utoipa::path(
    post,
    path = "/api/request-agreement",
    request_body = RequestAgreementRequest,
    responses(
        (status = 201, description = "Agreement requested, awaiting the landlord's signature", body = AgreementEnvelope),
        (status = 400, description = "Invalid amounts, duration or terms"),
        (status = 403, description = "Caller is not a tenant"),
        (status = 404, description = "Property not found")
    ),
    tag = "Agreements"
)]
pub async fn request_agreement_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppJson(req): AppJson<RequestAgreementRequest>,
) -> Result<(StatusCode, Json<AgreementEnvelope>), ApiError> {
    let terms = AgreementTerms {
        property_id: req.property_id,
        rent_amount: req.rent_amount,
        security_deposit: req.security_deposit,
        lease_duration: req.lease_duration,
        start_date: req.start_date,
        terms: req.terms,
    };
    let agreement = state.agreements.request(&who, terms).await?;
    Ok((
        StatusCode::CREATED,
        Json(AgreementEnvelope {
            message: "Agreement request sent successfully!".to_string(),
            agreement: agreement.into(),
        }),
    ))
}

/// GET /api/agreements - Agreements where the caller is a party, newest first
#[utoipa::path(
    get,
    path = "/api/agreements",
    responses(
        (status = 200, description = "Agreements with parties and property", body = [AgreementViewResponse])
    ),
    tag = "Agreements"
)]
pub async fn list_agreements_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
) -> Result<Json<Vec<AgreementViewResponse>>, ApiError> {
    let views = state.agreements.list(&who).await?;
    Ok(Json(views.into_iter().map(Into::into).collect()))
}

/// POST /api/sign-agreement/{agreement_id} - Sign as the caller's party
#[utoipa::path(
    post,
    path = "/api/sign-agreement/{agreement_id}",
    params(("agreement_id" = String, Path, description = "The agreement reference, e.g. AGR-1704067200000-K3J9QZ.")),
    responses(
        (status = 200, description = "Signature recorded", body = AgreementEnvelope),
        (status = 403, description = "Caller is not a party, or role does not match"),
        (status = 404, description = "Agreement not found"),
        (status = 409, description = "Already signed by this party, or agreement closed")
    ),
    tag = "Agreements"
)]
pub async fn sign_agreement_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    ClientAddr(ip_address): ClientAddr,
    AppPath(agreement_id): AppPath<String>,
) -> Result<Json<AgreementEnvelope>, ApiError> {
    let agreement = state
        .agreements
        .sign(&who, &agreement_id, &ip_address)
        .await?;
    Ok(Json(AgreementEnvelope {
        message: "Agreement signed successfully!".to_string(),
        agreement: agreement.into(),
    }))
}
