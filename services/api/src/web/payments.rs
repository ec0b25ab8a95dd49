//! services/api/src/web/payments.rs
//!
//! Rent payment endpoints: the UPI payment QR code, the tenant's "mark paid",
//! landlord verification and both sides' payment listings.

use axum::{extract::State, Extension, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::{render::svg, QrCode};
use rental_core::Identity;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::web::extract::{AppJson, AppPath};
use crate::web::models::{
    PaymentHistoryResponse, PaymentQrResponse, PaymentUpdateResponse, TenantPaymentResponse,
    VerifyPaymentRequest,
};
use crate::web::state::AppState;

const QR_MIN_DIMENSION: u32 = 256;

/// GET /api/generate-qr/{property_id} - UPI payment QR for the caller's own property (tenant)
#[utoipa::path(
    get,
    path = "/api/generate-qr/{property_id}",
    params(("property_id" = Uuid, Path, description = "The tenant's assigned property.")),
    responses(
        (status = 200, description = "QR code and amount", body = PaymentQrResponse),
        (status = 403, description = "Not the caller's assigned property"),
        (status = 404, description = "Property not found")
    ),
    tag = "Payments"
)]
pub async fn generate_qr_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppPath(property_id): AppPath<Uuid>,
) -> Result<Json<PaymentQrResponse>, ApiError> {
    let property = state.payments.payable_property(&who, property_id).await?;
    let upi_link = upi_link(&state.config, property.rent_amount)?;
    let qr_code = qr_data_url(&upi_link)?;
    Ok(Json(PaymentQrResponse {
        qr_code,
        amount: property.rent_amount,
        upi_link,
    }))
}

/// POST /api/mark-paid - Report this cycle's rent as paid (tenant)
#[utoipa::path(
    post,
    path = "/api/mark-paid",
    responses(
        (status = 200, description = "Payment recorded", body = PaymentUpdateResponse),
        (status = 403, description = "Caller is not a tenant"),
        (status = 404, description = "Caller has no assignment"),
        (status = 409, description = "Payment is not pending")
    ),
    tag = "Payments"
)]
pub async fn mark_paid_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
) -> Result<Json<PaymentUpdateResponse>, ApiError> {
    let (assignment, record) = state.payments.mark_paid(&who).await?;
    Ok(Json(PaymentUpdateResponse {
        message: "Payment marked as paid successfully!".to_string(),
        assignment: assignment.into(),
        payment: record.into(),
    }))
}

/// GET /api/tenant-payments - Payment status of every tenant on the caller's properties (landlord)
#[utoipa::path(
    get,
    path = "/api/tenant-payments",
    responses(
        (status = 200, description = "Assignments with tenant and property", body = [TenantPaymentResponse]),
        (status = 403, description = "Caller is not a landlord")
    ),
    tag = "Payments"
)]
pub async fn tenant_payments_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
) -> Result<Json<Vec<TenantPaymentResponse>>, ApiError> {
    let payments = state.payments.list_tenant_payments(&who).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

/// POST /api/verify-payment - Confirm the latest paid payment (landlord)
#[utoipa::path(
    post,
    path = "/api/verify-payment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = PaymentUpdateResponse),
        (status = 403, description = "Assignment is not on the caller's property"),
        (status = 404, description = "Assignment not found"),
        (status = 409, description = "No paid payment awaiting verification")
    ),
    tag = "Payments"
)]
pub async fn verify_payment_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
    AppJson(req): AppJson<VerifyPaymentRequest>,
) -> Result<Json<PaymentUpdateResponse>, ApiError> {
    let (assignment, record) = state.payments.verify(&who, req.assignment_id).await?;
    Ok(Json(PaymentUpdateResponse {
        message: "Payment verified successfully!".to_string(),
        assignment: assignment.into(),
        payment: record.into(),
    }))
}

/// GET /api/payment-history - The caller's payment ledger, newest first (tenant)
#[utoipa::path(
    get,
    path = "/api/payment-history",
    responses(
        (status = 200, description = "Payment records", body = [PaymentHistoryResponse]),
        (status = 403, description = "Caller is not a tenant")
    ),
    tag = "Payments"
)]
pub async fn payment_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(who): Extension<Identity>,
) -> Result<Json<Vec<PaymentHistoryResponse>>, ApiError> {
    let history = state.payments.history(&who).await?;
    Ok(Json(history.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Payment link rendering
//=========================================================================================

/// `upi://pay?pa=..&pn=..&am=..&cu=INR&tn=Rent Payment`, query form-encoded.
fn upi_link(config: &Config, amount: f64) -> Result<String, ApiError> {
    let amount = amount.to_string();
    let params = [
        ("pa", config.upi_payee_address.as_str()),
        ("pn", config.upi_payee_name.as_str()),
        ("am", amount.as_str()),
        ("cu", "INR"),
        ("tn", "Rent Payment"),
    ];
    Url::parse_with_params("upi://pay", &params)
        .map(String::from)
        .map_err(|e| ApiError::Internal(format!("Failed to build UPI link: {e}")))
}

/// Renders `data` as an SVG QR code wrapped in a base64 data URL.
fn qr_data_url(data: &str) -> Result<String, ApiError> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| ApiError::Internal(format!("Failed to encode QR code: {e}")))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build();
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("secret".to_string()),
            "UPI_PAYEE_ADDRESS" => Some("rent@oksbi".to_string()),
            "UPI_PAYEE_NAME" => Some("Asha Rao".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn upi_link_carries_payee_and_amount() {
        let link = upi_link(&config(), 10000.0).unwrap();
        assert!(link.starts_with("upi://pay?"));
        assert!(link.contains("pa=rent%40oksbi"));
        assert!(link.contains("pn=Asha+Rao"));
        assert!(link.contains("am=10000"));
        assert!(link.contains("cu=INR"));
        assert!(link.contains("tn=Rent+Payment"));
    }

    #[test]
    fn qr_is_an_svg_data_url() {
        let url = qr_data_url("upi://pay?pa=x&am=1").unwrap();
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(svg.contains("<svg"));
    }
}
