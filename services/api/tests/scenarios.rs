//! End-to-end flows through the HTTP surface.

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::TestApp;
use rental_core::domain::first_day_of_next_month;
use serde_json::json;

#[tokio::test]
async fn assigned_tenant_sees_property_on_dashboard() {
    let app = TestApp::new();
    let landlord = app.landlord("lena").await;
    let tenant = app.tenant("tomas").await;
    let property = app.create_property(&landlord, "12 MG Road, Pune", 10000.0).await;

    let (status, body) = app.assign(&landlord, property, &tenant).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["property"]["tenantId"], json!(tenant.id));

    let (status, dashboard) = app.get("/api/tenant-dashboard", &tenant.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["property"]["id"], json!(property));
    assert_eq!(dashboard["property"]["rentAmount"], json!(10000.0));
    assert_eq!(dashboard["paymentStatus"], "pending");
    let expected_due = first_day_of_next_month(Utc::now().date_naive());
    assert_eq!(dashboard["dueDate"], json!(expected_due.to_string()));
}

#[tokio::test]
async fn payment_goes_pending_paid_verified() {
    let app = TestApp::new();
    let landlord = app.landlord("lena").await;
    let tenant = app.tenant("tomas").await;
    let property = app.create_property(&landlord, "12 MG Road, Pune", 10000.0).await;
    app.assign(&landlord, property, &tenant).await;

    let (status, paid) = app.post("/api/mark-paid", &tenant.token, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{paid}");
    assert_eq!(paid["assignment"]["paymentStatus"], "paid");
    assert!(paid["assignment"]["lastPaymentDate"].is_string());
    assert_eq!(paid["payment"]["status"], "paid");
    assert_eq!(paid["payment"]["amount"], json!(10000.0));
    assert_eq!(
        paid["payment"]["notes"],
        "Payment marked as paid by tenant through dashboard."
    );

    let (_, history) = app.get("/api/payment-history", &tenant.token).await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
    assert_eq!(history[0]["status"], "paid");

    let (status, payments) = app.get("/api/tenant-payments", &landlord.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payments[0]["paymentStatus"], "paid");
    assert_eq!(payments[0]["tenant"]["username"], "tomas");
    let assignment_id = payments[0]["id"].clone();

    let (status, verified) = app
        .post(
            "/api/verify-payment",
            &landlord.token,
            json!({ "assignmentId": assignment_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{verified}");
    assert_eq!(verified["assignment"]["paymentStatus"], "verified");
    assert_eq!(verified["payment"]["status"], "verified");
    assert_eq!(verified["payment"]["id"], paid["payment"]["id"]);

    let (_, history) = app.get("/api/payment-history", &tenant.token).await;
    assert_eq!(history.as_array().map(Vec::len), Some(1));
    assert_eq!(history[0]["status"], "verified");
    assert_eq!(history[0]["notes"], "Payment verified by landlord.");
    assert_eq!(history[0]["property"]["address"], "12 MG Road, Pune");
}

#[tokio::test]
async fn agreement_is_signed_by_both_parties() {
    let app = TestApp::new();
    let landlord = app.landlord("lena").await;
    let tenant = app.tenant("tomas").await;
    let property = app.create_property(&landlord, "12 MG Road, Pune", 10000.0).await;
    app.assign(&landlord, property, &tenant).await;

    let agreement_id = app.create_agreement(&landlord, &tenant, property).await;
    let (_, list) = app.get("/api/agreements", &tenant.token).await;
    assert_eq!(list[0]["agreementId"], json!(agreement_id));
    assert_eq!(list[0]["status"], "pending_tenant_signature");
    assert_eq!(list[0]["startDate"], "2024-01-01");
    assert_eq!(list[0]["endDate"], "2025-01-01");
    assert_eq!(list[0]["landlord"]["username"], "lena");
    assert_eq!(list[0]["property"]["address"], "12 MG Road, Pune");

    let (status, signed) = app.sign(&tenant, &agreement_id).await;
    assert_eq!(status, StatusCode::OK, "{signed}");
    assert_eq!(signed["agreement"]["status"], "pending_landlord_signature");
    assert_eq!(signed["agreement"]["tenantSignature"]["signed"], true);
    assert_eq!(signed["agreement"]["tenantSignature"]["ipAddress"], "unknown");

    let (status, signed) = app.sign(&landlord, &agreement_id).await;
    assert_eq!(status, StatusCode::OK, "{signed}");
    assert_eq!(signed["agreement"]["status"], "signed");
    assert_eq!(signed["agreement"]["landlordSignature"]["signed"], true);

    let (status, _) = app.sign(&tenant, &agreement_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.sign(&landlord, &agreement_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn removing_tenant_cancels_signed_agreement() {
    let app = TestApp::new();
    let landlord = app.landlord("lena").await;
    let tenant = app.tenant("tomas").await;
    let property = app.create_property(&landlord, "12 MG Road, Pune", 10000.0).await;
    app.assign(&landlord, property, &tenant).await;
    let agreement_id = app.create_agreement(&landlord, &tenant, property).await;
    app.sign(&tenant, &agreement_id).await;
    app.sign(&landlord, &agreement_id).await;

    let (status, body) = app.remove(&landlord, property, &tenant).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["property"]["tenantId"].is_null());

    let (_, list) = app.get("/api/agreements", &landlord.token).await;
    assert_eq!(list[0]["status"], "cancelled");

    let (_, owned) = app.get("/api/properties", &landlord.token).await;
    assert!(owned[0]["tenantId"].is_null());
    assert!(owned[0]["tenant"].is_null());

    let (status, _) = app.get("/api/tenant-dashboard", &tenant.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, payments) = app.get("/api/tenant-payments", &landlord.token).await;
    assert_eq!(payments.as_array().map(Vec::len), Some(0));
}
