//! Shared harness: the full router over the in-memory store, driven with `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use api_lib::adapters::InMemoryDb;
use api_lib::config::Config;
use api_lib::web::{build_router, AppState};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "s3cret-pw";

pub struct TestApp {
    router: Router,
}

/// A registered, logged-in user.
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "JWT_SECRET" => Some("integration-secret".to_string()),
            "UPI_PAYEE_ADDRESS" => Some("rent@oksbi".to_string()),
            _ => None,
        })
        .expect("test config");
        let state = Arc::new(AppState::new(Arc::new(InMemoryDb::new()), Arc::new(config)));
        Self {
            router: build_router(state).expect("router"),
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn register(&self, username: &str, role: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
                "role": role,
            })),
        )
        .await
    }

    /// Registers and logs in.
    pub async fn user(&self, username: &str, role: &str) -> TestUser {
        let (status, _) = self.register(username, role).await;
        assert_eq!(status, StatusCode::CREATED, "register {username}");
        let (status, body) = self
            .send(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "username": username, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login {username}");
        TestUser {
            id: uuid(&body["userId"]),
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    pub async fn landlord(&self, username: &str) -> TestUser {
        self.user(username, "landlord").await
    }

    pub async fn tenant(&self, username: &str) -> TestUser {
        self.user(username, "tenant").await
    }

    pub async fn create_property(&self, landlord: &TestUser, address: &str, rent: f64) -> Uuid {
        let (status, body) = self
            .post(
                "/api/properties",
                &landlord.token,
                json!({
                    "address": address,
                    "rentAmount": rent,
                    "type": "2BHK",
                    "bedrooms": 2,
                    "bathrooms": 1,
                    "areaSqFt": 900,
                    "description": "Sunny flat",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create property: {body}");
        uuid(&body["id"])
    }

    pub async fn assign(&self, landlord: &TestUser, property: Uuid, tenant: &TestUser) -> (StatusCode, Value) {
        self.post(
            "/api/assign-tenant",
            &landlord.token,
            json!({ "propertyId": property, "tenantId": tenant.id }),
        )
        .await
    }

    pub async fn remove(&self, landlord: &TestUser, property: Uuid, tenant: &TestUser) -> (StatusCode, Value) {
        self.post(
            "/api/remove-tenant",
            &landlord.token,
            json!({ "propertyId": property, "tenantId": tenant.id }),
        )
        .await
    }

    /// Landlord-initiated agreement; returns its `agreementId` reference.
    pub async fn create_agreement(&self, landlord: &TestUser, tenant: &TestUser, property: Uuid) -> String {
        let (status, body) = self
            .post(
                "/api/create-agreement",
                &landlord.token,
                json!({
                    "tenantId": tenant.id,
                    "propertyId": property,
                    "rentAmount": 10000,
                    "securityDeposit": 20000,
                    "leaseDuration": 12,
                    "startDate": "2024-01-01",
                    "terms": "Rent due on the 1st. No subletting.",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create agreement: {body}");
        body["agreement"]["agreementId"]
            .as_str()
            .expect("agreementId")
            .to_string()
    }

    pub async fn sign(&self, who: &TestUser, agreement_id: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            &format!("/api/sign-agreement/{agreement_id}"),
            Some(&who.token),
            None,
        )
        .await
    }
}

pub fn uuid(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a uuid: {value}"))
}
