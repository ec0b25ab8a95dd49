//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration and login.

use axum::{extract::State, http::StatusCode, Json};
use rental_core::domain::{NewUser, Role};
use rental_core::ports::PortError;
use rental_core::{Identity, ServiceError};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;
use crate::web::extract::AppJson;
use crate::web::models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::web::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/register - Create a new landlord or tenant account
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = RegisterResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Username or email already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    // 1. Validate the submitted fields
    let new_user = validate_registration(req)?;

    // 2. Hash the password
    let hashed_password = hash_password(&new_user.password)?;

    // 3. Create the user; the store rejects duplicate usernames and emails
    let user = state
        .db
        .create_user(NewUser {
            username: new_user.username,
            email: new_user.email,
            hashed_password,
            role: new_user.role,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully!".to_string(),
            user: user.into(),
        }),
    ))
}

/// POST /api/login - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // 1. Look the user up by username
    let creds = state
        .db
        .get_credentials_by_username(req.username.trim())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ServiceError::InvalidCredentials,
            other => other.into(),
        })?;

    // 2. Verify the password
    if !verify_password(&req.password, &creds.hashed_password)? {
        debug!(username = %creds.username, "login rejected: wrong password");
        return Err(ServiceError::InvalidCredentials.into());
    }

    // 3. Issue the token
    let token = state
        .tokens
        .issue(&Identity::new(creds.user_id, creds.role))?;

    info!(user_id = %creds.user_id, "user logged in");
    Ok(Json(LoginResponse {
        token,
        role: creds.role.as_str().to_string(),
        user_id: creds.user_id,
        username: creds.username,
    }))
}

//=========================================================================================
// Validation
//=========================================================================================

/// A registration that passed validation, before the password is hashed.
struct ValidRegistration {
    username: String,
    email: String,
    password: String,
    role: Role,
}

fn validate_registration(req: RegisterRequest) -> Result<ValidRegistration, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("All fields are required."));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("Please provide a valid email address."));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LEN
        )));
    }
    let role = req
        .role
        .trim()
        .parse::<Role>()
        .map_err(|_| ApiError::bad_request("Role must be either 'landlord' or 'tenant'."))?;
    Ok(ValidRegistration {
        username,
        email,
        password: req.password,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str, role: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role: role.into(),
        }
    }

    #[test]
    fn accepts_a_well_formed_registration() {
        let valid = validate_registration(request(" asha ", "asha@example.com", "secret1", "tenant"))
            .unwrap_or_else(|_| panic!("registration should validate"));
        assert_eq!(valid.username, "asha");
        assert_eq!(valid.role, Role::Tenant);
    }

    #[test]
    fn rejects_bad_fields() {
        let cases = [
            request("", "a@b.c", "secret1", "tenant"),
            request("asha", "not-an-email", "secret1", "tenant"),
            request("asha", "a@b.c", "12345", "tenant"),
            request("asha", "a@b.c", "secret1", "owner"),
        ];
        for case in cases {
            let err = validate_registration(case).err().map(|e| e.status());
            assert_eq!(err, Some(StatusCode::BAD_REQUEST));
        }
    }
}
