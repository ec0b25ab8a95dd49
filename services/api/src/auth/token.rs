//! HS256 bearer tokens carrying the caller's id and role.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rental_core::{Identity, Role, ServiceError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// `landlord` or `tenant`.
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.user_id,
            role: identity.role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::Unexpected(format!("JWT encode: {e}")))
    }

    /// Verifies signature and expiry and returns the caller's identity.
    pub fn validate(&self, token: &str) -> Result<Identity, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp"]);

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ServiceError::Unauthenticated("Token has expired.".to_string())
                }
                _ => ServiceError::Unauthenticated("Invalid or expired token.".to_string()),
            })?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| ServiceError::Unauthenticated("Invalid or expired token.".to_string()))?;
        Ok(Identity::new(claims.sub, role))
    }

    #[cfg(test)]
    fn issue_expired(&self, identity: &Identity) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.user_id,
            role: identity.role.as_str().to_string(),
            iat: (now - Duration::hours(25)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip_preserves_identity() {
        let tokens = TokenService::new("test-secret", 24);
        let who = Identity::new(Uuid::new_v4(), Role::Landlord);
        let token = tokens.issue(&who).unwrap();
        assert_eq!(tokens.validate(&token).unwrap(), who);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let who = Identity::new(Uuid::new_v4(), Role::Tenant);
        let token = TokenService::new("a", 24).issue(&who).unwrap();
        assert!(matches!(
            TokenService::new("b", 24).validate(&token),
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = TokenService::new("test-secret", 24);
        let who = Identity::new(Uuid::new_v4(), Role::Tenant);
        let token = tokens.issue_expired(&who);
        let err = tokens.validate(&token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = TokenService::new("test-secret", 24);
        assert!(tokens.validate("not.a.jwt").is_err());
    }
}
