//! crates/rental_core/src/agreement.rs
//!
//! The agreement workflow: creation by either party, listing scoped to the
//! caller, and the bilateral signature state machine.
//!
//! ```text
//! landlord creates ──> pending_tenant_signature ──(tenant signs)──┐
//!                           │                                       v
//!                    (landlord signs)                             signed
//!                           v                                       ^
//! tenant requests ──> pending_landlord_signature ─(landlord signs)─┘
//!
//! any state but cancelled ──(tenant removed from property)──> cancelled
//! ```

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::access::{Capability, Identity};
use crate::domain::{
    Agreement, NewAgreement, Party, PropertySummary, Role, UserSummary,
};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, PortError};
use crate::property::{load_property, UserCache};

const CREATE: Capability = Capability::for_role(Role::Landlord, "create agreements");
const REQUEST: Capability = Capability::for_role(Role::Tenant, "request agreements");
const SIGN: Capability = Capability::any_role("sign agreements");

const REFERENCE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const REFERENCE_SUFFIX_LEN: usize = 6;

/// The commercial terms both creation paths share.
#[derive(Debug, Clone)]
pub struct AgreementTerms {
    pub property_id: Uuid,
    pub rent_amount: f64,
    pub security_deposit: f64,
    pub lease_duration: u32,
    pub start_date: NaiveDate,
    pub terms: String,
}

/// An agreement with its parties and property resolved for display.
#[derive(Debug, Clone)]
pub struct AgreementView {
    pub agreement: Agreement,
    pub tenant: Option<UserSummary>,
    pub landlord: Option<UserSummary>,
    pub property: Option<PropertySummary>,
}

#[derive(Clone)]
pub struct AgreementWorkflow {
    db: Arc<dyn DatabaseService>,
}

impl AgreementWorkflow {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Landlord-initiated agreement; the tenant signs next.
    pub async fn create(
        &self,
        who: &Identity,
        tenant_id: Uuid,
        terms: AgreementTerms,
    ) -> ServiceResult<Agreement> {
        CREATE.check(who)?;
        validate_terms(&terms)?;

        let property = self.db.get_property(terms.property_id).await;
        let tenant = self.db.get_user(tenant_id).await;
        let (property, tenant) = match (property, tenant) {
            (Ok(p), Ok(t)) if t.role == Role::Tenant => (p, t),
            (Err(PortError::Unexpected(e)), _) | (_, Err(PortError::Unexpected(e))) => {
                return Err(ServiceError::Unexpected(e))
            }
            _ => {
                return Err(ServiceError::not_found(
                    "Property or Tenant not found, or Tenant is invalid.",
                ))
            }
        };
        CREATE.check_owner(who, property.landlord_id)?;

        self.insert(NewAgreement {
            tenant_id: tenant.id,
            landlord_id: who.user_id,
            property_id: property.id,
            rent_amount: terms.rent_amount,
            security_deposit: terms.security_deposit,
            lease_duration: terms.lease_duration,
            start_date: terms.start_date,
            terms: terms.terms,
            initiated_by: Party::Landlord,
        })
        .await
    }

    /// Tenant-initiated agreement request; the property's landlord signs next.
    pub async fn request(&self, who: &Identity, terms: AgreementTerms) -> ServiceResult<Agreement> {
        REQUEST.check(who)?;
        validate_terms(&terms)?;

        let property = load_property(self.db.as_ref(), terms.property_id).await?;
        self.insert(NewAgreement {
            tenant_id: who.user_id,
            landlord_id: property.landlord_id,
            property_id: property.id,
            rent_amount: terms.rent_amount,
            security_deposit: terms.security_deposit,
            lease_duration: terms.lease_duration,
            start_date: terms.start_date,
            terms: terms.terms,
            initiated_by: Party::Tenant,
        })
        .await
    }

    async fn insert(&self, draft: NewAgreement) -> ServiceResult<Agreement> {
        let now = Utc::now();
        let initiated_by = draft.initiated_by;
        let agreement = draft
            .into_agreement(generate_reference(now), now)
            .ok_or_else(|| ServiceError::validation("Lease end date is out of range."))?;

        let agreement = self.db.create_agreement(agreement).await?;
        info!(
            agreement_id = %agreement.agreement_id,
            tenant_id = %agreement.tenant_id,
            property_id = %agreement.property_id,
            %initiated_by,
            status = %agreement.status,
            "agreement created"
        );
        Ok(agreement)
    }

    /// Agreements where the caller is the party matching their role, newest first.
    pub async fn list(&self, who: &Identity) -> ServiceResult<Vec<AgreementView>> {
        let agreements = match who.role {
            Role::Landlord => self.db.list_agreements_for_landlord(who.user_id).await?,
            Role::Tenant => self.db.list_agreements_for_tenant(who.user_id).await?,
        };

        let mut users = UserCache::new(self.db.as_ref());
        let mut views = Vec::with_capacity(agreements.len());
        for agreement in agreements {
            let tenant = users.get(agreement.tenant_id).await?;
            let landlord = users.get(agreement.landlord_id).await?;
            let property = match self.db.get_property(agreement.property_id).await {
                Ok(p) => Some(PropertySummary::from(&p)),
                Err(PortError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            };
            views.push(AgreementView {
                agreement,
                tenant,
                landlord,
                property,
            });
        }
        Ok(views)
    }

    /// Signs as whichever party the caller is. `ip_address` is recorded with the signature.
    pub async fn sign(
        &self,
        who: &Identity,
        agreement_id: &str,
        ip_address: &str,
    ) -> ServiceResult<Agreement> {
        let previous = self
            .db
            .get_agreement_by_reference(agreement_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => ServiceError::not_found("Agreement not found."),
                other => other.into(),
            })?;

        SIGN.check_with(who, |caller| {
            caller.user_id == previous.tenant_id || caller.user_id == previous.landlord_id
        })
        .map_err(|_| {
            ServiceError::forbidden(
                "Not authorized to sign this agreement. You are neither the tenant nor the landlord for this agreement.",
            )
        })?;
        let party = signing_party(who, &previous).ok_or_else(|| {
            ServiceError::forbidden(
                "Unauthorized to sign. Your role does not match your relation to this agreement.",
            )
        })?;

        let mut updated = previous.clone();
        updated.sign(party, Utc::now(), ip_address)?;
        let saved = self.db.save_signatures(&previous, &updated).await?;

        info!(
            agreement_id = %saved.agreement_id,
            %party,
            status = %saved.status,
            "agreement signed"
        );
        Ok(saved)
    }
}

/// The party the caller signs as: their role must match their relation to the agreement.
fn signing_party(who: &Identity, agreement: &Agreement) -> Option<Party> {
    match who.role {
        Role::Tenant if agreement.tenant_id == who.user_id => Some(Party::Tenant),
        Role::Landlord if agreement.landlord_id == who.user_id => Some(Party::Landlord),
        _ => None,
    }
}

fn validate_terms(terms: &AgreementTerms) -> ServiceResult<()> {
    if terms.terms.trim().is_empty() {
        return Err(ServiceError::validation("Missing required agreement fields."));
    }
    let rent_ok = terms.rent_amount.is_finite() && terms.rent_amount > 0.0;
    let deposit_ok = terms.security_deposit.is_finite() && terms.security_deposit >= 0.0;
    if !rent_ok || !deposit_ok || terms.lease_duration == 0 {
        return Err(ServiceError::validation(
            "Invalid numeric values for agreement.",
        ));
    }
    Ok(())
}

/// `AGR-<unix millis>-<6 uppercase base36 chars>`.
pub fn generate_reference(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_SUFFIX_LEN)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect();
    format!("AGR-{}-{}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> AgreementTerms {
        AgreementTerms {
            property_id: Uuid::new_v4(),
            rent_amount: 10_000.0,
            security_deposit: 0.0,
            lease_duration: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            terms: "No pets.".into(),
        }
    }

    #[test]
    fn reference_has_expected_shape() {
        let now = Utc::now();
        let reference = generate_reference(now);
        let parts: Vec<&str> = reference.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "AGR");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn zero_deposit_is_allowed_but_not_zero_rent_or_duration() {
        assert!(validate_terms(&terms()).is_ok());
        assert!(validate_terms(&AgreementTerms {
            rent_amount: 0.0,
            ..terms()
        })
        .is_err());
        assert!(validate_terms(&AgreementTerms {
            lease_duration: 0,
            ..terms()
        })
        .is_err());
        assert!(validate_terms(&AgreementTerms {
            security_deposit: -1.0,
            ..terms()
        })
        .is_err());
    }

    #[test]
    fn role_must_match_relation() {
        let id = Uuid::new_v4();
        let mut agreement = NewAgreement {
            tenant_id: id,
            landlord_id: id,
            property_id: Uuid::new_v4(),
            rent_amount: 1.0,
            security_deposit: 0.0,
            lease_duration: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            terms: "t".into(),
            initiated_by: Party::Landlord,
        }
        .into_agreement("AGR-1-AAAAAA".into(), Utc::now())
        .unwrap();

        let landlord = Identity::new(id, Role::Landlord);
        assert_eq!(signing_party(&landlord, &agreement), Some(Party::Landlord));

        agreement.landlord_id = Uuid::new_v4();
        assert_eq!(signing_party(&landlord, &agreement), None);
    }
}
