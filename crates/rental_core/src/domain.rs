//! crates/rental_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use uuid::Uuid;

//=========================================================================================
// Enumerations
//=========================================================================================

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Declares `as_str`, `Display` and `FromStr` for a fieldless enum from a
/// single variant/string table.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError::new($kind, other)),
                }
            }
        }
    };
}

/// The role a user registered with. Never changes after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Landlord,
    Tenant,
}

string_enum!(Role, "role", {
    Landlord => "landlord",
    Tenant => "tenant",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    OneBhk,
    TwoBhk,
    ThreeBhk,
    Studio,
    Penthouse,
    Villa,
    Other,
    Commercial,
}

string_enum!(PropertyType, "property type", {
    OneBhk => "1BHK",
    TwoBhk => "2BHK",
    ThreeBhk => "3BHK",
    Studio => "Studio",
    Penthouse => "Penthouse",
    Villa => "Villa",
    Other => "Other",
    Commercial => "Commercial",
});

/// Live payment state of an assignment: `pending -> paid -> verified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Verified,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Verified => "verified",
});

/// Status of a ledger entry. Ledger entries never go back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRecordStatus {
    Paid,
    Verified,
}

string_enum!(PaymentRecordStatus, "payment record status", {
    Paid => "paid",
    Verified => "verified",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgreementStatus {
    Draft,
    PendingTenantSignature,
    PendingLandlordSignature,
    Signed,
    Cancelled,
}

string_enum!(AgreementStatus, "agreement status", {
    Draft => "draft",
    PendingTenantSignature => "pending_tenant_signature",
    PendingLandlordSignature => "pending_landlord_signature",
    Signed => "signed",
    Cancelled => "cancelled",
});

impl AgreementStatus {
    /// Statuses that the tenant-removal cascade moves to `Cancelled`.
    pub const CANCELLABLE: &'static [AgreementStatus] = &[
        AgreementStatus::Draft,
        AgreementStatus::PendingTenantSignature,
        AgreementStatus::PendingLandlordSignature,
        AgreementStatus::Signed,
    ];

    pub fn is_cancellable(&self) -> bool {
        Self::CANCELLABLE.contains(self)
    }
}

/// One of the two signing parties of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Tenant,
    Landlord,
}

impl Party {
    pub fn counterpart(self) -> Party {
        match self {
            Party::Tenant => Party::Landlord,
            Party::Landlord => Party::Tenant,
        }
    }

    /// The status an agreement waits in while this party has still to sign.
    pub fn pending_status(self) -> AgreementStatus {
        match self {
            Party::Tenant => AgreementStatus::PendingTenantSignature,
            Party::Landlord => AgreementStatus::PendingLandlordSignature,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Tenant => f.write_str("tenant"),
            Party::Landlord => f.write_str("landlord"),
        }
    }
}

//=========================================================================================
// Users
//=========================================================================================

/// Represents a registered user - used throughout app
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub hashed_password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

/// The public face of a user when embedded into another record.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

//=========================================================================================
// Properties
//=========================================================================================

/// A landlord-owned listing. `tenant_id` is `None` while the property is vacant.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: Uuid,
    pub address: String,
    pub rent_amount: f64,
    pub property_type: PropertyType,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sq_ft: u32,
    pub description: String,
    pub landlord_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Property {
    pub fn is_vacant(&self) -> bool {
        self.tenant_id.is_none()
    }
}

/// Largest room or area count a listing may carry; the store keeps these as 32-bit integers.
pub const MAX_PROPERTY_COUNT: u32 = i32::MAX as u32;

#[derive(Debug, Clone)]
pub struct NewProperty {
    pub address: String,
    pub rent_amount: f64,
    pub property_type: PropertyType,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sq_ft: u32,
    pub description: String,
}

/// A short property description embedded into payment and agreement listings.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySummary {
    pub id: Uuid,
    pub address: String,
    pub rent_amount: f64,
    pub property_type: PropertyType,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub area_sq_ft: u32,
}

impl From<&Property> for PropertySummary {
    fn from(p: &Property) -> Self {
        Self {
            id: p.id,
            address: p.address.clone(),
            rent_amount: p.rent_amount,
            property_type: p.property_type,
            bedrooms: p.bedrooms,
            bathrooms: p.bathrooms,
            area_sq_ft: p.area_sq_ft,
        }
    }
}

/// Search criteria for tenants browsing vacant properties. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    /// Case-insensitive substring of the address.
    pub location: Option<String>,
    pub property_type: Option<PropertyType>,
    pub min_rent: Option<f64>,
    pub max_rent: Option<f64>,
    pub min_bedrooms: Option<u32>,
    pub min_bathrooms: Option<u32>,
}

impl PropertyFilter {
    /// True when the property is vacant and satisfies every set criterion.
    pub fn matches(&self, property: &Property) -> bool {
        if !property.is_vacant() {
            return false;
        }
        if let Some(location) = &self.location {
            if !property
                .address
                .to_lowercase()
                .contains(&location.to_lowercase())
            {
                return false;
            }
        }
        self.property_type.map_or(true, |t| property.property_type == t)
            && self.min_rent.map_or(true, |min| property.rent_amount >= min)
            && self.max_rent.map_or(true, |max| property.rent_amount <= max)
            && self.min_bedrooms.map_or(true, |min| property.bedrooms >= min)
            && self.min_bathrooms.map_or(true, |min| property.bathrooms >= min)
    }
}

//=========================================================================================
// Assignments and payments
//=========================================================================================

/// Binds a tenant to the single property they occupy.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub payment_status: PaymentStatus,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// An append-only entry in the payment ledger. Survives assignment removal.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub amount: f64,
    pub payment_date: DateTime<Utc>,
    pub status: PaymentRecordStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// The first day of the calendar month following `today`.
pub fn first_day_of_next_month(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    // Day 1 exists in every month.
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

//=========================================================================================
// Agreements
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
}

/// Why a signature could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("the {0} has already signed this agreement")]
    AlreadySigned(Party),
    #[error("agreement is {0} and can no longer be signed")]
    Closed(AgreementStatus),
}

/// A bilateral lease between a tenant and a landlord for one property.
#[derive(Debug, Clone, PartialEq)]
pub struct Agreement {
    pub id: Uuid,
    /// Human-readable unique reference, e.g. `AGR-1704067200000-K3J9QZ`.
    pub agreement_id: String,
    pub tenant_id: Uuid,
    pub landlord_id: Uuid,
    pub property_id: Uuid,
    pub rent_amount: f64,
    pub security_deposit: f64,
    /// Lease length in months.
    pub lease_duration: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub terms: String,
    pub status: AgreementStatus,
    pub tenant_signature: Signature,
    pub landlord_signature: Signature,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agreement {
    pub fn signature(&self, party: Party) -> &Signature {
        match party {
            Party::Tenant => &self.tenant_signature,
            Party::Landlord => &self.landlord_signature,
        }
    }

    fn signature_mut(&mut self, party: Party) -> &mut Signature {
        match party {
            Party::Tenant => &mut self.tenant_signature,
            Party::Landlord => &mut self.landlord_signature,
        }
    }

    /// Records `party`'s signature and recomputes the status.
    ///
    /// The agreement becomes `Signed` once both parties have signed, otherwise it
    /// waits on the counterpart. `Signed` and `Cancelled` accept no signatures.
    pub fn sign(
        &mut self,
        party: Party,
        at: DateTime<Utc>,
        ip_address: &str,
    ) -> Result<(), SignatureError> {
        if self.status == AgreementStatus::Cancelled {
            return Err(SignatureError::Closed(self.status));
        }
        if self.signature(party).signed {
            return Err(SignatureError::AlreadySigned(party));
        }
        if self.status == AgreementStatus::Signed {
            return Err(SignatureError::Closed(self.status));
        }

        *self.signature_mut(party) = Signature {
            signed: true,
            signed_at: Some(at),
            ip_address: Some(ip_address.to_string()),
        };

        let counterpart = party.counterpart();
        self.status = if self.signature(counterpart).signed {
            AgreementStatus::Signed
        } else {
            counterpart.pending_status()
        };
        self.updated_at = at;
        Ok(())
    }
}

/// Validated input for a new agreement. `initiated_by` decides who signs first.
#[derive(Debug, Clone)]
pub struct NewAgreement {
    pub tenant_id: Uuid,
    pub landlord_id: Uuid,
    pub property_id: Uuid,
    pub rent_amount: f64,
    pub security_deposit: f64,
    pub lease_duration: u32,
    pub start_date: NaiveDate,
    pub terms: String,
    pub initiated_by: Party,
}

impl NewAgreement {
    /// Builds the stored agreement. Returns `None` if the end date overflows the calendar.
    pub fn into_agreement(self, agreement_id: String, now: DateTime<Utc>) -> Option<Agreement> {
        let end_date = lease_end_date(self.start_date, self.lease_duration)?;
        Some(Agreement {
            id: Uuid::new_v4(),
            agreement_id,
            tenant_id: self.tenant_id,
            landlord_id: self.landlord_id,
            property_id: self.property_id,
            rent_amount: self.rent_amount,
            security_deposit: self.security_deposit,
            lease_duration: self.lease_duration,
            start_date: self.start_date,
            end_date,
            terms: self.terms,
            // The initiator is expected to have agreed already; the other side signs next.
            status: self.initiated_by.counterpart().pending_status(),
            tenant_signature: Signature::default(),
            landlord_signature: Signature::default(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// `start` plus `months` calendar months, clamped to the last day of a shorter month.
pub fn lease_end_date(start: NaiveDate, months: u32) -> Option<NaiveDate> {
    start.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn agreement(initiated_by: Party) -> Agreement {
        NewAgreement {
            tenant_id: Uuid::new_v4(),
            landlord_id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            rent_amount: 10_000.0,
            security_deposit: 20_000.0,
            lease_duration: 12,
            start_date: date(2024, 1, 1),
            terms: "Standard terms".into(),
            initiated_by,
        }
        .into_agreement("AGR-1-ABCDEF".into(), Utc::now())
        .unwrap()
    }

    #[test]
    fn next_month_rolls_over_year() {
        assert_eq!(first_day_of_next_month(date(2024, 12, 31)), date(2025, 1, 1));
        assert_eq!(first_day_of_next_month(date(2024, 1, 1)), date(2024, 2, 1));
        assert_eq!(first_day_of_next_month(date(2024, 2, 29)), date(2024, 3, 1));
    }

    #[test]
    fn lease_end_adds_calendar_months() {
        assert_eq!(lease_end_date(date(2024, 1, 1), 12), Some(date(2025, 1, 1)));
        assert_eq!(lease_end_date(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
    }

    #[test]
    fn initial_status_waits_on_the_other_party() {
        assert_eq!(
            agreement(Party::Landlord).status,
            AgreementStatus::PendingTenantSignature
        );
        assert_eq!(
            agreement(Party::Tenant).status,
            AgreementStatus::PendingLandlordSignature
        );
    }

    #[test]
    fn both_signatures_complete_the_agreement() {
        let mut a = agreement(Party::Landlord);
        a.sign(Party::Tenant, Utc::now(), "10.0.0.1").unwrap();
        assert_eq!(a.status, AgreementStatus::PendingLandlordSignature);
        assert_eq!(a.tenant_signature.ip_address.as_deref(), Some("10.0.0.1"));

        a.sign(Party::Landlord, Utc::now(), "10.0.0.2").unwrap();
        assert_eq!(a.status, AgreementStatus::Signed);
        assert!(a.landlord_signature.signed_at.is_some());
    }

    #[test]
    fn landlord_signing_first_keeps_tenant_pending() {
        let mut a = agreement(Party::Landlord);
        a.sign(Party::Landlord, Utc::now(), "ip").unwrap();
        assert_eq!(a.status, AgreementStatus::PendingTenantSignature);
    }

    #[test]
    fn re_signing_is_rejected() {
        let mut a = agreement(Party::Landlord);
        a.sign(Party::Tenant, Utc::now(), "ip").unwrap();
        assert_eq!(
            a.sign(Party::Tenant, Utc::now(), "ip"),
            Err(SignatureError::AlreadySigned(Party::Tenant))
        );
    }

    #[test]
    fn cancelled_agreement_is_absorbing() {
        let mut a = agreement(Party::Landlord);
        a.status = AgreementStatus::Cancelled;
        let before = a.clone();
        assert_eq!(
            a.sign(Party::Tenant, Utc::now(), "ip"),
            Err(SignatureError::Closed(AgreementStatus::Cancelled))
        );
        assert_eq!(a, before);
    }

    #[test]
    fn filter_skips_occupied_and_applies_ranges() {
        let mut p = Property {
            id: Uuid::new_v4(),
            address: "12 MG Road, Pune".into(),
            rent_amount: 15_000.0,
            property_type: PropertyType::TwoBhk,
            bedrooms: 2,
            bathrooms: 1,
            area_sq_ft: 900,
            description: String::new(),
            landlord_id: Uuid::new_v4(),
            tenant_id: None,
            created_at: Utc::now(),
        };
        let filter = PropertyFilter {
            location: Some("pune".into()),
            min_rent: Some(10_000.0),
            max_rent: Some(15_000.0),
            min_bedrooms: Some(2),
            ..Default::default()
        };
        assert!(filter.matches(&p));

        let too_many_baths = PropertyFilter {
            min_bathrooms: Some(2),
            ..Default::default()
        };
        assert!(!too_many_baths.matches(&p));

        p.tenant_id = Some(Uuid::new_v4());
        assert!(!filter.matches(&p));
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for t in PropertyType::ALL {
            assert_eq!(t.as_str().parse::<PropertyType>().unwrap(), *t);
        }
        assert_eq!(
            "pending_landlord_signature".parse::<AgreementStatus>().unwrap(),
            AgreementStatus::PendingLandlordSignature
        );
        assert!("owner".parse::<Role>().is_err());
    }
}
