//! crates/rental_core/src/ports.rs
//!
//! Defines the storage contract for the application's core logic.
//! The trait forms the boundary of the hexagonal architecture, so the workflow
//! services stay independent of whether records live in PostgreSQL or in memory.
//!
//! Every method that touches more than one record is a single atomic unit in the
//! adapter: either all of its writes become visible or none do. The conditional
//! writes (`create_assignment`, `remove_assignment`, `record_payment`,
//! `verify_latest_payment`, `save_signatures`, `delete_vacant_property`) re-check
//! their precondition inside that unit and report `PortError::Conflict` when a
//! concurrent request got there first.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    Agreement, Assignment, NewProperty, NewUser, PaymentRecord, Property, PropertyFilter, Role,
    User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the underlying store.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// What the removal cascade touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalOutcome {
    /// Whether an assignment row existed and was deleted.
    pub assignment_deleted: bool,
    pub cancelled_agreements: u64,
}

//=========================================================================================
// Service Port (Trait)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn list_users_by_role(&self, role: Role) -> PortResult<Vec<User>>;

    /// Tenants that hold no assignment.
    async fn list_unassigned_tenants(&self) -> PortResult<Vec<User>>;

    // --- Properties ---
    async fn create_property(&self, landlord_id: Uuid, property: NewProperty)
        -> PortResult<Property>;

    async fn get_property(&self, property_id: Uuid) -> PortResult<Property>;

    async fn list_properties_by_landlord(&self, landlord_id: Uuid) -> PortResult<Vec<Property>>;

    /// Vacant properties matching `filter`.
    async fn list_vacant_properties(&self, filter: &PropertyFilter) -> PortResult<Vec<Property>>;

    /// Deletes the property only if it is vacant and no agreement references it.
    async fn delete_vacant_property(&self, property_id: Uuid) -> PortResult<()>;

    // --- Assignments ---
    /// Occupies a vacant property and creates the tenant's assignment in one unit.
    ///
    /// `Conflict` if the property is no longer vacant or the tenant already holds
    /// an assignment.
    async fn create_assignment(
        &self,
        property_id: Uuid,
        tenant_id: Uuid,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> PortResult<Assignment>;

    async fn get_assignment(&self, assignment_id: Uuid) -> PortResult<Assignment>;

    async fn find_assignment_by_tenant(&self, tenant_id: Uuid) -> PortResult<Option<Assignment>>;

    /// Assignments on every property owned by `landlord_id`.
    async fn list_assignments_for_landlord(&self, landlord_id: Uuid)
        -> PortResult<Vec<Assignment>>;

    /// Vacates the property, deletes the assignment and cancels every
    /// non-cancelled agreement for the pair. Payment records are untouched.
    ///
    /// `Conflict` if the property is not occupied by `tenant_id`.
    async fn remove_assignment(
        &self,
        property_id: Uuid,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<RemovalOutcome>;

    // --- Payments ---
    /// Moves a `pending` assignment to `paid` and appends the ledger entry.
    async fn record_payment(
        &self,
        assignment_id: Uuid,
        amount: f64,
        notes: &str,
        now: DateTime<Utc>,
    ) -> PortResult<(Assignment, PaymentRecord)>;

    /// Marks the newest `paid` ledger entry of the assignment's tenant/property
    /// pair as verified and moves the assignment to `verified`.
    ///
    /// `Conflict` if no `paid` entry exists.
    async fn verify_latest_payment(
        &self,
        assignment_id: Uuid,
        notes: &str,
    ) -> PortResult<(Assignment, PaymentRecord)>;

    /// Ledger entries of one tenant, newest first.
    async fn list_payment_records_for_tenant(&self, tenant_id: Uuid)
        -> PortResult<Vec<PaymentRecord>>;

    // --- Agreements ---
    /// `Conflict` if the external `agreement_id` is already taken.
    async fn create_agreement(&self, agreement: Agreement) -> PortResult<Agreement>;

    async fn get_agreement_by_reference(&self, agreement_id: &str) -> PortResult<Agreement>;

    /// Newest first.
    async fn list_agreements_for_landlord(&self, landlord_id: Uuid) -> PortResult<Vec<Agreement>>;

    /// Newest first.
    async fn list_agreements_for_tenant(&self, tenant_id: Uuid) -> PortResult<Vec<Agreement>>;

    /// Persists the signatures and status of `updated`, provided the stored row
    /// still matches `previous` (same status and signature flags).
    async fn save_signatures(&self, previous: &Agreement, updated: &Agreement)
        -> PortResult<Agreement>;
}
