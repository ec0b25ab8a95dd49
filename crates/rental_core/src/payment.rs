//! crates/rental_core/src/payment.rs
//!
//! The payment tracker. Each assignment cycles `pending -> paid -> verified`;
//! every payment also lands in the append-only ledger.
//!
//! There is no rollover back to `pending`: a verified assignment stays verified
//! until the tenant is removed. A due-date scheduler would hook in here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::access::{Capability, Identity};
use crate::domain::{
    Assignment, PaymentRecord, PaymentStatus, Property, PropertySummary, Role, UserSummary,
};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, PortError};
use crate::property::{load_property, UserCache};

const PAY: Capability = Capability::for_role(Role::Tenant, "mark payments as paid");
const PAYMENT_LINK: Capability = Capability::for_role(Role::Tenant, "request payment links");
const VIEW_HISTORY: Capability =
    Capability::for_role(Role::Tenant, "view their payment history");
const VIEW_PAYMENTS: Capability = Capability::for_role(Role::Landlord, "view tenant payments");
const VERIFY: Capability = Capability::for_role(Role::Landlord, "verify payments");

pub const PAID_NOTE: &str = "Payment marked as paid by tenant through dashboard.";
pub const VERIFIED_NOTE: &str = "Payment verified by landlord.";

/// An assignment on one of the landlord's properties, with who and what it binds.
#[derive(Debug, Clone)]
pub struct TenantPayment {
    pub assignment: Assignment,
    pub tenant: Option<UserSummary>,
    pub property: Option<PropertySummary>,
}

/// A ledger entry with the property it was paid for, if that still exists.
#[derive(Debug, Clone)]
pub struct PaymentHistoryEntry {
    pub record: PaymentRecord,
    pub property: Option<PropertySummary>,
}

#[derive(Clone)]
pub struct PaymentTracker {
    db: Arc<dyn DatabaseService>,
}

impl PaymentTracker {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// The property a tenant may pay rent for. Only their own assigned property qualifies.
    pub async fn payable_property(
        &self,
        who: &Identity,
        property_id: Uuid,
    ) -> ServiceResult<Property> {
        PAYMENT_LINK.check(who)?;

        let property = load_property(self.db.as_ref(), property_id).await?;
        let assignment = self.db.find_assignment_by_tenant(who.user_id).await?;
        PAYMENT_LINK.check_with(who, |_| {
            assignment.is_some_and(|a| a.property_id == property.id)
        })?;
        Ok(property)
    }

    pub async fn mark_paid(&self, who: &Identity) -> ServiceResult<(Assignment, PaymentRecord)> {
        PAY.check(who)?;

        let assignment = self
            .db
            .find_assignment_by_tenant(who.user_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found("Tenant information not found for current user.")
            })?;
        if assignment.payment_status != PaymentStatus::Pending {
            return Err(ServiceError::conflict(format!(
                "Payment is already {}.",
                assignment.payment_status
            )));
        }
        let property = load_property(self.db.as_ref(), assignment.property_id).await?;

        let (assignment, record) = self
            .db
            .record_payment(assignment.id, property.rent_amount, PAID_NOTE, Utc::now())
            .await?;
        info!(
            assignment_id = %assignment.id,
            tenant_id = %who.user_id,
            amount = record.amount,
            "payment marked as paid"
        );
        Ok((assignment, record))
    }

    pub async fn verify(
        &self,
        who: &Identity,
        assignment_id: Uuid,
    ) -> ServiceResult<(Assignment, PaymentRecord)> {
        VERIFY.check(who)?;

        let assignment = self.db.get_assignment(assignment_id).await.map_err(|e| match e {
            PortError::NotFound(_) => {
                ServiceError::not_found("Tenant information record not found.")
            }
            other => other.into(),
        })?;
        let property = load_property(self.db.as_ref(), assignment.property_id).await?;
        VERIFY.check_owner(who, property.landlord_id)?;
        if assignment.payment_status != PaymentStatus::Paid {
            return Err(ServiceError::conflict(format!(
                "Payment is {}; only a paid payment can be verified.",
                assignment.payment_status
            )));
        }

        let (assignment, record) = self
            .db
            .verify_latest_payment(assignment_id, VERIFIED_NOTE)
            .await?;
        info!(%assignment_id, record_id = %record.id, "payment verified");
        Ok((assignment, record))
    }

    pub async fn list_tenant_payments(&self, who: &Identity) -> ServiceResult<Vec<TenantPayment>> {
        VIEW_PAYMENTS.check(who)?;

        let properties: HashMap<Uuid, PropertySummary> = self
            .db
            .list_properties_by_landlord(who.user_id)
            .await?
            .iter()
            .map(|p| (p.id, PropertySummary::from(p)))
            .collect();
        let assignments = self.db.list_assignments_for_landlord(who.user_id).await?;

        let mut tenants = UserCache::new(self.db.as_ref());
        let mut payments = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let tenant = tenants.get(assignment.tenant_id).await?;
            let property = properties.get(&assignment.property_id).cloned();
            payments.push(TenantPayment {
                assignment,
                tenant,
                property,
            });
        }
        Ok(payments)
    }

    /// The caller's own ledger, newest first.
    pub async fn history(&self, who: &Identity) -> ServiceResult<Vec<PaymentHistoryEntry>> {
        VIEW_HISTORY.check(who)?;

        let records = self.db.list_payment_records_for_tenant(who.user_id).await?;
        let mut properties: HashMap<Uuid, Option<PropertySummary>> = HashMap::new();
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            if !properties.contains_key(&record.property_id) {
                let summary = match self.db.get_property(record.property_id).await {
                    Ok(p) => Some(PropertySummary::from(&p)),
                    Err(PortError::NotFound(_)) => None,
                    Err(e) => return Err(e.into()),
                };
                properties.insert(record.property_id, summary);
            }
            let property = properties.get(&record.property_id).cloned().flatten();
            entries.push(PaymentHistoryEntry { record, property });
        }
        Ok(entries)
    }
}
