//! crates/rental_core/src/assignment.rs
//!
//! The assignment manager. Enforces that a tenant occupies at most one property
//! and that `Property.tenant_id` and the tenant's `Assignment` always agree.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access::{Capability, Identity};
use crate::domain::{first_day_of_next_month, Assignment, Property, Role};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, PortError};
use crate::property::load_property;

const ASSIGN: Capability = Capability::for_role(Role::Landlord, "assign tenants");
const REMOVE: Capability = Capability::for_role(Role::Landlord, "remove tenants");
const DASHBOARD: Capability = Capability::for_role(Role::Tenant, "view their dashboard");

#[derive(Debug, Clone)]
pub enum AssignOutcome {
    Assigned {
        property: Property,
        assignment: Assignment,
    },
    /// The property was already occupied by this very tenant; nothing changed.
    AlreadyAssigned,
}

/// What a tenant sees on their dashboard.
#[derive(Debug, Clone)]
pub struct TenantDashboard {
    pub assignment: Assignment,
    pub property: Property,
}

#[derive(Clone)]
pub struct AssignmentManager {
    db: Arc<dyn DatabaseService>,
}

impl AssignmentManager {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn assign(
        &self,
        who: &Identity,
        property_id: Uuid,
        tenant_id: Uuid,
    ) -> ServiceResult<AssignOutcome> {
        ASSIGN.check(who)?;

        let property = load_property(self.db.as_ref(), property_id).await?;
        ASSIGN.check_owner(who, property.landlord_id)?;

        match property.tenant_id {
            Some(current) if current == tenant_id => {
                debug!(%property_id, %tenant_id, "tenant already assigned, nothing to do");
                return Ok(AssignOutcome::AlreadyAssigned);
            }
            Some(_) => {
                return Err(ServiceError::conflict(
                    "This property is already occupied by another tenant.",
                ))
            }
            None => {}
        }

        let tenant = self.db.get_user(tenant_id).await.map_err(|e| match e {
            PortError::NotFound(_) => ServiceError::not_found("Tenant not found."),
            other => other.into(),
        })?;
        if tenant.role != Role::Tenant {
            return Err(ServiceError::validation("Only tenants can be assigned to a property."));
        }
        if self.db.find_assignment_by_tenant(tenant_id).await?.is_some() {
            return Err(already_assigned_elsewhere());
        }

        let now = Utc::now();
        let due_date = first_day_of_next_month(now.date_naive());
        // The store re-checks vacancy and tenant uniqueness inside the write.
        let assignment = self
            .db
            .create_assignment(property_id, tenant_id, due_date, now)
            .await?;

        let property = Property {
            tenant_id: Some(tenant_id),
            ..property
        };
        info!(%property_id, %tenant_id, %due_date, "tenant assigned");
        Ok(AssignOutcome::Assigned {
            property,
            assignment,
        })
    }

    /// Vacates the property. Cancels every live agreement for the pair; the
    /// payment ledger is kept.
    pub async fn remove(
        &self,
        who: &Identity,
        property_id: Uuid,
        tenant_id: Uuid,
    ) -> ServiceResult<Property> {
        REMOVE.check(who)?;

        let property = load_property(self.db.as_ref(), property_id).await?;
        REMOVE.check_owner(who, property.landlord_id)?;
        if property.tenant_id != Some(tenant_id) {
            return Err(not_assigned_here());
        }

        let outcome = self
            .db
            .remove_assignment(property_id, tenant_id, Utc::now())
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => not_assigned_here(),
                other => other.into(),
            })?;
        if !outcome.assignment_deleted {
            warn!(%property_id, %tenant_id, "no assignment record found while removing tenant");
        }

        info!(
            %property_id,
            %tenant_id,
            cancelled_agreements = outcome.cancelled_agreements,
            "tenant removed"
        );
        Ok(Property {
            tenant_id: None,
            ..property
        })
    }

    pub async fn dashboard(&self, who: &Identity) -> ServiceResult<TenantDashboard> {
        DASHBOARD.check(who)?;

        let assignment = self
            .db
            .find_assignment_by_tenant(who.user_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found("No property currently assigned to this tenant.")
            })?;
        let property = load_property(self.db.as_ref(), assignment.property_id).await?;
        Ok(TenantDashboard {
            assignment,
            property,
        })
    }
}

fn already_assigned_elsewhere() -> ServiceError {
    ServiceError::conflict(
        "This tenant is already assigned to a property. A tenant can only be assigned to one property at a time.",
    )
}

fn not_assigned_here() -> ServiceError {
    ServiceError::conflict("This tenant is not assigned to the specified property.")
}
