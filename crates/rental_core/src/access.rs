//! crates/rental_core/src/access.rs
//!
//! The access-control gate. Every workflow operation declares a [`Capability`]
//! naming the role it requires, and checks the caller against it together with
//! an ownership predicate over the target resource. The gate is a pure guard;
//! it never touches the store.

use uuid::Uuid;

use crate::domain::Role;
use crate::error::{ServiceError, ServiceResult};

/// An authenticated caller. Handed explicitly into every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// The right to perform one kind of operation.
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    required_role: Option<Role>,
    action: &'static str,
}

impl Capability {
    /// Only callers with `role` may perform `action`.
    pub const fn for_role(role: Role, action: &'static str) -> Self {
        Self {
            required_role: Some(role),
            action,
        }
    }

    /// Any authenticated caller may attempt `action`; ownership decides.
    pub const fn any_role(action: &'static str) -> Self {
        Self {
            required_role: None,
            action,
        }
    }

    /// Role check only.
    pub fn check(&self, identity: &Identity) -> ServiceResult<()> {
        match self.required_role {
            Some(role) if role != identity.role => Err(ServiceError::forbidden(format!(
                "Access denied. Only {}s can {}.",
                role, self.action
            ))),
            _ => Ok(()),
        }
    }

    /// Role check, then `owns` decides whether the caller may touch the resource.
    pub fn check_with<F>(&self, identity: &Identity, owns: F) -> ServiceResult<()>
    where
        F: FnOnce(&Identity) -> bool,
    {
        self.check(identity)?;
        if owns(identity) {
            Ok(())
        } else {
            Err(ServiceError::forbidden(format!(
                "Access denied. You can only {} for resources you own.",
                self.action
            )))
        }
    }

    /// Role check plus the common case: the resource's owning id must be the caller.
    pub fn check_owner(&self, identity: &Identity, owner_id: Uuid) -> ServiceResult<()> {
        self.check_with(identity, |who| who.user_id == owner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANAGE: Capability = Capability::for_role(Role::Landlord, "manage properties");

    #[test]
    fn role_mismatch_is_forbidden() {
        let tenant = Identity::new(Uuid::new_v4(), Role::Tenant);
        assert!(matches!(MANAGE.check(&tenant), Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn owner_mismatch_is_forbidden() {
        let landlord = Identity::new(Uuid::new_v4(), Role::Landlord);
        assert!(MANAGE.check_owner(&landlord, landlord.user_id).is_ok());
        assert!(matches!(
            MANAGE.check_owner(&landlord, Uuid::new_v4()),
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[test]
    fn role_is_checked_before_ownership() {
        let tenant = Identity::new(Uuid::new_v4(), Role::Tenant);
        let err = MANAGE.check_owner(&tenant, tenant.user_id).unwrap_err();
        assert!(err.to_string().contains("Only landlords"));
    }

    #[test]
    fn any_role_defers_to_predicate() {
        let sign = Capability::any_role("sign agreements");
        let tenant = Identity::new(Uuid::new_v4(), Role::Tenant);
        assert!(sign.check_with(&tenant, |_| true).is_ok());
        assert!(sign.check_with(&tenant, |_| false).is_err());
    }
}
