//! crates/rental_core/src/property.rs
//!
//! The property registry: landlord-owned listings, tenant browsing and the
//! tenant directory landlords pick from when assigning.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::access::{Capability, Identity};
use crate::domain::{
    NewProperty, Property, PropertyFilter, Role, User, UserSummary, MAX_PROPERTY_COUNT,
};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, PortError};

const ADD_PROPERTY: Capability = Capability::for_role(Role::Landlord, "add properties");
const VIEW_OWN_PROPERTIES: Capability =
    Capability::for_role(Role::Landlord, "view their properties");
const DELETE_PROPERTY: Capability = Capability::for_role(Role::Landlord, "delete properties");
const VIEW_TENANTS: Capability = Capability::for_role(Role::Landlord, "view tenants");
const BROWSE: Capability = Capability::for_role(Role::Tenant, "browse properties");
const CONTACT: Capability = Capability::for_role(Role::Tenant, "send contact requests");

/// A landlord's listing together with the occupying tenant, if any.
#[derive(Debug, Clone)]
pub struct OwnedProperty {
    pub property: Property,
    pub tenant: Option<UserSummary>,
}

/// A vacant listing together with the landlord to contact.
#[derive(Debug, Clone)]
pub struct AvailableProperty {
    pub property: Property,
    pub landlord: UserSummary,
}

/// The simulated confirmation of a tenant contacting a landlord. Nothing is delivered.
#[derive(Debug, Clone)]
pub struct ContactReceipt {
    pub landlord: UserSummary,
    pub tenant: UserSummary,
    pub property: Property,
    pub message: String,
}

#[derive(Clone)]
pub struct PropertyRegistry {
    db: Arc<dyn DatabaseService>,
}

impl PropertyRegistry {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn create(&self, who: &Identity, input: NewProperty) -> ServiceResult<Property> {
        ADD_PROPERTY.check(who)?;
        validate_new_property(&input)?;

        let property = self.db.create_property(who.user_id, input).await?;
        info!(property_id = %property.id, landlord_id = %who.user_id, "property created");
        Ok(property)
    }

    pub async fn list_own(&self, who: &Identity) -> ServiceResult<Vec<OwnedProperty>> {
        VIEW_OWN_PROPERTIES.check(who)?;

        let properties = self.db.list_properties_by_landlord(who.user_id).await?;
        let mut tenants = UserCache::new(self.db.as_ref());
        let mut owned = Vec::with_capacity(properties.len());
        for property in properties {
            let tenant = match property.tenant_id {
                Some(id) => tenants.get(id).await?,
                None => None,
            };
            owned.push(OwnedProperty { property, tenant });
        }
        Ok(owned)
    }

    /// Deletes a listing once its history is resolved: no tenant and no agreements.
    pub async fn delete(&self, who: &Identity, property_id: Uuid) -> ServiceResult<()> {
        DELETE_PROPERTY.check(who)?;

        let property = load_property(self.db.as_ref(), property_id).await?;
        DELETE_PROPERTY.check_owner(who, property.landlord_id)?;
        if !property.is_vacant() {
            return Err(ServiceError::conflict(
                "Cannot delete property with assigned tenant. Please remove the tenant first.",
            ));
        }

        self.db.delete_vacant_property(property_id).await?;
        info!(%property_id, landlord_id = %who.user_id, "property deleted");
        Ok(())
    }

    pub async fn list_available(
        &self,
        who: &Identity,
        filter: &PropertyFilter,
    ) -> ServiceResult<Vec<AvailableProperty>> {
        BROWSE.check(who)?;

        let properties = self.db.list_vacant_properties(filter).await?;
        let mut landlords = UserCache::new(self.db.as_ref());
        let mut available = Vec::with_capacity(properties.len());
        for property in properties {
            if let Some(landlord) = landlords.get(property.landlord_id).await? {
                available.push(AvailableProperty { property, landlord });
            }
        }
        Ok(available)
    }

    pub async fn list_all_tenants(&self, who: &Identity) -> ServiceResult<Vec<UserSummary>> {
        VIEW_TENANTS.check(who)?;
        let tenants = self.db.list_users_by_role(Role::Tenant).await?;
        Ok(tenants.iter().map(UserSummary::from).collect())
    }

    pub async fn list_unassigned_tenants(&self, who: &Identity) -> ServiceResult<Vec<UserSummary>> {
        VIEW_TENANTS.check(who)?;
        let tenants = self.db.list_unassigned_tenants().await?;
        Ok(tenants.iter().map(UserSummary::from).collect())
    }

    pub async fn contact_landlord(
        &self,
        who: &Identity,
        property_id: Uuid,
        message: String,
    ) -> ServiceResult<ContactReceipt> {
        CONTACT.check(who)?;

        let property = load_property(self.db.as_ref(), property_id).await?;
        let landlord = self.db.get_user(property.landlord_id).await?;
        let tenant = self.db.get_user(who.user_id).await.map_err(|e| match e {
            PortError::NotFound(_) => ServiceError::not_found("Tenant not found."),
            other => other.into(),
        })?;

        info!(%property_id, tenant_id = %who.user_id, "contact request recorded");
        Ok(ContactReceipt {
            landlord: UserSummary::from(&landlord),
            tenant: UserSummary::from(&tenant),
            property,
            message,
        })
    }
}

fn validate_new_property(input: &NewProperty) -> ServiceResult<()> {
    if input.address.trim().is_empty() {
        return Err(ServiceError::validation("Missing required property fields."));
    }
    if !input.rent_amount.is_finite() || input.rent_amount <= 0.0 {
        return Err(ServiceError::validation(
            "Rent amount must be a positive number.",
        ));
    }
    let counts = [input.bedrooms, input.bathrooms, input.area_sq_ft];
    if counts.iter().any(|&n| n > MAX_PROPERTY_COUNT) {
        return Err(ServiceError::validation(format!(
            "Bedrooms, bathrooms and area must not exceed {}.",
            MAX_PROPERTY_COUNT
        )));
    }
    Ok(())
}

/// Loads a property, reporting a missing one with a caller-facing message.
pub(crate) async fn load_property(
    db: &dyn DatabaseService,
    property_id: Uuid,
) -> ServiceResult<Property> {
    db.get_property(property_id).await.map_err(|e| match e {
        PortError::NotFound(_) => ServiceError::not_found("Property not found."),
        other => other.into(),
    })
}

/// Memoizes user lookups while populating a listing.
pub(crate) struct UserCache<'a> {
    db: &'a dyn DatabaseService,
    seen: HashMap<Uuid, Option<User>>,
}

impl<'a> UserCache<'a> {
    pub(crate) fn new(db: &'a dyn DatabaseService) -> Self {
        Self {
            db,
            seen: HashMap::new(),
        }
    }

    /// `None` if the referenced user no longer resolves.
    pub(crate) async fn get(&mut self, user_id: Uuid) -> ServiceResult<Option<UserSummary>> {
        if !self.seen.contains_key(&user_id) {
            let user = match self.db.get_user(user_id).await {
                Ok(user) => Some(user),
                Err(PortError::NotFound(_)) => None,
                Err(e) => return Err(e.into()),
            };
            self.seen.insert(user_id, user);
        }
        Ok(self
            .seen
            .get(&user_id)
            .and_then(|u| u.as_ref())
            .map(UserSummary::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PropertyType;

    fn listing() -> NewProperty {
        NewProperty {
            address: "12 Lake Road".to_string(),
            rent_amount: 12000.0,
            property_type: PropertyType::TwoBhk,
            bedrooms: 2,
            bathrooms: 1,
            area_sq_ft: 900,
            description: String::new(),
        }
    }

    #[test]
    fn valid_listing_passes() {
        assert!(validate_new_property(&listing()).is_ok());
    }

    #[test]
    fn oversized_counts_are_rejected() {
        let too_many_rooms = NewProperty {
            bedrooms: MAX_PROPERTY_COUNT + 1,
            ..listing()
        };
        assert!(matches!(
            validate_new_property(&too_many_rooms),
            Err(ServiceError::Validation(_))
        ));

        let too_large = NewProperty {
            area_sq_ft: u32::MAX,
            ..listing()
        };
        assert!(matches!(
            validate_new_property(&too_large),
            Err(ServiceError::Validation(_))
        ));

        let at_limit = NewProperty {
            bathrooms: MAX_PROPERTY_COUNT,
            ..listing()
        };
        assert!(validate_new_property(&at_limit).is_ok());
    }
}
