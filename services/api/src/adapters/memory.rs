//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the `DatabaseService` port. Each table is a
//! plain collection behind a single `tokio::sync::Mutex`, so every composite
//! write (assign, remove, pay, verify, sign, delete) happens under one lock and
//! is atomic with respect to concurrent requests.
//!
//! Used when no `DATABASE_URL` is configured, and by the test suite.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rental_core::domain::{
    Agreement, AgreementStatus, Assignment, NewProperty, NewUser, PaymentRecord,
    PaymentRecordStatus, PaymentStatus, Property, PropertyFilter, Role, User, UserCredentials,
};
use rental_core::ports::{DatabaseService, PortError, PortResult, RemovalOutcome};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<(User, String)>,
    properties: Vec<Property>,
    assignments: Vec<Assignment>,
    payments: Vec<PaymentRecord>,
    agreements: Vec<Agreement>,
}

impl Tables {
    fn property_mut(&mut self, property_id: Uuid) -> PortResult<&mut Property> {
        self.properties
            .iter_mut()
            .find(|p| p.id == property_id)
            .ok_or_else(|| PortError::NotFound(format!("Property {} not found", property_id)))
    }

    fn assignment_mut(&mut self, assignment_id: Uuid) -> PortResult<&mut Assignment> {
        self.assignments
            .iter_mut()
            .find(|a| a.id == assignment_id)
            .ok_or_else(|| PortError::NotFound(format!("Assignment {} not found", assignment_id)))
    }
}

/// The in-memory store adapter.
#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; ties keep insertion order reversed.
fn newest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.reverse();
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut t = self.tables.lock().await;
        if t
            .users
            .iter()
            .any(|(u, _)| u.username == user.username || u.email == user.email)
        {
            return Err(PortError::Conflict(
                "User with this email or username already exists.".to_string(),
            ));
        }
        let record = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: Utc::now(),
        };
        t.users.push((record.clone(), user.hashed_password));
        Ok(record)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let t = self.tables.lock().await;
        t.users
            .iter()
            .find(|(u, _)| u.id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let t = self.tables.lock().await;
        t.users
            .iter()
            .find(|(u, _)| u.username == username)
            .map(|(u, hash)| UserCredentials {
                user_id: u.id,
                username: u.username.clone(),
                role: u.role,
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn list_users_by_role(&self, role: Role) -> PortResult<Vec<User>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .iter()
            .filter(|(u, _)| u.role == role)
            .map(|(u, _)| u.clone())
            .collect())
    }

    async fn list_unassigned_tenants(&self) -> PortResult<Vec<User>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .iter()
            .filter(|(u, _)| u.role == Role::Tenant)
            .filter(|(u, _)| !t.assignments.iter().any(|a| a.tenant_id == u.id))
            .map(|(u, _)| u.clone())
            .collect())
    }

    async fn create_property(
        &self,
        landlord_id: Uuid,
        property: NewProperty,
    ) -> PortResult<Property> {
        let mut t = self.tables.lock().await;
        let record = Property {
            id: Uuid::new_v4(),
            address: property.address,
            rent_amount: property.rent_amount,
            property_type: property.property_type,
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            area_sq_ft: property.area_sq_ft,
            description: property.description,
            landlord_id,
            tenant_id: None,
            created_at: Utc::now(),
        };
        t.properties.push(record.clone());
        Ok(record)
    }

    async fn get_property(&self, property_id: Uuid) -> PortResult<Property> {
        let mut t = self.tables.lock().await;
        t.property_mut(property_id).map(|p| p.clone())
    }

    async fn list_properties_by_landlord(&self, landlord_id: Uuid) -> PortResult<Vec<Property>> {
        let t = self.tables.lock().await;
        Ok(t.properties
            .iter()
            .filter(|p| p.landlord_id == landlord_id)
            .cloned()
            .collect())
    }

    async fn list_vacant_properties(&self, filter: &PropertyFilter) -> PortResult<Vec<Property>> {
        let t = self.tables.lock().await;
        Ok(t.properties
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn delete_vacant_property(&self, property_id: Uuid) -> PortResult<()> {
        let mut t = self.tables.lock().await;
        if !t.property_mut(property_id)?.is_vacant() {
            return Err(PortError::Conflict(
                "Cannot delete property with assigned tenant. Please remove the tenant first."
                    .to_string(),
            ));
        }
        if t.agreements.iter().any(|a| a.property_id == property_id) {
            return Err(PortError::Conflict(
                "Cannot delete property with existing rental agreements. Please handle agreements first."
                    .to_string(),
            ));
        }
        t.properties.retain(|p| p.id != property_id);
        Ok(())
    }

    async fn create_assignment(
        &self,
        property_id: Uuid,
        tenant_id: Uuid,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> PortResult<Assignment> {
        let mut t = self.tables.lock().await;
        if t.assignments.iter().any(|a| a.tenant_id == tenant_id) {
            return Err(PortError::Conflict(
                "This tenant is already assigned to a property. A tenant can only be assigned to one property at a time."
                    .to_string(),
            ));
        }
        let property = t.property_mut(property_id)?;
        if !property.is_vacant() {
            return Err(PortError::Conflict(
                "This property is already occupied by another tenant.".to_string(),
            ));
        }
        property.tenant_id = Some(tenant_id);

        let assignment = Assignment {
            id: Uuid::new_v4(),
            tenant_id,
            property_id,
            payment_status: PaymentStatus::Pending,
            last_payment_date: None,
            due_date,
            created_at: now,
        };
        t.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment(&self, assignment_id: Uuid) -> PortResult<Assignment> {
        let mut t = self.tables.lock().await;
        t.assignment_mut(assignment_id).map(|a| a.clone())
    }

    async fn find_assignment_by_tenant(&self, tenant_id: Uuid) -> PortResult<Option<Assignment>> {
        let t = self.tables.lock().await;
        Ok(t.assignments
            .iter()
            .find(|a| a.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_assignments_for_landlord(
        &self,
        landlord_id: Uuid,
    ) -> PortResult<Vec<Assignment>> {
        let t = self.tables.lock().await;
        Ok(t.assignments
            .iter()
            .filter(|a| {
                t.properties
                    .iter()
                    .any(|p| p.id == a.property_id && p.landlord_id == landlord_id)
            })
            .cloned()
            .collect())
    }

    async fn remove_assignment(
        &self,
        property_id: Uuid,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<RemovalOutcome> {
        let mut t = self.tables.lock().await;
        let property = t.property_mut(property_id)?;
        if property.tenant_id != Some(tenant_id) {
            return Err(PortError::Conflict(
                "This tenant is not assigned to the specified property.".to_string(),
            ));
        }
        property.tenant_id = None;

        let before = t.assignments.len();
        t.assignments
            .retain(|a| !(a.tenant_id == tenant_id && a.property_id == property_id));
        let assignment_deleted = t.assignments.len() < before;

        let mut cancelled_agreements = 0;
        for agreement in t.agreements.iter_mut().filter(|a| {
            a.tenant_id == tenant_id && a.property_id == property_id && a.status.is_cancellable()
        }) {
            agreement.status = AgreementStatus::Cancelled;
            agreement.updated_at = now;
            cancelled_agreements += 1;
        }

        Ok(RemovalOutcome {
            assignment_deleted,
            cancelled_agreements,
        })
    }

    async fn record_payment(
        &self,
        assignment_id: Uuid,
        amount: f64,
        notes: &str,
        now: DateTime<Utc>,
    ) -> PortResult<(Assignment, PaymentRecord)> {
        let mut t = self.tables.lock().await;
        let assignment = t.assignment_mut(assignment_id)?;
        if assignment.payment_status != PaymentStatus::Pending {
            return Err(PortError::Conflict(format!(
                "Payment is already {}.",
                assignment.payment_status
            )));
        }
        assignment.payment_status = PaymentStatus::Paid;
        assignment.last_payment_date = Some(now);
        let assignment = assignment.clone();

        let record = PaymentRecord {
            id: Uuid::new_v4(),
            tenant_id: assignment.tenant_id,
            property_id: assignment.property_id,
            amount,
            payment_date: now,
            status: PaymentRecordStatus::Paid,
            notes: notes.to_string(),
            created_at: now,
        };
        t.payments.push(record.clone());
        Ok((assignment, record))
    }

    async fn verify_latest_payment(
        &self,
        assignment_id: Uuid,
        notes: &str,
    ) -> PortResult<(Assignment, PaymentRecord)> {
        let mut t = self.tables.lock().await;
        let (tenant_id, property_id) = {
            let a = t.assignment_mut(assignment_id)?;
            if a.payment_status != PaymentStatus::Paid {
                return Err(PortError::Conflict(format!(
                    "Payment is {}; only a paid payment can be verified.",
                    a.payment_status
                )));
            }
            (a.tenant_id, a.property_id)
        };

        // Latest by created_at; among equal timestamps the later insert wins.
        let latest = t
            .payments
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.tenant_id == tenant_id
                    && r.property_id == property_id
                    && r.status == PaymentRecordStatus::Paid
            })
            .max_by_key(|(i, r)| (r.created_at, *i))
            .map(|(i, _)| i)
            .ok_or_else(|| {
                PortError::Conflict("No paid payment is awaiting verification.".to_string())
            })?;

        let record = &mut t.payments[latest];
        record.status = PaymentRecordStatus::Verified;
        record.notes = notes.to_string();
        let record = record.clone();

        let assignment = t.assignment_mut(assignment_id)?;
        assignment.payment_status = PaymentStatus::Verified;
        Ok((assignment.clone(), record))
    }

    async fn list_payment_records_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> PortResult<Vec<PaymentRecord>> {
        let t = self.tables.lock().await;
        let records = t
            .payments
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(newest_first(records, |r| r.created_at))
    }

    async fn create_agreement(&self, agreement: Agreement) -> PortResult<Agreement> {
        let mut t = self.tables.lock().await;
        if t
            .agreements
            .iter()
            .any(|a| a.agreement_id == agreement.agreement_id)
        {
            return Err(PortError::Conflict(format!(
                "Agreement {} already exists",
                agreement.agreement_id
            )));
        }
        t.agreements.push(agreement.clone());
        Ok(agreement)
    }

    async fn get_agreement_by_reference(&self, agreement_id: &str) -> PortResult<Agreement> {
        let t = self.tables.lock().await;
        t.agreements
            .iter()
            .find(|a| a.agreement_id == agreement_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Agreement {} not found", agreement_id)))
    }

    async fn list_agreements_for_landlord(&self, landlord_id: Uuid) -> PortResult<Vec<Agreement>> {
        let t = self.tables.lock().await;
        let agreements = t
            .agreements
            .iter()
            .filter(|a| a.landlord_id == landlord_id)
            .cloned()
            .collect();
        Ok(newest_first(agreements, |a| a.created_at))
    }

    async fn list_agreements_for_tenant(&self, tenant_id: Uuid) -> PortResult<Vec<Agreement>> {
        let t = self.tables.lock().await;
        let agreements = t
            .agreements
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect();
        Ok(newest_first(agreements, |a| a.created_at))
    }

    async fn save_signatures(
        &self,
        previous: &Agreement,
        updated: &Agreement,
    ) -> PortResult<Agreement> {
        let mut t = self.tables.lock().await;
        let stored = t
            .agreements
            .iter_mut()
            .find(|a| a.id == previous.id)
            .ok_or_else(|| {
                PortError::NotFound(format!("Agreement {} not found", previous.agreement_id))
            })?;
        if stored.status != previous.status
            || stored.tenant_signature.signed != previous.tenant_signature.signed
            || stored.landlord_signature.signed != previous.landlord_signature.signed
        {
            return Err(PortError::Conflict(
                "Agreement was modified concurrently; please retry.".to_string(),
            ));
        }
        stored.tenant_signature = updated.tenant_signature.clone();
        stored.landlord_signature = updated.landlord_signature.clone();
        stored.status = updated.status;
        stored.updated_at = updated.updated_at;
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_core::domain::{NewAgreement, Party, PropertyType};

    fn listing() -> NewProperty {
        NewProperty {
            address: "1 Baner Road".to_string(),
            rent_amount: 9000.0,
            property_type: PropertyType::TwoBhk,
            bedrooms: 2,
            bathrooms: 1,
            area_sq_ft: 900,
            description: String::new(),
        }
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    fn draft(tenant_id: Uuid, landlord_id: Uuid, property_id: Uuid) -> Agreement {
        NewAgreement {
            tenant_id,
            landlord_id,
            property_id,
            rent_amount: 9000.0,
            security_deposit: 18000.0,
            lease_duration: 12,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            terms: "No subletting.".to_string(),
            initiated_by: Party::Landlord,
        }
        .into_agreement("AGR-1704067200000-ABC123".to_string(), Utc::now())
        .unwrap()
    }

    #[tokio::test]
    async fn assignment_into_occupied_property_conflicts() {
        let db = InMemoryDb::new();
        let landlord = Uuid::new_v4();
        let property = db.create_property(landlord, listing()).await.unwrap();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        db.create_assignment(property.id, first, due(), Utc::now())
            .await
            .unwrap();
        let err = db
            .create_assignment(property.id, second, due(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));

        let stored = db.get_property(property.id).await.unwrap();
        assert_eq!(stored.tenant_id, Some(first));
        assert!(db.find_assignment_by_tenant(second).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_assignments_of_one_tenant_leave_one_binding() {
        let db = InMemoryDb::new();
        let landlord = Uuid::new_v4();
        let a = db.create_property(landlord, listing()).await.unwrap();
        let b = db.create_property(landlord, listing()).await.unwrap();
        let tenant = Uuid::new_v4();

        let (left, right) = tokio::join!(
            db.create_assignment(a.id, tenant, due(), Utc::now()),
            db.create_assignment(b.id, tenant, due(), Utc::now()),
        );
        assert_eq!(left.is_ok() as u8 + right.is_ok() as u8, 1);
        let loser = left.err().or(right.err()).unwrap();
        assert!(matches!(loser, PortError::Conflict(_)));

        let occupied = [a.id, b.id].len()
            - db
                .list_vacant_properties(&PropertyFilter::default())
                .await
                .unwrap()
                .len();
        assert_eq!(occupied, 1);
    }

    #[tokio::test]
    async fn stale_signature_write_conflicts() {
        let db = InMemoryDb::new();
        let (tenant, landlord, property) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let stored = db
            .create_agreement(draft(tenant, landlord, property))
            .await
            .unwrap();

        let mut by_tenant = stored.clone();
        by_tenant.sign(Party::Tenant, Utc::now(), "10.0.0.5").unwrap();
        db.save_signatures(&stored, &by_tenant).await.unwrap();

        // A second writer still holding the unsigned snapshot.
        let mut stale = stored.clone();
        stale.sign(Party::Tenant, Utc::now(), "10.0.0.9").unwrap();
        let err = db.save_signatures(&stored, &stale).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));

        let current = db
            .get_agreement_by_reference(&stored.agreement_id)
            .await
            .unwrap();
        assert_eq!(current.status, AgreementStatus::PendingLandlordSignature);
        assert_eq!(current.tenant_signature.ip_address.as_deref(), Some("10.0.0.5"));
    }

    #[tokio::test]
    async fn verify_requires_a_paid_assignment() {
        let db = InMemoryDb::new();
        let landlord = Uuid::new_v4();
        let property = db.create_property(landlord, listing()).await.unwrap();
        let tenant = Uuid::new_v4();

        let old = db
            .create_assignment(property.id, tenant, due(), Utc::now())
            .await
            .unwrap();
        db.record_payment(old.id, 9000.0, "paid", Utc::now())
            .await
            .unwrap();
        db.remove_assignment(property.id, tenant, Utc::now())
            .await
            .unwrap();

        let fresh = db
            .create_assignment(property.id, tenant, due(), Utc::now())
            .await
            .unwrap();
        let err = db
            .verify_latest_payment(fresh.id, "verified")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        let current = db.get_assignment(fresh.id).await.unwrap();
        assert_eq!(current.payment_status, PaymentStatus::Pending);
    }
}
