//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Composite writes run inside one transaction and use conditional updates so the
//! occupancy and signature invariants hold under concurrent requests; the unique
//! indexes in the migrations back them up.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rental_core::domain::{
    Agreement, AgreementStatus, Assignment, NewProperty, NewUser, PaymentRecord, PaymentStatus,
    Property, PropertyFilter, Role, Signature, User, UserCredentials,
};
use rental_core::ports::{DatabaseService, PortError, PortResult, RemovalOutcome};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// Error helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Maps a unique-index violation to `Conflict(msg)`, anything else to `Unexpected`.
fn conflict_on_unique(msg: &'static str) -> impl Fn(sqlx::Error) -> PortError {
    move |e| {
        if is_unique_violation(&e) {
            PortError::Conflict(msg.to_string())
        } else {
            unexpected(e)
        }
    }
}

fn not_found_or_unexpected(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => unexpected(e),
    }
}

fn parse<T: std::str::FromStr>(raw: &str) -> PortResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| PortError::Unexpected(format!("corrupt row: {e}")))
}

fn to_i32(value: u32) -> PortResult<i32> {
    i32::try_from(value).map_err(|_| PortError::Unexpected(format!("{value} is out of range")))
}

fn to_u32(value: i32) -> PortResult<u32> {
    u32::try_from(value).map_err(|_| PortError::Unexpected(format!("corrupt row: {value}")))
}

/// `%needle%` for ILIKE, with the pattern metacharacters escaped.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, username, email, role, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            role: parse(&self.role)?,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    role: String,
    password_hash: String,
}

const PROPERTY_COLUMNS: &str = "id, address, rent_amount, property_type, bedrooms, bathrooms, \
     area_sq_ft, description, landlord_id, tenant_id, created_at";

#[derive(FromRow)]
struct PropertyRecord {
    id: Uuid,
    address: String,
    rent_amount: f64,
    property_type: String,
    bedrooms: i32,
    bathrooms: i32,
    area_sq_ft: i32,
    description: String,
    landlord_id: Uuid,
    tenant_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}
impl PropertyRecord {
    fn to_domain(self) -> PortResult<Property> {
        Ok(Property {
            id: self.id,
            address: self.address,
            rent_amount: self.rent_amount,
            property_type: parse(&self.property_type)?,
            bedrooms: to_u32(self.bedrooms)?,
            bathrooms: to_u32(self.bathrooms)?,
            area_sq_ft: to_u32(self.area_sq_ft)?,
            description: self.description,
            landlord_id: self.landlord_id,
            tenant_id: self.tenant_id,
            created_at: self.created_at,
        })
    }
}

const ASSIGNMENT_COLUMNS: &str =
    "id, tenant_id, property_id, payment_status, last_payment_date, due_date, created_at";

#[derive(FromRow)]
struct AssignmentRecord {
    id: Uuid,
    tenant_id: Uuid,
    property_id: Uuid,
    payment_status: String,
    last_payment_date: Option<DateTime<Utc>>,
    due_date: NaiveDate,
    created_at: DateTime<Utc>,
}
impl AssignmentRecord {
    fn to_domain(self) -> PortResult<Assignment> {
        Ok(Assignment {
            id: self.id,
            tenant_id: self.tenant_id,
            property_id: self.property_id,
            payment_status: parse(&self.payment_status)?,
            last_payment_date: self.last_payment_date,
            due_date: self.due_date,
            created_at: self.created_at,
        })
    }
}

const PAYMENT_COLUMNS: &str =
    "id, tenant_id, property_id, amount, payment_date, status, notes, created_at";

#[derive(FromRow)]
struct PaymentRecordRow {
    id: Uuid,
    tenant_id: Uuid,
    property_id: Uuid,
    amount: f64,
    payment_date: DateTime<Utc>,
    status: String,
    notes: String,
    created_at: DateTime<Utc>,
}
impl PaymentRecordRow {
    fn to_domain(self) -> PortResult<PaymentRecord> {
        Ok(PaymentRecord {
            id: self.id,
            tenant_id: self.tenant_id,
            property_id: self.property_id,
            amount: self.amount,
            payment_date: self.payment_date,
            status: parse(&self.status)?,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

const AGREEMENT_COLUMNS: &str = "id, agreement_id, tenant_id, landlord_id, property_id, \
     rent_amount, security_deposit, lease_duration, start_date, end_date, terms, status, \
     tenant_signed, tenant_signed_at, tenant_signed_ip, \
     landlord_signed, landlord_signed_at, landlord_signed_ip, created_at, updated_at";

#[derive(FromRow)]
struct AgreementRecord {
    id: Uuid,
    agreement_id: String,
    tenant_id: Uuid,
    landlord_id: Uuid,
    property_id: Uuid,
    rent_amount: f64,
    security_deposit: f64,
    lease_duration: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    terms: String,
    status: String,
    tenant_signed: bool,
    tenant_signed_at: Option<DateTime<Utc>>,
    tenant_signed_ip: Option<String>,
    landlord_signed: bool,
    landlord_signed_at: Option<DateTime<Utc>>,
    landlord_signed_ip: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl AgreementRecord {
    fn to_domain(self) -> PortResult<Agreement> {
        Ok(Agreement {
            id: self.id,
            agreement_id: self.agreement_id,
            tenant_id: self.tenant_id,
            landlord_id: self.landlord_id,
            property_id: self.property_id,
            rent_amount: self.rent_amount,
            security_deposit: self.security_deposit,
            lease_duration: to_u32(self.lease_duration)?,
            start_date: self.start_date,
            end_date: self.end_date,
            terms: self.terms,
            status: parse(&self.status)?,
            tenant_signature: Signature {
                signed: self.tenant_signed,
                signed_at: self.tenant_signed_at,
                ip_address: self.tenant_signed_ip,
            },
            landlord_signature: Signature {
                signed: self.landlord_signed,
                signed_at: self.landlord_signed_at,
                ip_address: self.landlord_signed_ip,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn all_to_domain<R, T>(records: Vec<R>, f: fn(R) -> PortResult<T>) -> PortResult<Vec<T>> {
    records.into_iter().map(f).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.hashed_password)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(conflict_on_unique(
                "User with this email or username already exists.",
            ))?;
        record.to_domain()
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!("User {} not found", user_id)))?
            .to_domain()
    }

    async fn get_credentials_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, role, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {} not found", username)))?;
        Ok(UserCredentials {
            user_id: record.id,
            username: record.username,
            role: parse(&record.role)?,
            hashed_password: record.password_hash,
        })
    }

    async fn list_users_by_role(&self, role: Role) -> PortResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at");
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        all_to_domain(records, UserRecord::to_domain)
    }

    async fn list_unassigned_tenants(&self) -> PortResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.role = 'tenant' \
             AND NOT EXISTS (SELECT 1 FROM assignments a WHERE a.tenant_id = u.id) \
             ORDER BY u.created_at"
        );
        let records = sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        all_to_domain(records, UserRecord::to_domain)
    }

    async fn create_property(
        &self,
        landlord_id: Uuid,
        property: NewProperty,
    ) -> PortResult<Property> {
        let sql = format!(
            "INSERT INTO properties (id, address, rent_amount, property_type, bedrooms, bathrooms, \
             area_sq_ft, description, landlord_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {PROPERTY_COLUMNS}"
        );
        sqlx::query_as::<_, PropertyRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&property.address)
            .bind(property.rent_amount)
            .bind(property.property_type.as_str())
            .bind(to_i32(property.bedrooms)?)
            .bind(to_i32(property.bathrooms)?)
            .bind(to_i32(property.area_sq_ft)?)
            .bind(&property.description)
            .bind(landlord_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn get_property(&self, property_id: Uuid) -> PortResult<Property> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1");
        sqlx::query_as::<_, PropertyRecord>(&sql)
            .bind(property_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!(
                "Property {} not found",
                property_id
            )))?
            .to_domain()
    }

    async fn list_properties_by_landlord(&self, landlord_id: Uuid) -> PortResult<Vec<Property>> {
        let sql = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE landlord_id = $1 ORDER BY created_at"
        );
        let records = sqlx::query_as::<_, PropertyRecord>(&sql)
            .bind(landlord_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        all_to_domain(records, PropertyRecord::to_domain)
    }

    async fn list_vacant_properties(&self, filter: &PropertyFilter) -> PortResult<Vec<Property>> {
        let sql = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties \
             WHERE tenant_id IS NULL \
             AND ($1::TEXT IS NULL OR address ILIKE $1) \
             AND ($2::TEXT IS NULL OR property_type = $2) \
             AND ($3::FLOAT8 IS NULL OR rent_amount >= $3) \
             AND ($4::FLOAT8 IS NULL OR rent_amount <= $4) \
             AND ($5::INT4 IS NULL OR bedrooms >= $5) \
             AND ($6::INT4 IS NULL OR bathrooms >= $6) \
             ORDER BY created_at"
        );
        let min_bedrooms = filter.min_bedrooms.map(to_i32).transpose()?;
        let min_bathrooms = filter.min_bathrooms.map(to_i32).transpose()?;
        let records = sqlx::query_as::<_, PropertyRecord>(&sql)
            .bind(filter.location.as_deref().map(contains_pattern))
            .bind(filter.property_type.map(|t| t.as_str()))
            .bind(filter.min_rent)
            .bind(filter.max_rent)
            .bind(min_bedrooms)
            .bind(min_bathrooms)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        all_to_domain(records, PropertyRecord::to_domain)
    }

    async fn delete_vacant_property(&self, property_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let property = sqlx::query_as::<_, (Option<Uuid>,)>(
            "SELECT tenant_id FROM properties WHERE id = $1 FOR UPDATE",
        )
        .bind(property_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("Property {} not found", property_id)))?;
        if property.0.is_some() {
            return Err(PortError::Conflict(
                "Cannot delete property with assigned tenant. Please remove the tenant first."
                    .to_string(),
            ));
        }

        let (has_agreements,) = sqlx::query_as::<_, (bool,)>(
            "SELECT EXISTS (SELECT 1 FROM agreements WHERE property_id = $1)",
        )
        .bind(property_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;
        if has_agreements {
            return Err(PortError::Conflict(
                "Cannot delete property with existing rental agreements. Please handle agreements first."
                    .to_string(),
            ));
        }

        sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(property_id)
            .execute(&mut *tx)
            .await
            // A concurrent agreement insert trips the foreign key.
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                    PortError::Conflict(
                        "Cannot delete property with existing rental agreements.".to_string(),
                    )
                }
                other => unexpected(other),
            })?;
        tx.commit().await.map_err(unexpected)
    }

    async fn create_assignment(
        &self,
        property_id: Uuid,
        tenant_id: Uuid,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> PortResult<Assignment> {
        const TENANT_TAKEN: &str = "This tenant is already assigned to a property. A tenant can only be assigned to one property at a time.";

        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Compare-and-set on vacancy.
        let occupied = sqlx::query(
            "UPDATE properties SET tenant_id = $1 WHERE id = $2 AND tenant_id IS NULL",
        )
        .bind(tenant_id)
        .bind(property_id)
        .execute(&mut *tx)
        .await
        .map_err(conflict_on_unique(TENANT_TAKEN))?;
        if occupied.rows_affected() == 0 {
            return Err(PortError::Conflict(
                "This property is already occupied by another tenant.".to_string(),
            ));
        }

        let sql = format!(
            "INSERT INTO assignments (id, tenant_id, property_id, payment_status, due_date, created_at) \
             VALUES ($1, $2, $3, 'pending', $4, $5) RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, AssignmentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(tenant_id)
            .bind(property_id)
            .bind(due_date)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(conflict_on_unique(TENANT_TAKEN))?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_assignment(&self, assignment_id: Uuid) -> PortResult<Assignment> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1");
        sqlx::query_as::<_, AssignmentRecord>(&sql)
            .bind(assignment_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!(
                "Assignment {} not found",
                assignment_id
            )))?
            .to_domain()
    }

    async fn find_assignment_by_tenant(&self, tenant_id: Uuid) -> PortResult<Option<Assignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE tenant_id = $1");
        sqlx::query_as::<_, AssignmentRecord>(&sql)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(AssignmentRecord::to_domain)
            .transpose()
    }

    async fn list_assignments_for_landlord(
        &self,
        landlord_id: Uuid,
    ) -> PortResult<Vec<Assignment>> {
        let records = sqlx::query_as::<_, AssignmentRecord>(
            "SELECT a.id, a.tenant_id, a.property_id, a.payment_status, a.last_payment_date, \
             a.due_date, a.created_at \
             FROM assignments a JOIN properties p ON p.id = a.property_id \
             WHERE p.landlord_id = $1 ORDER BY a.created_at",
        )
        .bind(landlord_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        all_to_domain(records, AssignmentRecord::to_domain)
    }

    async fn remove_assignment(
        &self,
        property_id: Uuid,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<RemovalOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let vacated = sqlx::query(
            "UPDATE properties SET tenant_id = NULL WHERE id = $1 AND tenant_id = $2",
        )
        .bind(property_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;
        if vacated.rows_affected() == 0 {
            return Err(PortError::Conflict(
                "This tenant is not assigned to the specified property.".to_string(),
            ));
        }

        let deleted =
            sqlx::query("DELETE FROM assignments WHERE tenant_id = $1 AND property_id = $2")
                .bind(tenant_id)
                .bind(property_id)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;

        let cancellable: Vec<String> = AgreementStatus::CANCELLABLE
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let cancelled = sqlx::query(
            "UPDATE agreements SET status = 'cancelled', updated_at = $3 \
             WHERE tenant_id = $1 AND property_id = $2 AND status = ANY($4)",
        )
        .bind(tenant_id)
        .bind(property_id)
        .bind(now)
        .bind(cancellable)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(RemovalOutcome {
            assignment_deleted: deleted.rows_affected() > 0,
            cancelled_agreements: cancelled.rows_affected(),
        })
    }

    async fn record_payment(
        &self,
        assignment_id: Uuid,
        amount: f64,
        notes: &str,
        now: DateTime<Utc>,
    ) -> PortResult<(Assignment, PaymentRecord)> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "UPDATE assignments SET payment_status = 'paid', last_payment_date = $2 \
             WHERE id = $1 AND payment_status = 'pending' RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let assignment = sqlx::query_as::<_, AssignmentRecord>(&sql)
            .bind(assignment_id)
            .bind(now)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::Conflict("Payment is not pending for this assignment.".to_string())
            })?
            .to_domain()?;

        let sql = format!(
            "INSERT INTO payment_history (id, tenant_id, property_id, amount, payment_date, status, notes, created_at) \
             VALUES ($1, $2, $3, $4, $5, 'paid', $6, $5) RETURNING {PAYMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, PaymentRecordRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(assignment.tenant_id)
            .bind(assignment.property_id)
            .bind(amount)
            .bind(now)
            .bind(notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?
            .to_domain()?;

        tx.commit().await.map_err(unexpected)?;
        Ok((assignment, record))
    }

    async fn verify_latest_payment(
        &self,
        assignment_id: Uuid,
        notes: &str,
    ) -> PortResult<(Assignment, PaymentRecord)> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1 FOR UPDATE"
        );
        let current = sqlx::query_as::<_, AssignmentRecord>(&sql)
            .bind(assignment_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::NotFound(format!("Assignment {} not found", assignment_id))
            })?;
        if current.payment_status != PaymentStatus::Paid.as_str() {
            return Err(PortError::Conflict(format!(
                "Payment is {}; only a paid payment can be verified.",
                current.payment_status
            )));
        }

        let sql = format!(
            "UPDATE payment_history SET status = 'verified', notes = $3 \
             WHERE id = (SELECT id FROM payment_history \
                         WHERE tenant_id = $1 AND property_id = $2 AND status = 'paid' \
                         ORDER BY created_at DESC LIMIT 1 FOR UPDATE) \
             RETURNING {PAYMENT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, PaymentRecordRow>(&sql)
            .bind(current.tenant_id)
            .bind(current.property_id)
            .bind(notes)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::Conflict("No paid payment is awaiting verification.".to_string())
            })?
            .to_domain()?;

        let sql = format!(
            "UPDATE assignments SET payment_status = 'verified' \
             WHERE id = $1 AND payment_status = 'paid' \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let assignment = sqlx::query_as::<_, AssignmentRecord>(&sql)
            .bind(assignment_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::Conflict("Payment is no longer awaiting verification.".to_string())
            })?
            .to_domain()?;

        tx.commit().await.map_err(unexpected)?;
        Ok((assignment, record))
    }

    async fn list_payment_records_for_tenant(
        &self,
        tenant_id: Uuid,
    ) -> PortResult<Vec<PaymentRecord>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history WHERE tenant_id = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, PaymentRecordRow>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        all_to_domain(records, PaymentRecordRow::to_domain)
    }

    async fn create_agreement(&self, agreement: Agreement) -> PortResult<Agreement> {
        let sql = format!(
            "INSERT INTO agreements ({AGREEMENT_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
              $13, $14, $15, $16, $17, $18, $19, $20) \
             RETURNING {AGREEMENT_COLUMNS}"
        );
        let t = &agreement.tenant_signature;
        let l = &agreement.landlord_signature;
        sqlx::query_as::<_, AgreementRecord>(&sql)
            .bind(agreement.id)
            .bind(&agreement.agreement_id)
            .bind(agreement.tenant_id)
            .bind(agreement.landlord_id)
            .bind(agreement.property_id)
            .bind(agreement.rent_amount)
            .bind(agreement.security_deposit)
            .bind(to_i32(agreement.lease_duration)?)
            .bind(agreement.start_date)
            .bind(agreement.end_date)
            .bind(&agreement.terms)
            .bind(agreement.status.as_str())
            .bind(t.signed)
            .bind(t.signed_at)
            .bind(t.ip_address.as_deref())
            .bind(l.signed)
            .bind(l.signed_at)
            .bind(l.ip_address.as_deref())
            .bind(agreement.created_at)
            .bind(agreement.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PortError::Conflict(format!(
                        "Agreement {} already exists",
                        agreement.agreement_id
                    ))
                } else {
                    unexpected(e)
                }
            })?
            .to_domain()
    }

    async fn get_agreement_by_reference(&self, agreement_id: &str) -> PortResult<Agreement> {
        let sql = format!("SELECT {AGREEMENT_COLUMNS} FROM agreements WHERE agreement_id = $1");
        sqlx::query_as::<_, AgreementRecord>(&sql)
            .bind(agreement_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!(
                "Agreement {} not found",
                agreement_id
            )))?
            .to_domain()
    }

    async fn list_agreements_for_landlord(&self, landlord_id: Uuid) -> PortResult<Vec<Agreement>> {
        let sql = format!(
            "SELECT {AGREEMENT_COLUMNS} FROM agreements WHERE landlord_id = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, AgreementRecord>(&sql)
            .bind(landlord_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        all_to_domain(records, AgreementRecord::to_domain)
    }

    async fn list_agreements_for_tenant(&self, tenant_id: Uuid) -> PortResult<Vec<Agreement>> {
        let sql = format!(
            "SELECT {AGREEMENT_COLUMNS} FROM agreements WHERE tenant_id = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, AgreementRecord>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        all_to_domain(records, AgreementRecord::to_domain)
    }

    async fn save_signatures(
        &self,
        previous: &Agreement,
        updated: &Agreement,
    ) -> PortResult<Agreement> {
        let sql = format!(
            "UPDATE agreements SET status = $2, \
             tenant_signed = $3, tenant_signed_at = $4, tenant_signed_ip = $5, \
             landlord_signed = $6, landlord_signed_at = $7, landlord_signed_ip = $8, \
             updated_at = $9 \
             WHERE id = $1 AND status = $10 AND tenant_signed = $11 AND landlord_signed = $12 \
             RETURNING {AGREEMENT_COLUMNS}"
        );
        let t = &updated.tenant_signature;
        let l = &updated.landlord_signature;
        sqlx::query_as::<_, AgreementRecord>(&sql)
            .bind(previous.id)
            .bind(updated.status.as_str())
            .bind(t.signed)
            .bind(t.signed_at)
            .bind(t.ip_address.as_deref())
            .bind(l.signed)
            .bind(l.signed_at)
            .bind(l.ip_address.as_deref())
            .bind(updated.updated_at)
            .bind(previous.status.as_str())
            .bind(previous.tenant_signature.signed)
            .bind(previous.landlord_signature.signed)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| {
                PortError::Conflict(
                    "Agreement was modified concurrently; please retry.".to_string(),
                )
            })?
            .to_domain()
    }
}
