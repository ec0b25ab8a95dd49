pub mod access;
pub mod agreement;
pub mod assignment;
pub mod domain;
pub mod error;
pub mod payment;
pub mod ports;
pub mod property;

pub use access::{Capability, Identity};
pub use agreement::{AgreementTerms, AgreementView, AgreementWorkflow};
pub use assignment::{AssignOutcome, AssignmentManager, TenantDashboard};
pub use domain::{
    Agreement, AgreementStatus, Assignment, NewProperty, NewUser, Party, PaymentRecord,
    PaymentRecordStatus, PaymentStatus, Property, PropertyFilter, PropertySummary, PropertyType,
    Role, Signature, User, UserCredentials, UserSummary,
};
pub use error::{ServiceError, ServiceResult};
pub use payment::{PaymentHistoryEntry, PaymentTracker, TenantPayment};
pub use ports::{DatabaseService, PortError, PortResult, RemovalOutcome};
pub use property::{AvailableProperty, ContactReceipt, OwnedProperty, PropertyRegistry};
