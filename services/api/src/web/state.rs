//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use rental_core::ports::DatabaseService;
use rental_core::{AgreementWorkflow, AssignmentManager, PaymentTracker, PropertyRegistry};

use crate::auth::TokenService;
use crate::config::Config;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub properties: PropertyRegistry,
    pub assignments: AssignmentManager,
    pub payments: PaymentTracker,
    pub agreements: AgreementWorkflow,
}

impl AppState {
    /// Wires every workflow service to the same store.
    pub fn new(db: Arc<dyn DatabaseService>, config: Arc<Config>) -> Self {
        Self {
            tokens: TokenService::new(&config.jwt_secret, config.token_lifetime_hours),
            properties: PropertyRegistry::new(db.clone()),
            assignments: AssignmentManager::new(db.clone()),
            payments: PaymentTracker::new(db.clone()),
            agreements: AgreementWorkflow::new(db.clone()),
            db,
            config,
        }
    }
}
