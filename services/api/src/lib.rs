//! services/api/src/lib.rs
//!
//! The HTTP service for the rental manager: configuration, authentication,
//! store adapters and the axum web layer.

pub mod adapters;
pub mod auth;
pub mod config;
pub mod error;
pub mod web;
