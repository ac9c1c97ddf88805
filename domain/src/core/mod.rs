//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ProviderId`] / [`model::ModelRef`]: backend identity and model references
//! - [`registry`]: static model table for provider resolution and pricing
//! - [`error::DomainError`]: domain-level errors
//! - [`validation`]: configuration issues and severities

pub mod error;
pub mod model;
pub mod registry;
pub mod string;
pub mod validation;
