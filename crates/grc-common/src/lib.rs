//! OpenGRC Common - Shared types for the compliance engine
//!
//! This crate provides:
//! - Identifiers for tenants, controls, frameworks, requirements and domains
//! - Tenant-owned records (responses, requirement assessments, snapshots)
//! - Store contracts with in-memory implementations
//! - Error handling
//!
//! Catalog data (controls, frameworks, requirement trees) is process-wide and
//! lives in `grc-compliance`. Everything here that carries a `tenant_id` is
//! owned by exactly one tenant and every store query is partitioned by it.

#![warn(clippy::all)]

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::*;
