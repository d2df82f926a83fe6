//! OpenGRC Domain Model
//!
//! - **Value Objects**: TenantId, ControlId, FrameworkId, RequirementId, DomainId
//! - **Records**: ControlResponse, RequirementAssessment, ComplianceSnapshot
//! - **Repositories**: ResponseStore, AssessmentStore, SnapshotStore

pub mod value_objects;
pub mod records;
pub mod repositories;

pub use value_objects::*;
pub use records::*;
pub use repositories::*;
