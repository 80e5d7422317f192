//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction) as the first argument.

pub mod active_engagement_repo;
pub mod audit_catalog_repo;
pub mod document_repo;
pub mod engagement_repo;
pub mod organization_repo;
pub mod procedure_file_repo;
pub mod session_repo;
pub mod substep_status_repo;
pub mod user_repo;

pub use active_engagement_repo::ActiveEngagementRepo;
pub use audit_catalog_repo::{AuditStepRepo, AuditSubstepRepo, StepActionRepo};
pub use document_repo::DocumentRepo;
pub use engagement_repo::EngagementRepo;
pub use organization_repo::OrganizationRepo;
pub use procedure_file_repo::ProcedureFileRepo;
pub use session_repo::SessionRepo;
pub use substep_status_repo::SubstepStatusRepo;
pub use user_repo::UserRepo;
