//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` input DTOs for inserts and updates

pub mod active_engagement;
pub mod audit_catalog;
pub mod document;
pub mod engagement;
pub mod organization;
pub mod procedure_file;
pub mod status;
pub mod substep_status;
pub mod user;
