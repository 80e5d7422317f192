//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the actor from a JWT Bearer token.
//! - [`rbac::RequireSuperuser`] -- Requires a superuser.
//! - [`rbac::RequireManager`] -- Requires a superuser or manager.
//! - [`rbac::RequireManagerGroup`] -- Requires the manager group.

pub mod auth;
pub mod rbac;
