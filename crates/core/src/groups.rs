//! Well-known group name constants.
//!
//! These must match the seed data in `20260301000002_create_users_and_groups.sql`.

/// Members of this group manage engagements across the whole organization.
pub const GROUP_MANAGER: &str = "manager";
