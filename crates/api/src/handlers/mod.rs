pub mod admin;
pub mod auth;
pub mod catalog;
pub mod documents;
pub mod engagement;
pub mod generation;
pub mod metrics;
pub mod monitoring;
pub mod session;
pub mod team;
pub mod uploads;
pub mod users;
