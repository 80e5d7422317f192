pub mod access;
pub mod choices;
pub mod documents;
pub mod engagement;
pub mod error;
pub mod groups;
pub mod hashing;
pub mod metrics;
pub mod progress;
pub mod reporting_period;
pub mod team;
pub mod types;
pub mod uploads;
