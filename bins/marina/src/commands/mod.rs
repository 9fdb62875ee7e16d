//! CLI command implementations

pub mod auth;
pub mod boats;
pub mod bookings;
pub mod request;
