//! Shared helpers for in-crate tests.

pub mod fake_platform;
pub mod socket_guard;
