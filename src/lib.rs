//! signoff — human-approval gateway; library crate for integration testing.
//!
//! Re-exports the modules exercised by tests in `tests/`.

pub mod approval;
pub mod config;
pub mod correlation;
pub mod discharge;
pub mod errors;
pub mod notification;
