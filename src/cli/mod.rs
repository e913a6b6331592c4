//! CLI Module
//!
//! Support code for the `adcplink` binary:
//! - Exit codes for supervisors
//! - Logging initialisation

pub mod exit_codes;
pub mod logging;

pub use exit_codes::{exit_code_description, exit_code_for, to_exit_code, ExitCodes};
