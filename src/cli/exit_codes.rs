//! CLI Exit Codes
//!
//! Process exit codes for supervisors and scripts.

use std::process::ExitCode;

use crate::config::ConfigError;
use crate::core::pipeline::PipelineError;
use crate::core::sink::SinkError;
use crate::core::transport::ConnectionError;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// File not found
    pub const FILE_NOT_FOUND: u8 = 6;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Output sink failed
    pub const OUTPUT_FAILED: u8 = 10;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;

    /// Worker thread died
    pub const INTERNAL_ERROR: u8 = 127;
}

/// Pick the exit code for the first recognised error in the chain
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            return match e {
                ConfigError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                    ExitCodes::FILE_NOT_FOUND
                }
                _ => ExitCodes::CONFIG_ERROR,
            };
        }
        if let Some(e) = cause.downcast_ref::<ConnectionError>() {
            return match e {
                ConnectionError::PortNotFound(_) => ExitCodes::PORT_NOT_FOUND,
                ConnectionError::PermissionDenied(_) => ExitCodes::PERMISSION_DENIED,
                ConnectionError::InvalidConfiguration(_) => ExitCodes::INVALID_ARGS,
                _ => ExitCodes::CONNECTION_FAILED,
            };
        }
        if cause.downcast_ref::<SinkError>().is_some() {
            return ExitCodes::OUTPUT_FAILED;
        }
        if cause.downcast_ref::<PipelineError>().is_some() {
            return ExitCodes::INTERNAL_ERROR;
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            return match e.kind() {
                std::io::ErrorKind::NotFound => ExitCodes::FILE_NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
                _ => ExitCodes::ERROR,
            };
        }
    }
    ExitCodes::ERROR
}

/// Convert an error into the process exit code
pub fn to_exit_code(err: &anyhow::Error) -> ExitCode {
    ExitCode::from(exit_code_for(err))
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Connection failed",
        6 => "File not found",
        7 => "Permission denied",
        8 => "Configuration error",
        10 => "Output failed",
        14 => "Port not found",
        127 => "Internal error",
        _ => "Unknown error",
    }
}
