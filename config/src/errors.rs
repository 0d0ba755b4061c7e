// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration / validation failures.
//! Any result returned by the validation, parsing or builder methods of this crate carries a
//! [`ConfigError`].

use std::net::Ipv4Addr;
use thiserror::Error;

/// The reasons why we may reject a configuration or an administrative command
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid range {0}-{1}: first address is above last")]
    InvalidRange(Ipv4Addr, Ipv4Addr),
    #[error("Invalid IPv4 address '{0}'")]
    InvalidIpv4(String),
    #[error("Invalid IPv6 address '{0}'")]
    InvalidIpv6(String),
    #[error("Invalid translation mode '{0}'")]
    InvalidMode(String),
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    #[error("Unknown setting '{0}'")]
    UnknownSetting(String),
    #[error("Invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },
    #[error("Missing mandatory parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
    #[error("Fragment threshold {0} must be a non-zero multiple of 8")]
    BadFragmentThreshold(usize),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<derive_builder::UninitializedFieldError> for ConfigError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        ConfigError::MissingParameter(e.field_name())
    }
}

/// Result-like type for configurations
pub type ConfigResult<T = ()> = Result<T, ConfigError>;

