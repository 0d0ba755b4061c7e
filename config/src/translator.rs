// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Startup configuration of the translator

use crate::{ConfigError, ConfigResult};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumString, IntoStaticStr};
use tracing::debug;

/// Which directions get translated.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    StrumDisplay,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BihMode {
    /// Every packet is dropped
    #[strum(to_string = "disabled", serialize = "0")]
    Disabled,
    /// Only IPv6 to IPv4 is translated
    #[serde(rename = "nat64")]
    #[strum(to_string = "nat64", serialize = "1")]
    Nat64Only,
    /// Both directions are translated
    #[default]
    #[strum(to_string = "dual", serialize = "2")]
    Dual,
}

/// An inclusive range of IPv4 addresses available for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolRange {
    pub first: Ipv4Addr,
    pub last: Ipv4Addr,
}

impl PoolRange {
    /// Build a range, rejecting `first > last`.
    pub fn new(first: Ipv4Addr, last: Ipv4Addr) -> ConfigResult<Self> {
        let range = Self { first, last };
        range.validate()?;
        Ok(range)
    }

    /// A range holding only `addr`.
    #[must_use]
    pub fn single(addr: Ipv4Addr) -> Self {
        Self {
            first: addr,
            last: addr,
        }
    }

    pub fn validate(&self) -> ConfigResult {
        if self.first > self.last {
            return Err(ConfigError::InvalidRange(self.first, self.last));
        }
        Ok(())
    }

    /// Number of addresses in the range.
    #[must_use]
    pub fn len(&self) -> u64 {
        u64::from(self.last.to_bits()).saturating_sub(u64::from(self.first.to_bits())) + 1
    }

    /// Always false: a range holds at least one address.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Display for PoolRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

/// An administratively configured binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMapping {
    pub v4: Ipv4Addr,
    pub v6: Ipv6Addr,
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        u64::deserialize(de).map(Duration::from_secs)
    }
}

/// The translator configuration.
///
/// Durations are expressed in seconds when (de)serialized.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[builder(default, setter(into), build_fn(error = "ConfigError"))]
#[serde(default, deny_unknown_fields)]
pub struct TranslatorConfig {
    pub mode: BihMode,
    /// Zero the traffic class / type of service instead of copying it
    pub tos_ignore: bool,
    #[serde(with = "secs")]
    pub idle_timeout: Duration,
    #[serde(with = "secs")]
    pub reap_interval: Duration,
    /// Largest IPv4 payload sent through the translator without being split first
    pub fragment_threshold: usize,
    /// Overrides the interface address as destination of IPv6 to IPv4 packets
    #[builder(default, setter(into, strip_option))]
    pub private_addr: Option<Ipv4Addr>,
    pub pool: Vec<PoolRange>,
    pub mappings: Vec<StaticMapping>,
}

impl TranslatorConfig {
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1800);
    pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(60);
    pub const DEFAULT_FRAGMENT_THRESHOLD: usize = 1232;

    /// Parse a YAML document and validate it.
    pub fn from_yaml(input: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml_ng::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        debug!("Loaded translator configuration: {config:?}");
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult {
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::Forbidden("idle timeout of zero"));
        }
        if self.reap_interval.is_zero() {
            return Err(ConfigError::Forbidden("reap interval of zero"));
        }
        if self.fragment_threshold == 0 || self.fragment_threshold % 8 != 0 {
            return Err(ConfigError::BadFragmentThreshold(self.fragment_threshold));
        }
        self.pool.iter().try_for_each(PoolRange::validate)
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            mode: BihMode::default(),
            tos_ignore: false,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            reap_interval: Self::DEFAULT_REAP_INTERVAL,
            fragment_threshold: Self::DEFAULT_FRAGMENT_THRESHOLD,
            private_addr: None,
            pool: Vec::new(),
            mappings: Vec::new(),
        }
    }
}
