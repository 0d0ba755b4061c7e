// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Textual administrative commands.
//!
//! Three small grammars are accepted:
//! - address ranges: `10.0.0.1-10.0.0.9,10.0.1.1` (a bare address is a one-address range)
//! - mapping commands: `ADD <v4> <v6>`, `DEL <v4>`, `CLEAR`
//! - settings: space separated `key=value` tokens with keys `mode`, `timeout`, `tos_ignore`
//!   and `private`

use crate::{BihMode, ConfigError, ConfigResult, PoolRange};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

fn ipv4(text: &str) -> ConfigResult<Ipv4Addr> {
    text.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidIpv4(text.trim().to_string()))
}

fn ipv6(text: &str) -> ConfigResult<Ipv6Addr> {
    text.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidIpv6(text.trim().to_string()))
}

/// Parse a comma separated list of ranges. Empty items are skipped.
pub fn parse_ranges(input: &str) -> ConfigResult<Vec<PoolRange>> {
    let ranges = input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once('-') {
            Some((first, last)) => PoolRange::new(ipv4(first)?, ipv4(last)?),
            None => Ok(PoolRange::single(ipv4(item)?)),
        })
        .collect::<ConfigResult<Vec<_>>>()?;
    debug!("Parsed {} range(s) from '{input}'", ranges.len());
    Ok(ranges)
}

/// A change to the static mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingCommand {
    Add { v4: Ipv4Addr, v6: Ipv6Addr },
    Del(Ipv4Addr),
    Clear,
}

impl FromStr for MappingCommand {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut words = input.split_whitespace();
        let keyword = words
            .next()
            .ok_or(ConfigError::MissingParameter("command"))?;
        let command = if keyword.eq_ignore_ascii_case("add") {
            let v4 = ipv4(words.next().ok_or(ConfigError::MissingParameter("IPv4 address"))?)?;
            let v6 = ipv6(words.next().ok_or(ConfigError::MissingParameter("IPv6 address"))?)?;
            MappingCommand::Add { v4, v6 }
        } else if keyword.eq_ignore_ascii_case("del") {
            let v4 = ipv4(words.next().ok_or(ConfigError::MissingParameter("IPv4 address"))?)?;
            MappingCommand::Del(v4)
        } else if keyword.eq_ignore_ascii_case("clear") {
            MappingCommand::Clear
        } else {
            return Err(ConfigError::UnknownCommand(keyword.to_string()));
        };
        if let Some(extra) = words.next() {
            return Err(ConfigError::UnknownCommand(extra.to_string()));
        }
        Ok(command)
    }
}

/// A single runtime setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Mode(BihMode),
    /// Idle timeout of mappings
    Timeout(Duration),
    TosIgnore(bool),
    /// Private IPv4 address; `none` removes it
    Private(Option<Ipv4Addr>),
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

impl FromStr for Setting {
    type Err = ConfigError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| ConfigError::UnknownSetting(token.to_string()))?;
        match key.to_ascii_lowercase().as_str() {
            "mode" => value
                .parse()
                .map(Setting::Mode)
                .map_err(|_| ConfigError::InvalidMode(value.to_string())),
            "timeout" => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Setting::Timeout(Duration::from_secs(secs))),
                _ => Err(invalid(key, value)),
            },
            "tos_ignore" => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "on" => Ok(Setting::TosIgnore(true)),
                "0" | "false" | "off" => Ok(Setting::TosIgnore(false)),
                _ => Err(invalid(key, value)),
            },
            "private" if value.eq_ignore_ascii_case("none") => Ok(Setting::Private(None)),
            "private" => ipv4(value)
                .map(|addr| Setting::Private(Some(addr)))
                .map_err(|_| invalid(key, value)),
            _ => Err(ConfigError::UnknownSetting(key.to_string())),
        }
    }
}

/// Parse space separated `key=value` tokens. Nothing is returned unless every token is valid.
pub fn parse_settings(input: &str) -> ConfigResult<Vec<Setting>> {
    input.split_whitespace().map(Setting::from_str).collect()
}

/// Any administrative request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    AddRanges(Vec<PoolRange>),
    RemoveRanges(Vec<PoolRange>),
    Mapping(MappingCommand),
    Settings(Vec<Setting>),
}
