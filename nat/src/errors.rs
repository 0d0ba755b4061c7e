// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Error types of the translator

use net::ip::NextHeader;
use net::ipv6::ExtensionWalkError;
use net::parse::LengthError;
use std::net::{IpAddr, Ipv4Addr};
use strum::IntoStaticStr;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("Invalid range {0}-{1}: first address is above last")]
    InvalidRange(Ipv4Addr, Ipv4Addr),
    #[error("No range {0}-{1} in the pool")]
    NotFound(Ipv4Addr, Ipv4Addr),
    #[error("Address pool exhausted")]
    PoolExhausted,
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    #[error("No mapping for {0}")]
    NotFound(Ipv4Addr),
}

/// An administrative command could not be applied.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum AdminError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ReaperError {
    #[error("Failed to spawn reaper thread: {0}")]
    Spawn(String),
    #[error("Reaper thread panicked")]
    Panicked,
}

/// An output packet could not be handed over.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Output refused: {0}")]
    Refused(String),
}

/// Why a packet was dropped instead of translated.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TranslateError {
    #[error("Address {0} cannot be translated")]
    InvalidAddressClass(IpAddr),
    #[error("No mapping for {0}")]
    NoMapping(IpAddr),
    #[error("Address pool exhausted")]
    PoolExhausted,
    #[error("Unsupported extension header {0}")]
    UnsupportedExtensionHeader(NextHeader),
    #[error("Malformed fragment header")]
    MalformedFragmentHeader,
    #[error("Unknown ICMP type {icmp_type} code {code}")]
    UnknownIcmpType { icmp_type: u8, code: u8 },
    #[error("ICMP error embedded in an ICMP error")]
    IncludedErrorInError,
    #[error("Failed to translate embedded packet: {0}")]
    RecursiveTranslationFailed(#[source] Box<TranslateError>),
    #[error("Packet too short: {0}")]
    PacketTooShort(#[from] LengthError),
    #[error("Invalid IP header")]
    InvalidHeader,
    #[error("Translation is disabled")]
    TranslationDisabled,
    #[error("Translation is disabled in this direction")]
    DirectionDisabled,
    #[error("DNS traffic is not translated")]
    DnsExempt,
    #[error("Interface {0} has no local address of the needed family")]
    NoLocalAddress(String),
    #[error("Destination {0} is not a local address")]
    NotLocalDestination(IpAddr),
    #[error("Fragmented ICMP is not translated")]
    FragmentedIcmp,
    #[error("Unsupported protocol {0}")]
    UnsupportedProtocol(NextHeader),
    #[error("First UDP fragment without checksum")]
    ZeroChecksumFragment,
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl TranslateError {
    /// Short label of the error kind, for logs and metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.into()
    }

    pub(crate) fn embedded(self) -> Self {
        TranslateError::RecursiveTranslationFailed(Box::new(self))
    }
}

impl From<PoolError> for TranslateError {
    fn from(_: PoolError) -> Self {
        TranslateError::PoolExhausted
    }
}

impl From<ExtensionWalkError> for TranslateError {
    fn from(e: ExtensionWalkError) -> Self {
        match e {
            ExtensionWalkError::Unsupported(next) => TranslateError::UnsupportedExtensionHeader(next),
            ExtensionWalkError::SegmentsLeft(_) => {
                TranslateError::UnsupportedExtensionHeader(NextHeader::ROUTING)
            }
            ExtensionWalkError::MalformedFragment => TranslateError::MalformedFragmentHeader,
            ExtensionWalkError::Length(len) => TranslateError::PacketTooShort(len),
        }
    }
}
