// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 address classification

use std::fmt::{Display, Formatter};
use std::net::Ipv4Addr;

/// Coarse classification of an IPv4 address, as far as translation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv4Class {
    /// `0.0.0.0/8`
    ZeroNet,
    /// `127.0.0.0/8`
    Loopback,
    /// `224.0.0.0/4`
    Multicast,
    /// `255.255.255.255`
    Broadcast,
    /// Anything else
    Unicast,
}

impl Ipv4Class {
    /// Classify `addr`.
    #[must_use]
    pub fn of(addr: Ipv4Addr) -> Self {
        if addr.octets()[0] == 0 {
            Ipv4Class::ZeroNet
        } else if addr.is_loopback() {
            Ipv4Class::Loopback
        } else if addr.is_multicast() {
            Ipv4Class::Multicast
        } else if addr.is_broadcast() {
            Ipv4Class::Broadcast
        } else {
            Ipv4Class::Unicast
        }
    }
}

impl Display for Ipv4Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ipv4Class::ZeroNet => write!(f, "zeronet"),
            Ipv4Class::Loopback => write!(f, "loopback"),
            Ipv4Class::Multicast => write!(f, "multicast"),
            Ipv4Class::Broadcast => write!(f, "broadcast"),
            Ipv4Class::Unicast => write!(f, "unicast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Ipv4Class;
    use std::net::Ipv4Addr;

    #[test]
    fn classify() {
        assert_eq!(Ipv4Class::of(Ipv4Addr::new(0, 1, 2, 3)), Ipv4Class::ZeroNet);
        assert_eq!(Ipv4Class::of(Ipv4Addr::UNSPECIFIED), Ipv4Class::ZeroNet);
        assert_eq!(Ipv4Class::of(Ipv4Addr::new(127, 0, 0, 9)), Ipv4Class::Loopback);
        assert_eq!(Ipv4Class::of(Ipv4Addr::new(239, 1, 1, 1)), Ipv4Class::Multicast);
        assert_eq!(Ipv4Class::of(Ipv4Addr::BROADCAST), Ipv4Class::Broadcast);
        assert_eq!(Ipv4Class::of(Ipv4Addr::new(10, 0, 0, 1)), Ipv4Class::Unicast);
    }
}
