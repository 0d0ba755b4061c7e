// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv6 address classification

use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;

/// Coarse classification of an IPv6 address, as far as translation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv6Class {
    /// `ff00::/8`
    Multicast,
    /// `::1`
    Loopback,
    /// `fe80::/10`
    LinkLocal,
    /// `fec0::/10` (deprecated, still filtered)
    SiteLocal,
    /// Anything else
    Unicast,
}

impl Ipv6Class {
    /// Classify `addr`.
    #[must_use]
    pub fn of(addr: Ipv6Addr) -> Self {
        let first = addr.segments()[0];
        if addr.is_multicast() {
            Ipv6Class::Multicast
        } else if addr.is_loopback() {
            Ipv6Class::Loopback
        } else if first & 0xffc0 == 0xfe80 {
            Ipv6Class::LinkLocal
        } else if first & 0xffc0 == 0xfec0 {
            Ipv6Class::SiteLocal
        } else {
            Ipv6Class::Unicast
        }
    }

    /// True for scopes which never leave the local link or site.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        matches!(self, Ipv6Class::LinkLocal | Ipv6Class::SiteLocal)
    }
}

impl Display for Ipv6Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ipv6Class::Multicast => write!(f, "multicast"),
            Ipv6Class::Loopback => write!(f, "loopback"),
            Ipv6Class::LinkLocal => write!(f, "link-local"),
            Ipv6Class::SiteLocal => write!(f, "site-local"),
            Ipv6Class::Unicast => write!(f, "unicast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Ipv6Class;
    use std::net::Ipv6Addr;

    fn class(s: &str) -> Ipv6Class {
        Ipv6Class::of(s.parse::<Ipv6Addr>().unwrap())
    }

    #[test]
    fn classify() {
        assert_eq!(class("ff02::1"), Ipv6Class::Multicast);
        assert_eq!(class("::1"), Ipv6Class::Loopback);
        assert_eq!(class("fe80::1"), Ipv6Class::LinkLocal);
        assert_eq!(class("febf::1"), Ipv6Class::LinkLocal);
        assert_eq!(class("fec0::1"), Ipv6Class::SiteLocal);
        assert_eq!(class("feff::1"), Ipv6Class::SiteLocal);
        assert_eq!(class("2001:db8::1"), Ipv6Class::Unicast);
        assert!(Ipv6Class::LinkLocal.is_scoped());
        assert!(!Ipv6Class::Loopback.is_scoped());
    }
}
