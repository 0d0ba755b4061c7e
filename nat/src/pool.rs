// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Pool of IPv4 addresses handed out to IPv6 hosts.
//!
//! Allocation is round-robin: a [`PoolCursor`] remembers the last address handed out and the
//! next scan starts right after it, walking up through the ranges and wrapping from the last
//! range back to the first one.

use crate::errors::PoolError;
use crate::mapping::MappingTable;
use config::PoolRange;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Instant;
use tracing::{debug, warn};

/// An inclusive range of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AddressRange {
    first: Ipv4Addr,
    last: Ipv4Addr,
}

impl AddressRange {
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidRange`] if `first` is above `last`.
    pub fn new(first: Ipv4Addr, last: Ipv4Addr) -> Result<Self, PoolError> {
        if first > last {
            return Err(PoolError::InvalidRange(first, last));
        }
        Ok(Self { first, last })
    }

    #[must_use]
    pub fn first(&self) -> Ipv4Addr {
        self.first
    }

    #[must_use]
    pub fn last(&self) -> Ipv4Addr {
        self.last
    }

    #[must_use]
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.first <= addr && addr <= self.last
    }

    /// Number of addresses in the range.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.last.to_bits()) - u64::from(self.first.to_bits()) + 1
    }
}

impl TryFrom<PoolRange> for AddressRange {
    type Error = PoolError;

    fn try_from(range: PoolRange) -> Result<Self, Self::Error> {
        AddressRange::new(range.first, range.last)
    }
}

/// Where the last allocation left off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCursor {
    /// First address of the range holding `addr`
    pub range: Ipv4Addr,
    pub addr: Ipv4Addr,
}

#[derive(Debug, Default)]
pub struct AddressPool {
    /// first address -> last address, ascending
    ranges: BTreeMap<Ipv4Addr, Ipv4Addr>,
    cursor: Option<PoolCursor>,
}

impl AddressPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a range. A range starting at the same address as an existing one replaces its end.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidRange`] if `first` is above `last`.
    pub fn add_range(&mut self, first: Ipv4Addr, last: Ipv4Addr) -> Result<(), PoolError> {
        let range = AddressRange::new(first, last)?;
        if let Some(old) = self.ranges.insert(range.first, range.last)
            && old != range.last
        {
            debug!("Pool range {first}-{old} now ends at {last}");
        } else {
            debug!("Added pool range {first}-{last}");
        }
        Ok(())
    }

    /// Remove the range `first-last`, which must match a stored range exactly.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NotFound`] if there is no such range.
    pub fn remove_range(&mut self, first: Ipv4Addr, last: Ipv4Addr) -> Result<(), PoolError> {
        match self.ranges.get(&first) {
            Some(stored) if *stored == last => {
                self.ranges.remove(&first);
                if self.cursor.is_some_and(|c| c.range == first) {
                    self.cursor = None;
                }
                debug!("Removed pool range {first}-{last}");
                Ok(())
            }
            _ => Err(PoolError::NotFound(first, last)),
        }
    }

    /// The ranges in ascending order.
    pub fn ranges(&self) -> impl Iterator<Item = AddressRange> + '_ {
        self.ranges
            .iter()
            .map(|(first, last)| AddressRange { first: *first, last: *last })
    }

    #[must_use]
    pub fn cursor(&self) -> Option<PoolCursor> {
        self.cursor
    }

    /// Total number of addresses in the pool.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.ranges().map(|r| r.size()).sum()
    }

    /// The address following `addr` in pool order, wrapping around.
    fn successor(&self, range: AddressRange, addr: Ipv4Addr) -> PoolCursor {
        if addr < range.last {
            return PoolCursor {
                range: range.first,
                addr: Ipv4Addr::from_bits(addr.to_bits() + 1),
            };
        }
        let next = self
            .ranges
            .range((std::ops::Bound::Excluded(range.first), std::ops::Bound::Unbounded))
            .next()
            .or_else(|| self.ranges.iter().next())
            .map_or(range.first, |(first, _)| *first);
        PoolCursor {
            range: next,
            addr: next,
        }
    }

    fn range_of(&self, cursor: PoolCursor) -> Option<AddressRange> {
        let last = *self.ranges.get(&cursor.range)?;
        let range = AddressRange {
            first: cursor.range,
            last,
        };
        range.contains(cursor.addr).then_some(range)
    }

    fn scan_start(&self) -> Option<PoolCursor> {
        if let Some(cursor) = self.cursor
            && let Some(range) = self.range_of(cursor)
        {
            return Some(self.successor(range, cursor.addr));
        }
        self.ranges.keys().next().map(|first| PoolCursor {
            range: *first,
            addr: *first,
        })
    }

    /// Hand out an IPv4 address.
    ///
    /// If `internal` is already bound, its address is returned and the cursor stays put.
    /// Otherwise the first address after the cursor that is not bound in `table` is taken and,
    /// if `internal` was given, bound to it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolExhausted`] if every address is bound (or the pool is empty).
    pub fn assign(
        &mut self,
        table: &mut MappingTable,
        internal: Option<Ipv6Addr>,
        now: Instant,
    ) -> Result<Ipv4Addr, PoolError> {
        if let Some(internal) = internal
            && let Some(entry) = table.find_by_internal(internal, now)
        {
            return Ok(entry.external());
        }
        let mut position = self.scan_start().ok_or(PoolError::PoolExhausted)?;
        for _ in 0..self.size() {
            let Some(range) = self.range_of(position) else {
                break;
            };
            if !table.is_bound(position.addr) {
                self.cursor = Some(position);
                if let Some(internal) = internal {
                    table.add(position.addr, internal, now);
                    crate::metrics::mapping_created();
                }
                debug!("Assigned {} from the pool", position.addr);
                return Ok(position.addr);
            }
            position = self.successor(range, position.addr);
        }
        warn!("Address pool exhausted");
        Err(PoolError::PoolExhausted)
    }

    /// The ranges, one per line, and the cursor.
    #[must_use]
    pub fn show(&self) -> String {
        let mut out = String::new();
        for range in self.ranges() {
            let _ = writeln!(out, "{}-{}", range.first, range.last);
        }
        match self.cursor {
            Some(cursor) => {
                let _ = writeln!(out, "cursor {}", cursor.addr);
            }
            None => out.push_str("cursor none\n"),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressPool, AddressRange};
    use crate::errors::PoolError;
    use crate::mapping::MappingTable;
    use config::PoolRange;
    use pretty_assertions::assert_eq;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::time::Instant;

    fn v4(c: u8, d: u8) -> Ipv4Addr {
        Ipv4Addr::new(10, 0, c, d)
    }

    fn v6(last: u16) -> Ipv6Addr {
        Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, last)
    }

    #[test]
    fn ranges_are_validated() {
        let mut pool = AddressPool::new();
        assert_eq!(
            pool.add_range(v4(0, 9), v4(0, 1)),
            Err(PoolError::InvalidRange(v4(0, 9), v4(0, 1)))
        );
        pool.add_range(v4(0, 1), v4(0, 4)).unwrap();
        assert_eq!(
            pool.remove_range(v4(0, 1), v4(0, 3)),
            Err(PoolError::NotFound(v4(0, 1), v4(0, 3)))
        );
        pool.add_range(v4(0, 1), v4(0, 3)).unwrap();
        assert_eq!(pool.size(), 3);
        pool.remove_range(v4(0, 1), v4(0, 3)).unwrap();
        assert_eq!(pool.size(), 0);
        assert!(AddressRange::try_from(PoolRange::single(v4(0, 1))).is_ok());
    }

    #[test]
    fn assigns_round_robin() {
        let now = Instant::now();
        let mut table = MappingTable::default();
        let mut pool = AddressPool::new();
        pool.add_range(v4(0, 1), v4(0, 2)).unwrap();
        pool.add_range(v4(1, 1), v4(1, 1)).unwrap();

        assert_eq!(pool.assign(&mut table, None, now).unwrap(), v4(0, 1));
        assert_eq!(pool.assign(&mut table, None, now).unwrap(), v4(0, 2));
        assert_eq!(pool.assign(&mut table, None, now).unwrap(), v4(1, 1));
        // nothing bound, so the scan wraps back to the first range
        assert_eq!(pool.assign(&mut table, None, now).unwrap(), v4(0, 1));
        assert!(table.is_empty());
    }

    #[test]
    fn skips_bound_addresses() {
        let now = Instant::now();
        let mut table = MappingTable::default();
        table.add(v4(0, 1), v6(100), now);
        let mut pool = AddressPool::new();
        pool.add_range(v4(0, 1), v4(0, 3)).unwrap();
        assert_eq!(pool.assign(&mut table, Some(v6(1)), now).unwrap(), v4(0, 2));
        assert_eq!(table.find_by_internal(v6(1), now).unwrap().external(), v4(0, 2));
    }

    #[test]
    fn assign_is_idempotent() {
        let now = Instant::now();
        let mut table = MappingTable::default();
        let mut pool = AddressPool::new();
        pool.add_range(v4(0, 1), v4(0, 5)).unwrap();
        let first = pool.assign(&mut table, Some(v6(1)), now).unwrap();
        let cursor = pool.cursor();
        assert_eq!(pool.assign(&mut table, Some(v6(1)), now).unwrap(), first);
        assert_eq!(pool.cursor(), cursor);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn exhaustion() {
        let now = Instant::now();
        let mut table = MappingTable::default();
        let mut pool = AddressPool::new();
        assert_eq!(
            pool.assign(&mut table, Some(v6(1)), now),
            Err(PoolError::PoolExhausted)
        );
        pool.add_range(v4(0, 1), v4(0, 2)).unwrap();
        assert_eq!(pool.assign(&mut table, Some(v6(1)), now).unwrap(), v4(0, 1));
        assert_eq!(pool.assign(&mut table, Some(v6(2)), now).unwrap(), v4(0, 2));
        assert_eq!(
            pool.assign(&mut table, Some(v6(3)), now),
            Err(PoolError::PoolExhausted)
        );
        // freeing an address makes it available again
        table.remove(v4(0, 1)).unwrap();
        assert_eq!(pool.assign(&mut table, Some(v6(3)), now).unwrap(), v4(0, 1));
    }

    #[test]
    fn cursor_survives_range_removal() {
        let now = Instant::now();
        let mut table = MappingTable::default();
        let mut pool = AddressPool::new();
        pool.add_range(v4(0, 1), v4(0, 1)).unwrap();
        pool.add_range(v4(1, 1), v4(1, 2)).unwrap();
        assert_eq!(pool.assign(&mut table, None, now).unwrap(), v4(0, 1));
        pool.remove_range(v4(0, 1), v4(0, 1)).unwrap();
        assert_eq!(pool.cursor(), None);
        assert_eq!(pool.assign(&mut table, None, now).unwrap(), v4(1, 1));
    }

    #[test]
    fn show_lists_ranges_and_cursor() {
        let now = Instant::now();
        let mut table = MappingTable::default();
        let mut pool = AddressPool::new();
        pool.add_range(v4(1, 1), v4(1, 9)).unwrap();
        pool.add_range(v4(0, 1), v4(0, 2)).unwrap();
        assert_eq!(pool.show(), "10.0.0.1-10.0.0.2\n10.0.1.1-10.0.1.9\ncursor none\n");
        pool.assign(&mut table, None, now).unwrap();
        assert_eq!(
            pool.show(),
            "10.0.0.1-10.0.0.2\n10.0.1.1-10.0.1.9\ncursor 10.0.0.1\n"
        );
    }
}
