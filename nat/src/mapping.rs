// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The IPv4/IPv6 mapping table.
//!
//! Each [`MapEntry`] binds one external IPv4 address to one internal IPv6 address. The table is
//! indexed by both keys and keeps the binding 1:1: adding a binding for an address that is
//! already bound replaces the old binding instead of creating a second one.

use crate::errors::MappingError;
use ahash::RandomState;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    external: Ipv4Addr,
    internal: Ipv6Addr,
    created_at: Instant,
    last_touched: Instant,
}

impl MapEntry {
    fn new(external: Ipv4Addr, internal: Ipv6Addr, now: Instant) -> Self {
        Self {
            external,
            internal,
            created_at: now,
            last_touched: now,
        }
    }

    #[must_use]
    pub fn external(&self) -> Ipv4Addr {
        self.external
    }

    #[must_use]
    pub fn internal(&self) -> Ipv6Addr {
        self.internal
    }

    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    #[must_use]
    pub fn last_touched(&self) -> Instant {
        self.last_touched
    }

    /// True if the entry has not been used for more than `idle` at time `now`.
    #[must_use]
    pub fn is_idle(&self, now: Instant, idle: Duration) -> bool {
        now.saturating_duration_since(self.last_touched) > idle
    }

    fn touch(&mut self, now: Instant) {
        if now > self.last_touched {
            self.last_touched = now;
        }
    }
}

/// Dual-key store of [`MapEntry`] bindings.
#[derive(Debug)]
pub struct MappingTable {
    by_external: BTreeMap<Ipv4Addr, MapEntry>,
    by_internal: HashMap<Ipv6Addr, Ipv4Addr, RandomState>,
    idle_timeout: Duration,
}

impl MappingTable {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            by_external: BTreeMap::new(),
            by_internal: HashMap::with_hasher(RandomState::with_seed(0)),
            idle_timeout,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_external.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_external.is_empty()
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn set_idle_timeout(&mut self, idle_timeout: Duration) {
        debug!("Mapping idle timeout set to {}s", idle_timeout.as_secs());
        self.idle_timeout = idle_timeout;
    }

    /// Look up the binding of an internal IPv6 address, refreshing it on a hit.
    pub fn find_by_internal(&mut self, internal: Ipv6Addr, now: Instant) -> Option<MapEntry> {
        let external = self.by_internal.get(&internal)?;
        let entry = self.by_external.get_mut(external)?;
        entry.touch(now);
        Some(entry.clone())
    }

    /// Look up the binding of an external IPv4 address, refreshing it on a hit.
    pub fn search_by_external(&mut self, external: Ipv4Addr, now: Instant) -> Option<MapEntry> {
        let entry = self.by_external.get_mut(&external)?;
        entry.touch(now);
        Some(entry.clone())
    }

    /// True if `external` is bound. Does not refresh the entry.
    #[must_use]
    pub fn is_bound(&self, external: Ipv4Addr) -> bool {
        self.by_external.contains_key(&external)
    }

    /// Bind `external` to `internal`.
    ///
    /// An existing binding of `external` is overwritten and refreshed, keeping its creation time.
    /// Any other binding of `internal` is dropped so that each address appears in at most one
    /// entry.
    pub fn add(&mut self, external: Ipv4Addr, internal: Ipv6Addr, now: Instant) -> MapEntry {
        if let Some(previous) = self.by_internal.get(&internal).copied()
            && previous != external
        {
            debug!("Unbinding {internal} from {previous}");
            self.by_external.remove(&previous);
        }
        let entry = match self.by_external.get_mut(&external) {
            Some(entry) => {
                if entry.internal != internal {
                    self.by_internal.remove(&entry.internal);
                    entry.internal = internal;
                }
                entry.touch(now);
                entry.clone()
            }
            None => {
                let entry = MapEntry::new(external, internal, now);
                self.by_external.insert(external, entry.clone());
                entry
            }
        };
        self.by_internal.insert(internal, external);
        debug!("Bound {external} <-> {internal}");
        entry
    }

    /// Remove the binding of `external`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::NotFound`] if `external` is not bound.
    pub fn remove(&mut self, external: Ipv4Addr) -> Result<MapEntry, MappingError> {
        let entry = self
            .by_external
            .remove(&external)
            .ok_or(MappingError::NotFound(external))?;
        self.by_internal.remove(&entry.internal);
        debug!("Removed binding {external} <-> {}", entry.internal);
        Ok(entry)
    }

    /// Remove every binding, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.by_external.len();
        self.by_external.clear();
        self.by_internal.clear();
        count
    }

    /// Remove every entry idle for more than `idle` and return them.
    pub fn reap(&mut self, now: Instant, idle: Duration) -> Vec<MapEntry> {
        let expired: Vec<Ipv4Addr> = self
            .by_external
            .values()
            .filter(|entry| entry.is_idle(now, idle))
            .map(MapEntry::external)
            .collect();
        let mut reaped = Vec::with_capacity(expired.len());
        for external in expired {
            if let Some(entry) = self.by_external.remove(&external) {
                self.by_internal.remove(&entry.internal);
                reaped.push(entry);
            }
        }
        reaped
    }

    /// Iterate over the entries, in ascending order of IPv4 address.
    pub fn iter(&self) -> impl Iterator<Item = &MapEntry> {
        self.by_external.values()
    }

    /// One line per binding with the time since creation and since last use.
    #[must_use]
    pub fn render(&self, now: Instant) -> String {
        let mut out = String::new();
        for entry in self.by_external.values() {
            let _ = writeln!(
                out,
                "{} {} used {}s unused {}s",
                entry.external,
                entry.internal,
                now.saturating_duration_since(entry.created_at).as_secs(),
                now.saturating_duration_since(entry.last_touched).as_secs(),
            );
        }
        out
    }
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::new(config::TranslatorConfig::DEFAULT_IDLE_TIMEOUT)
    }
}
