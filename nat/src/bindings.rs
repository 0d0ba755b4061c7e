// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The address pool and the mapping table behind a single lock.
//!
//! Allocation checks the table for free addresses and then inserts into it, so both live under
//! the same mutex: an assignment is atomic with respect to lookups, reaping and administrative
//! changes running on other threads.

use crate::errors::{MappingError, PoolError};
use crate::mapping::{MapEntry, MappingTable};
use crate::pool::AddressPool;
use concurrency::sync::{Mutex, MutexGuard};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug)]
struct BindingState {
    table: MappingTable,
    pool: AddressPool,
}

#[derive(Debug)]
pub struct Bindings {
    inner: Mutex<BindingState>,
}

impl Bindings {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(BindingState {
                table: MappingTable::new(idle_timeout),
                pool: AddressPool::new(),
            }),
        }
    }

    // every mutation is a single map operation, so a poisoned lock still guards consistent state
    fn lock(&self) -> MutexGuard<'_, BindingState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn find_by_internal(&self, internal: Ipv6Addr, now: Instant) -> Option<Ipv4Addr> {
        self.lock()
            .table
            .find_by_internal(internal, now)
            .as_ref()
            .map(MapEntry::external)
    }

    pub fn search_by_external(&self, external: Ipv4Addr, now: Instant) -> Option<Ipv6Addr> {
        self.lock()
            .table
            .search_by_external(external, now)
            .as_ref()
            .map(MapEntry::internal)
    }

    /// The IPv4 address bound to `internal`, allocating one from the pool if there is none.
    pub fn resolve_or_assign(
        &self,
        internal: Ipv6Addr,
        now: Instant,
    ) -> Result<Ipv4Addr, PoolError> {
        let mut state = self.lock();
        let BindingState { table, pool } = &mut *state;
        pool.assign(table, Some(internal), now)
    }

    /// Take a free address from the pool, binding it to `internal` if given.
    pub fn assign(
        &self,
        internal: Option<Ipv6Addr>,
        now: Instant,
    ) -> Result<Ipv4Addr, PoolError> {
        let mut state = self.lock();
        let BindingState { table, pool } = &mut *state;
        pool.assign(table, internal, now)
    }

    pub fn add_range(&self, first: Ipv4Addr, last: Ipv4Addr) -> Result<(), PoolError> {
        self.lock().pool.add_range(first, last)
    }

    pub fn remove_range(&self, first: Ipv4Addr, last: Ipv4Addr) -> Result<(), PoolError> {
        self.lock().pool.remove_range(first, last)
    }

    pub fn add_mapping(&self, external: Ipv4Addr, internal: Ipv6Addr, now: Instant) -> MapEntry {
        self.lock().table.add(external, internal, now)
    }

    pub fn remove_mapping(&self, external: Ipv4Addr) -> Result<MapEntry, MappingError> {
        self.lock().table.remove(external)
    }

    pub fn clear_mappings(&self) -> usize {
        self.lock().table.clear()
    }

    pub fn mapping_count(&self) -> usize {
        self.lock().table.len()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.lock().table.idle_timeout()
    }

    pub fn set_idle_timeout(&self, idle_timeout: Duration) {
        self.lock().table.set_idle_timeout(idle_timeout);
    }

    /// Evict the mappings idle for longer than the configured timeout.
    pub fn reap(&self, now: Instant) -> Vec<MapEntry> {
        let mut state = self.lock();
        let idle = state.table.idle_timeout();
        let reaped = state.table.reap(now, idle);
        drop(state);
        if !reaped.is_empty() {
            crate::metrics::mappings_reaped(reaped.len());
        }
        for entry in &reaped {
            info!(
                "Expired mapping {} <-> {}",
                entry.external(),
                entry.internal()
            );
        }
        reaped
    }

    pub fn show_pool(&self) -> String {
        self.lock().pool.show()
    }

    pub fn render_mappings(&self, now: Instant) -> String {
        self.lock().table.render(now)
    }
}
