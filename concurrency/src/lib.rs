// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

//! Synchronization primitives for the translator state.
//!
//! Code shared between the packet path and the control path takes its locks from [`sync`], which
//! is `std::sync` in normal builds and `shuttle::sync` when the `shuttle` feature is enabled, so
//! the same code can be explored by the shuttle scheduler in tests.

mod macros;

#[cfg(not(feature = "shuttle"))]
pub use std::sync;

#[cfg(not(feature = "shuttle"))]
pub use std::thread;

#[cfg(feature = "shuttle")]
pub use shuttle::sync;

#[cfg(feature = "shuttle")]
pub use shuttle::thread;

/// Run `test` under the concurrency model selected at build time.
///
/// With the `shuttle` feature this explores `iterations` random schedules; otherwise it runs the
/// test once on real threads.
pub fn model<F>(iterations: usize, test: F)
where
    F: Fn() + Send + Sync + 'static,
{
    #[cfg(feature = "shuttle")]
    shuttle::check_random(test, iterations);

    #[cfg(not(feature = "shuttle"))]
    {
        let _ = iterations;
        test();
    }
}
