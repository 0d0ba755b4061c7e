// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Background eviction of idle mappings

use crate::context::TranslatorContext;
use crate::errors::ReaperError;
use concurrency::sync::Arc;
use crossbeam_channel::{Sender, bounded, select, tick};
// a wall-clock timer thread: crossbeam ticks are not driven by the shuttle scheduler
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info, trace};

/// Handle to the thread reaping idle mappings of a [`TranslatorContext`].
///
/// The thread wakes up every reap interval of the context. It is stopped by
/// [`Reaper::stop`], or when the handle is dropped.
#[derive(Debug)]
pub struct Reaper {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    pub fn start(context: Arc<TranslatorContext>) -> Result<Self, ReaperError> {
        let interval = context.reap_interval();
        let (stop, stopped) = bounded::<()>(1);
        let reaper_loop = move || {
            info!("Reaping idle mappings every {}ms", interval.as_millis());
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let reaped = context.reap(Instant::now());
                        trace!("Reap pass evicted {} mapping(s)", reaped.len());
                    }
                    recv(stopped) -> _ => break,
                }
            }
            info!("Reaper stopped");
        };
        let handle = thread::Builder::new()
            .name("bih-reaper".to_string())
            .spawn(reaper_loop)
            .map_err(|e| ReaperError::Spawn(e.to_string()))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to end. Stopping twice is harmless.
    pub fn stop(&mut self) -> Result<(), ReaperError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        debug!("Requesting reaper to stop..");
        // a disconnected channel also ends the loop
        let _ = self.stop.try_send(());
        handle.join().map_err(|_| ReaperError::Panicked)?;
        debug!("Reaper ended successfully");
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            debug!("Failed to stop reaper: {e}");
        }
    }
}

// reaping runs on wall-clock ticks, out of reach of the shuttle scheduler
concurrency::with_std! {
    #[cfg(test)]
    mod tests {
        use super::Reaper;
        use crate::context::{StaticResolver, TranslatorContext};
        use concurrency::sync::Arc;
        use config::TranslatorConfigBuilder;
        use std::net::{Ipv4Addr, Ipv6Addr};
        use std::time::{Duration, Instant};

        #[test]
        fn idle_mappings_disappear() {
            let config = TranslatorConfigBuilder::default()
                .idle_timeout(Duration::from_millis(50))
                .reap_interval(Duration::from_millis(10))
                .build()
                .unwrap();
            let ctx = Arc::new(TranslatorContext::new(&config, StaticResolver::new()).unwrap());
            ctx.add_mapping(Ipv4Addr::new(10, 0, 0, 1), Ipv6Addr::LOCALHOST);
            let mut reaper = Reaper::start(ctx.clone()).unwrap();
            assert!(reaper.is_running());

            let deadline = Instant::now() + Duration::from_secs(5);
            while ctx.bindings().mapping_count() > 0 && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            assert_eq!(ctx.bindings().mapping_count(), 0);

            reaper.stop().unwrap();
            assert!(!reaper.is_running());
            reaper.stop().unwrap();
        }

        #[test]
        fn dropping_the_handle_stops_the_thread() {
            let ctx = Arc::new(
                TranslatorContext::new(&config::TranslatorConfig::default(), StaticResolver::new())
                    .unwrap(),
            );
            let reaper = Reaper::start(ctx.clone()).unwrap();
            drop(reaper);
            // the thread held the only other reference
            assert_eq!(Arc::strong_count(&ctx), 1);
        }
    }
}
