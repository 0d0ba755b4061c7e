// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use ordermap::OrderMap;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

use crate::display::TargetCfgDbByTag;
use crate::targets::TRACING_TARGETS;

/// Errors when changing the tracing configuration
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TraceCtlError {
    #[error("invalid syntax '{0}': expected tag=level")]
    Syntax(String),
    #[error("invalid level '{0}'")]
    Level(String),
}

/// Runtime configuration of a single target
#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: Vec<&'static str>,
}

impl TargetCfg {
    fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        // a target can always be addressed by its name
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
        }
    }

    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) level: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, HashSet<&'static str>>,
}

impl TargetCfgDb {
    fn new(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for spec in TRACING_TARGETS {
            db.register(TargetCfg::new(spec.target, spec.name, spec.level, spec.tags));
        }
        db
    }

    fn register(&mut self, cfg: TargetCfg) {
        let target = cfg.target;
        for tag in &cfg.tags {
            self.tags.entry(*tag).or_default().insert(target);
        }
        if let Some(exist) = self.targets.insert(target, cfg) {
            warn!("Target {} has been multiply defined!", exist.target);
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for target in self.targets.values() {
            match format!("{}={}", target.target, target.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => error!("Bad directive for target {}: {e}", target.target),
            }
        }
        filter
    }

    /// The current configuration, in the syntax accepted by [`TracingControl::setup_from_string`].
    fn as_config_string(&self) -> String {
        let mut out = format!("default={}", self.level);
        for target in self.targets.values() {
            out += format!(",{}={}", target.name, target.level).as_str();
        }
        out
    }

    fn tag_targets_mut(&mut self, tag: &str) -> impl Iterator<Item = &mut TargetCfg> {
        let members = self.tags.get(tag).cloned().unwrap_or_default();
        self.targets
            .values_mut()
            .filter(move |target| members.contains(target.target))
    }
}

/// Owner of the reloadable filter of the process-wide subscriber
#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_filter: reload::Handle<EnvFilter, Registry>,
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get the process-wide [`TracingControl`], installing the subscriber on first use.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

impl TracingControl {
    fn new() -> Self {
        let db = TargetCfgDb::new(LevelFilter::INFO);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);
        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
        {
            // someone else (e.g. a test harness) owns the global subscriber
            warn!("Tracing subscriber not installed: {e}");
        }
        Self {
            db: Mutex::new(db),
            reload_filter,
        }
    }

    fn db(&self) -> MutexGuard<'_, TargetCfgDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reload(&self, filter: EnvFilter) {
        if let Err(e) = self.reload_filter.reload(filter) {
            error!("Failed to reload tracing filter: {e}");
        }
    }

    pub fn init() {
        get_trace_ctl();
    }

    /// Set the level of every target carrying `tag`. Returns how many targets changed.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> usize {
        let mut db = self.db();
        let mut changed = 0;
        for target in db.tag_targets_mut(tag) {
            if target.level != level {
                target.level = level;
                changed += 1;
            }
        }
        if changed > 0 {
            self.reload(db.env_filter());
        }
        info!("Changed log level for tag '{tag}' to {level}. Targets changed: {changed}");
        changed
    }

    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db();
        for target in db.targets.values_mut() {
            target.level = level;
        }
        self.reload(db.env_filter());
    }

    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db();
        if db.level != level {
            db.level = level;
            info!("Set default log level to {level}");
            self.reload(db.env_filter());
        }
    }

    #[must_use]
    pub fn get_default_level(&self) -> LevelFilter {
        self.db().level
    }

    fn parse_tracing_config(input: &str) -> Result<OrderMap<String, LevelFilter>, TraceCtlError> {
        let mut result = OrderMap::new();
        for item in input.split(',').map(str::trim) {
            let Some((tag, level)) = item.split_once('=') else {
                return Err(TraceCtlError::Syntax(item.to_string()));
            };
            let level = LevelFilter::from_str(level.trim())
                .map_err(|_| TraceCtlError::Level(level.trim().to_string()))?;
            result.insert(tag.trim().to_string(), level);
        }
        Ok(result)
    }

    /// Apply a comma separated list of `tag=level` items.
    ///
    /// `default` sets the level of unregistered targets and `all` the level of every registered
    /// target; other items then override per tag, so `default=error,all=info,nat=debug` works.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if an item is malformed or names an unknown level.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = Self::parse_tracing_config(input)?;
        if let Some(level) = config.get("default") {
            self.set_default_level(*level);
        }
        if let Some(level) = config.get("all") {
            self.set_level_all(*level);
        }
        for (tag, level) in config
            .iter()
            .filter(|(t, _)| !matches!(t.as_str(), "default" | "all")) {
            self.set_tag_level(tag, *level);
        }
        Ok(())
    }

    #[must_use]
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db().targets.get(target).cloned()
    }

    pub fn get_targets_by_tag(&self, tag: &str) -> impl Iterator<Item = TargetCfg> {
        let mut db = self.db();
        db.tag_targets_mut(tag)
            .map(|t| t.clone())
            .collect::<Vec<_>>()
            .into_iter()
    }

    pub fn dump(&self) {
        let db = self.db();
        info!("{db}");
        info!("{}", TargetCfgDbByTag(&db));
    }

    #[must_use]
    pub fn as_config_string(&self) -> String {
        self.db().as_config_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{TraceCtlError, TracingControl, get_trace_ctl};
    use crate::LevelFilter;
    use crate::targets::TRACING_TARGETS;
    use serial_test::serial;

    #[test]
    #[serial]
    fn own_target_is_registered() {
        let names: Vec<&str> = TRACING_TARGETS.iter().map(|t| t.name).collect();
        assert!(names.contains(&"tracectl"));
        let tctl = get_trace_ctl();
        let target = tctl.get_target("bih_tracectl").unwrap();
        assert_eq!(target.name(), "tracectl");
        assert_eq!(target.level(), LevelFilter::INFO);
    }

    #[test]
    #[serial]
    fn tag_level_changes() {
        let tctl = get_trace_ctl();
        tctl.set_tag_level("tracectl", LevelFilter::INFO);
        assert_eq!(tctl.set_tag_level("tracectl", LevelFilter::DEBUG), 1);
        assert_eq!(tctl.set_tag_level("tracectl", LevelFilter::DEBUG), 0);
        assert_eq!(tctl.set_tag_level("no-such-tag", LevelFilter::DEBUG), 0);
        let mut targets = tctl.get_targets_by_tag("tracectl");
        assert_eq!(targets.next().unwrap().level(), LevelFilter::DEBUG);
        tctl.set_tag_level("tracectl", LevelFilter::INFO);
    }

    #[test]
    #[serial]
    fn setup_from_string() {
        let tctl = get_trace_ctl();
        tctl.setup_from_string("default=warn, tracectl=error").unwrap();
        assert_eq!(tctl.get_default_level(), LevelFilter::WARN);
        assert_eq!(
            tctl.get_target("bih_tracectl").unwrap().level(),
            LevelFilter::ERROR
        );
        assert!(tctl.as_config_string().starts_with("default=warn"));
        assert!(tctl.as_config_string().contains("tracectl=error"));

        assert_eq!(
            tctl.setup_from_string("tracectl=bad"),
            Err(TraceCtlError::Level("bad".to_string()))
        );
        assert_eq!(
            tctl.setup_from_string("tracectl=error, foo"),
            Err(TraceCtlError::Syntax("foo".to_string()))
        );

        tctl.setup_from_string("default=info,all=info").unwrap();
        TracingControl::init();
        tctl.dump();
    }
}
