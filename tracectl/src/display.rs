// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations

use crate::control::{TargetCfg, TargetCfgDb};
use std::fmt::Display;

macro_rules! TARGET_FMT {
    () => {
        "{:>40} │ {:>16} │ {:>6} │ {}"
    };
}

impl Display for TargetCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            TARGET_FMT!(),
            self.target,
            self.name,
            self.level,
            self.tags.join(",")
        )
    }
}

impl Display for TargetCfgDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{:>40}", "──── tracing targets ────")?;
        writeln!(f, TARGET_FMT!(), "TARGET", "NAME", "LEVEL", "TAGS")?;
        for target in self.targets.values() {
            writeln!(f, "{target}")?;
        }
        write!(f, TARGET_FMT!(), "(default)", "--", self.level, "--")
    }
}

pub(crate) struct TargetCfgDbByTag<'a>(pub(crate) &'a TargetCfgDb);

impl Display for TargetCfgDbByTag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let db = self.0;
        writeln!(f)?;
        writeln!(f, "{:>40}", "──── tracing targets by tag ────")?;
        for (tag, members) in &db.tags {
            writeln!(f, " {tag}:")?;
            for target in db.targets.values().filter(|t| members.contains(t.target)) {
                writeln!(f, "      {:<40} : {}", target.target, target.level)?;
            }
        }
        Ok(())
    }
}
