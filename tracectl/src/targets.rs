// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Static registry of tracing targets across all linked crates

use crate::LevelFilter;
use linkme::distributed_slice;

/// A tracing target declared with [`trace_target!`](crate::trace_target).
#[derive(Debug)]
pub struct TargetSpec {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
}

impl TargetSpec {
    #[must_use]
    pub const fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            name,
            level,
            tags,
        }
    }
}

/// Every target declared in any linked crate, collected at link time.
#[distributed_slice]
pub static TRACING_TARGETS: [TargetSpec];

#[macro_export]
/// Declare the tracing target of the calling module, its short name, default level and tags.
///
/// The calling crate needs `linkme` among its dependencies.
macro_rules! trace_target {
    // The const scope keeps the static's name private so the macro can be used once per module
    // without clashes.
    ($name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use linkme::distributed_slice;
            use $crate::targets::{TargetSpec, TRACING_TARGETS};

            #[distributed_slice(TRACING_TARGETS)]
            static TRACE_TGT: TargetSpec = TargetSpec::new(module_path!(), $name, $level, $tags);
        };
    };
}
