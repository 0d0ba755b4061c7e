// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Translator counters

use crate::context::Direction;
use crate::errors::TranslateError;
use metrics::{counter, describe_counter};

/// Metric name constants
pub const PACKETS_TRANSLATED: &str = "bih_packets_translated";
pub const PACKETS_DROPPED: &str = "bih_packets_dropped";
pub const FRAGMENTS_EMITTED: &str = "bih_fragments_emitted";
pub const MAPPINGS_CREATED: &str = "bih_mappings_created";
pub const MAPPINGS_REAPED: &str = "bih_mappings_reaped";

/// Register the descriptions of the translator counters with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        PACKETS_TRANSLATED,
        "Packets translated, by direction"
    );
    describe_counter!(
        PACKETS_DROPPED,
        "Packets dropped instead of translated, by direction and reason"
    );
    describe_counter!(
        FRAGMENTS_EMITTED,
        "IPv6 packets produced by splitting an oversized IPv4 datagram"
    );
    describe_counter!(MAPPINGS_CREATED, "Mappings allocated from the pool");
    describe_counter!(MAPPINGS_REAPED, "Mappings evicted after idling");
}

pub(crate) fn translated(direction: Direction, packets: usize) {
    counter!(PACKETS_TRANSLATED, "direction" => direction.as_str())
        .increment(u64::try_from(packets).unwrap_or(u64::MAX));
}

pub(crate) fn dropped(direction: Direction, error: &TranslateError) {
    counter!(PACKETS_DROPPED, "direction" => direction.as_str(), "reason" => error.reason())
        .increment(1);
}

pub(crate) fn fragments(count: usize) {
    counter!(FRAGMENTS_EMITTED).increment(u64::try_from(count).unwrap_or(u64::MAX));
}

pub(crate) fn mapping_created() {
    counter!(MAPPINGS_CREATED).increment(1);
}

pub(crate) fn mappings_reaped(count: usize) {
    counter!(MAPPINGS_REAPED).increment(u64::try_from(count).unwrap_or(u64::MAX));
}
