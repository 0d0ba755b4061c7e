// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The translator instance shared by every packet and administrative request.
//!
//! A [`TranslatorContext`] is built once from a [`TranslatorConfig`] and shared behind an `Arc`
//! by the threads delivering packets, the control path and the [`crate::Reaper`]. The host owns
//! packet interception: it classifies each packet as IPv4 or IPv6, calls
//! [`TranslatorContext::on_packet`] (or [`TranslatorContext::on_packet_with`]) and transmits
//! whatever comes out. Interface addresses are looked up through an [`AddressResolver`].

use crate::bindings::Bindings;
use crate::errors::{AdminError, DispatchError, MappingError, PoolError, TranslateError};
use crate::fragment::FragmentEmitter;
use crate::mapping::MapEntry;
use crate::translate::{TranslateEnv, translate_6to4};
use ahash::RandomState;
use concurrency::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use config::TranslatorConfig;
use config::admin::{AdminCommand, MappingCommand, Setting};
use config::{BihMode, PoolRange};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};
use strum::{Display, IntoStaticStr};
use tracing::{debug, info};

/// Translation direction, as classified by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum Direction {
    #[strum(serialize = "4to6")]
    V4ToV6,
    #[strum(serialize = "6to4")]
    V6ToV4,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

/// A translated packet, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPacket {
    /// Interface the original packet was received on
    pub interface: String,
    pub direction: Direction,
    /// The packet, starting with its IP header
    pub bytes: Vec<u8>,
}

/// Where translated packets go.
pub trait PacketSink {
    /// Hand over one packet.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the packet could not be taken.
    fn dispatch(&mut self, packet: OutputPacket) -> Result<(), DispatchError>;
}

impl PacketSink for Vec<OutputPacket> {
    fn dispatch(&mut self, packet: OutputPacket) -> Result<(), DispatchError> {
        self.push(packet);
        Ok(())
    }
}

/// Lookup of the addresses configured on the host's interfaces.
pub trait AddressResolver: Send + Sync {
    fn local_address_of(&self, interface: &str, family: AddressFamily) -> Option<IpAddr>;
}

/// An [`AddressResolver`] over a fixed table.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    interfaces: HashMap<String, (Option<Ipv4Addr>, Option<Ipv6Addr>), RandomState>,
}

impl StaticResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            interfaces: HashMap::with_hasher(RandomState::with_seed(0)),
        }
    }

    /// Set the addresses of `interface`, replacing any previous ones.
    #[must_use]
    pub fn with_interface(
        mut self,
        interface: &str,
        v4: Option<Ipv4Addr>,
        v6: Option<Ipv6Addr>,
    ) -> Self {
        self.interfaces.insert(interface.to_string(), (v4, v6));
        self
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressResolver for StaticResolver {
    fn local_address_of(&self, interface: &str, family: AddressFamily) -> Option<IpAddr> {
        let (v4, v6) = self.interfaces.get(interface)?;
        match family {
            AddressFamily::Ipv4 => v4.map(IpAddr::V4),
            AddressFamily::Ipv6 => v6.map(IpAddr::V6),
        }
    }
}

/// Settings changed at runtime, read once per packet.
#[derive(Debug, Clone, Copy)]
struct Settings {
    mode: BihMode,
    tos_ignore: bool,
    private_addr: Option<Ipv4Addr>,
    emitter: FragmentEmitter,
    reap_interval: Duration,
}

pub struct TranslatorContext {
    bindings: Bindings,
    settings: RwLock<Settings>,
    resolver: Box<dyn AddressResolver>,
}

impl Debug for TranslatorContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorContext")
            .field("bindings", &self.bindings)
            .field("settings", &*self.read_settings())
            .finish_non_exhaustive()
    }
}

impl TranslatorContext {
    /// Build a context, seeding the pool and the static mappings from `config`.
    pub fn new(
        config: &TranslatorConfig,
        resolver: impl AddressResolver + 'static,
    ) -> Result<Self, PoolError> {
        let context = Self {
            bindings: Bindings::new(config.idle_timeout),
            settings: RwLock::new(Settings {
                mode: config.mode,
                tos_ignore: config.tos_ignore,
                private_addr: config.private_addr,
                emitter: FragmentEmitter::new(config.fragment_threshold),
                reap_interval: config.reap_interval,
            }),
            resolver: Box::new(resolver),
        };
        crate::metrics::describe_metrics();
        context.add_ranges(&config.pool)?;
        let now = Instant::now();
        for mapping in &config.mappings {
            context.bindings.add_mapping(mapping.v4, mapping.v6, now);
        }
        info!(
            "Translator ready: mode {}, {} range(s), {} static mapping(s)",
            config.mode,
            config.pool.len(),
            config.mappings.len()
        );
        Ok(context)
    }

    // settings are plain values, always consistent even if a writer panicked
    fn read_settings(&self) -> RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_settings(&self) -> RwLockWriteGuard<'_, Settings> {
        self.settings.write().unwrap_or_else(|e| e.into_inner())
    }

    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Translate one packet received on `interface`, collecting the output.
    ///
    /// Usually one packet comes out; an oversized IPv4 datagram comes out as several IPv6
    /// fragments.
    pub fn on_packet(
        &self,
        interface: &str,
        direction: Direction,
        bytes: &[u8],
    ) -> Result<Vec<OutputPacket>, TranslateError> {
        let mut out = Vec::new();
        self.on_packet_with(interface, direction, bytes, &mut out)?;
        Ok(out)
    }

    /// Translate one packet, handing every output packet to `sink` as soon as it is built.
    ///
    /// On failure, packets already given to `sink` are not taken back. Returns the number of
    /// packets dispatched.
    pub fn on_packet_with(
        &self,
        interface: &str,
        direction: Direction,
        bytes: &[u8],
        sink: &mut impl PacketSink,
    ) -> Result<usize, TranslateError> {
        self.process(interface, direction, bytes, Instant::now(), sink)
    }

    pub(crate) fn process(
        &self,
        interface: &str,
        direction: Direction,
        bytes: &[u8],
        now: Instant,
        sink: &mut impl PacketSink,
    ) -> Result<usize, TranslateError> {
        let result = self.translate(interface, direction, bytes, now, sink);
        match &result {
            Ok(count) => crate::metrics::translated(direction, *count),
            Err(e) => {
                debug!("Dropped {direction} packet on {interface}: {e}");
                crate::metrics::dropped(direction, e);
            }
        }
        result
    }

    fn translate(
        &self,
        interface: &str,
        direction: Direction,
        bytes: &[u8],
        now: Instant,
        sink: &mut impl PacketSink,
    ) -> Result<usize, TranslateError> {
        let settings = *self.read_settings();
        match (settings.mode, direction) {
            (BihMode::Disabled, _) => return Err(TranslateError::TranslationDisabled),
            (BihMode::Nat64Only, Direction::V4ToV6) => {
                return Err(TranslateError::DirectionDisabled);
            }
            _ => {}
        }
        let env = TranslateEnv {
            bindings: &self.bindings,
            interface,
            local_v4: self.local_v4(interface),
            local_v6: self.local_v6(interface),
            private_addr: settings.private_addr,
            tos_ignore: settings.tos_ignore,
            now,
        };
        let mut send = |packet: Vec<u8>| {
            sink.dispatch(OutputPacket {
                interface: interface.to_string(),
                direction,
                bytes: packet,
            })
            .map_err(TranslateError::from)
        };
        match direction {
            Direction::V4ToV6 => settings.emitter.emit(&env, bytes, send),
            Direction::V6ToV4 => {
                send(translate_6to4(&env, bytes)?)?;
                Ok(1)
            }
        }
    }

    fn local_v4(&self, interface: &str) -> Option<Ipv4Addr> {
        match self.resolver.local_address_of(interface, AddressFamily::Ipv4)? {
            IpAddr::V4(addr) => Some(addr),
            IpAddr::V6(_) => None,
        }
    }

    fn local_v6(&self, interface: &str) -> Option<Ipv6Addr> {
        match self.resolver.local_address_of(interface, AddressFamily::Ipv6)? {
            IpAddr::V6(addr) => Some(addr),
            IpAddr::V4(_) => None,
        }
    }

    /// Add ranges to the pool, stopping at the first invalid one.
    pub fn add_ranges(&self, ranges: &[PoolRange]) -> Result<(), PoolError> {
        for range in ranges {
            self.bindings.add_range(range.first, range.last)?;
            info!("Added pool range {range}");
        }
        Ok(())
    }

    /// Remove ranges from the pool, stopping at the first one not found.
    pub fn remove_ranges(&self, ranges: &[PoolRange]) -> Result<(), PoolError> {
        for range in ranges {
            self.bindings.remove_range(range.first, range.last)?;
            info!("Removed pool range {range}");
        }
        Ok(())
    }

    pub fn add_mapping(&self, v4: Ipv4Addr, v6: Ipv6Addr) -> MapEntry {
        info!("Adding mapping {v4} <-> {v6}");
        self.bindings.add_mapping(v4, v6, Instant::now())
    }

    pub fn remove_mapping(&self, v4: Ipv4Addr) -> Result<MapEntry, MappingError> {
        let entry = self.bindings.remove_mapping(v4)?;
        info!("Removed mapping {v4} <-> {}", entry.internal());
        Ok(entry)
    }

    pub fn clear_mappings(&self) -> usize {
        let count = self.bindings.clear_mappings();
        info!("Cleared {count} mapping(s)");
        count
    }

    pub fn set_idle_timeout(&self, idle_timeout: Duration) {
        info!("Idle timeout set to {}s", idle_timeout.as_secs());
        self.bindings.set_idle_timeout(idle_timeout);
    }

    pub fn set_tos_ignore(&self, tos_ignore: bool) {
        info!("TOS ignore set to {tos_ignore}");
        self.write_settings().tos_ignore = tos_ignore;
    }

    pub fn set_mode(&self, mode: BihMode) {
        info!("Translation mode set to {mode}");
        self.write_settings().mode = mode;
    }

    pub fn set_private_addr(&self, private_addr: Option<Ipv4Addr>) {
        match private_addr {
            Some(addr) => info!("Private address set to {addr}"),
            None => info!("Private address removed"),
        }
        self.write_settings().private_addr = private_addr;
    }

    #[must_use]
    pub fn mode(&self) -> BihMode {
        self.read_settings().mode
    }

    #[must_use]
    pub fn tos_ignore(&self) -> bool {
        self.read_settings().tos_ignore
    }

    #[must_use]
    pub fn private_addr(&self) -> Option<Ipv4Addr> {
        self.read_settings().private_addr
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.bindings.idle_timeout()
    }

    #[must_use]
    pub fn reap_interval(&self) -> Duration {
        self.read_settings().reap_interval
    }

    /// Apply a parsed administrative command.
    pub fn apply(&self, command: AdminCommand) -> Result<(), AdminError> {
        match command {
            AdminCommand::AddRanges(ranges) => self.add_ranges(&ranges)?,
            AdminCommand::RemoveRanges(ranges) => self.remove_ranges(&ranges)?,
            AdminCommand::Mapping(MappingCommand::Add { v4, v6 }) => {
                self.add_mapping(v4, v6);
            }
            AdminCommand::Mapping(MappingCommand::Del(v4)) => {
                self.remove_mapping(v4)?;
            }
            AdminCommand::Mapping(MappingCommand::Clear) => {
                self.clear_mappings();
            }
            AdminCommand::Settings(settings) => {
                for setting in settings {
                    match setting {
                        Setting::Mode(mode) => self.set_mode(mode),
                        Setting::Timeout(timeout) => self.set_idle_timeout(timeout),
                        Setting::TosIgnore(tos_ignore) => self.set_tos_ignore(tos_ignore),
                        Setting::Private(addr) => self.set_private_addr(addr),
                    }
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn show_pool(&self) -> String {
        self.bindings.show_pool()
    }

    #[must_use]
    pub fn render_mappings(&self) -> String {
        self.bindings.render_mappings(Instant::now())
    }

    /// Evict the mappings idle for longer than the idle timeout.
    pub fn reap(&self, now: Instant) -> Vec<MapEntry> {
        self.bindings.reap(now)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AddressFamily, AddressResolver, Direction, OutputPacket, PacketSink, StaticResolver,
        TranslatorContext,
    };
    use crate::errors::{AdminError, DispatchError, MappingError, TranslateError};
    use concurrency::sync::Arc;
    use concurrency::thread;
    use config::admin::{AdminCommand, MappingCommand, parse_ranges, parse_settings};
    use config::{BihMode, PoolRange, StaticMapping, TranslatorConfig, TranslatorConfigBuilder};
    use etherparse::{Ipv4Header, Ipv6Header, PacketBuilder};
    use pretty_assertions::assert_eq;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::time::{Duration, Instant};
    use tracing_test::traced_test;

    const IFACE: &str = "eth0";
    const HOST_V4: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 100);
    const HOST_V6: Ipv6Addr = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x100);

    fn peer(last: u16) -> Ipv6Addr {
        Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, last)
    }

    fn resolver() -> StaticResolver {
        StaticResolver::new().with_interface(IFACE, Some(HOST_V4), Some(HOST_V6))
    }

    fn config() -> TranslatorConfig {
        TranslatorConfigBuilder::default()
            .pool(vec![
                PoolRange::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)).unwrap(),
            ])
            .build()
            .unwrap()
    }

    fn context() -> TranslatorContext {
        TranslatorContext::new(&config(), resolver()).unwrap()
    }

    fn udp_from(src: Ipv6Addr) -> Vec<u8> {
        let payload = b"hello";
        let builder = PacketBuilder::ipv6(src.octets(), HOST_V6.octets(), 64).udp(4000, 5000);
        let mut packet = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, payload).unwrap();
        packet
    }

    fn udp_to(dst: Ipv4Addr, payload_len: usize) -> Vec<u8> {
        let payload = vec![0x5a; payload_len];
        let builder = PacketBuilder::ipv4(HOST_V4.octets(), dst.octets(), 64).udp(5000, 4000);
        let mut packet = Vec::with_capacity(builder.size(payload.len()));
        builder.write(&mut packet, &payload).unwrap();
        packet
    }

    fn ipv4_source(packet: &OutputPacket) -> Ipv4Addr {
        let (header, _) = Ipv4Header::from_slice(&packet.bytes).unwrap();
        Ipv4Addr::from(header.source)
    }

    fn ipv6_destination(packet: &OutputPacket) -> Ipv6Addr {
        let (header, _) = Ipv6Header::from_slice(&packet.bytes).unwrap();
        Ipv6Addr::from(header.destination)
    }

    #[test]
    fn static_resolver() {
        let resolver = resolver();
        assert_eq!(
            resolver.local_address_of(IFACE, AddressFamily::Ipv4),
            Some(IpAddr::V4(HOST_V4))
        );
        assert_eq!(
            resolver.local_address_of(IFACE, AddressFamily::Ipv6),
            Some(IpAddr::V6(HOST_V6))
        );
        assert_eq!(resolver.local_address_of("lo", AddressFamily::Ipv4), None);
    }

    #[test]
    #[traced_test]
    fn allocation_then_return_traffic() {
        let start = Instant::now();
        let ctx = context();
        let mut out = Vec::new();

        ctx.process(IFACE, Direction::V6ToV4, &udp_from(peer(1)), start, &mut out)
            .unwrap();
        ctx.process(IFACE, Direction::V6ToV4, &udp_from(peer(2)), start, &mut out)
            .unwrap();
        assert_eq!(ipv4_source(&out[0]), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(ipv4_source(&out[1]), Ipv4Addr::new(10, 0, 0, 2));
        assert!(out.iter().all(|p| p.direction == Direction::V6ToV4));

        assert_eq!(
            ctx.process(IFACE, Direction::V6ToV4, &udp_from(peer(3)), start, &mut out),
            Err(TranslateError::PoolExhausted)
        );
        assert!(logs_contain("Dropped 6to4 packet on eth0"));

        let later = start + Duration::from_secs(6 * 60);
        assert!(ctx.reap(later).is_empty());
        let mut replies = Vec::new();
        ctx.process(
            IFACE,
            Direction::V4ToV6,
            &udp_to(Ipv4Addr::new(10, 0, 0, 1), 16),
            later,
            &mut replies,
        )
        .unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(ipv6_destination(&replies[0]), peer(1));
        assert_eq!(replies[0].interface, IFACE);
    }

    #[test]
    fn idle_mappings_are_reaped() {
        let start = Instant::now();
        let ctx = context();
        ctx.process(IFACE, Direction::V6ToV4, &udp_from(peer(1)), start, &mut Vec::new())
            .unwrap();
        let idle = ctx.idle_timeout();
        assert!(ctx.reap(start + idle - Duration::from_secs(1)).is_empty());
        let reaped = ctx.reap(start + idle + Duration::from_secs(1));
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].internal(), peer(1));
        assert_eq!(
            ctx.process(
                IFACE,
                Direction::V4ToV6,
                &udp_to(Ipv4Addr::new(10, 0, 0, 1), 16),
                start + idle + Duration::from_secs(2),
                &mut Vec::new(),
            ),
            Err(TranslateError::NoMapping(Ipv4Addr::new(10, 0, 0, 1).into()))
        );
    }

    #[test]
    fn modes() {
        let ctx = context();
        ctx.set_mode(BihMode::Disabled);
        assert_eq!(
            ctx.on_packet(IFACE, Direction::V6ToV4, &udp_from(peer(1))),
            Err(TranslateError::TranslationDisabled)
        );
        ctx.set_mode(BihMode::Nat64Only);
        assert_eq!(ctx.on_packet(IFACE, Direction::V6ToV4, &udp_from(peer(1))).unwrap().len(), 1);
        assert_eq!(
            ctx.on_packet(IFACE, Direction::V4ToV6, &udp_to(Ipv4Addr::new(10, 0, 0, 1), 16)),
            Err(TranslateError::DirectionDisabled)
        );
        ctx.set_mode(BihMode::Dual);
        assert_eq!(
            ctx.on_packet(IFACE, Direction::V4ToV6, &udp_to(Ipv4Addr::new(10, 0, 0, 1), 16))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn unknown_interface_has_no_address() {
        let ctx = context();
        assert_eq!(
            ctx.on_packet("wlan0", Direction::V6ToV4, &udp_from(peer(1))),
            Err(TranslateError::NoLocalAddress("wlan0".to_string()))
        );
    }

    #[test]
    fn static_mappings_from_config() {
        let mut config = config();
        config.mappings.push(StaticMapping {
            v4: Ipv4Addr::new(10, 0, 0, 9),
            v6: peer(9),
        });
        let ctx = TranslatorContext::new(&config, resolver()).unwrap();
        let out = ctx
            .on_packet(IFACE, Direction::V4ToV6, &udp_to(Ipv4Addr::new(10, 0, 0, 9), 16))
            .unwrap();
        assert_eq!(ipv6_destination(&out[0]), peer(9));
    }

    #[test]
    fn oversized_datagram_comes_out_fragmented() {
        let ctx = context();
        ctx.add_mapping(Ipv4Addr::new(10, 0, 0, 1), peer(1));
        let out = ctx
            .on_packet(IFACE, Direction::V4ToV6, &udp_to(Ipv4Addr::new(10, 0, 0, 1), 2000))
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| p.bytes.len() <= 1280));
        assert!(out.iter().all(|p| ipv6_destination(p) == peer(1)));
    }

    struct Refusing;

    impl PacketSink for Refusing {
        fn dispatch(&mut self, _: OutputPacket) -> Result<(), DispatchError> {
            Err(DispatchError::Refused("link down".to_string()))
        }
    }

    #[test]
    fn sink_failure_is_reported() {
        let ctx = context();
        assert_eq!(
            ctx.on_packet_with(IFACE, Direction::V6ToV4, &udp_from(peer(1)), &mut Refusing),
            Err(TranslateError::Dispatch(DispatchError::Refused(
                "link down".to_string()
            )))
        );
    }

    #[test]
    #[traced_test]
    fn admin_commands() {
        let ctx = context();
        ctx.apply(AdminCommand::AddRanges(parse_ranges("10.0.1.1-10.0.1.4").unwrap()))
            .unwrap();
        assert!(logs_contain("Added pool range 10.0.1.1-10.0.1.4"));
        assert_eq!(
            ctx.show_pool(),
            "10.0.0.1-10.0.0.2\n10.0.1.1-10.0.1.4\ncursor none\n"
        );
        ctx.apply(AdminCommand::RemoveRanges(parse_ranges("10.0.0.1-10.0.0.2").unwrap()))
            .unwrap();
        assert_eq!(ctx.show_pool(), "10.0.1.1-10.0.1.4\ncursor none\n");

        ctx.apply(AdminCommand::Mapping("ADD 10.0.0.7 2001:db8::7".parse().unwrap()))
            .unwrap();
        assert_eq!(ctx.bindings().mapping_count(), 1);
        assert!(ctx.render_mappings().starts_with("10.0.0.7 2001:db8::7 used"));
        assert_eq!(
            ctx.apply(AdminCommand::Mapping(MappingCommand::Del(Ipv4Addr::new(10, 0, 0, 8)))),
            Err(AdminError::Mapping(MappingError::NotFound(Ipv4Addr::new(
                10, 0, 0, 8
            ))))
        );
        ctx.apply(AdminCommand::Mapping(MappingCommand::Clear)).unwrap();
        assert_eq!(ctx.bindings().mapping_count(), 0);

        let settings =
            parse_settings("mode=nat64 timeout=600 tos_ignore=1 private=192.168.1.1").unwrap();
        ctx.apply(AdminCommand::Settings(settings)).unwrap();
        assert_eq!(ctx.mode(), BihMode::Nat64Only);
        assert_eq!(ctx.idle_timeout(), Duration::from_secs(600));
        assert!(ctx.tos_ignore());
        assert_eq!(ctx.private_addr(), Some(Ipv4Addr::new(192, 168, 1, 1)));
        ctx.apply(AdminCommand::Settings(parse_settings("private=none").unwrap()))
            .unwrap();
        assert_eq!(ctx.private_addr(), None);
    }

    #[test]
    fn private_address_is_the_destination() {
        let ctx = context();
        ctx.set_private_addr(Some(Ipv4Addr::new(192, 168, 1, 1)));
        let out = ctx
            .on_packet(IFACE, Direction::V6ToV4, &udp_from(peer(1)))
            .unwrap();
        let (header, _) = Ipv4Header::from_slice(&out[0].bytes).unwrap();
        assert_eq!(header.destination, [192, 168, 1, 1]);
    }

    #[test]
    fn racing_sources_never_share_an_address() {
        concurrency::model(100, || {
            let ctx = Arc::new(context());
            let handles: Vec<_> = (1..=3u16)
                .map(|last| {
                    let ctx = ctx.clone();
                    thread::spawn(move || {
                        ctx.on_packet(IFACE, Direction::V6ToV4, &udp_from(peer(last)))
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let exhausted = results
                .iter()
                .filter(|r| **r == Err(TranslateError::PoolExhausted))
                .count();
            assert_eq!(exhausted, 1);
            let mut sources: Vec<Ipv4Addr> = results
                .iter()
                .filter_map(|r| r.as_ref().ok())
                .map(|out| ipv4_source(&out[0]))
                .collect();
            sources.sort_unstable();
            assert_eq!(
                sources,
                vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2)]
            );
        });
    }
}
