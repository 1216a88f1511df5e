/*! Decoding captured frames into a block chain.

A [Decoder] takes a frame apart in two passes. Dissection walks the headers
from the outside in, validating each one and recording it as a [Layer] of a
[Plan]. Building then walks the plan from the inside out, so every header is
built after everything it encloses and the chain serializes back in wire
order. Nothing is built unless the whole frame dissects cleanly, and the
first builder failure ends the build before any enclosing header is built.

Which dissector handles the payload of a header is looked up in per-decoder
registries keyed by ethertype, IP version and IP protocol. Payloads no
dissector claims are carried as opaque data.
*/

use core::fmt;

use heapless::LinearMap;

use crate::build::{self, BlockFlags, Builder, Tag};
use crate::config::{REGISTRY_ETHERTYPE_COUNT, REGISTRY_IP_VERSION_COUNT, REGISTRY_PROTOCOL_COUNT};
use crate::wire::{
    self, EthernetFrame, EthernetProtocol, EthernetRepr, IpProtocol, IpVersion, Ipv4Packet,
    Ipv4Repr, TcpPacket, TcpRepr, UdpPacket, UdpRepr,
};

mod layer;

pub use self::layer::{Layer, Plan};

/// Decoding a frame failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A header could not be parsed.
    Wire(wire::Error),
    /// The builder rejected a block.
    Build(build::Error),
    /// The frame has more layers than a plan holds.
    TooDeep,
    /// A registry has no room for another dissector.
    Exhausted,
    /// A dissector succeeded without recording any layer.
    EmptyPlan,
}

impl From<wire::Error> for Error {
    fn from(err: wire::Error) -> Self {
        Error::Wire(err)
    }
}

impl From<build::Error> for Error {
    fn from(err: build::Error) -> Self {
        Error::Build(err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Wire(err) => Some(err),
            Error::Build(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Wire(err) => write!(f, "decode::Error: {err}"),
            Error::Build(err) => write!(f, "decode::Error: {err}"),
            Error::TooDeep => write!(f, "decode::Error: too many layers"),
            Error::Exhausted => write!(f, "decode::Error: registry exhausted"),
            Error::EmptyPlan => write!(f, "decode::Error: nothing was dissected"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Whether the decoder asks for a checksum to be recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Checksum {
    /// Mark the block so its checksum is recomputed before it is sent.
    #[default]
    Tx,
    /// Keep the checksum that was captured.
    None,
}

impl Checksum {
    pub fn tx(&self) -> bool {
        matches!(*self, Checksum::Tx)
    }
}

/// Checksum behavior for every protocol that carries one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct ChecksumCapabilities {
    pub ipv4: Checksum,
    pub tcp: Checksum,
    pub udp: Checksum,
}

impl ChecksumCapabilities {
    /// Checksum behavior that keeps every captured checksum as it is.
    pub fn ignored() -> Self {
        ChecksumCapabilities {
            ipv4: Checksum::None,
            tcp: Checksum::None,
            udp: Checksum::None,
        }
    }
}

/// Decoder configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Config {
    pub checksum: ChecksumCapabilities,
}

impl Config {
    pub fn new() -> Self {
        Default::default()
    }
}

/// A function that dissects a header and everything inside it into a plan.
pub type Dissector = for<'a> fn(&Decoder, &'a [u8], &mut Plan<'a>) -> Result<()>;

/// A frame decoder with its dissector registries.
pub struct Decoder {
    config: Config,
    ethertypes: LinearMap<EthernetProtocol, Dissector, REGISTRY_ETHERTYPE_COUNT>,
    versions: LinearMap<IpVersion, Dissector, REGISTRY_IP_VERSION_COUNT>,
    protocols: LinearMap<IpProtocol, Dissector, REGISTRY_PROTOCOL_COUNT>,
}

impl Decoder {
    /// Create a decoder handling IPv4 over Ethernet, and TCP and UDP over IPv4.
    pub fn new(config: Config) -> Decoder {
        let mut decoder = Decoder {
            config,
            ethertypes: LinearMap::new(),
            versions: LinearMap::new(),
            protocols: LinearMap::new(),
        };
        // Cannot fail, the registries start out empty.
        let _ = decoder
            .ethertypes
            .insert(EthernetProtocol::Ipv4, Decoder::dissect_ip);
        let _ = decoder
            .versions
            .insert(IpVersion::Ipv4, Decoder::dissect_ipv4);
        let _ = decoder.protocols.insert(IpProtocol::Tcp, Decoder::dissect_tcp);
        let _ = decoder.protocols.insert(IpProtocol::Udp, Decoder::dissect_udp);
        decoder
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Dissect Ethernet payloads of the given type with `dissector`,
    /// replacing any previous entry.
    pub fn register_ethertype(
        &mut self,
        ethertype: EthernetProtocol,
        dissector: Dissector,
    ) -> Result<()> {
        match self.ethertypes.insert(ethertype, dissector) {
            Ok(_) => Ok(()),
            Err(_) => {
                net_debug!("ethertype registry full, cannot add {}", ethertype);
                Err(Error::Exhausted)
            }
        }
    }

    /// Stop dissecting Ethernet payloads of the given type; they are
    /// attached to the Ethernet block instead.
    pub fn remove_ethertype(&mut self, ethertype: EthernetProtocol) -> Option<Dissector> {
        self.ethertypes.remove(&ethertype)
    }

    /// Dissect IP packets of the given version with `dissector`.
    pub fn register_ip_version(&mut self, version: IpVersion, dissector: Dissector) -> Result<()> {
        match self.versions.insert(version, dissector) {
            Ok(_) => Ok(()),
            Err(_) => {
                net_debug!("IP version registry full, cannot add {}", version);
                Err(Error::Exhausted)
            }
        }
    }

    /// Stop dissecting IP packets of the given version; they become opaque data.
    pub fn remove_ip_version(&mut self, version: IpVersion) -> Option<Dissector> {
        self.versions.remove(&version)
    }

    /// Dissect IP payloads of the given protocol with `dissector`.
    pub fn register_protocol(&mut self, protocol: IpProtocol, dissector: Dissector) -> Result<()> {
        match self.protocols.insert(protocol, dissector) {
            Ok(_) => Ok(()),
            Err(_) => {
                net_debug!("protocol registry full, cannot add {}", protocol);
                Err(Error::Exhausted)
            }
        }
    }

    /// Stop dissecting IP payloads of the given protocol; they become opaque data.
    pub fn remove_protocol(&mut self, protocol: IpProtocol) -> Option<Dissector> {
        self.protocols.remove(&protocol)
    }

    /// Dissect an Ethernet II frame.
    pub fn dissect_ethernet<'a>(&self, frame: &'a [u8], plan: &mut Plan<'a>) -> Result<()> {
        let frame = EthernetFrame::new_checked(frame).map_err(|err| {
            net_debug!("ethernet: {}", err);
            err
        })?;
        let repr = EthernetRepr::parse(&frame)?;

        match self.ethertypes.get(&repr.ethertype) {
            Some(dissect) => {
                layer::push(plan, Layer::Ethernet { repr, payload: &[] })?;
                dissect(self, frame.payload(), plan)
            }
            None => {
                net_trace!("ethernet: no dissector for {}", repr.ethertype);
                layer::push(
                    plan,
                    Layer::Ethernet {
                        repr,
                        payload: frame.payload(),
                    },
                )
            }
        }
    }

    /// Dissect an IP packet of any version.
    pub fn dissect_ip<'a>(&self, packet: &'a [u8], plan: &mut Plan<'a>) -> Result<()> {
        let version = IpVersion::of_packet(packet).map_err(|err| {
            net_debug!("ip: {}", err);
            err
        })?;
        match self.versions.get(&version) {
            Some(dissect) => dissect(self, packet, plan),
            None => {
                net_trace!("ip: no dissector for {}", version);
                layer::push(plan, Layer::Data(packet))
            }
        }
    }

    /// Dissect an IPv4 packet.
    ///
    /// Everything after the header is payload; the total length field is
    /// carried but not acted on.
    pub fn dissect_ipv4<'a>(&self, packet: &'a [u8], plan: &mut Plan<'a>) -> Result<()> {
        let packet = Ipv4Packet::new_checked(packet).map_err(|err| {
            net_debug!("ipv4: {}", err);
            err
        })?;
        let repr = Ipv4Repr::parse(&packet).map_err(|err| {
            net_debug!("ipv4: version {}: {}", packet.version(), err);
            err
        })?;

        layer::push(
            plan,
            Layer::Ipv4 {
                repr,
                options: packet.options(),
            },
        )?;
        match self.protocols.get(&repr.next_header) {
            Some(dissect) => dissect(self, packet.payload(), plan),
            None => layer::push(plan, Layer::Data(packet.payload())),
        }
    }

    /// Dissect a TCP segment.
    pub fn dissect_tcp<'a>(&self, segment: &'a [u8], plan: &mut Plan<'a>) -> Result<()> {
        let packet = TcpPacket::new_checked(segment).map_err(|err| {
            net_debug!("tcp: {}", err);
            err
        })?;
        let repr = TcpRepr::parse(&packet)?;

        let options = match packet.options() {
            [] => None,
            options => Some(options),
        };
        layer::push(plan, Layer::Tcp { repr, options })?;
        match packet.payload() {
            [] => Ok(()),
            payload => layer::push(plan, Layer::Data(payload)),
        }
    }

    /// Dissect a UDP datagram.
    pub fn dissect_udp<'a>(&self, datagram: &'a [u8], plan: &mut Plan<'a>) -> Result<()> {
        let packet = UdpPacket::new_checked(datagram).map_err(|err| {
            net_debug!("udp: {}", err);
            err
        })?;
        let repr = UdpRepr::parse(&packet)?;
        layer::push(
            plan,
            Layer::Udp {
                repr,
                payload: packet.payload(),
            },
        )
    }

    /// Decode an Ethernet II frame into `builder`, returning the tag of the
    /// Ethernet block.
    pub fn decode_ethernet<B: Builder>(&self, frame: &[u8], builder: &mut B) -> Result<Tag> {
        self.decode(Decoder::dissect_ethernet, frame, builder)
    }

    /// Decode an IP packet into `builder`, returning the tag of its outermost block.
    pub fn decode_ip<B: Builder>(&self, packet: &[u8], builder: &mut B) -> Result<Tag> {
        self.decode(Decoder::dissect_ip, packet, builder)
    }

    /// Decode an IPv4 packet into `builder`, returning the tag of the IPv4 block.
    pub fn decode_ipv4<B: Builder>(&self, packet: &[u8], builder: &mut B) -> Result<Tag> {
        self.decode(Decoder::dissect_ipv4, packet, builder)
    }

    /// Decode a TCP segment into `builder`, returning the tag of the TCP block.
    pub fn decode_tcp<B: Builder>(&self, segment: &[u8], builder: &mut B) -> Result<Tag> {
        self.decode(Decoder::dissect_tcp, segment, builder)
    }

    /// Decode a UDP datagram into `builder`, returning the tag of the UDP block.
    pub fn decode_udp<B: Builder>(&self, datagram: &[u8], builder: &mut B) -> Result<Tag> {
        self.decode(Decoder::dissect_udp, datagram, builder)
    }

    fn decode<B: Builder>(&self, dissect: Dissector, bytes: &[u8], builder: &mut B) -> Result<Tag> {
        let mut plan = Plan::new();
        dissect(self, bytes, &mut plan)?;
        self.build(&plan, builder)
    }

    /// Build a dissected plan innermost layer first, returning the tag of
    /// the outermost layer.
    pub fn build<B: Builder>(&self, plan: &Plan, builder: &mut B) -> Result<Tag> {
        let mut outermost = None;
        for layer in plan.iter().rev() {
            let tag = layer.build(builder).map_err(|err| {
                net_debug!("building {}: {}", layer, err);
                err
            })?;
            if self.checksum_pending(layer) {
                builder
                    .find_block(tag)
                    .ok_or(Error::Build(build::Error::NotFound))?
                    .mark_checksum_pending();
            }
            outermost = Some(tag);
        }
        outermost.ok_or(Error::EmptyPlan)
    }

    fn checksum_pending(&self, layer: &Layer) -> bool {
        let caps = &self.config.checksum;
        match layer {
            Layer::Ipv4 { .. } => caps.ipv4.tx(),
            Layer::Tcp { .. } => caps.tcp.tx(),
            Layer::Udp { .. } => caps.udp.tx(),
            Layer::Ethernet { .. } | Layer::Data(_) => false,
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new(Config::new())
    }
}
