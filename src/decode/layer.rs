use core::fmt;

use crate::build::{Builder, Tag};
use crate::config::DECODE_MAX_DEPTH;
use crate::wire::{EthernetRepr, Ipv4Repr, TcpRepr, UdpRepr};

use super::{Error, Result};

/// One dissected layer, holding everything its builder calls need.
///
/// Byte slices borrow from the buffer being decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer<'a> {
    /// An Ethernet header. `payload` is empty when the frame was dispatched
    /// to an inner dissector, and the unparsed remainder otherwise.
    Ethernet {
        repr: EthernetRepr,
        payload: &'a [u8],
    },
    /// An IPv4 header. `options` is empty when the header has none.
    Ipv4 { repr: Ipv4Repr, options: &'a [u8] },
    /// A TCP header. The segment payload, if any, is the next layer.
    Tcp {
        repr: TcpRepr,
        options: Option<&'a [u8]>,
    },
    /// A UDP header with its payload attached.
    Udp { repr: UdpRepr, payload: &'a [u8] },
    /// Bytes nothing recognized.
    Data(&'a [u8]),
}

/// The layers of a packet, outermost first.
pub type Plan<'a> = heapless::Vec<Layer<'a>, DECODE_MAX_DEPTH>;

impl<'a> Layer<'a> {
    /// Issue the builder calls for this layer and return the tag of the
    /// block holding its header.
    pub fn build<B: Builder>(&self, builder: &mut B) -> Result<Tag> {
        let tag = match self {
            Layer::Ethernet { repr, payload } => builder.build_ethernet(repr, payload)?,
            Layer::Ipv4 { repr, options } => {
                if !options.is_empty() {
                    builder.build_ipv4_options(options)?;
                }
                builder.build_ipv4(repr, &[])?
            }
            Layer::Tcp { repr, options } => {
                builder.build_tcp_options(*options)?;
                builder.build_tcp(repr, &[])?
            }
            Layer::Udp { repr, payload } => builder.build_udp(repr, payload)?,
            Layer::Data(data) => builder.build_data(data)?,
        };
        Ok(tag)
    }
}

impl<'a> fmt::Display for Layer<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Layer::Ethernet { repr, payload } => {
                write!(f, "{repr}")?;
                if !payload.is_empty() {
                    write!(f, " payload={}", payload.len())?;
                }
                Ok(())
            }
            Layer::Ipv4 { repr, options } => {
                write!(f, "{repr}")?;
                if !options.is_empty() {
                    write!(f, " opts={}", options.len())?;
                }
                Ok(())
            }
            Layer::Tcp { repr, options } => {
                write!(f, "{repr}")?;
                if let Some(options) = options {
                    write!(f, " opts={}", options.len())?;
                }
                Ok(())
            }
            Layer::Udp { repr, payload } => write!(f, "{repr} payload={}", payload.len()),
            Layer::Data(data) => write!(f, "data len={}", data.len()),
        }
    }
}

/// Append a layer to a plan, failing once the plan is full.
pub(super) fn push<'a>(plan: &mut Plan<'a>, layer: Layer<'a>) -> Result<()> {
    net_trace!("dissected {}", layer);
    plan.push(layer).map_err(|layer| {
        net_debug!("too many layers, dropping {}", layer);
        Error::TooDeep
    })
}
