use core::fmt;

use super::{BlockFlags, Flags, Tag};
use crate::wire::{
    EthernetFrame, EthernetRepr, Ipv4Packet, Ipv4Repr, TcpPacket, TcpRepr, UdpPacket, UdpRepr,
};

/// What a block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Data,
    Ipv4Options,
    TcpOptions,
    Ethernet,
    Ipv4,
    Tcp,
    Udp,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockKind::Data => write!(f, "data"),
            BlockKind::Ipv4Options => write!(f, "ipv4-options"),
            BlockKind::TcpOptions => write!(f, "tcp-options"),
            BlockKind::Ethernet => write!(f, "ethernet"),
            BlockKind::Ipv4 => write!(f, "ipv4"),
            BlockKind::Tcp => write!(f, "tcp"),
            BlockKind::Udp => write!(f, "udp"),
        }
    }
}

/// The header a block emits in front of its payload.
///
/// Opaque data and option areas have no header of their own; their octets
/// are the block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Header {
    Data,
    Ipv4Options,
    TcpOptions,
    Ethernet(EthernetRepr),
    Ipv4(Ipv4Repr),
    Tcp(TcpRepr),
    Udp(UdpRepr),
}

impl Header {
    pub const fn kind(&self) -> BlockKind {
        match self {
            Header::Data => BlockKind::Data,
            Header::Ipv4Options => BlockKind::Ipv4Options,
            Header::TcpOptions => BlockKind::TcpOptions,
            Header::Ethernet(_) => BlockKind::Ethernet,
            Header::Ipv4(_) => BlockKind::Ipv4,
            Header::Tcp(_) => BlockKind::Tcp,
            Header::Udp(_) => BlockKind::Udp,
        }
    }

    /// Return the length of the header octets, payload excluded.
    pub const fn header_len(&self) -> usize {
        match self {
            Header::Data | Header::Ipv4Options | Header::TcpOptions => 0,
            Header::Ethernet(repr) => repr.buffer_len(),
            Header::Ipv4(repr) => repr.buffer_len(),
            Header::Tcp(repr) => repr.buffer_len(),
            Header::Udp(repr) => repr.header_len(),
        }
    }
}

/// One independently mutable entry of a block chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    tag: Tag,
    flags: Flags,
    header: Header,
    payload: Vec<u8>,
}

impl Block {
    pub(crate) fn new(tag: Tag, header: Header, payload: &[u8]) -> Block {
        Block {
            tag,
            flags: Flags::EMPTY,
            header,
            payload: payload.to_vec(),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn kind(&self) -> BlockKind {
        self.header.kind()
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    /// Return the number of octets this block occupies on the wire.
    ///
    /// Option areas are padded with zeroes to a multiple of four octets.
    pub fn buffer_len(&self) -> usize {
        match self.header {
            Header::Ipv4Options | Header::TcpOptions => (self.payload.len() + 3) & !3,
            _ => self.header.header_len() + self.payload.len(),
        }
    }

    /// Write the block into `buffer`, which must be exactly
    /// [buffer_len](#method.buffer_len) octets long.
    ///
    /// `options_len` is the padded length of the option block that follows
    /// an IPv4 or TCP header on the wire; other blocks ignore it.
    pub(crate) fn emit(&self, buffer: &mut [u8], options_len: usize) {
        let header_len = self.header.header_len();
        match &self.header {
            Header::Data => {}
            Header::Ipv4Options | Header::TcpOptions => {
                buffer.fill(0);
            }
            Header::Ethernet(repr) => repr.emit(&mut EthernetFrame::new_unchecked(&mut *buffer)),
            Header::Ipv4(repr) => repr.emit(&mut Ipv4Packet::new_unchecked(&mut *buffer), options_len),
            Header::Tcp(repr) => repr.emit(&mut TcpPacket::new_unchecked(&mut *buffer), options_len),
            Header::Udp(repr) => repr.emit(&mut UdpPacket::new_unchecked(&mut *buffer)),
        }
        buffer[header_len..header_len + self.payload.len()].copy_from_slice(&self.payload);
    }
}

impl BlockFlags for Block {
    fn flags(&self) -> Flags {
        self.flags
    }

    fn set_flags(&mut self, flags: Flags) {
        self.flags = flags
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.tag, self.kind())?;
        match &self.header {
            Header::Ethernet(repr) => write!(f, " ({repr})")?,
            Header::Ipv4(repr) => write!(f, " ({repr})")?,
            Header::Tcp(repr) => write!(f, " ({repr})")?,
            Header::Udp(repr) => write!(f, " ({repr})")?,
            _ => {}
        }
        write!(f, " payload={}", self.payload.len())?;
        if self.checksum_pending() {
            write!(f, " cksum-pending")?;
        }
        Ok(())
    }
}
