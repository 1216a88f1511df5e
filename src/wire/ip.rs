use core::fmt;

use super::{Error, Result};

enum_with_unknown! {
    /// Internet protocol version.
    pub enum Version(u8) {
        Ipv4 = 4,
        Ipv6 = 6
    }
}

impl Version {
    /// Return the version of an IP packet stored in the provided buffer.
    ///
    /// Only the high nibble of the first octet is looked at; an unknown
    /// version is returned as `Version::Unknown`, not as an error.
    pub fn of_packet(data: &[u8]) -> Result<Version> {
        match data.first() {
            Some(&byte) => Ok(Version::from(byte >> 4)),
            None => Err(Error::Truncated),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Version::Ipv4 => write!(f, "IPv4"),
            Version::Ipv6 => write!(f, "IPv6"),
            Version::Unknown(id) => write!(f, "IPv{id}"),
        }
    }
}

enum_with_unknown! {
    /// IP datagram encapsulated protocol.
    pub enum Protocol(u8) {
        HopByHop  = 0x00,
        Icmp      = 0x01,
        Igmp      = 0x02,
        Tcp       = 0x06,
        Udp       = 0x11,
        Gre       = 0x2f,
        IpSecEsp  = 0x32,
        IpSecAh   = 0x33
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Protocol::HopByHop => write!(f, "Hop-by-Hop"),
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Igmp => write!(f, "IGMP"),
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Gre => write!(f, "GRE"),
            Protocol::IpSecEsp => write!(f, "IPSec-ESP"),
            Protocol::IpSecAh => write!(f, "IPSec-AH"),
            Protocol::Unknown(id) => write!(f, "0x{id:02x}"),
        }
    }
}

pub mod checksum {
    use byteorder::{ByteOrder, NetworkEndian};

    use super::Protocol;
    use crate::wire::Ipv4Address;

    const fn propagate_carries(mut word: u64) -> u16 {
        while word >> 16 != 0 {
            word = (word >> 16) + (word & 0xffff);
        }
        word as u16
    }

    /// Compute an RFC 1071 compliant checksum (without the final complement).
    pub fn data(mut data: &[u8]) -> u16 {
        let mut accum: u64 = 0;

        while data.len() >= 2 {
            accum += NetworkEndian::read_u16(data) as u64;
            data = &data[2..];
        }

        if let Some(&value) = data.first() {
            accum += (value as u64) << 8;
        }

        propagate_carries(accum)
    }

    /// Combine several RFC 1071 compliant checksums.
    pub fn combine(checksums: &[u16]) -> u16 {
        let mut accum: u64 = 0;
        for &word in checksums {
            accum += word as u64;
        }
        propagate_carries(accum)
    }

    /// Compute an IPv4 pseudo header checksum.
    ///
    /// Both halves of `length` are summed, so a length past 16 bits is
    /// folded in rather than cut off.
    pub fn pseudo_header_v4(
        src_addr: &Ipv4Address,
        dst_addr: &Ipv4Address,
        next_header: Protocol,
        length: u32,
    ) -> u16 {
        combine(&[
            data(&src_addr.octets()),
            data(&dst_addr.octets()),
            u8::from(next_header) as u16,
            (length >> 16) as u16,
            length as u16,
        ])
    }
}
