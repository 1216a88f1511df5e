/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides two
levels of functionality.

 * First, it provides functions to extract fields from sequences of octets,
   and to insert fields into sequences of octets. This happens `Packet` family of
   structures, e.g. [EthernetFrame] or [Ipv4Packet].
 * Second, in cases where the space of valid field values is much smaller than the space
   of possible field values, it provides a compact, high-level representation
   of packet data that can be parsed from and emitted into a sequence of octets.
   This happens through the `Repr` family of structs and enums, e.g. [TcpRepr].

The `Packet` family of data structures guarantees that, if the `Packet::check_len()` method
returned `Ok(())`, then no accessor or setter method will panic; the header length
fields are validated against the length of the underlying buffer, never trusted.
*/

use core::fmt;

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub mod ethernet;
pub mod ip;
pub mod ipv4;
pub mod tcp;
pub mod udp;

pub use self::ethernet::{
    Address as EthernetAddress, EtherType as EthernetProtocol, Frame as EthernetFrame,
    Repr as EthernetRepr, HEADER_LEN as ETHERNET_HEADER_LEN,
};

pub use self::ip::{checksum, Protocol as IpProtocol, Version as IpVersion};

pub use self::ipv4::{
    Address as Ipv4Address, Packet as Ipv4Packet, Repr as Ipv4Repr,
    HEADER_LEN as IPV4_HEADER_LEN, MAX_OPTIONS_LEN as IPV4_MAX_OPTIONS_LEN,
};

pub use self::tcp::{
    Packet as TcpPacket, Repr as TcpRepr, TcpOption, HEADER_LEN as TCP_HEADER_LEN,
};

pub use self::udp::{Packet as UdpPacket, Repr as UdpRepr, HEADER_LEN as UDP_HEADER_LEN};

/// Parsing a packet failed.
///
/// Either it is malformed, or it is not supported by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The buffer is shorter than the header it claims to hold.
    Truncated,
    /// A header field holds a value no valid header can have.
    Malformed,
}

impl std::error::Error for Error {}

/// The result type for the networking stack.
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "wire::Error: truncated header"),
            Error::Malformed => write!(f, "wire::Error: malformed header"),
        }
    }
}
