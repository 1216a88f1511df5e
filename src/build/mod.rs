/*! The packet builder boundary.

A decoded frame is rebuilt as a chain of blocks, one per header (plus option
areas and opaque payloads), each identified by a [Tag]. The decoder only
talks to the chain through the [Builder] trait; [Context] is the in-memory
implementation shipped with this crate.

Blocks are built innermost first. The chain serializes each block ahead of
every block built before it, so the last block built (the outermost header)
comes first on the wire.
*/

use core::fmt;
use core::num::NonZeroU32;
use core::ops::BitOr;

use crate::wire::{EthernetRepr, Ipv4Repr, TcpRepr, UdpRepr};

mod block;
mod context;

pub use self::block::{Block, BlockKind, Header};
pub use self::context::{BlockStorage, Context};

/// Handle of a block in a builder's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(NonZeroU32);

impl Tag {
    /// Create a tag from its numeric value; zero is not a valid tag.
    pub const fn new(value: u32) -> Option<Tag> {
        match NonZeroU32::new(value) {
            Some(value) => Some(Tag(value)),
            None => None,
        }
    }

    /// Return the numeric value of the tag.
    pub const fn get(&self) -> u32 {
        self.0.get()
    }

    pub(crate) fn from_index(index: usize) -> Tag {
        Tag(NonZeroU32::MIN.saturating_add(index as u32))
    }

    pub(crate) fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-block flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags(u8);

impl Flags {
    pub const EMPTY: Flags = Flags(0);
    /// The checksum of the block is stale and is recomputed on emit.
    pub const DO_CHECKSUM: Flags = Flags(0x01);

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Flags) {
        self.0 |= other.0
    }

    pub fn remove(&mut self, other: Flags) {
        self.0 &= !other.0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Flag access on a built block.
pub trait BlockFlags {
    fn flags(&self) -> Flags;

    fn set_flags(&mut self, flags: Flags);

    /// Mark the block's checksum for recomputation before serialization.
    fn mark_checksum_pending(&mut self) {
        let flags = self.flags() | Flags::DO_CHECKSUM;
        self.set_flags(flags)
    }

    fn checksum_pending(&self) -> bool {
        self.flags().contains(Flags::DO_CHECKSUM)
    }
}

/// A block could not be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The chain has no room for another block.
    Exhausted,
    /// The data handed to the builder cannot form a valid block.
    Malformed,
    /// No block carries the given tag.
    NotFound,
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Exhausted => write!(f, "build::Error: block chain exhausted"),
            Error::Malformed => write!(f, "build::Error: malformed block data"),
            Error::NotFound => write!(f, "build::Error: no block with that tag"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// A chain of packet blocks that decoded headers are rebuilt into.
///
/// Every `build_*` call appends one block and returns its tag, except
/// [build_tcp_options] given `None`, which builds nothing.
///
/// [build_tcp_options]: #tymethod.build_tcp_options
pub trait Builder {
    type Block: BlockFlags;

    /// Wrap an arbitrary byte range as one unparsed block.
    fn build_data(&mut self, payload: &[u8]) -> Result<Tag>;

    /// Capture an IPv4 options area verbatim.
    fn build_ipv4_options(&mut self, options: &[u8]) -> Result<Tag>;

    /// Capture a TCP options area. `None` means the header has no options.
    fn build_tcp_options(&mut self, options: Option<&[u8]>) -> Result<Option<Tag>>;

    fn build_ethernet(&mut self, repr: &EthernetRepr, payload: &[u8]) -> Result<Tag>;

    fn build_ipv4(&mut self, repr: &Ipv4Repr, payload: &[u8]) -> Result<Tag>;

    fn build_tcp(&mut self, repr: &TcpRepr, payload: &[u8]) -> Result<Tag>;

    fn build_udp(&mut self, repr: &UdpRepr, payload: &[u8]) -> Result<Tag>;

    fn find_block(&mut self, tag: Tag) -> Option<&mut Self::Block>;
}
