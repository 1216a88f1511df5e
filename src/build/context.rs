use managed::ManagedSlice;

use super::{Block, BlockFlags, Builder, Error, Header, Result, Tag};
use crate::wire::{
    EthernetRepr, Ipv4Address, Ipv4Packet, Ipv4Repr, TcpOption, TcpPacket, TcpRepr, UdpPacket,
    UdpRepr, IPV4_MAX_OPTIONS_LEN, TCP_HEADER_LEN, UDP_HEADER_LEN,
};

/// Largest options area a TCP data offset of 15 can describe.
const TCP_MAX_OPTIONS_LEN: usize = 40;

/// An item of a block chain.
///
/// This type is public so that storage for a fixed-capacity [Context] can
/// be declared; its contents are private.
#[derive(Debug, Default)]
pub struct BlockStorage {
    inner: Option<Block>,
}

impl BlockStorage {
    pub const EMPTY: Self = Self { inner: None };
}

/// An in-memory block chain for one packet construction session.
///
/// Blocks are stored in build order and emitted in reverse: the block built
/// last is the first on the wire.
#[derive(Debug)]
pub struct Context<'a> {
    blocks: ManagedSlice<'a, BlockStorage>,
    len: usize,
}

impl<'a> Context<'a> {
    /// Create a block chain using the provided storage.
    ///
    /// Borrowed storage bounds the number of blocks; owned storage grows.
    pub fn new<BlocksT>(blocks: BlocksT) -> Context<'a>
    where
        BlocksT: Into<ManagedSlice<'a, BlockStorage>>,
    {
        let mut blocks = blocks.into();
        for slot in blocks.iter_mut() {
            slot.inner = None;
        }
        Context { blocks, len: 0 }
    }

    fn push(&mut self, header: Header, payload: &[u8]) -> Result<Tag> {
        let index = self.len;
        let tag = Tag::from_index(index);
        if index == self.blocks.len() {
            match &mut self.blocks {
                ManagedSlice::Borrowed(_) => {
                    net_debug!("block chain full at {} blocks", index);
                    return Err(Error::Exhausted);
                }
                ManagedSlice::Owned(blocks) => blocks.push(BlockStorage::EMPTY),
            }
        }

        let block = Block::new(tag, header, payload);
        net_trace!("built {}", block);
        self.blocks[index].inner = Some(block);
        self.len += 1;
        Ok(tag)
    }

    /// Get a block by its tag.
    pub fn block(&self, tag: Tag) -> Option<&Block> {
        self.blocks.get(tag.index())?.inner.as_ref()
    }

    /// Iterate every block in build order, innermost first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Block> {
        self.blocks[..self.len]
            .iter()
            .filter_map(|slot| slot.inner.as_ref())
    }

    /// Iterate every block mutably, in build order.
    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Block> {
        self.blocks[..self.len]
            .iter_mut()
            .filter_map(|slot| slot.inner.as_mut())
    }

    /// Return the number of blocks in the chain.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every block, ending the session. Borrowed storage is kept for reuse.
    pub fn clear(&mut self) {
        for slot in self.blocks.iter_mut() {
            slot.inner = None;
        }
        if let ManagedSlice::Owned(blocks) = &mut self.blocks {
            blocks.clear();
        }
        self.len = 0;
    }

    /// Return the length of the packet [emit](#method.emit) produces.
    pub fn buffer_len(&self) -> usize {
        self.iter().map(Block::buffer_len).sum()
    }

    /// Serialize the chain in wire order.
    ///
    /// IPv4 header lengths and TCP data offsets are derived from the option
    /// block that follows the header, if any. Checksums of blocks marked
    /// pending are recomputed; TCP and UDP checksums need an IPv4 block
    /// ahead of them for the pseudo header and are left alone otherwise.
    /// A TCP checksum covers the segment up to the end of the enclosing
    /// datagram as its total length gives it, so link layer padding is left
    /// out; the `len` hint is used only when the total length cannot hold
    /// the TCP header.
    pub fn emit(&self) -> Vec<u8> {
        let wire: Vec<&Block> = self.iter().rev().collect();
        let mut buffer = vec![0u8; self.buffer_len()];
        let mut offsets = Vec::with_capacity(wire.len());

        let mut offset = 0;
        for (index, block) in wire.iter().enumerate() {
            let options_len = match (block.header(), wire.get(index + 1).map(|b| b.header())) {
                (Header::Ipv4(_), Some(Header::Ipv4Options))
                | (Header::Tcp(_), Some(Header::TcpOptions)) => wire[index + 1].buffer_len(),
                _ => 0,
            };
            let end = offset + block.buffer_len();
            block.emit(&mut buffer[offset..end], options_len);
            offsets.push(offset);
            offset = end;
        }

        for (index, block) in wire.iter().enumerate() {
            if !block.checksum_pending() {
                continue;
            }
            let offset = offsets[index];
            match block.header() {
                Header::Ipv4(_) => {
                    Ipv4Packet::new_unchecked(&mut buffer[offset..]).fill_checksum();
                }
                Header::Tcp(repr) => {
                    let Some(ip_index) = enclosing_ipv4(&wire[..index]) else {
                        net_debug!("{}: no IPv4 header for the pseudo header", block.tag());
                        continue;
                    };
                    let (src_addr, dst_addr, datagram_end) =
                        ipv4_datagram(&buffer, offsets[ip_index]);
                    let end = if datagram_end >= offset + TCP_HEADER_LEN {
                        datagram_end
                    } else {
                        segment_end(offset, repr.len, TCP_HEADER_LEN, buffer.len())
                    };
                    TcpPacket::new_unchecked(&mut buffer[offset..end])
                        .fill_checksum(&src_addr, &dst_addr);
                }
                Header::Udp(repr) => {
                    let Some(ip_index) = enclosing_ipv4(&wire[..index]) else {
                        net_debug!("{}: no IPv4 header for the pseudo header", block.tag());
                        continue;
                    };
                    let (src_addr, dst_addr, _) = ipv4_datagram(&buffer, offsets[ip_index]);
                    let end = segment_end(offset, repr.length as usize, UDP_HEADER_LEN, buffer.len());
                    UdpPacket::new_unchecked(&mut buffer[offset..end])
                        .fill_checksum(&src_addr, &dst_addr);
                }
                _ => {}
            }
        }

        buffer
    }
}

impl Default for Context<'static> {
    fn default() -> Self {
        Context::new(Vec::new())
    }
}

/// Find the innermost IPv4 block ahead of a transport block on the wire.
fn enclosing_ipv4(outer: &[&Block]) -> Option<usize> {
    outer
        .iter()
        .rposition(|block| matches!(block.header(), Header::Ipv4(_)))
}

/// Read the addresses of an emitted IPv4 header and where its datagram
/// ends according to the total length field, clamped to the buffer.
fn ipv4_datagram(buffer: &[u8], offset: usize) -> (Ipv4Address, Ipv4Address, usize) {
    let packet = Ipv4Packet::new_unchecked(&buffer[offset..]);
    let end = buffer.len().min(offset + packet.total_len() as usize);
    (packet.src_addr(), packet.dst_addr(), end)
}

/// Where the segment a checksum covers ends: `len` octets past `offset`,
/// clamped to the buffer, or the end of the buffer when `len` cannot even
/// hold the header.
fn segment_end(offset: usize, len: usize, header_len: usize, buffer_len: usize) -> usize {
    if len < header_len {
        buffer_len
    } else {
        buffer_len.min(offset + len)
    }
}

impl<'a> Builder for Context<'a> {
    type Block = Block;

    fn build_data(&mut self, payload: &[u8]) -> Result<Tag> {
        self.push(Header::Data, payload)
    }

    fn build_ipv4_options(&mut self, options: &[u8]) -> Result<Tag> {
        if options.is_empty() || options.len() > IPV4_MAX_OPTIONS_LEN {
            net_debug!("ipv4 options: bad length {}", options.len());
            return Err(Error::Malformed);
        }
        self.push(Header::Ipv4Options, options)
    }

    fn build_tcp_options(&mut self, options: Option<&[u8]>) -> Result<Option<Tag>> {
        let Some(options) = options else {
            return Ok(None);
        };
        if options.is_empty() || options.len() > TCP_MAX_OPTIONS_LEN {
            net_debug!("tcp options: bad length {}", options.len());
            return Err(Error::Malformed);
        }
        if let Err(err) = TcpOption::validate(options) {
            net_debug!("tcp options: {}", err);
            return Err(Error::Malformed);
        }
        self.push(Header::TcpOptions, options).map(Some)
    }

    fn build_ethernet(&mut self, repr: &EthernetRepr, payload: &[u8]) -> Result<Tag> {
        self.push(Header::Ethernet(*repr), payload)
    }

    fn build_ipv4(&mut self, repr: &Ipv4Repr, payload: &[u8]) -> Result<Tag> {
        self.push(Header::Ipv4(*repr), payload)
    }

    fn build_tcp(&mut self, repr: &TcpRepr, payload: &[u8]) -> Result<Tag> {
        self.push(Header::Tcp(*repr), payload)
    }

    fn build_udp(&mut self, repr: &UdpRepr, payload: &[u8]) -> Result<Tag> {
        self.push(Header::Udp(*repr), payload)
    }

    fn find_block(&mut self, tag: Tag) -> Option<&mut Block> {
        self.blocks.get_mut(tag.index())?.inner.as_mut()
    }
}
