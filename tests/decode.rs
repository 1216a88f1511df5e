use pbdecode_rs::build::{self, BlockFlags, BlockKind, BlockStorage, Builder, Context, Flags, Tag};
use pbdecode_rs::decode::{Decoder, Error};
use pbdecode_rs::wire::{
    self, EthernetAddress, EthernetFrame, EthernetProtocol, EthernetRepr, IpProtocol, Ipv4Address,
    Ipv4Packet, Ipv4Repr, TcpPacket, TcpRepr, UdpPacket, UdpRepr, ETHERNET_HEADER_LEN,
    IPV4_HEADER_LEN, TCP_HEADER_LEN, UDP_HEADER_LEN,
};
use rand::Rng;

const SRC_ADDR: Ipv4Address = Ipv4Address::new(192, 168, 69, 1);
const DST_ADDR: Ipv4Address = Ipv4Address::new(192, 168, 69, 2);

fn setup_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ethernet_frame(ethertype: EthernetProtocol, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0; ETHERNET_HEADER_LEN + payload.len()];
    let mut frame = EthernetFrame::new_unchecked(&mut bytes[..]);
    EthernetRepr {
        src_addr: EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
        dst_addr: EthernetAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]),
        ethertype,
    }
    .emit(&mut frame);
    frame.payload_mut().copy_from_slice(payload);
    bytes
}

fn ipv4_packet(protocol: IpProtocol, options: &[u8], payload: &[u8]) -> Vec<u8> {
    let header_len = IPV4_HEADER_LEN + options.len();
    let mut bytes = vec![0; header_len + payload.len()];
    Ipv4Repr {
        total_len: bytes.len() as u16,
        tos: 0x10,
        ident: 0x1234,
        frag_info: 0x4000,
        hop_limit: 64,
        next_header: protocol,
        checksum: 0,
        src_addr: SRC_ADDR,
        dst_addr: DST_ADDR,
    }
    .emit(&mut Ipv4Packet::new_unchecked(&mut bytes[..]), options.len());
    bytes[IPV4_HEADER_LEN..header_len].copy_from_slice(options);
    bytes[header_len..].copy_from_slice(payload);
    Ipv4Packet::new_unchecked(&mut bytes[..]).fill_checksum();
    bytes
}

fn tcp_segment(options: &[u8], payload: &[u8]) -> Vec<u8> {
    let header_len = TCP_HEADER_LEN + options.len();
    let mut bytes = vec![0; header_len + payload.len()];
    TcpRepr {
        src_port: 49500,
        dst_port: 80,
        seq_number: 0x01234567,
        ack_number: 0x89abcdef,
        flags: wire::tcp::flags::PSH | wire::tcp::flags::ACK,
        window_len: 0x0123,
        checksum: 0,
        urgent_at: 0,
        len: bytes.len(),
    }
    .emit(&mut TcpPacket::new_unchecked(&mut bytes[..]), options.len());
    bytes[TCP_HEADER_LEN..header_len].copy_from_slice(options);
    bytes[header_len..].copy_from_slice(payload);
    TcpPacket::new_unchecked(&mut bytes[..]).fill_checksum(&SRC_ADDR, &DST_ADDR);
    bytes
}

fn udp_datagram(payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0; UDP_HEADER_LEN + payload.len()];
    UdpRepr {
        src_port: 5353,
        dst_port: 53,
        length: bytes.len() as u16,
        checksum: 0,
    }
    .emit(&mut UdpPacket::new_unchecked(&mut bytes[..]));
    bytes[UDP_HEADER_LEN..].copy_from_slice(payload);
    UdpPacket::new_unchecked(&mut bytes[..]).fill_checksum(&SRC_ADDR, &DST_ADDR);
    bytes
}

fn tcp_frame(ip_options: &[u8], tcp_options: &[u8], payload: &[u8]) -> Vec<u8> {
    ethernet_frame(
        EthernetProtocol::Ipv4,
        &ipv4_packet(IpProtocol::Tcp, ip_options, &tcp_segment(tcp_options, payload)),
    )
}

fn udp_frame(ip_options: &[u8], payload: &[u8]) -> Vec<u8> {
    ethernet_frame(
        EthernetProtocol::Ipv4,
        &ipv4_packet(IpProtocol::Udp, ip_options, &udp_datagram(payload)),
    )
}

fn kinds(ctx: &Context) -> Vec<BlockKind> {
    ctx.iter().map(|block| block.kind()).collect()
}

/// A builder that records every call it receives.
#[derive(Default)]
struct Recorder {
    calls: Vec<Call>,
    flags: Vec<RecordedBlock>,
    fail_on: Option<BlockKind>,
}

#[derive(Debug, PartialEq, Eq)]
enum Call {
    Data(Vec<u8>),
    Ipv4Options(Vec<u8>),
    TcpOptions(Option<Vec<u8>>),
    Ethernet(usize),
    Ipv4(usize),
    Tcp(usize),
    Udp(usize),
}

#[derive(Default)]
struct RecordedBlock {
    flags: Flags,
}

impl BlockFlags for RecordedBlock {
    fn flags(&self) -> Flags {
        self.flags
    }

    fn set_flags(&mut self, flags: Flags) {
        self.flags = flags
    }
}

impl Recorder {
    fn failing_on(kind: BlockKind) -> Recorder {
        Recorder {
            fail_on: Some(kind),
            ..Default::default()
        }
    }

    fn record(&mut self, kind: BlockKind, call: Call) -> build::Result<Tag> {
        if self.fail_on == Some(kind) {
            return Err(build::Error::Exhausted);
        }
        self.calls.push(call);
        self.flags.push(RecordedBlock::default());
        Ok(Tag::new(self.flags.len() as u32).unwrap())
    }
}

impl Builder for Recorder {
    type Block = RecordedBlock;

    fn build_data(&mut self, payload: &[u8]) -> build::Result<Tag> {
        self.record(BlockKind::Data, Call::Data(payload.to_vec()))
    }

    fn build_ipv4_options(&mut self, options: &[u8]) -> build::Result<Tag> {
        self.record(BlockKind::Ipv4Options, Call::Ipv4Options(options.to_vec()))
    }

    fn build_tcp_options(&mut self, options: Option<&[u8]>) -> build::Result<Option<Tag>> {
        self.record(
            BlockKind::TcpOptions,
            Call::TcpOptions(options.map(|options| options.to_vec())),
        )
        .map(Some)
    }

    fn build_ethernet(&mut self, _repr: &EthernetRepr, payload: &[u8]) -> build::Result<Tag> {
        self.record(BlockKind::Ethernet, Call::Ethernet(payload.len()))
    }

    fn build_ipv4(&mut self, _repr: &Ipv4Repr, payload: &[u8]) -> build::Result<Tag> {
        self.record(BlockKind::Ipv4, Call::Ipv4(payload.len()))
    }

    fn build_tcp(&mut self, _repr: &TcpRepr, payload: &[u8]) -> build::Result<Tag> {
        self.record(BlockKind::Tcp, Call::Tcp(payload.len()))
    }

    fn build_udp(&mut self, _repr: &UdpRepr, payload: &[u8]) -> build::Result<Tag> {
        self.record(BlockKind::Udp, Call::Udp(payload.len()))
    }

    fn find_block(&mut self, tag: Tag) -> Option<&mut RecordedBlock> {
        self.flags.get_mut(tag.get() as usize - 1)
    }
}

#[test]
fn test_tcp_round_trip() {
    setup_logging();
    let frame = tcp_frame(&[], &[], b"abcd");
    assert_eq!(frame.len(), 58);

    let decoder = Decoder::default();
    let mut ctx = Context::default();
    let tag = decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(ctx.block(tag).unwrap().kind(), BlockKind::Ethernet);
    assert_eq!(ctx.emit(), frame);
}

#[test]
fn test_stale_checksums_recomputed() {
    setup_logging();
    let frame = tcp_frame(&[], &[], b"abcd");
    let mut stale = frame.clone();
    stale[24..26].copy_from_slice(&[0xde, 0xad]);
    stale[50..52].copy_from_slice(&[0xbe, 0xef]);

    let decoder = Decoder::default();
    let mut ctx = Context::default();
    decoder.decode_ethernet(&stale, &mut ctx).unwrap();
    let emitted = ctx.emit();
    assert_eq!(emitted, frame);

    let eth = EthernetFrame::new_checked(&emitted[..]).unwrap();
    let ip = Ipv4Packet::new_checked(eth.payload()).unwrap();
    assert!(ip.verify_checksum());
    let tcp = TcpPacket::new_checked(ip.payload()).unwrap();
    assert!(tcp.verify_checksum(&ip.src_addr(), &ip.dst_addr()));
}

#[test]
fn test_depth_bound() {
    let decoder = Decoder::default();

    let mut ctx = Context::default();
    decoder
        .decode_ethernet(&tcp_frame(&[], &[], b"abcd"), &mut ctx)
        .unwrap();
    assert_eq!(
        kinds(&ctx),
        [
            BlockKind::Data,
            BlockKind::Tcp,
            BlockKind::Ipv4,
            BlockKind::Ethernet
        ]
    );

    let mut ctx = Context::default();
    decoder
        .decode_ethernet(&tcp_frame(&[], &[], &[]), &mut ctx)
        .unwrap();
    assert_eq!(
        kinds(&ctx),
        [BlockKind::Tcp, BlockKind::Ipv4, BlockKind::Ethernet]
    );
}

#[test]
fn test_ipv4_options_preserved() {
    setup_logging();
    let options = [0x94, 0x04, 0x00, 0x00];
    let frame = udp_frame(&options, b"hello");
    assert_eq!(frame[ETHERNET_HEADER_LEN], 0x46);

    let decoder = Decoder::default();
    let mut ctx = Context::default();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(
        kinds(&ctx),
        [
            BlockKind::Udp,
            BlockKind::Ipv4Options,
            BlockKind::Ipv4,
            BlockKind::Ethernet
        ]
    );
    let options_block = ctx.iter().nth(1).unwrap();
    assert_eq!(options_block.payload(), &options[..]);
    assert!(ctx.iter().nth(2).unwrap().payload().is_empty());
    assert_eq!(ctx.emit(), frame);
}

#[test]
fn test_tcp_options_preserved() {
    let options = [0x02, 0x04, 0x05, 0xb4, 0x01, 0x03, 0x03, 0x07];
    let frame = tcp_frame(&[], &options, b"payload");

    let decoder = Decoder::default();
    let mut ctx = Context::default();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(
        kinds(&ctx),
        [
            BlockKind::Data,
            BlockKind::TcpOptions,
            BlockKind::Tcp,
            BlockKind::Ipv4,
            BlockKind::Ethernet
        ]
    );
    assert_eq!(ctx.iter().nth(1).unwrap().payload(), &options[..]);
    assert_eq!(ctx.emit(), frame);
}

#[test]
fn test_zero_tcp_options_passed_as_none() {
    let decoder = Decoder::default();
    let mut recorder = Recorder::default();
    decoder
        .decode_tcp(&tcp_segment(&[], b"xy"), &mut recorder)
        .unwrap();
    assert_eq!(
        recorder.calls,
        [
            Call::Data(b"xy".to_vec()),
            Call::TcpOptions(None),
            Call::Tcp(0)
        ]
    );

    let mut recorder = Recorder::default();
    decoder
        .decode_tcp(&tcp_segment(&[0x01, 0x01, 0x01, 0x00], &[]), &mut recorder)
        .unwrap();
    assert_eq!(
        recorder.calls,
        [
            Call::TcpOptions(Some(vec![0x01, 0x01, 0x01, 0x00])),
            Call::Tcp(0)
        ]
    );
}

#[test]
fn test_unsupported_protocol_fallback() {
    let gre = [0x00, 0x00, 0x08, 0x00, 0xaa, 0xbb];
    let frame = ethernet_frame(
        EthernetProtocol::Ipv4,
        &ipv4_packet(IpProtocol::Gre, &[], &gre),
    );

    let decoder = Decoder::default();
    let mut recorder = Recorder::default();
    decoder.decode_ethernet(&frame, &mut recorder).unwrap();
    assert_eq!(
        recorder.calls,
        [Call::Data(gre.to_vec()), Call::Ipv4(0), Call::Ethernet(0)]
    );

    let mut ctx = Context::default();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(ctx.emit(), frame);
}

#[test]
fn test_unsupported_protocol_empty_payload() {
    let packet = ipv4_packet(IpProtocol::Icmp, &[], &[]);
    let decoder = Decoder::default();
    let mut recorder = Recorder::default();
    decoder.decode_ipv4(&packet, &mut recorder).unwrap();
    assert_eq!(recorder.calls, [Call::Data(vec![]), Call::Ipv4(0)]);
}

#[test]
fn test_transport_failure_propagates() {
    setup_logging();
    let decoder = Decoder::default();

    let mut recorder = Recorder::failing_on(BlockKind::Tcp);
    let packet = ipv4_packet(IpProtocol::Tcp, &[], &tcp_segment(&[], b"abcd"));
    assert_eq!(
        decoder.decode_ipv4(&packet, &mut recorder),
        Err(Error::Build(build::Error::Exhausted))
    );
    assert_eq!(
        recorder.calls,
        [Call::Data(b"abcd".to_vec()), Call::TcpOptions(None)]
    );

    let mut recorder = Recorder::failing_on(BlockKind::Udp);
    assert_eq!(
        decoder.decode_ethernet(&udp_frame(&[0x01, 0x01, 0x01, 0x01], b"x"), &mut recorder),
        Err(Error::Build(build::Error::Exhausted))
    );
    assert!(recorder.calls.is_empty());
}

#[test]
fn test_options_failure_propagates() {
    let decoder = Decoder::default();
    let mut recorder = Recorder::failing_on(BlockKind::Ipv4Options);
    let packet = ipv4_packet(IpProtocol::Udp, &[0x01, 0x01, 0x01, 0x01], &udp_datagram(b"x"));
    assert_eq!(
        decoder.decode_ipv4(&packet, &mut recorder),
        Err(Error::Build(build::Error::Exhausted))
    );
    assert_eq!(recorder.calls, [Call::Udp(1)]);
}

#[test]
fn test_storage_exhausted() {
    let decoder = Decoder::default();
    let frame = tcp_frame(&[], &[], b"abcd");

    let mut storage: [BlockStorage; 0] = [];
    let mut ctx = Context::new(&mut storage[..]);
    assert_eq!(
        decoder.decode_ethernet(&frame, &mut ctx),
        Err(Error::Build(build::Error::Exhausted))
    );
    assert!(ctx.is_empty());

    let mut storage = [BlockStorage::EMPTY, BlockStorage::EMPTY];
    let mut ctx = Context::new(&mut storage[..]);
    assert_eq!(
        decoder.decode_ethernet(&frame, &mut ctx),
        Err(Error::Build(build::Error::Exhausted))
    );
    assert_eq!(kinds(&ctx), [BlockKind::Data, BlockKind::Tcp]);
}

#[test]
fn test_checksum_deferral() {
    let decoder = Decoder::default();
    let mut ctx = Context::default();
    decoder
        .decode_ethernet(&udp_frame(&[], b"abc"), &mut ctx)
        .unwrap();
    for block in ctx.iter() {
        let expected = !matches!(block.kind(), BlockKind::Ethernet);
        assert_eq!(block.checksum_pending(), expected, "{block}");
    }

    let mut recorder = Recorder::default();
    decoder
        .decode_ethernet(&tcp_frame(&[], &[], b"abcd"), &mut recorder)
        .unwrap();
    let pending: Vec<bool> = recorder
        .flags
        .iter()
        .map(|block| block.checksum_pending())
        .collect();
    // data, tcp options, tcp, ipv4, ethernet
    assert_eq!(pending, [false, false, true, true, false]);
}

#[test]
fn test_truncated_headers() {
    setup_logging();
    let decoder = Decoder::default();
    let frame = tcp_frame(&[], &[], b"abcd");

    for len in [0, 13, 14, 33, 53] {
        let mut ctx = Context::default();
        assert_eq!(
            decoder.decode_ethernet(&frame[..len], &mut ctx),
            Err(Error::Wire(wire::Error::Truncated)),
            "length {len}"
        );
        assert!(ctx.is_empty());
    }

    let mut ctx = Context::default();
    assert_eq!(
        decoder.decode_udp(&udp_datagram(b"")[..7], &mut ctx),
        Err(Error::Wire(wire::Error::Truncated))
    );
}

#[test]
fn test_header_length_overruns_buffer() {
    let decoder = Decoder::default();

    let mut packet = ipv4_packet(IpProtocol::Udp, &[], &udp_datagram(b""));
    // IHL of 15 claims 60 octets of header in a 28 octet packet.
    packet[0] = 0x4f;
    let mut ctx = Context::default();
    assert_eq!(
        decoder.decode_ipv4(&packet, &mut ctx),
        Err(Error::Wire(wire::Error::Truncated))
    );

    let mut segment = tcp_segment(&[], b"");
    segment[12] = 0xf0;
    assert_eq!(
        decoder.decode_tcp(&segment, &mut ctx),
        Err(Error::Wire(wire::Error::Truncated))
    );
    assert!(ctx.is_empty());
}

#[test]
fn test_malformed_header_length() {
    let decoder = Decoder::default();
    let mut ctx = Context::default();

    let mut packet = ipv4_packet(IpProtocol::Udp, &[], &udp_datagram(b""));
    packet[0] = 0x44;
    assert_eq!(
        decoder.decode_ipv4(&packet, &mut ctx),
        Err(Error::Wire(wire::Error::Malformed))
    );

    let mut segment = tcp_segment(&[], b"abcd");
    segment[12] = 0x40;
    assert_eq!(
        decoder.decode_tcp(&segment, &mut ctx),
        Err(Error::Wire(wire::Error::Malformed))
    );
    assert!(ctx.is_empty());
}

#[test]
fn test_unknown_ethertype_payload_attached() {
    let arp = [0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01];
    let frame = ethernet_frame(EthernetProtocol::Arp, &arp);

    let decoder = Decoder::default();
    let mut ctx = Context::default();
    let tag = decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(ctx.len(), 1);
    let block = ctx.block(tag).unwrap();
    assert_eq!(block.kind(), BlockKind::Ethernet);
    assert_eq!(block.payload(), &arp[..]);
    assert!(!block.checksum_pending());
    assert_eq!(ctx.emit(), frame);
}

#[test]
fn test_non_ipv4_version_is_data() {
    let mut packet = ipv4_packet(IpProtocol::Udp, &[], &udp_datagram(b"abc"));
    packet[0] = 0x60;

    let mut decoder = Decoder::default();
    decoder
        .register_ethertype(EthernetProtocol::Ipv6, Decoder::dissect_ip)
        .unwrap();
    let frame = ethernet_frame(EthernetProtocol::Ipv6, &packet);
    let mut ctx = Context::default();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(kinds(&ctx), [BlockKind::Data, BlockKind::Ethernet]);
    assert_eq!(ctx.iter().next().unwrap().payload(), &packet[..]);
    assert_eq!(ctx.emit(), frame);
}

#[test]
fn test_registry_extension() {
    let udplite = IpProtocol::Unknown(136);
    let frame = ethernet_frame(
        EthernetProtocol::Ipv4,
        &ipv4_packet(udplite, &[], &udp_datagram(b"lite")),
    );

    let mut decoder = Decoder::default();
    let mut ctx = Context::default();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(
        kinds(&ctx),
        [BlockKind::Data, BlockKind::Ipv4, BlockKind::Ethernet]
    );

    decoder
        .register_protocol(udplite, Decoder::dissect_udp)
        .unwrap();
    ctx.clear();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(
        kinds(&ctx),
        [BlockKind::Udp, BlockKind::Ipv4, BlockKind::Ethernet]
    );
    assert_eq!(ctx.iter().next().unwrap().payload(), b"lite");
}

#[test]
fn test_registry_removal() {
    let frame = udp_frame(&[], b"abc");
    let mut decoder = Decoder::default();

    assert!(decoder.remove_protocol(IpProtocol::Udp).is_some());
    let mut ctx = Context::default();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(
        kinds(&ctx),
        [BlockKind::Data, BlockKind::Ipv4, BlockKind::Ethernet]
    );

    assert!(decoder.remove_ethertype(EthernetProtocol::Ipv4).is_some());
    assert!(decoder.remove_ethertype(EthernetProtocol::Ipv4).is_none());
    let mut ctx = Context::default();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(kinds(&ctx), [BlockKind::Ethernet]);
    assert_eq!(ctx.emit(), frame);
}

#[test]
fn test_too_many_layers() {
    setup_logging();
    let nested = EthernetProtocol::Unknown(0x88b5);
    let mut decoder = Decoder::default();
    decoder
        .register_ethertype(nested, Decoder::dissect_ethernet)
        .unwrap();

    let mut frame = ethernet_frame(EthernetProtocol::Arp, &[]);
    for _ in 0..7 {
        frame = ethernet_frame(nested, &frame);
    }
    let mut ctx = Context::default();
    decoder.decode_ethernet(&frame, &mut ctx).unwrap();
    assert_eq!(ctx.len(), 8);
    assert_eq!(ctx.emit(), frame);

    let frame = ethernet_frame(nested, &frame);
    let mut ctx = Context::default();
    assert_eq!(
        decoder.decode_ethernet(&frame, &mut ctx),
        Err(Error::TooDeep)
    );
    assert!(ctx.is_empty());
}

#[test]
fn test_mutated_payload_checksummed() {
    let decoder = Decoder::default();
    let mut ctx = Context::default();
    decoder
        .decode_ethernet(&udp_frame(&[], b"abcd"), &mut ctx)
        .unwrap();

    let udp = ctx.iter_mut().next().unwrap();
    assert_eq!(udp.kind(), BlockKind::Udp);
    udp.payload_mut().copy_from_slice(b"wxyz");

    let emitted = ctx.emit();
    assert_eq!(emitted, udp_frame(&[], b"wxyz"));
    let eth = EthernetFrame::new_checked(&emitted[..]).unwrap();
    let ip = Ipv4Packet::new_checked(eth.payload()).unwrap();
    let udp = UdpPacket::new_checked(ip.payload()).unwrap();
    assert!(udp.verify_checksum(&ip.src_addr(), &ip.dst_addr()));
}

#[test]
fn test_random_udp_round_trip() {
    let mut rng = rand::thread_rng();
    let decoder = Decoder::default();
    let mut ctx = Context::default();

    for _ in 0..32 {
        let len = rng.gen_range(0..=1400);
        let payload: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let frame = udp_frame(&[], &payload);

        ctx.clear();
        decoder.decode_ethernet(&frame, &mut ctx).unwrap();
        assert_eq!(ctx.iter().next().unwrap().payload(), &payload[..]);
        assert_eq!(ctx.buffer_len(), frame.len());
        assert_eq!(ctx.emit(), frame);
    }
}

#[test]
fn test_padded_frame_tcp_checksum() {
    setup_logging();
    let frame = tcp_frame(&[], &[], &[]);
    let mut padded = frame.clone();
    padded.resize(60, 0);
    let mut stale = padded.clone();
    stale[50..52].copy_from_slice(&[0x00, 0x00]);

    let decoder = Decoder::default();
    let mut ctx = Context::default();
    decoder.decode_ethernet(&stale, &mut ctx).unwrap();
    assert_eq!(
        kinds(&ctx),
        [
            BlockKind::Data,
            BlockKind::Tcp,
            BlockKind::Ipv4,
            BlockKind::Ethernet
        ]
    );

    let emitted = ctx.emit();
    assert_eq!(emitted, padded);
    let eth = EthernetFrame::new_checked(&emitted[..]).unwrap();
    let ip = Ipv4Packet::new_checked(eth.payload()).unwrap();
    assert_eq!(ip.total_len(), 40);
    let tcp = TcpPacket::new_checked(&ip.payload()[..20]).unwrap();
    assert!(tcp.verify_checksum(&ip.src_addr(), &ip.dst_addr()));
}

#[test]
fn test_oversized_buffer_emits() {
    let packet = ipv4_packet(IpProtocol::Tcp, &[], &tcp_segment(&[], &[]));
    let mut bytes = packet.clone();
    bytes.resize(packet.len() + 200_000, 0xff);

    let decoder = Decoder::default();
    let mut ctx = Context::default();
    decoder.decode_ipv4(&bytes, &mut ctx).unwrap();
    assert_eq!(ctx.len(), 3);

    let emitted = ctx.emit();
    assert_eq!(emitted, bytes);
    let ip = Ipv4Packet::new_checked(&emitted[..]).unwrap();
    assert!(ip.verify_checksum());
    let tcp = TcpPacket::new_checked(&ip.payload()[..20]).unwrap();
    assert!(tcp.verify_checksum(&ip.src_addr(), &ip.dst_addr()));
}
