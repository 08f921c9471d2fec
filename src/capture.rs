//! Pull UDP datagrams out of pcap / pcapng captures.
//!
//! Supports Ethernet (with 802.1Q / 802.1ad tags), raw IP and Linux cooked (SLL) link types,
//! IPv4 only. The IPv4 and UDP length fields bound the payload so Ethernet padding in short
//! frames is never handed to the codec.

use pcap_parser::pcapng::Block as PcapNgBlock;
use pcap_parser::traits::{PcapNGPacketBlock, PcapReaderIterator};
use pcap_parser::{Linktype, PcapBlockOwned, PcapError};
use std::io::{BufRead, Read};

const READER_CAPACITY: usize = 1 << 20;
const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("pcap: {0}")]
    Pcap(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpDatagram<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: &'a [u8],
}

/// Counters for one pass over a capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub packets: u64,
    pub udp_payloads: u64,
}

/// Read a capture and call `f(packet_index, datagram)` for every UDP datagram whose source or
/// destination port is `port` (every datagram if `port` is `None`). Packet indices start at 1.
///
/// The file magic is peeked from the buffer, so the pcap reader still sees the whole file header.
pub fn for_each_udp_payload<R, F>(
    mut reader: R,
    port: Option<u16>,
    mut f: F,
) -> Result<CaptureStats, CaptureError>
where
    R: BufRead,
    F: FnMut(u64, &UdpDatagram<'_>),
{
    let is_pcapng = {
        let head = reader.fill_buf()?;
        if head.len() < PCAPNG_MAGIC.len() {
            return Err(CaptureError::Io(std::io::Error::from(
                std::io::ErrorKind::UnexpectedEof,
            )));
        }
        head[..PCAPNG_MAGIC.len()] == PCAPNG_MAGIC
    };
    let mut stats = CaptureStats::default();
    let mut emit = |linktype: Linktype, frame: &[u8], stats: &mut CaptureStats| {
        stats.packets += 1;
        if let Some(dgram) = udp_from_linktype(linktype, frame) {
            if port.map_or(true, |p| dgram.src_port == p || dgram.dst_port == p) {
                stats.udp_payloads += 1;
                f(stats.packets, &dgram);
            }
        }
    };
    if is_pcapng {
        run_pcapng(reader, &mut stats, &mut emit)?;
    } else {
        run_legacy_pcap(reader, &mut stats, &mut emit)?;
    }
    Ok(stats)
}

fn run_legacy_pcap<R, E>(
    input: R,
    stats: &mut CaptureStats,
    emit: &mut E,
) -> Result<(), CaptureError>
where
    R: Read,
    E: FnMut(Linktype, &[u8], &mut CaptureStats),
{
    let mut reader = pcap_parser::pcap::LegacyPcapReader::new(READER_CAPACITY, input)
        .map_err(|e| CaptureError::Pcap(format!("{:?}", e)))?;
    let mut linktype: Option<Linktype> = None;
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                match block {
                    PcapBlockOwned::LegacyHeader(h) => linktype = Some(h.network),
                    PcapBlockOwned::Legacy(b) => {
                        emit(linktype.unwrap_or(Linktype(1)), b.data, stats)
                    }
                    PcapBlockOwned::NG(_) => {}
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| CaptureError::Pcap(format!("refill error: {:?}", e)))?;
            }
            Err(e) => return Err(CaptureError::Pcap(format!("read error: {:?}", e))),
        }
    }
    Ok(())
}

fn run_pcapng<R, E>(
    input: R,
    stats: &mut CaptureStats,
    emit: &mut E,
) -> Result<(), CaptureError>
where
    R: Read,
    E: FnMut(Linktype, &[u8], &mut CaptureStats),
{
    let mut reader = pcap_parser::pcapng::PcapNGReader::new(READER_CAPACITY, input)
        .map_err(|e| CaptureError::Pcap(format!("{:?}", e)))?;
    let mut if_linktypes: Vec<Linktype> = Vec::new();
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                if let PcapBlockOwned::NG(b) = block {
                    match &b {
                        PcapNgBlock::InterfaceDescription(idb) => if_linktypes.push(idb.linktype),
                        PcapNgBlock::EnhancedPacket(epb) => {
                            let lt = if_linktypes
                                .get(epb.if_id as usize)
                                .copied()
                                .unwrap_or(Linktype(1));
                            emit(lt, epb.packet_data(), stats);
                        }
                        PcapNgBlock::SimplePacket(spb) => {
                            let lt = if_linktypes.first().copied().unwrap_or(Linktype(1));
                            emit(lt, spb.packet_data(), stats);
                        }
                        _ => {}
                    }
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| CaptureError::Pcap(format!("refill error: {:?}", e)))?;
            }
            Err(e) => return Err(CaptureError::Pcap(format!("read error: {:?}", e))),
        }
    }
    Ok(())
}

/// UDP datagram of a captured frame, if it is IPv4/UDP on a supported link type.
pub fn udp_from_linktype(linktype: Linktype, frame: &[u8]) -> Option<UdpDatagram<'_>> {
    let l3 = match linktype.0 {
        1 => ethernet_l3(frame)?,    // DLT_EN10MB
        101 => frame,                // DLT_RAW
        113 => linux_sll_l3(frame)?, // DLT_LINUX_SLL
        _ => return None,
    };
    ipv4_udp(l3)
}

fn ethernet_l3(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 14 {
        return None;
    }
    let mut off = 12usize;
    let mut ethertype = u16::from_be_bytes([frame[off], frame[off + 1]]);
    off += 2;
    while ethertype == 0x8100 || ethertype == 0x88a8 {
        if frame.len() < off + 4 + 2 {
            return None;
        }
        off += 4;
        ethertype = u16::from_be_bytes([frame[off - 2], frame[off - 1]]);
    }
    match ethertype {
        0x0800 => Some(&frame[off..]),
        _ => None,
    }
}

fn linux_sll_l3(frame: &[u8]) -> Option<&[u8]> {
    // 16-byte SLL header, protocol at bytes 14..16
    if frame.len() < 16 {
        return None;
    }
    match u16::from_be_bytes([frame[14], frame[15]]) {
        0x0800 => Some(&frame[16..]),
        _ => None,
    }
}

fn ipv4_udp(l3: &[u8]) -> Option<UdpDatagram<'_>> {
    if l3.len() < 20 || l3[0] >> 4 != 4 {
        return None;
    }
    let ihl = (l3[0] & 0x0f) as usize * 4;
    if ihl < 20 || l3.len() < ihl {
        return None;
    }
    let total_len = u16::from_be_bytes([l3[2], l3[3]]) as usize;
    if total_len < ihl {
        return None;
    }
    let l3 = if total_len <= l3.len() { &l3[..total_len] } else { l3 };
    if l3.len() < ihl + 8 || l3[9] != 17 {
        return None;
    }
    let udp = &l3[ihl..];
    let udp_len = u16::from_be_bytes([udp[4], udp[5]]) as usize;
    if udp_len < 8 || udp.len() < udp_len {
        return None;
    }
    Some(UdpDatagram {
        src_port: u16::from_be_bytes([udp[0], udp[1]]),
        dst_port: u16::from_be_bytes([udp[2], udp[3]]),
        payload: &udp[8..udp_len],
    })
}
