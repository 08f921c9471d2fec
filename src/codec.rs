//! Packet-level decode/encode entry points and the codec error type.
//!
//! Decode runs header → alignment → records. Probe packets stop after the header. Encode runs
//! the same pipeline in reverse. Both are pure functions of their input; negotiated widths are
//! taken from the header or passed per call, never remembered.

use crate::align::Widths;
use crate::header::{decode_header, encode_header, has_magic, Header};
use crate::packet::Packet;
use crate::record::{decode_records, encode_records};
use crate::width::Width;
use log::debug;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Too short: {len} bytes, need at least 4")]
    TooShort { len: usize },
    #[error("Bad magic: {0:#06x}")]
    BadMagic(u16),
    #[error("Bad width code: {0:#x}")]
    BadWidthCode(u8),
    #[error("Truncated record at offset {offset}: needs {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Value {value:#x} does not fit in {width}")]
    ValueTooWide { value: u64, width: Width },
    #[error("Too many operations in one record: {0} (max 255)")]
    TooManyOperations(usize),
    #[error("Not a probe request")]
    NotAProbe,
    #[error("Version {0} does not fit in 4 bits")]
    VersionOutOfRange(u8),
    #[error("Probe request and probe reply flags both set")]
    ConflictingProbeFlags,
}

/// How to label read-block entries. Both are sized by the address width on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadDirection {
    /// Entries are addresses to read (what a device receives).
    #[default]
    Request,
    /// Entries are returned values.
    Reply,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Negotiated widths; `None` takes the widest advertised width of each header nibble.
    pub widths: Option<Widths>,
    pub read_direction: ReadDirection,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Negotiated widths; `None` takes the widest advertised width of each width set.
    pub widths: Option<Widths>,
}

/// Operating widths implied by a header: the widest member of each advertised set.
pub fn operating_widths(header: &Header) -> Result<Widths, CodecError> {
    let addr = header
        .supported_addr_widths
        .widest()
        .ok_or(CodecError::BadWidthCode(0))?;
    let data = header
        .supported_port_widths
        .widest()
        .ok_or(CodecError::BadWidthCode(0))?;
    Ok(Widths::new(addr, data))
}

/// Magic-only check, for multiplexers deciding whether a datagram is Etherbone at all.
pub fn is_etherbone(buf: &[u8]) -> bool {
    has_magic(buf)
}

pub fn decode(buf: &[u8]) -> Result<Packet, CodecError> {
    decode_with(buf, &DecodeOptions::default())
}

pub fn decode_with(buf: &[u8], opts: &DecodeOptions) -> Result<Packet, CodecError> {
    let header = decode_header(buf)?;
    if !header.carries_records() {
        debug!(
            "probe packet (request={}, reply={}), {} trailing bytes ignored",
            header.probe_request,
            header.probe_reply,
            buf.len() - 4
        );
        return Ok(Packet::from_header(header, Vec::new()));
    }
    let widths = match opts.widths {
        Some(w) => w,
        None => operating_widths(&header)?,
    };
    let records = decode_records(buf, widths, opts.read_direction)?;
    debug!(
        "decoded {} records ({} addr, {} data) from {} bytes",
        records.len(),
        widths.addr,
        widths.data,
        buf.len()
    );
    Ok(Packet::from_header(header, records))
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, CodecError> {
    encode_with(packet, &EncodeOptions::default())
}

pub fn encode_with(packet: &Packet, opts: &EncodeOptions) -> Result<Vec<u8>, CodecError> {
    let header = packet.header();
    let head = encode_header(&header)?;
    if !header.carries_records() {
        return Ok(head.to_vec());
    }
    let widths = match opts.widths {
        Some(w) => w,
        None => operating_widths(&header)?,
    };
    let align = widths.alignment();
    let mut out = Vec::with_capacity(align.record_alignment * (packet.records.len() + 1));
    out.extend_from_slice(&head);
    out.resize(align.record_alignment, 0);
    encode_records(&mut out, &packet.records, widths)?;
    Ok(out)
}
