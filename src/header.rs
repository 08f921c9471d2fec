//! The fixed 4-byte packet header: magic, version, control flags and supported widths.
//!
//! ```text
//!  byte 0..2   magic 0x4E6F (big-endian)
//!  byte 2      version[7:4] | reserved[3] | no_reads[2] | probe_reply[1] | probe_request[0]
//!  byte 3      addr_width_code[7:4] | port_width_code[3:0]
//! ```
//!
//! On record-carrying packets the header is followed by padding up to the record alignment.
//!
//! Decoding keeps a header with both probe bits set (it carries no records); encoding refuses
//! one, as it does a version above 15.

use crate::codec::CodecError;
use crate::width::{code_for_widths, widths_for_code, WidthSet};
use byteorder::{BigEndian, ByteOrder};

pub const MAGIC: u16 = 0x4e6f;
pub const VERSION: u8 = 1;
const MAX_VERSION: u8 = 0x0f;
pub const HEADER_LEN: usize = 4;
/// UDP port LiteEth Etherbone targets bind by default.
pub const DEFAULT_UDP_PORT: u16 = 1234;

const NO_READS: u8 = 0x04;
const PROBE_REPLY: u8 = 0x02;
const PROBE_REQUEST: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub no_reads: bool,
    pub probe_reply: bool,
    pub probe_request: bool,
    pub supported_addr_widths: WidthSet,
    pub supported_port_widths: WidthSet,
}

impl Header {
    pub fn probe_request(addr: WidthSet, port: WidthSet) -> Self {
        Header {
            version: VERSION,
            no_reads: false,
            probe_reply: false,
            probe_request: true,
            supported_addr_widths: addr,
            supported_port_widths: port,
        }
    }

    /// Reply to `request`: same version, probe-request cleared, probe-reply set.
    pub fn probe_reply_to(
        request: &Header,
        addr: WidthSet,
        port: WidthSet,
    ) -> Result<Self, CodecError> {
        if !request.probe_request {
            return Err(CodecError::NotAProbe);
        }
        Ok(Header {
            version: request.version,
            no_reads: request.no_reads,
            probe_reply: true,
            probe_request: false,
            supported_addr_widths: addr,
            supported_port_widths: port,
        })
    }

    /// True when neither probe bit is set, i.e. the body is a record stream.
    pub fn carries_records(&self) -> bool {
        self.flags_byte() % 4 == 0
    }

    fn flags_byte(&self) -> u8 {
        let mut b = (self.version & MAX_VERSION) << 4;
        if self.no_reads {
            b |= NO_READS;
        }
        if self.probe_reply {
            b |= PROBE_REPLY;
        }
        if self.probe_request {
            b |= PROBE_REQUEST;
        }
        b
    }
}

/// Cheap magic-only check; looks at nothing past byte 1.
pub fn has_magic(buf: &[u8]) -> bool {
    buf.len() >= 2 && BigEndian::read_u16(&buf[..2]) == MAGIC
}

pub fn decode_header(buf: &[u8]) -> Result<Header, CodecError> {
    if buf.len() < HEADER_LEN {
        return Err(CodecError::TooShort { len: buf.len() });
    }
    let magic = BigEndian::read_u16(&buf[0..2]);
    if magic != MAGIC {
        return Err(CodecError::BadMagic(magic));
    }
    let flags = buf[2];
    let sizes = buf[3];
    Ok(Header {
        version: flags >> 4,
        no_reads: flags & NO_READS != 0,
        probe_reply: flags & PROBE_REPLY != 0,
        probe_request: flags & PROBE_REQUEST != 0,
        supported_addr_widths: widths_for_code(sizes >> 4)?,
        supported_port_widths: widths_for_code(sizes & 0x0f)?,
    })
}

pub fn encode_header(header: &Header) -> Result<[u8; HEADER_LEN], CodecError> {
    if header.version > MAX_VERSION {
        return Err(CodecError::VersionOutOfRange(header.version));
    }
    if header.probe_request && header.probe_reply {
        return Err(CodecError::ConflictingProbeFlags);
    }
    let addr = code_for_widths(&header.supported_addr_widths)?;
    let port = code_for_widths(&header.supported_port_widths)?;
    let mut out = [0u8; HEADER_LEN];
    BigEndian::write_u16(&mut out[0..2], MAGIC);
    out[2] = header.flags_byte();
    out[3] = (addr << 4) | port;
    Ok(out)
}
