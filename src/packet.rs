//! Decoded packet representation: header fields, records, write and read blocks.
//!
//! Every value here is an immutable result of one [`decode`](crate::codec::decode) call (or the
//! input of one [`encode`](crate::codec::encode) call). Nothing is cached between packets.

use crate::codec::CodecError;
use crate::header::{Header, VERSION};
use crate::width::{Width, WidthSet};

/// A bus address or data value together with the width it occupies on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Word {
    pub width: Width,
    pub value: u64,
}

impl Word {
    pub fn new(width: Width, value: u64) -> Self {
        Word { width, value }
    }

    /// Fails with `ValueTooWide` if `value` does not fit in `width`.
    pub fn checked(width: Width, value: u64) -> Result<Self, CodecError> {
        if value > width.max_value() {
            return Err(CodecError::ValueTooWide { value, width });
        }
        Ok(Word { width, value })
    }
}

/// Record header flag bits (byte 0 of each record). Bit 0x10 is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordFlags {
    /// `bca`: base return address is in config space.
    pub reply_to_config_space: bool,
    /// `rca`: reads target config space.
    pub read_from_config_space: bool,
    /// `rff`: reads come from a FIFO (no address increment).
    pub read_fifo: bool,
    /// `cyc`: drop the bus cycle after this record.
    pub drop_cycle: bool,
    /// `wca`: writes target config space.
    pub write_to_config_space: bool,
    /// `wff`: writes go to a FIFO (no address increment).
    pub write_fifo: bool,
}

impl RecordFlags {
    pub const BCA: u8 = 0x80;
    pub const RCA: u8 = 0x40;
    pub const RFF: u8 = 0x20;
    pub const CYC: u8 = 0x08;
    pub const WCA: u8 = 0x04;
    pub const WFF: u8 = 0x02;

    pub fn from_byte(b: u8) -> Self {
        RecordFlags {
            reply_to_config_space: b & Self::BCA != 0,
            read_from_config_space: b & Self::RCA != 0,
            read_fifo: b & Self::RFF != 0,
            drop_cycle: b & Self::CYC != 0,
            write_to_config_space: b & Self::WCA != 0,
            write_fifo: b & Self::WFF != 0,
        }
    }

    pub fn to_byte(&self) -> u8 {
        let mut b = 0;
        for (set, bit) in [
            (self.reply_to_config_space, Self::BCA),
            (self.read_from_config_space, Self::RCA),
            (self.read_fifo, Self::RFF),
            (self.drop_cycle, Self::CYC),
            (self.write_to_config_space, Self::WCA),
            (self.write_fifo, Self::WFF),
        ] {
            if set {
                b |= bit;
            }
        }
        b
    }

    /// Short names of the set flags, most significant first.
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.reply_to_config_space, "bca"),
            (self.read_from_config_space, "rca"),
            (self.read_fifo, "rff"),
            (self.drop_cycle, "cyc"),
            (self.write_to_config_space, "wca"),
            (self.write_fifo, "wff"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

/// One base address followed by the values written starting there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBlock {
    pub base_address: Word,
    pub values: Vec<Word>,
}

/// A single write, flattened out of a [`WriteBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOp {
    pub base_address: Word,
    pub value: Word,
}

/// Read-block entry interpreted as a request: the address to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequestEntry {
    pub target: Word,
}

/// Read-block entry interpreted as a reply: a value returned by the bus.
///
/// On the wire this slot is still sized by the address width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReplyEntry {
    pub value: Word,
}

/// One read-block entry. The header carries no direction indicator, so the decoder labels
/// entries according to the caller's [`ReadDirection`](crate::codec::ReadDirection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOp {
    Request(ReadRequestEntry),
    Reply(ReadReplyEntry),
}

impl ReadOp {
    /// The raw slot content, whichever way it is labelled.
    pub fn word(&self) -> Word {
        match self {
            ReadOp::Request(e) => e.target,
            ReadOp::Reply(e) => e.value,
        }
    }
}

/// The reply address shared by every entry of a read block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBlock {
    pub reply_address: Word,
    pub entries: Vec<ReadOp>,
}

/// One batch of writes and/or reads sharing flags and a byte-select mask.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub flags: RecordFlags,
    pub byte_select: u8,
    pub writes: Option<WriteBlock>,
    pub reads: Option<ReadBlock>,
}

impl Record {
    /// Number of write values (the `wr` count on the wire).
    pub fn write_count(&self) -> usize {
        self.writes.as_ref().map_or(0, |w| w.values.len())
    }

    /// Number of read entries (the `rd` count on the wire).
    pub fn read_count(&self) -> usize {
        self.reads.as_ref().map_or(0, |r| r.entries.len())
    }

    /// A record without operations only occupies a padding slot.
    pub fn is_padding(&self) -> bool {
        self.write_count() == 0 && self.read_count() == 0
    }

    pub fn write_ops(&self) -> impl Iterator<Item = WriteOp> + '_ {
        self.writes.iter().flat_map(|b| {
            b.values.iter().map(move |v| WriteOp {
                base_address: b.base_address,
                value: *v,
            })
        })
    }

    pub fn read_ops(&self) -> impl Iterator<Item = (Word, &ReadOp)> + '_ {
        self.reads
            .iter()
            .flat_map(|b| b.entries.iter().map(move |e| (b.reply_address, e)))
    }

    /// Build the record a device sends back for this record's reads: a write block addressed to
    /// the reply address, carrying `values` in read order. Config-space and FIFO flags of the
    /// read side carry over to the write side.
    ///
    /// `None` if there is no read block or `values` has a different length than it.
    pub fn read_response(&self, values: Vec<Word>) -> Option<Record> {
        let reads = self.reads.as_ref()?;
        if values.len() != reads.entries.len() {
            return None;
        }
        Some(Record {
            flags: RecordFlags {
                write_to_config_space: self.flags.reply_to_config_space,
                write_fifo: self.flags.read_fifo,
                drop_cycle: self.flags.drop_cycle,
                ..RecordFlags::default()
            },
            byte_select: self.byte_select,
            writes: Some(WriteBlock {
                base_address: reads.reply_address,
                values,
            }),
            reads: None,
        })
    }
}

/// A decoded Etherbone packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub version: u8,
    pub no_reads: bool,
    pub is_probe_reply: bool,
    pub is_probe_request: bool,
    pub supported_addr_widths: WidthSet,
    pub supported_port_widths: WidthSet,
    pub records: Vec<Record>,
}

impl Packet {
    /// A record-carrying packet advertising exactly the operating widths.
    pub fn new(addr: Width, data: Width, records: Vec<Record>) -> Self {
        Packet {
            version: VERSION,
            no_reads: false,
            is_probe_reply: false,
            is_probe_request: false,
            supported_addr_widths: WidthSet::single(addr),
            supported_port_widths: WidthSet::single(data),
            records,
        }
    }

    pub fn from_header(header: Header, records: Vec<Record>) -> Self {
        Packet {
            version: header.version,
            no_reads: header.no_reads,
            is_probe_reply: header.probe_reply,
            is_probe_request: header.probe_request,
            supported_addr_widths: header.supported_addr_widths,
            supported_port_widths: header.supported_port_widths,
            records,
        }
    }

    pub fn header(&self) -> Header {
        Header {
            version: self.version,
            no_reads: self.no_reads,
            probe_reply: self.is_probe_reply,
            probe_request: self.is_probe_request,
            supported_addr_widths: self.supported_addr_widths,
            supported_port_widths: self.supported_port_widths,
        }
    }

    pub fn probe_request(addr: WidthSet, port: WidthSet) -> Self {
        Packet::from_header(Header::probe_request(addr, port), Vec::new())
    }

    /// Answer a probe request with the widths this device supports.
    pub fn probe_reply_to(
        request: &Packet,
        addr: WidthSet,
        port: WidthSet,
    ) -> Result<Self, CodecError> {
        let header = Header::probe_reply_to(&request.header(), addr, port)?;
        Ok(Packet::from_header(header, Vec::new()))
    }

    pub fn is_probe(&self) -> bool {
        self.is_probe_reply || self.is_probe_request
    }

    pub fn write_ops(&self) -> impl Iterator<Item = WriteOp> + '_ {
        self.records.iter().flat_map(Record::write_ops)
    }
}
