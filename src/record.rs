//! Record stream codec: record headers, write blocks and read blocks.
//!
//! Layout of one record, every slot `alignment` bytes wide except the header slot
//! (`record_alignment` bytes):
//!
//! ```text
//!  [flags][byte_select][wr][rd] pad..         record header slot
//!  [base address]                             only if wr > 0
//!  [value] x wr                               data width
//!  [reply address]                            only if rd > 0
//!  [entry] x rd                               address width (see below)
//! ```
//!
//! Fields are big-endian and right-aligned in their slot; the leading bytes of a slot are
//! ignored on decode and zeroed on encode. Records with `wr == rd == 0` are padding.
//!
//! Read-block entries are always sized by the address width, whether they are read targets
//! (request) or returned values (reply). The header does not say which, so the caller picks the
//! labelling with [`ReadDirection`].

use crate::align::{Alignment, Widths};
use crate::codec::{CodecError, ReadDirection};
use crate::packet::{
    ReadBlock, ReadOp, ReadReplyEntry, ReadRequestEntry, Record, RecordFlags, WriteBlock, Word,
};
use crate::walk::RecordWalker;
use crate::width::Width;
use byteorder::{BigEndian, ByteOrder};
use log::trace;

struct SlotReader<'a> {
    data: &'a [u8],
    pos: usize,
    alignment: usize,
}

impl SlotReader<'_> {
    fn read(&mut self, width: Width) -> Result<Word, CodecError> {
        let end = self.pos + self.alignment;
        let Some(slot) = self.data.get(self.pos..end) else {
            return Err(CodecError::TruncatedRecord {
                offset: self.pos,
                needed: self.alignment,
                available: self.data.len().saturating_sub(self.pos),
            });
        };
        let value = BigEndian::read_uint(&slot[self.alignment - width.bytes()..], width.bytes());
        self.pos = end;
        Ok(Word::new(width, value))
    }
}

/// Decode every non-padding record after the packet header.
pub fn decode_records(
    buf: &[u8],
    widths: Widths,
    direction: ReadDirection,
) -> Result<Vec<Record>, CodecError> {
    let align = widths.alignment();
    let mut records = Vec::new();
    for span in RecordWalker::new(buf, align.record_alignment, align) {
        let span = span?;
        if span.is_padding() {
            continue;
        }
        let mut r = SlotReader {
            data: buf,
            pos: span.range.start + align.record_alignment,
            alignment: align.alignment,
        };
        let writes = if span.wr > 0 {
            let base_address = r.read(widths.addr)?;
            let values = (0..span.wr)
                .map(|_| r.read(widths.data))
                .collect::<Result<Vec<_>, _>>()?;
            Some(WriteBlock { base_address, values })
        } else {
            None
        };
        let reads = if span.rd > 0 {
            let reply_address = r.read(widths.addr)?;
            let entries = (0..span.rd)
                .map(|_| {
                    r.read(widths.addr).map(|w| match direction {
                        ReadDirection::Request => ReadOp::Request(ReadRequestEntry { target: w }),
                        ReadDirection::Reply => ReadOp::Reply(ReadReplyEntry { value: w }),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(ReadBlock { reply_address, entries })
        } else {
            None
        };
        records.push(Record {
            flags: RecordFlags::from_byte(span.flags),
            byte_select: span.byte_select,
            writes,
            reads,
        });
    }
    Ok(records)
}

fn write_slot(
    out: &mut Vec<u8>,
    align: &Alignment,
    width: Width,
    value: u64,
) -> Result<(), CodecError> {
    let word = Word::checked(width, value)?;
    let start = out.len();
    out.resize(start + align.alignment, 0);
    let field = &mut out[start + align.alignment - width.bytes()..];
    BigEndian::write_uint(field, word.value, width.bytes());
    Ok(())
}

fn count(n: usize) -> Result<u8, CodecError> {
    u8::try_from(n).map_err(|_| CodecError::TooManyOperations(n))
}

/// Append `records` to `out`, which must already hold the padded packet header.
/// A record without operations is written as one padding slot.
pub fn encode_records(
    out: &mut Vec<u8>,
    records: &[Record],
    widths: Widths,
) -> Result<(), CodecError> {
    let align = widths.alignment();
    for rec in records {
        let wr = count(rec.write_count())?;
        let rd = count(rec.read_count())?;
        let start = out.len();
        out.extend_from_slice(&[rec.flags.to_byte(), rec.byte_select, wr, rd]);
        out.resize(start + align.record_alignment, 0);
        if let Some(w) = rec.writes.as_ref().filter(|w| !w.values.is_empty()) {
            write_slot(out, &align, widths.addr, w.base_address.value)?;
            for v in &w.values {
                write_slot(out, &align, widths.data, v.value)?;
            }
        }
        if let Some(r) = rec.reads.as_ref().filter(|r| !r.entries.is_empty()) {
            write_slot(out, &align, widths.addr, r.reply_address.value)?;
            for e in &r.entries {
                write_slot(out, &align, widths.addr, e.word().value)?;
            }
        }
        trace!("encoded record wr={} rd={} ({} bytes)", wr, rd, out.len() - start);
    }
    Ok(())
}
