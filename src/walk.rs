//! Zero-copy walk over the record stream of one packet.
//!
//! The walker only reads record headers (flags, byte select and the two counts) and advances by
//! the size those counts imply. It never decodes field values, so it is the cheap way to get
//! record boundaries, e.g. for a hex dump annotated per record or a quick validity check.
//!
//! Every read is bounds-checked. A record whose declared size runs past the end of the buffer
//! yields [`CodecError::TruncatedRecord`] and stops the walk.

use crate::align::Alignment;
use crate::codec::CodecError;
use log::trace;
use std::ops::Range;

/// Size of the fixed part of a record header (flags, byte select, wr, rd).
pub const RECORD_HEADER_LEN: usize = 4;

/// Byte range and header fields of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpan {
    pub range: Range<usize>,
    pub flags: u8,
    pub byte_select: u8,
    pub wr: u8,
    pub rd: u8,
}

impl RecordSpan {
    pub fn is_padding(&self) -> bool {
        self.wr == 0 && self.rd == 0
    }
}

/// Iterator over record spans, starting at `pos` (normally the padded header length).
pub struct RecordWalker<'a> {
    data: &'a [u8],
    pos: usize,
    align: Alignment,
    failed: bool,
}

impl<'a> RecordWalker<'a> {
    pub fn new(data: &'a [u8], start: usize, align: Alignment) -> Self {
        RecordWalker {
            data,
            pos: start,
            align,
            failed: false,
        }
    }

    /// Offset of the next record.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn truncated(&mut self, needed: usize) -> CodecError {
        self.failed = true;
        CodecError::TruncatedRecord {
            offset: self.pos,
            needed,
            available: self.data.len() - self.pos,
        }
    }

    fn next_span(&mut self) -> Result<RecordSpan, CodecError> {
        let data = self.data;
        let start = self.pos;
        let Some(head) = data.get(start..start + RECORD_HEADER_LEN) else {
            return Err(self.truncated(RECORD_HEADER_LEN));
        };
        let (flags, byte_select, wr, rd) = (head[0], head[1], head[2], head[3]);
        if wr == 0 && rd == 0 {
            // A padding slot may be cut short by the end of the datagram.
            let end = (start + self.align.record_alignment).min(data.len());
            trace!("padding record at {}", start);
            self.pos = start + self.align.record_alignment;
            return Ok(RecordSpan { range: start..end, flags, byte_select, wr, rd });
        }
        let size = self.align.record_size(wr, rd);
        if start + size > data.len() {
            return Err(self.truncated(size));
        }
        trace!("record at {}: wr={} rd={} size={}", start, wr, rd, size);
        self.pos = start + size;
        Ok(RecordSpan { range: start..start + size, flags, byte_select, wr, rd })
    }
}

impl Iterator for RecordWalker<'_> {
    type Item = Result<RecordSpan, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        Some(self.next_span())
    }
}

/// All record spans of a packet body, padding included.
pub fn record_spans(
    data: &[u8],
    start: usize,
    align: Alignment,
) -> Result<Vec<RecordSpan>, CodecError> {
    RecordWalker::new(data, start, align).collect()
}
