//! # etherbone-codec — Etherbone wire format
//!
//! Etherbone carries Wishbone bus reads and writes inside UDP datagrams. A host first probes a
//! device for the address and data widths it supports, then sends packets holding batches of
//! records. This crate parses and builds those packets; it performs no I/O and keeps no state
//! between calls.
//!
//! ## Packet layout (big-endian)
//!
//! ```text
//! header   magic 0x4E6F | version, no_reads, probe_reply, probe_request | addr code, port code
//! padding  up to record_alignment
//! record*  [flags][byte_select][wr][rd] pad | base addr | wr values | reply addr | rd entries
//! ```
//!
//! Field slots are `alignment = max(addr, data, 2)` bytes; record headers take
//! `record_alignment = max(alignment, 4)` bytes. Records with no writes and no reads are padding.
//!
//! ## Usage
//!
//! ```
//! use etherbone_codec::{decode, encode, Packet, Record, Width, WriteBlock, Word};
//!
//! let rec = Record {
//!     byte_select: 0x0f,
//!     writes: Some(WriteBlock {
//!         base_address: Word::new(Width::W32, 0x1000),
//!         values: vec![Word::new(Width::W32, 0xdead_beef)],
//!     }),
//!     ..Record::default()
//! };
//! let bytes = encode(&Packet::new(Width::W32, Width::W32, vec![rec])).unwrap();
//! let back = decode(&bytes).unwrap();
//! assert_eq!(back.write_ops().count(), 1);
//! ```
//!
//! The `decode_pcap` binary decodes Etherbone traffic from a capture; `eb_encode` builds packets
//! from the text format in [`script`].

pub mod align;
pub mod capture;
pub mod codec;
pub mod dump;
pub mod header;
pub mod packet;
pub mod record;
pub mod script;
pub mod walk;
pub mod width;

pub use align::{Alignment, Widths};
pub use codec::{
    decode, decode_with, encode, encode_with, is_etherbone, CodecError, DecodeOptions,
    EncodeOptions, ReadDirection,
};
pub use header::{decode_header, encode_header, Header, DEFAULT_UDP_PORT, MAGIC, VERSION};
pub use packet::{
    Packet, ReadBlock, ReadOp, ReadReplyEntry, ReadRequestEntry, Record, RecordFlags, WriteBlock,
    WriteOp, Word,
};
pub use script::{parse_script, Script};
pub use walk::{record_spans, RecordSpan, RecordWalker};
pub use width::{widths_for_code, Width, WidthSet};
