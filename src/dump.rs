//! Format decoded packets for display (text dump, dissector-style tree).

use crate::packet::{Packet, ReadOp, Record, Word};
use crate::walk::RecordSpan;
use crate::width::code_for_widths;

pub fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Raw bytes, 16 per line, prefixed with the offset of the first byte.
pub fn hex_with_offset(bytes: &[u8], indent: usize) -> String {
    const COLS: usize = 16;
    let pad = "  ".repeat(indent);
    bytes
        .chunks(COLS)
        .enumerate()
        .map(|(i, chunk)| format!("{}offset {:4}: {}", pad, i * COLS, hex_string(chunk)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Zero-padded hex at the word's wire width.
pub fn format_word(w: &Word) -> String {
    format!("0x{:0digits$x}", w.value, digits = w.width.bytes() * 2)
}

fn widths_line(label: &str, set: &crate::width::WidthSet) -> String {
    match code_for_widths(set) {
        Ok(code) => format!("{}: {} ({:#x})", label, set, code),
        Err(_) => format!("{}: {}", label, set),
    }
}

fn record_to_dump(index: usize, rec: &Record, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let flags = rec.flags.names();
    let mut lines = vec![format!(
        "{}record [{}] flags=[{}] byte_select={:#04x} wr={} rd={}",
        pad,
        index,
        flags.join(","),
        rec.byte_select,
        rec.write_count(),
        rec.read_count()
    )];
    if let Some(w) = &rec.writes {
        lines.push(format!("{}  write base {}", pad, format_word(&w.base_address)));
        for (i, v) in w.values.iter().enumerate() {
            lines.push(format!("{}    [{}] {}", pad, i, format_word(v)));
        }
    }
    if let Some(r) = &rec.reads {
        lines.push(format!("{}  read reply-to {}", pad, format_word(&r.reply_address)));
        for (i, e) in r.entries.iter().enumerate() {
            let (kind, w) = match e {
                ReadOp::Request(x) => ("address", &x.target),
                ReadOp::Reply(x) => ("value", &x.value),
            };
            lines.push(format!("{}    [{}] {} {}", pad, i, kind, format_word(w)));
        }
    }
    lines.join("\n")
}

/// Multi-line tree of one packet.
pub fn packet_to_dump(p: &Packet) -> String {
    let kind = if p.is_probe_request {
        "probe request"
    } else if p.is_probe_reply {
        "probe reply"
    } else {
        "records"
    };
    let mut lines = vec![
        format!("etherbone v{} ({})", p.version, kind),
        format!("  no_reads: {}", p.no_reads),
        format!("  {}", widths_line("addr widths", &p.supported_addr_widths)),
        format!("  {}", widths_line("port widths", &p.supported_port_widths)),
    ];
    if !p.is_probe() {
        lines.push(format!("  records: {}", p.records.len()));
        for (i, rec) in p.records.iter().enumerate() {
            lines.push(record_to_dump(i, rec, 2));
        }
    }
    lines.join("\n")
}

/// One summary line per record span (padding included).
pub fn span_lines(spans: &[RecordSpan]) -> Vec<String> {
    spans
        .iter()
        .map(|s| {
            if s.is_padding() {
                format!("bytes [{}-{}]  padding", s.range.start, s.range.end)
            } else {
                format!(
                    "bytes [{}-{}]  flags={:#04x} byte_select={:#04x} wr={} rd={}",
                    s.range.start, s.range.end, s.flags, s.byte_select, s.wr, s.rd
                )
            }
        })
        .collect()
}
