//! Parse a small text description of one packet using PEST.
//!
//! ```text
//! packet version 1 addr 32 data 32
//! supports addr 32,16 port 32      # optional; defaults to the operating widths
//! record flags cyc select 0x0f
//!   write 0x1000: 0xdeadbeef, 0x1  # base address: values
//!   read 0x2000: 0x10, 0x14        # reply address: targets
//! padding
//! ```
//!
//! `packet` may also carry `no_reads`, `probe_request` or `probe_reply`. Values are checked
//! against the operating widths while parsing.

use crate::align::Widths;
use crate::packet::{Packet, ReadBlock, ReadOp, ReadRequestEntry, Record, WriteBlock, Word};
use crate::width::{Width, WidthSet};
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "script.pest"]
struct ScriptParser;

/// A parsed script: the packet and the widths it is laid out with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub packet: Packet,
    pub widths: Widths,
}

/// Parse script source into a packet.
pub fn parse_script(source: &str) -> Result<Script, String> {
    let pairs =
        ScriptParser::parse(Rule::script, source).map_err(|e| format!("Parse error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty parse")?;
    build_script(pair)
}

fn parse_number(s: &str) -> Result<u64, String> {
    let r = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    r.map_err(|e| format!("bad number {:?}: {}", s, e))
}

fn parse_bits(s: &str) -> Result<Width, String> {
    let n: u32 = s.parse().map_err(|_| format!("bad width {:?}", s))?;
    Width::from_bits(n).ok_or_else(|| format!("bad width {:?}", s))
}

fn build_bits_list(pair: pest::iterators::Pair<Rule>) -> Result<WidthSet, String> {
    pair.into_inner().map(|p| parse_bits(p.as_str())).collect()
}

fn build_number_list(pair: pest::iterators::Pair<Rule>, width: Width) -> Result<Vec<Word>, String> {
    pair.into_inner()
        .map(|p| {
            let v = parse_number(p.as_str())?;
            Word::checked(width, v).map_err(|e| e.to_string())
        })
        .collect()
}

#[derive(Default)]
struct PacketLine {
    version: Option<u8>,
    addr: Option<Width>,
    data: Option<Width>,
    no_reads: bool,
    probe_request: bool,
    probe_reply: bool,
}

fn build_packet_line(pair: pest::iterators::Pair<Rule>) -> Result<PacketLine, String> {
    let mut line = PacketLine::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::version_opt => {
                let n = inner.into_inner().next().ok_or("version: value")?;
                let v = parse_number(n.as_str())?;
                if v > 0x0f {
                    return Err(format!("version {} does not fit in 4 bits", v));
                }
                line.version = Some(v as u8);
            }
            Rule::addr_opt => {
                let b = inner.into_inner().next().ok_or("addr: width")?;
                line.addr = Some(parse_bits(b.as_str())?);
            }
            Rule::data_opt => {
                let b = inner.into_inner().next().ok_or("data: width")?;
                line.data = Some(parse_bits(b.as_str())?);
            }
            Rule::header_flag => match inner.as_str() {
                "no_reads" => line.no_reads = true,
                "probe_request" => line.probe_request = true,
                "probe_reply" => line.probe_reply = true,
                other => return Err(format!("unknown header flag {:?}", other)),
            },
            _ => {}
        }
    }
    if line.probe_request && line.probe_reply {
        return Err("probe_request and probe_reply are exclusive".to_string());
    }
    Ok(line)
}

fn build_record_line(pair: pest::iterators::Pair<Rule>) -> Result<Record, String> {
    let mut rec = Record {
        byte_select: 0xff,
        ..Record::default()
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::flags_opt => {
                for f in inner.into_inner() {
                    match f.as_str() {
                        "bca" => rec.flags.reply_to_config_space = true,
                        "rca" => rec.flags.read_from_config_space = true,
                        "rff" => rec.flags.read_fifo = true,
                        "cyc" => rec.flags.drop_cycle = true,
                        "wca" => rec.flags.write_to_config_space = true,
                        "wff" => rec.flags.write_fifo = true,
                        other => return Err(format!("unknown record flag {:?}", other)),
                    }
                }
            }
            Rule::select_opt => {
                let n = inner.into_inner().next().ok_or("select: value")?;
                let v = parse_number(n.as_str())?;
                rec.byte_select = u8::try_from(v)
                    .map_err(|_| format!("select {:#x} does not fit in 8 bits", v))?;
            }
            _ => {}
        }
    }
    Ok(rec)
}

/// Base (or reply) address followed by the list of values.
fn build_block(
    pair: pest::iterators::Pair<Rule>,
    widths: Widths,
    list_width: Width,
) -> Result<(Word, Vec<Word>), String> {
    let mut it = pair.into_inner();
    let addr = it.next().ok_or("block: address")?;
    let addr = Word::checked(widths.addr, parse_number(addr.as_str())?).map_err(|e| e.to_string())?;
    let list = it.next().ok_or("block: values")?;
    let values = build_number_list(list, list_width)?;
    if values.len() > 255 {
        return Err(format!("{} operations in one block (max 255)", values.len()));
    }
    Ok((addr, values))
}

fn build_script(pair: pest::iterators::Pair<Rule>) -> Result<Script, String> {
    let mut inner = pair.into_inner();
    let head = inner.next().ok_or("script: packet line")?;
    let line = build_packet_line(head)?;
    let widths = Widths::new(line.addr.unwrap_or(Width::W32), line.data.unwrap_or(Width::W32));

    let mut supported_addr = None;
    let mut supported_port = None;
    let mut records: Vec<Record> = Vec::new();
    let mut in_record = false;

    for stmt in inner {
        match stmt.as_rule() {
            Rule::supports_line => {
                for s in stmt.into_inner() {
                    let rule = s.as_rule();
                    let list = s.into_inner().next().ok_or("supports: widths")?;
                    let set = build_bits_list(list)?;
                    match rule {
                        Rule::supports_addr => supported_addr = Some(set),
                        Rule::supports_port => supported_port = Some(set),
                        _ => {}
                    }
                }
            }
            Rule::record_line => {
                records.push(build_record_line(stmt)?);
                in_record = true;
            }
            Rule::padding_line => {
                records.push(Record::default());
                in_record = false;
            }
            Rule::write_line => {
                let rec = records.last_mut().filter(|_| in_record).ok_or("write outside a record")?;
                if rec.writes.is_some() {
                    return Err("only one write block per record".to_string());
                }
                let (base_address, values) = build_block(stmt, widths, widths.data)?;
                rec.writes = Some(WriteBlock { base_address, values });
            }
            Rule::read_line => {
                let rec = records.last_mut().filter(|_| in_record).ok_or("read outside a record")?;
                if rec.reads.is_some() {
                    return Err("only one read block per record".to_string());
                }
                let (reply_address, targets) = build_block(stmt, widths, widths.addr)?;
                let entries = targets
                    .into_iter()
                    .map(|target| ReadOp::Request(ReadRequestEntry { target }))
                    .collect();
                rec.reads = Some(ReadBlock { reply_address, entries });
            }
            _ => {}
        }
    }

    let mut packet = Packet::new(widths.addr, widths.data, Vec::new());
    packet.version = line.version.unwrap_or(packet.version);
    packet.no_reads = line.no_reads;
    packet.is_probe_request = line.probe_request;
    packet.is_probe_reply = line.probe_reply;
    if let Some(s) = supported_addr {
        packet.supported_addr_widths = s;
    }
    if let Some(s) = supported_port {
        packet.supported_port_widths = s;
    }
    if packet.is_probe() {
        if !records.is_empty() {
            return Err("probe packets carry no records".to_string());
        }
    } else {
        packet.records = records;
    }
    Ok(Script { packet, widths })
}
