//! Decode Etherbone traffic from a pcap / pcapng capture.
//!
//! Usage:
//!   decode_pcap [OPTIONS] CAPTURE
//!
//! Prints a summary (packets, probes, records, operations, errors by kind) to stderr. With
//! `--dump` each Etherbone packet is written as hex, record spans and a decoded tree.

use anyhow::Context;
use clap::Parser as _;
use etherbone_codec::capture::{for_each_udp_payload, UdpDatagram};
use etherbone_codec::codec::operating_widths;
use etherbone_codec::dump::{hex_with_offset, packet_to_dump, span_lines};
use etherbone_codec::{
    decode_header, decode_with, is_etherbone, record_spans, CodecError, DecodeOptions,
    ReadDirection, DEFAULT_UDP_PORT,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, clap::Parser)]
struct Args {
    /// Capture file (pcap or pcapng).
    capture: PathBuf,

    /// UDP port carrying Etherbone (matched as source or destination).
    #[arg(short, long, default_value_t = DEFAULT_UDP_PORT)]
    port: u16,

    /// Decode every UDP payload regardless of port.
    #[arg(long)]
    any_port: bool,

    /// Write per-packet dumps to a file, or to stdout when no path is given.
    #[arg(long, num_args = 0..=1, default_missing_value = "-")]
    dump: Option<PathBuf>,

    /// Only dump this packet index.
    #[arg(long)]
    frame: Option<u64>,

    /// Label read-block entries as returned values instead of read addresses.
    #[arg(long)]
    reply: bool,

    /// Verbosity level for logging.
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Default)]
struct Summary {
    etherbone: u64,
    not_etherbone: u64,
    probe_requests: u64,
    probe_replies: u64,
    records: u64,
    writes: u64,
    reads: u64,
    errors: BTreeMap<&'static str, u64>,
    first_error: Option<(u64, String)>,
}

fn error_kind(e: &CodecError) -> &'static str {
    match e {
        CodecError::TooShort { .. } => "too-short",
        CodecError::BadMagic(_) => "bad-magic",
        CodecError::BadWidthCode(_) => "bad-width-code",
        CodecError::TruncatedRecord { .. } => "truncated-record",
        CodecError::ValueTooWide { .. } => "value-too-wide",
        CodecError::TooManyOperations(_) => "too-many-operations",
        CodecError::NotAProbe => "not-a-probe",
        CodecError::VersionOutOfRange(_) => "version-out-of-range",
        CodecError::ConflictingProbeFlags => "conflicting-probe-flags",
    }
}

fn process(
    index: u64,
    dgram: &UdpDatagram<'_>,
    opts: &DecodeOptions,
    summary: &mut Summary,
    dump: &mut Option<Box<dyn Write>>,
    frame_filter: Option<u64>,
) -> std::io::Result<()> {
    let payload = dgram.payload;
    if !is_etherbone(payload) {
        summary.not_etherbone += 1;
        log::debug!("packet {}: not etherbone ({} bytes)", index, payload.len());
        return Ok(());
    }
    summary.etherbone += 1;
    let result = decode_with(payload, opts);
    match &result {
        Ok(p) => {
            summary.probe_requests += u64::from(p.is_probe_request);
            summary.probe_replies += u64::from(p.is_probe_reply);
            summary.records += p.records.len() as u64;
            summary.writes += p.records.iter().map(|r| r.write_count() as u64).sum::<u64>();
            summary.reads += p.records.iter().map(|r| r.read_count() as u64).sum::<u64>();
        }
        Err(e) => {
            log::warn!("packet {}: {}", index, e);
            *summary.errors.entry(error_kind(e)).or_insert(0) += 1;
            summary.first_error.get_or_insert_with(|| (index, e.to_string()));
        }
    }

    let Some(w) = dump.as_mut() else {
        return Ok(());
    };
    if frame_filter.map_or(false, |f| f != index) {
        return Ok(());
    }
    writeln!(
        w,
        "=== packet {}  {} -> {}  len {} ===",
        index,
        dgram.src_port,
        dgram.dst_port,
        payload.len()
    )?;
    writeln!(w, "{}", hex_with_offset(payload, 1))?;
    match result {
        Ok(p) => {
            if !p.is_probe() {
                let widths = opts
                    .widths
                    .or_else(|| decode_header(payload).and_then(|h| operating_widths(&h)).ok());
                if let Some(widths) = widths {
                    let align = widths.alignment();
                    if let Ok(spans) = record_spans(payload, align.record_alignment, align) {
                        for line in span_lines(&spans) {
                            writeln!(w, "  {}", line)?;
                        }
                    }
                }
            }
            writeln!(w, "{}", packet_to_dump(&p))?;
        }
        Err(e) => writeln!(w, "  decode error: {}", e)?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    stderrlog::new().verbosity(args.verbose as usize).init()?;

    let opts = DecodeOptions {
        widths: None,
        read_direction: if args.reply { ReadDirection::Reply } else { ReadDirection::Request },
    };
    let mut dump: Option<Box<dyn Write>> = match &args.dump {
        Some(p) if p.as_os_str() == "-" => Some(Box::new(std::io::stdout())),
        Some(p) => Some(Box::new(
            File::create(p).with_context(|| format!("create dump file {}", p.display()))?,
        )),
        None => None,
    };

    let file = File::open(&args.capture)
        .with_context(|| format!("open {}", args.capture.display()))?;
    let port = if args.any_port { None } else { Some(args.port) };
    let mut summary = Summary::default();
    let mut io_error: Option<std::io::Error> = None;
    let stats = for_each_udp_payload(BufReader::new(file), port, |index, dgram| {
        if io_error.is_some() {
            return;
        }
        if let Err(e) = process(index, dgram, &opts, &mut summary, &mut dump, args.frame) {
            io_error = Some(e);
        }
    })?;
    if let Some(e) = io_error {
        return Err(e).context("write dump");
    }

    eprintln!("capture: {}", args.capture.display());
    eprintln!("packets: {}", stats.packets);
    eprintln!("udp payloads: {}", stats.udp_payloads);
    eprintln!("etherbone packets: {}", summary.etherbone);
    eprintln!("not etherbone (magic mismatch): {}", summary.not_etherbone);
    eprintln!("probe requests: {}", summary.probe_requests);
    eprintln!("probe replies: {}", summary.probe_replies);
    eprintln!("records: {}", summary.records);
    eprintln!("writes: {}", summary.writes);
    eprintln!("reads: {}", summary.reads);
    if !summary.errors.is_empty() {
        eprintln!("decode errors:");
        for (kind, n) in &summary.errors {
            eprintln!("  {}: {}", kind, n);
        }
        if let Some((index, err)) = &summary.first_error {
            eprintln!("  first error (packet {}): {}", index, err);
        }
    }
    Ok(())
}
