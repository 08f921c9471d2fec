//! Build an Etherbone packet from a text script.
//!
//! Usage:
//!   eb_encode [OPTIONS] [SCRIPT]
//!   eb_encode < packet.eb
//!
//! Writes the encoded packet to `--out` (binary) or prints it as hex on stdout.

use anyhow::Context;
use clap::Parser as _;
use etherbone_codec::dump::{hex_with_offset, packet_to_dump};
use etherbone_codec::{encode_with, parse_script, EncodeOptions};
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Clone, clap::Parser)]
struct Args {
    /// Packet script; reads stdin when omitted.
    script: Option<PathBuf>,

    /// Write the binary packet to this file.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print the packet as hex with offsets (default when no --out is given).
    #[arg(long)]
    hex: bool,

    /// Also print the decoded tree of the packet.
    #[arg(long)]
    tree: bool,

    /// Verbosity level for logging.
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    stderrlog::new().verbosity(args.verbose as usize).init()?;

    let src = match &args.script {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?,
        None => {
            let mut s = String::new();
            std::io::stdin().read_to_string(&mut s)?;
            s
        }
    };
    let script = parse_script(&src).map_err(|e| anyhow::anyhow!(e))?;
    let bytes = encode_with(&script.packet, &EncodeOptions { widths: Some(script.widths) })?;
    log::info!(
        "encoded {} records into {} bytes ({} addr, {} data)",
        script.packet.records.len(),
        bytes.len(),
        script.widths.addr,
        script.widths.data
    );

    if args.tree {
        println!("{}", packet_to_dump(&script.packet));
    }
    if let Some(out) = &args.out {
        std::fs::write(out, &bytes).with_context(|| format!("write {}", out.display()))?;
    }
    if args.hex || args.out.is_none() {
        println!("{}", hex_with_offset(&bytes, 0));
    }
    Ok(())
}
