//! Benchmark: span walk only vs full decode vs decode+encode round trip, over a batch of
//! synthetic packets covering every width pair and a range of record sizes.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use etherbone_codec::{
    decode, encode, record_spans, Alignment, Packet, ReadBlock, ReadOp, ReadRequestEntry, Record,
    Width, Widths, Word, WriteBlock,
};

fn sample_packets() -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    for addr in Width::ALL {
        for data in Width::ALL {
            for n in [1usize, 8, 64, 255] {
                let rec = Record {
                    byte_select: 0xff,
                    writes: Some(WriteBlock {
                        base_address: Word::new(addr, 0x40),
                        values: (0..n).map(|i| Word::new(data, i as u64 & 0x7f)).collect(),
                    }),
                    reads: Some(ReadBlock {
                        reply_address: Word::new(addr, 0x80),
                        entries: (0..n)
                            .map(|i| {
                                ReadOp::Request(ReadRequestEntry {
                                    target: Word::new(addr, i as u64 & 0x7f),
                                })
                            })
                            .collect(),
                    }),
                    ..Record::default()
                };
                let p = Packet::new(addr, data, vec![rec.clone(), Record::default(), rec]);
                if let Ok(bytes) = encode(&p) {
                    out.push(bytes);
                }
            }
        }
    }
    out
}

fn bench_decode(c: &mut Criterion) {
    let packets = sample_packets();
    let total: usize = packets.iter().map(Vec::len).sum();
    eprintln!("{} packets, {} bytes", packets.len(), total);

    c.bench_function("walk_spans", |b| {
        b.iter(|| {
            let mut n = 0usize;
            for p in &packets {
                let widths = etherbone_codec::decode_header(p)
                    .and_then(|h| etherbone_codec::codec::operating_widths(&h))
                    .unwrap_or(Widths::new(Width::W32, Width::W32));
                let align = Alignment::for_widths(widths);
                n += record_spans(black_box(p), align.record_alignment, align)
                    .map_or(0, |s| s.len());
            }
            n
        })
    });

    c.bench_function("decode", |b| {
        b.iter(|| {
            let mut n = 0usize;
            for p in &packets {
                n += decode(black_box(p)).map_or(0, |p| p.records.len());
            }
            n
        })
    });

    c.bench_function("decode_encode", |b| {
        b.iter(|| {
            let mut n = 0usize;
            for p in &packets {
                if let Ok(decoded) = decode(black_box(p)) {
                    n += encode(&decoded).map_or(0, |v| v.len());
                }
            }
            n
        })
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
