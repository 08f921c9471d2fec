//! Packet script tests: parse the text format, encode, and check the result decodes back.

use etherbone_codec::{
    decode_with, encode_with, parse_script, DecodeOptions, EncodeOptions, ReadOp, Width, WidthSet,
    Word,
};

const WRITE_AND_READ: &str = r#"
# one write burst and one read
packet version 1 addr 32 data 32
record flags cyc select 0x0f
  write 0x1000: 0xdeadbeef, 0x1
  read 0x2000: 0x10, 0x14
padding
record
  write 0x3000: 7
"#;

#[test]
fn test_parse_write_and_read() {
    let s = parse_script(WRITE_AND_READ).expect("parse");
    assert_eq!(s.widths.addr, Width::W32);
    assert_eq!(s.widths.data, Width::W32);
    let p = &s.packet;
    assert_eq!(p.version, 1);
    assert_eq!(p.records.len(), 3);

    let r0 = &p.records[0];
    assert!(r0.flags.drop_cycle);
    assert_eq!(r0.byte_select, 0x0f);
    let w = r0.writes.as_ref().expect("writes");
    assert_eq!(w.base_address, Word::new(Width::W32, 0x1000));
    assert_eq!(w.values, vec![Word::new(Width::W32, 0xdead_beef), Word::new(Width::W32, 1)]);
    let targets: Vec<u64> = r0.read_ops().map(|(_, op)| op.word().value).collect();
    assert_eq!(targets, vec![0x10, 0x14]);
    assert!(matches!(r0.read_ops().next(), Some((_, ReadOp::Request(_)))));

    assert!(p.records[1].is_padding());
    assert_eq!(p.records[2].byte_select, 0xff);
}

#[test]
fn test_script_encodes_and_decodes() {
    let s = parse_script(WRITE_AND_READ).expect("parse");
    let bytes = encode_with(&s.packet, &EncodeOptions { widths: Some(s.widths) }).expect("encode");
    // header 4, record 4 + 3*4 + 3*4, padding 4, record 4 + 2*4
    assert_eq!(bytes.len(), 4 + 28 + 4 + 12);
    let back = decode_with(
        &bytes,
        &DecodeOptions {
            widths: Some(s.widths),
            ..DecodeOptions::default()
        },
    )
    .expect("decode");
    let mut expected = s.packet.clone();
    expected.records.retain(|r| !r.is_padding());
    assert_eq!(back, expected);
}

#[test]
fn test_supports_line() {
    let src = "packet addr 16 data 8\nsupports addr 32,16 port 8\nrecord\n  write 0x10: 0xff\n";
    let s = parse_script(src).expect("parse");
    assert_eq!(s.widths.addr, Width::W16);
    assert_eq!(s.widths.data, Width::W8);
    let addr: WidthSet = [Width::W16, Width::W32].into_iter().collect();
    assert_eq!(s.packet.supported_addr_widths, addr);
    assert_eq!(s.packet.supported_port_widths, WidthSet::single(Width::W8));
}

#[test]
fn test_probe_script() {
    let s = parse_script("packet probe_request\nsupports addr 64,32,16,8 port 32").expect("parse");
    assert!(s.packet.is_probe_request);
    let bytes = encode_with(&s.packet, &EncodeOptions::default()).expect("encode");
    assert_eq!(bytes, vec![0x4e, 0x6f, 0x11, 0xf4]);
}

#[test]
fn test_script_errors() {
    assert!(parse_script("").is_err());
    assert!(parse_script("record\n").is_err());
    assert!(parse_script("packet\nwrite 0x0: 1\n").is_err());
    assert!(parse_script("packet\npadding\n  write 0x0: 1\n").is_err());
    assert!(parse_script("packet addr 24\n").is_err());
    assert!(parse_script("packet data 8\nrecord\n  write 0x0: 0x100\n").is_err());
    assert!(parse_script("packet\nrecord select 0x100\n").is_err());
    assert!(parse_script("packet probe_request probe_reply\n").is_err());
    assert!(parse_script("packet probe_request\nrecord\n").is_err());
    assert!(parse_script("packet\nrecord\n  write 0x0: 1\n  write 0x4: 2\n").is_err());
}
