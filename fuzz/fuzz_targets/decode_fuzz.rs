//! Decode fuzz target: feed arbitrary bytes to the packet decoder.
//! Decode must not panic. Whatever decodes must re-encode and decode to the same packet.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Ok(packet) = etherbone_codec::decode(data) else {
        return;
    };
    if let Ok(bytes) = etherbone_codec::encode(&packet) {
        let again = etherbone_codec::decode(&bytes).expect("re-decode");
        assert_eq!(again, packet);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
