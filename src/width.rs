//! Bus widths and the 4-bit capability codes that advertise them.
//!
//! The packet header carries two nibbles (address and port/data width). Each nibble is a code
//! from a fixed 16-entry table; code `0x0` is "Bad Value". The table is kept as literal data
//! (see [`WIDTH_TABLE`]) rather than derived from bit positions.

use crate::codec::CodecError;
use std::fmt;

/// One bus width. Discriminants are the width in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Width {
    W8 = 1,
    W16 = 2,
    W32 = 4,
    W64 = 8,
}

impl Width {
    pub const ALL: [Width; 4] = [Width::W8, Width::W16, Width::W32, Width::W64];

    /// Width in bytes.
    pub fn bytes(self) -> usize {
        self as usize
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    pub fn from_bytes(n: usize) -> Option<Width> {
        match n {
            1 => Some(Width::W8),
            2 => Some(Width::W16),
            4 => Some(Width::W32),
            8 => Some(Width::W64),
            _ => None,
        }
    }

    pub fn from_bits(n: u32) -> Option<Width> {
        if n % 8 != 0 {
            return None;
        }
        Width::from_bytes((n / 8) as usize)
    }

    /// Largest value representable at this width.
    pub fn max_value(self) -> u64 {
        match self {
            Width::W64 => u64::MAX,
            w => (1u64 << w.bits()) - 1,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bit", self.bits())
    }
}

/// A set of supported widths, as advertised in one header nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct WidthSet {
    w8: bool,
    w16: bool,
    w32: bool,
    w64: bool,
}

const fn set(w64: bool, w32: bool, w16: bool, w8: bool) -> Option<WidthSet> {
    Some(WidthSet { w8, w16, w32, w64 })
}

/// Capability code → width set. Index is the nibble value; `None` marks "Bad Value".
pub const WIDTH_TABLE: [(Option<WidthSet>, &str); 16] = [
    (None, "Bad Value"),
    (set(false, false, false, true), "8 bit"),
    (set(false, false, true, false), "16 bit"),
    (set(false, false, true, true), "16,8 bit"),
    (set(false, true, false, false), "32 bit"),
    (set(false, true, false, true), "32,8 bit"),
    (set(false, true, true, false), "32,16 bit"),
    (set(false, true, true, true), "32,16,8 bit"),
    (set(true, false, false, false), "64 bit"),
    (set(true, false, false, true), "64,8 bit"),
    (set(true, false, true, false), "64,16 bit"),
    (set(true, false, true, true), "64,16,8 bit"),
    (set(true, true, false, false), "64,32 bit"),
    (set(true, true, false, true), "64,32,8 bit"),
    (set(true, true, true, false), "64,32,16 bit"),
    (set(true, true, true, true), "64,32,16,8 bit"),
];

/// Resolve a header nibble to its width set.
pub fn widths_for_code(code: u8) -> Result<WidthSet, CodecError> {
    WIDTH_TABLE
        .get(code as usize)
        .and_then(|(s, _)| *s)
        .ok_or(CodecError::BadWidthCode(code))
}

/// Reverse lookup, used when building headers. The empty set has no code.
pub fn code_for_widths(widths: &WidthSet) -> Result<u8, CodecError> {
    WIDTH_TABLE
        .iter()
        .position(|(s, _)| s.as_ref() == Some(widths))
        .map(|i| i as u8)
        .ok_or(CodecError::BadWidthCode(0))
}

/// Table label for a code ("Bad Value" for 0 and out-of-range values).
pub fn label_for_code(code: u8) -> &'static str {
    WIDTH_TABLE
        .get(code as usize)
        .map(|(_, label)| *label)
        .unwrap_or("Bad Value")
}

impl WidthSet {
    pub const fn empty() -> Self {
        WidthSet { w8: false, w16: false, w32: false, w64: false }
    }

    pub fn single(w: Width) -> Self {
        let mut s = WidthSet::empty();
        s.insert(w);
        s
    }

    pub fn insert(&mut self, w: Width) {
        match w {
            Width::W8 => self.w8 = true,
            Width::W16 => self.w16 = true,
            Width::W32 => self.w32 = true,
            Width::W64 => self.w64 = true,
        }
    }

    pub fn contains(&self, w: Width) -> bool {
        match w {
            Width::W8 => self.w8,
            Width::W16 => self.w16,
            Width::W32 => self.w32,
            Width::W64 => self.w64,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.w8 || self.w16 || self.w32 || self.w64)
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Width> + '_ {
        Width::ALL.into_iter().filter(move |w| self.contains(*w))
    }

    /// The operating width for a non-probe packet: the widest advertised member.
    pub fn widest(&self) -> Option<Width> {
        self.iter().last()
    }
}

impl FromIterator<Width> for WidthSet {
    fn from_iter<I: IntoIterator<Item = Width>>(iter: I) -> Self {
        let mut s = WidthSet::empty();
        for w in iter {
            s.insert(w);
        }
        s
    }
}

impl fmt::Display for WidthSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match code_for_widths(self) {
            Ok(code) => f.write_str(label_for_code(code)),
            Err(_) => f.write_str("Bad Value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_code_is_bad_value() {
        assert!(matches!(widths_for_code(0), Err(CodecError::BadWidthCode(0))));
        assert!(matches!(widths_for_code(0x10), Err(CodecError::BadWidthCode(0x10))));
    }

    #[test]
    fn code_seven_is_8_16_32() {
        let s = widths_for_code(0x7).expect("code 7");
        let members: Vec<_> = s.iter().collect();
        assert_eq!(members, vec![Width::W8, Width::W16, Width::W32]);
        assert_eq!(s.to_string(), "32,16,8 bit");
        assert_eq!(s.widest(), Some(Width::W32));
    }

    #[test]
    fn every_valid_code_maps_back() {
        for code in 1u8..=0xF {
            let s = widths_for_code(code).expect("valid code");
            assert!(!s.is_empty());
            assert_eq!(code_for_widths(&s).expect("reverse"), code);
        }
        assert!(code_for_widths(&WidthSet::empty()).is_err());
    }

    #[test]
    fn codes_decode_to_expected_members() {
        use Width::*;
        let expected: [(u8, &[Width], &str); 15] = [
            (0x1, &[W8], "8 bit"),
            (0x2, &[W16], "16 bit"),
            (0x3, &[W8, W16], "16,8 bit"),
            (0x4, &[W32], "32 bit"),
            (0x5, &[W8, W32], "32,8 bit"),
            (0x6, &[W16, W32], "32,16 bit"),
            (0x7, &[W8, W16, W32], "32,16,8 bit"),
            (0x8, &[W64], "64 bit"),
            (0x9, &[W8, W64], "64,8 bit"),
            (0xa, &[W16, W64], "64,16 bit"),
            (0xb, &[W8, W16, W64], "64,16,8 bit"),
            (0xc, &[W32, W64], "64,32 bit"),
            (0xd, &[W8, W32, W64], "64,32,8 bit"),
            (0xe, &[W16, W32, W64], "64,32,16 bit"),
            (0xf, &[W8, W16, W32, W64], "64,32,16,8 bit"),
        ];
        for (code, members, label) in expected {
            let s = widths_for_code(code).expect("valid code");
            assert_eq!(s.iter().collect::<Vec<_>>(), members, "code {:#x}", code);
            assert_eq!(label_for_code(code), label);
            for w in Width::ALL {
                let bit = w.bytes() as u8;
                assert_eq!(s.contains(w), code & bit != 0, "code {:#x} {}", code, w);
            }
        }
    }

    #[test]
    fn max_values() {
        assert_eq!(Width::W8.max_value(), 0xFF);
        assert_eq!(Width::W32.max_value(), 0xFFFF_FFFF);
        assert_eq!(Width::W64.max_value(), u64::MAX);
    }
}
