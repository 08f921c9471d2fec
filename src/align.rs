//! Slot sizes derived from the negotiated address and data widths.

use crate::width::Width;

/// Negotiated operating widths for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widths {
    pub addr: Width,
    pub data: Width,
}

impl Widths {
    pub fn new(addr: Width, data: Width) -> Self {
        Widths { addr, data }
    }

    pub fn alignment(&self) -> Alignment {
        Alignment::for_widths(*self)
    }
}

/// `alignment` is the size of one field slot; `record_alignment` is the size of a record
/// header slot (and of the packet header once padded, and of one padding record).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub alignment: usize,
    pub record_alignment: usize,
}

impl Alignment {
    pub fn for_widths(widths: Widths) -> Self {
        let alignment = widths.addr.bytes().max(widths.data.bytes()).max(2);
        Alignment {
            alignment,
            record_alignment: alignment.max(4),
        }
    }

    /// Bytes occupied by a record with `wr` writes and `rd` reads, header included.
    pub fn record_size(&self, wr: u8, rd: u8) -> usize {
        let wr = wr as usize;
        let rd = rd as usize;
        let slots = wr + rd + usize::from(wr > 0) + usize::from(rd > 0);
        self.record_alignment + slots * self.alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_widths_round_up() {
        let a = Alignment::for_widths(Widths::new(Width::W8, Width::W8));
        assert_eq!(a, Alignment { alignment: 2, record_alignment: 4 });
    }

    #[test]
    fn wide_widths() {
        let a = Alignment::for_widths(Widths::new(Width::W16, Width::W64));
        assert_eq!(a, Alignment { alignment: 8, record_alignment: 8 });
        let a = Alignment::for_widths(Widths::new(Width::W32, Width::W16));
        assert_eq!(a, Alignment { alignment: 4, record_alignment: 4 });
    }

    #[test]
    fn record_sizes() {
        let a = Alignment::for_widths(Widths::new(Width::W32, Width::W32));
        assert_eq!(a.record_size(0, 0), 4);
        assert_eq!(a.record_size(1, 0), 12);
        assert_eq!(a.record_size(2, 3), 4 + 7 * 4);
        assert_eq!(a.record_size(255, 255), 4 + 512 * 4);
    }
}
