use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalFrame;

/// A single 32-bit page-table word in its raw bitfield form.
///
/// Both levels share this layout. At the top level a valid word points at a
/// second-level table; at the second level it points at the data frame that
/// backs a page.
///
/// ### Bit layout
///
/// | Bits  | Name           | Meaning |
/// |-------|----------------|---------|
/// | 0     | `valid`        | The frame number is meaningful |
/// | 1–11  | reserved       | Always zero |
/// | 12–31 | `frame_number` | Physical frame bits [31:12] |
///
/// A word with `valid` clear is all zeroes. Only the table types read or
/// write these bits; everything else goes through
/// [`DirectorySlot`](crate::DirectorySlot) and [`PtSlot`](crate::PtSlot).
///
/// ### Example
/// ```rust
/// # use kernel_memory_addresses::PhysicalFrame;
/// # use kernel_vmem::PageEntryBits;
/// let e = PageEntryBits::for_frame(PhysicalFrame::from_number(0x123));
/// assert!(e.valid());
/// assert_eq!(e.into_bits(), 0x0012_3001);
/// ```
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PageEntryBits {
    /// Slot holds a frame.
    pub valid: bool,

    #[bits(11)]
    __: u16,

    /// Physical frame number (`base >> 12`).
    #[bits(20)]
    pub frame_number: u32,
}

impl PageEntryBits {
    /// A valid word pointing at `frame`.
    #[inline]
    #[must_use]
    pub const fn for_frame(frame: PhysicalFrame) -> Self {
        Self::new()
            .with_valid(true)
            .with_frame_number(frame.number())
    }

    /// The frame this word points at, if valid.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> Option<PhysicalFrame> {
        if self.valid() {
            Some(PhysicalFrame::from_number(self.frame_number()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_word_is_zero() {
        let e = PageEntryBits::new();
        assert_eq!(e.into_bits(), 0);
        assert_eq!(e.frame(), None);
    }

    #[test]
    fn top_frame_fits_the_word() {
        let top = PhysicalFrame::from_number(0xF_FFFF);
        let e = PageEntryBits::for_frame(top);
        assert_eq!(e.into_bits(), 0xFFFF_F001);
        assert_eq!(e.frame(), Some(top));
    }
}
