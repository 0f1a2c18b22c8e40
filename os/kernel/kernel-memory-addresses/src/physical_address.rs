use crate::{PAGE_FRAME, PAGE_SIZE, PhysicalFrame};
use core::fmt;

/// Physical memory address.
///
/// Carries intent and prevents accidental VA↔PA mix-ups. Use
/// [`PhysicalAddress::frame`] / [`PhysicalAddress::offset`] to split it into a
/// frame base and an in-frame offset.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u32);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u32) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// `true` if the address sits on a frame boundary.
    #[inline]
    #[must_use]
    pub const fn is_frame_aligned(self) -> bool {
        self.0 & (PAGE_SIZE - 1) == 0
    }

    /// The frame that contains this address.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> PhysicalFrame {
        PhysicalFrame::containing(self)
    }

    /// Byte offset inside the containing frame.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.0 & !PAGE_FRAME
    }

    #[inline]
    #[must_use]
    pub const fn split(self) -> (PhysicalFrame, u32) {
        (self.frame(), self.offset())
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:08X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for PhysicalAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u32 {
    #[inline]
    fn from(a: PhysicalAddress) -> Self {
        a.0
    }
}

impl From<PhysicalFrame> for PhysicalAddress {
    #[inline]
    fn from(value: PhysicalFrame) -> Self {
        value.base()
    }
}
