use crate::{PAGE_FRAME, PAGE_SHIFT, PAGE_SIZE, PhysicalAddress};
use core::fmt;

/// Base of one physical frame.
///
/// A `PhysicalFrame` is always frame-aligned: the only constructors round
/// down ([`PhysicalFrame::containing`]) or build from a frame number.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x0012_3456);
/// let frame = pa.frame();
/// assert_eq!(frame.base().as_u32(), 0x0012_3000);
/// assert_eq!(frame.number(), 0x123);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalFrame(u32);

impl PhysicalFrame {
    /// The frame that contains `pa` (low bits dropped).
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self(pa.as_u32() & PAGE_FRAME)
    }

    /// Frame with the given frame number (`base >> PAGE_SHIFT`).
    ///
    /// ### Debug assertions
    /// - Asserts that the number fits the 32-bit physical space.
    #[inline]
    #[must_use]
    pub const fn from_number(n: u32) -> Self {
        debug_assert!(n < (1 << (32 - PAGE_SHIFT)));
        Self(n << PAGE_SHIFT)
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0)
    }

    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }

    /// The frame `n` frames above this one, if it is still addressable.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, n: u32) -> Option<Self> {
        let Some(bytes) = n.checked_mul(PAGE_SIZE) else {
            return None;
        };
        match self.0.checked_add(bytes) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Display for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base(), f)
    }
}

impl fmt::Debug for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalFrame(0x{:08X})", self.0)
    }
}
