use crate::{PAGE_FRAME, VirtualPage};
use core::fmt;

/// Virtual memory address.
///
/// User addresses live below the kernel's direct-mapped segment; kernel
/// addresses of allocated frames live inside it. Both are plain
/// `VirtualAddress`es, the distinction is made by the layout constants.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u32);

impl VirtualAddress {
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

    /// The page that contains this address.
    #[inline]
    #[must_use]
    pub const fn page(self) -> VirtualPage {
        VirtualPage::containing(self)
    }

    /// Byte offset inside the containing page.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u32 {
        self.0 & !PAGE_FRAME
    }

    #[inline]
    #[must_use]
    pub const fn split(self) -> (VirtualPage, u32) {
        (self.page(), self.offset())
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:08X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

impl From<u32> for VirtualAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl From<VirtualAddress> for u32 {
    #[inline]
    fn from(a: VirtualAddress) -> Self {
        a.0
    }
}

impl From<VirtualPage> for VirtualAddress {
    #[inline]
    fn from(value: VirtualPage) -> Self {
        value.base()
    }
}
