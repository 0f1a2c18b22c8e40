use crate::{PAGE_FRAME, PAGE_SHIFT, PAGE_SIZE, VirtualAddress};
use core::fmt;

/// Number of address bits that select a slot in one page-table level.
const INDEX_BITS: u32 = 10;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const DIRECTORY_SHIFT: u32 = PAGE_SHIFT + INDEX_BITS;

/// Base of one virtual page.
///
/// Besides alignment, a page knows where it sits in the two-level table:
///
/// ```text
/// | 31‒22           | 21‒12       | 11‒0   |
/// | directory index | table index | offset |
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage(u32);

impl VirtualPage {
    #[inline]
    #[must_use]
    pub const fn containing(va: VirtualAddress) -> Self {
        Self(va.as_u32() & PAGE_FRAME)
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> VirtualAddress {
        VirtualAddress::new(self.0)
    }

    /// Top-level slot index (bits 31‒22).
    #[inline]
    #[must_use]
    pub const fn directory_index(self) -> usize {
        (self.0 >> DIRECTORY_SHIFT) as usize
    }

    /// Second-level slot index (bits 21‒12).
    #[inline]
    #[must_use]
    pub const fn table_index(self) -> usize {
        ((self.0 >> PAGE_SHIFT) & INDEX_MASK) as usize
    }

    /// The page `n` pages above this one, if it is still addressable.
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

impl fmt::Display for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base(), f)
    }
}

impl fmt::Debug for VirtualPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VirtualPage(0x{:08X} [{}:{}])",
            self.0,
            self.directory_index(),
            self.table_index()
        )
    }
}
