//! # Second-Level Page Table
//!
//! A [`PageTable`] covers 4 MiB of virtual space: 1024 slots of one page
//! each. A slot is in one of two states:
//!
//! - [`PtSlot::Unmapped`]: the page is declared but has no data frame yet.
//!   The first touch faults and the handler attaches a frame.
//! - [`PtSlot::Backed`]: the page owns the given data frame.
//!
//! Pages outside every declared region share the `Unmapped` encoding; the
//! region list, not the table, decides whether an address is legal.

use crate::PageEntryBits;
use kernel_info::memory::PT_ENTRIES;
use kernel_memory_addresses::PhysicalFrame;

/// Decoded second-level slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PtSlot {
    Unmapped,
    Backed(PhysicalFrame),
}

/// A second-level table: 1024 slots, 4 KiB-aligned.
#[doc(alias = "PT")]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageEntryBits; PT_ENTRIES],
}

impl From<PtSlot> for PageEntryBits {
    #[inline]
    fn from(slot: PtSlot) -> Self {
        match slot {
            PtSlot::Unmapped => Self::new(),
            PtSlot::Backed(frame) => Self::for_frame(frame),
        }
    }
}

impl From<PageEntryBits> for PtSlot {
    #[inline]
    fn from(bits: PageEntryBits) -> Self {
        bits.frame().map_or_else(
            || {
                debug_assert_eq!(bits.into_bits(), 0, "stale bits in unmapped slot");
                Self::Unmapped
            },
            Self::Backed,
        )
    }
}

impl PageTable {
    /// Create a table with every slot unmapped.
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageEntryBits::new(); PT_ENTRIES],
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> PtSlot {
        self.entries[index].into()
    }

    /// Write the slot at `index`.
    ///
    /// Caller must flush the TLB if this table belongs to the running
    /// address space and a backed slot changed.
    #[inline]
    pub fn set(&mut self, index: usize, slot: PtSlot) {
        self.entries[index] = slot.into();
    }

    /// All backed slots in index order.
    pub fn backed(&self) -> impl Iterator<Item = (usize, PhysicalFrame)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.frame().map(|f| (i, f)))
    }
}
