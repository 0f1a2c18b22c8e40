//! # Page Directory
//!
//! The root of an address space. Slot `i` covers virtual addresses
//! `[i << 22, (i + 1) << 22)` and either is [`DirectorySlot::Absent`] or
//! names the frame of the [`PageTable`](super::PageTable) for that range.

use crate::PageEntryBits;
use kernel_info::memory::PT_ENTRIES;
use kernel_memory_addresses::PhysicalFrame;

/// Decoded top-level slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DirectorySlot {
    Absent,
    Table(PhysicalFrame),
}

/// The top-level table: 1024 slots, 4 KiB-aligned.
#[doc(alias = "PD")]
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PageEntryBits; PT_ENTRIES],
}

impl From<DirectorySlot> for PageEntryBits {
    #[inline]
    fn from(slot: DirectorySlot) -> Self {
        match slot {
            DirectorySlot::Absent => Self::new(),
            DirectorySlot::Table(frame) => Self::for_frame(frame),
        }
    }
}

impl From<PageEntryBits> for DirectorySlot {
    #[inline]
    fn from(bits: PageEntryBits) -> Self {
        bits.frame().map_or(Self::Absent, Self::Table)
    }
}

impl PageDirectory {
    /// Create a directory with every slot absent.
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageEntryBits::new(); PT_ENTRIES],
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> DirectorySlot {
        self.entries[index].into()
    }

    #[inline]
    pub fn set(&mut self, index: usize, slot: DirectorySlot) {
        self.entries[index] = slot.into();
    }

    /// Frames of all present second-level tables, with their slot index.
    pub fn tables(&self) -> impl Iterator<Item = (usize, PhysicalFrame)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.frame().map(|f| (i, f)))
    }
}
