//! # Frame Table and Free List
//!
//! One [`FrameEntry`] per usable frame, stored in the lowest frames of the
//! usable range itself:
//!
//! ```text
//! first                    first + footprint                       last
//!   ├── entries[0..total] ──┼──── free frames, linked by index ─────┤
//!   │  (always Allocated)   │  head → i → entries[i].next → … → None │
//! ```
//!
//! Links are indices into the entry array, never addresses, and an entry is
//! either allocated or a free-list link, never both.

use crate::BootstrapError;
use core::slice;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalFrame, pages_for};
use kernel_vmem::{AllocError, FreeError, PhysMapper};

/// Metadata of one frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FrameEntry {
    Allocated,
    /// On the free list; `next` is the index of the following free frame.
    Free { next: Option<u32> },
}

/// The frame table, threaded by an index-linked LIFO list of free frames.
pub(crate) struct FreeList<'m> {
    first: PhysicalFrame,
    entries: &'m mut [FrameEntry],
    footprint: u32,
    head: Option<u32>,
    free: usize,
}

impl<'m> FreeList<'m> {
    /// Build the table over `total` frames starting at `first`, placing the
    /// entries themselves at `first`.
    ///
    /// Every frame above the footprint is seeded onto the list in ascending
    /// order and the last one terminates it.
    ///
    /// # Safety
    /// `[first, first + total)` must be RAM reachable through `mapper` for
    /// `'m` and owned by nobody else.
    pub(crate) unsafe fn build<M: PhysMapper>(
        mapper: &'m M,
        first: PhysicalFrame,
        total: u32,
    ) -> Result<Self, BootstrapError> {
        let footprint = footprint_frames(total);
        if footprint >= u64::from(total) {
            return Err(BootstrapError::FootprintExhaustsMemory {
                footprint_frames: usize::try_from(footprint).unwrap_or(usize::MAX),
                total_frames: total as usize,
            });
        }
        #[allow(clippy::cast_possible_truncation)]
        let footprint = footprint as u32;

        let base = mapper.phys_to_ptr::<FrameEntry>(first.base());
        for i in 0..total {
            let entry = if i < footprint {
                FrameEntry::Allocated
            } else {
                FrameEntry::Free {
                    next: (i + 1 < total).then_some(i + 1),
                }
            };
            unsafe { base.add(i as usize).write(entry) };
        }
        let entries = unsafe { slice::from_raw_parts_mut(base, total as usize) };

        Ok(Self {
            first,
            entries,
            footprint,
            head: Some(footprint),
            free: (total - footprint) as usize,
        })
    }

    pub(crate) fn total(&self) -> usize {
        self.entries.len()
    }

    pub(crate) const fn footprint(&self) -> u32 {
        self.footprint
    }

    pub(crate) const fn free(&self) -> usize {
        self.free
    }

    /// First frame past the table's own storage.
    pub(crate) fn reserved_end(&self) -> PhysicalFrame {
        self.frame_at(self.footprint)
    }

    fn frame_at(&self, index: u32) -> PhysicalFrame {
        PhysicalFrame::from_number(self.first.number() + index)
    }

    /// Index of `frame`, if it lies in the table.
    fn index_of(&self, frame: PhysicalFrame) -> Option<u32> {
        let index = frame.number().checked_sub(self.first.number())?;
        ((index as usize) < self.entries.len()).then_some(index)
    }

    /// Take the most recently freed frame.
    pub(crate) fn pop(&mut self) -> Result<PhysicalFrame, AllocError> {
        let index = self.head.ok_or(AllocError::Exhausted)?;
        let entry = &mut self.entries[index as usize];
        let FrameEntry::Free { next } = *entry else {
            return Err(AllocError::Corrupt(self.frame_at(index).base()));
        };
        *entry = FrameEntry::Allocated;
        self.head = next;
        self.free -= 1;
        Ok(self.frame_at(index))
    }

    /// Put `frame` at the head of the list.
    ///
    /// The caller has already routed frames below [`reserved_end`](Self::reserved_end)
    /// elsewhere.
    pub(crate) fn push(&mut self, frame: PhysicalFrame) -> Result<(), FreeError> {
        let index = self
            .index_of(frame)
            .ok_or(FreeError::OutOfRange(frame.base()))?;
        debug_assert!(index >= self.footprint);
        let entry = &mut self.entries[index as usize];
        if let FrameEntry::Free { .. } = entry {
            return Err(FreeError::DoubleFree(frame.base()));
        }
        *entry = FrameEntry::Free { next: self.head };
        self.head = Some(index);
        self.free += 1;
        Ok(())
    }
}

/// Frames needed to store `total` entries.
fn footprint_frames(total: u32) -> u64 {
    pages_for(u64::from(total) * size_of::<FrameEntry>() as u64)
}

const _: () = assert!(size_of::<FrameEntry>() <= PAGE_SIZE as usize);
