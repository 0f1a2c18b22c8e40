//! # Virtual Memory Support
//!
//! Per-process address spaces over a two-level software page table, for a
//! 32-bit kernel with a software-refilled TLB.
//!
//! ## What you get
//! - An [`AddressSpace`] that owns a top-level [`PageDirectory`], the
//!   second-level [`PageTable`]s below it, every data frame they point at,
//!   and the list of declared [`Region`]s.
//! - A 4 KiB-aligned table wrapper per level with typed slots
//!   ([`DirectorySlot`], [`PtSlot`]); the packed 32-bit words only exist in
//!   [`PageEntryBits`].
//! - A tiny allocator/mapper interface ([`FrameAlloc`], [`PhysMapper`]) and a
//!   [`Tlb`] seam for flushing the translation cache.
//!
//! ## Virtual Address → Slot Walk
//!
//! Each 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22           | 21‒12       | 11‒0   |
//! | directory index | table index | offset |
//! ```
//!
//! ```text
//!  PageDirectory  →  PageTable  →  data frame
//!     (root)          (on demand)    (on first touch)
//! ```
//!
//! | Level | Table | Slot | Meaning |
//! |:------|:------|:-----|:--------|
//! | 1 | [`PageDirectory`] | [`DirectorySlot`] | `Absent`, or the frame of a second-level table. One per address space. |
//! | 2 | [`PageTable`] | [`PtSlot`] | `Unmapped` (declared, not yet backed) or the backing data frame. |
//!
//! Declaring a region guarantees that the second-level tables for all of its
//! pages exist. Data frames are only attached later, by the fault handler
//! through [`AddressSpace::map_frame`], or by [`AddressSpace::copy`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod address_space;
mod error;
mod page_entry_bits;
mod page_table;
mod tlb;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::address_space::{AddressSpace, Permissions, Region};
pub use crate::error::{AllocError, FreeError, InvariantViolation, VmError};
pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::{DirectorySlot, PageDirectory, PageTable, PtSlot};
pub use crate::tlb::{Tlb, invalidate_all};

use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalFrame};

/// Re-export constants as info module.
pub use kernel_info::memory as info;

/// Source of **physical** 4 KiB frames for page tables and page contents.
///
/// The implementation decides where frames come from (boot pool, free
/// list, …). Returned frames are exclusively owned by the caller until they
/// are handed back through [`FrameAlloc::free_4k`].
///
/// Both methods take `&self`; implementations serialize internally so that
/// several address spaces can share one allocator.
pub trait FrameAlloc {
    /// Allocate one 4 KiB physical frame.
    ///
    /// # Errors
    /// [`AllocError::Exhausted`] when no frame is left, which the caller may
    /// recover from; [`AllocError::Corrupt`] when the allocator's own state
    /// is broken, which it may not.
    fn alloc_4k(&self) -> Result<PhysicalFrame, AllocError>;

    /// Return a frame obtained from [`FrameAlloc::alloc_4k`].
    ///
    /// # Errors
    /// Implementations reject frames they never handed out, and frames that
    /// are already free.
    fn free_4k(&self, frame: PhysicalFrame) -> Result<(), FreeError>;
}

/// Converts physical addresses to usable pointers in the current virtual
/// address space.
///
/// Typical patterns:
/// - **Kernel**: physical memory is reachable through the direct-mapped
///   segment; add a constant offset.
/// - **Tests**: index into a heap buffer that plays the role of RAM.
pub trait PhysMapper {
    /// Convert a physical address to a raw pointer in the current address
    /// space. Producing the pointer is safe; dereferencing it is not.
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T;

    /// Convert a physical address to a mutable reference.
    ///
    /// # Safety
    /// - `pa` must be mapped writable in the current address space for `'a`.
    /// - The bytes at `pa` must be a valid `T`, suitably aligned.
    /// - No other reference to the same bytes may be live for `'a`.
    #[inline]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        unsafe { &mut *self.phys_to_ptr::<T>(pa) }
    }
}

/// Fill one frame with zero bytes.
///
/// # Safety
/// The caller must own `frame` and `mapper` must reach it.
#[inline]
pub unsafe fn zero_frame<M: PhysMapper + ?Sized>(mapper: &M, frame: PhysicalFrame) {
    let dst = mapper.phys_to_ptr::<u8>(frame.base());
    unsafe { core::ptr::write_bytes(dst, 0, PAGE_SIZE as usize) };
}

/// Copy the full contents of `src` into `dst`.
///
/// # Safety
/// - `src` and `dst` must be distinct frames reachable through `mapper`.
/// - The caller must own `dst`.
#[inline]
pub unsafe fn copy_frame<M: PhysMapper + ?Sized>(
    mapper: &M,
    src: PhysicalFrame,
    dst: PhysicalFrame,
) {
    debug_assert_ne!(src, dst);
    let from = mapper.phys_to_ptr::<u8>(src.base());
    let to = mapper.phys_to_ptr::<u8>(dst.base());
    unsafe { core::ptr::copy_nonoverlapping(from, to, PAGE_SIZE as usize) };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestPhys;

    #[test]
    fn zero_and_copy_touch_whole_frames() {
        let phys = TestPhys::with_frames(4);
        let a = PhysicalFrame::from_number(1);
        let b = PhysicalFrame::from_number(2);

        phys.fill(a, 0xAB);
        phys.fill(b, 0x11);
        unsafe { copy_frame(&phys, a, b) };
        assert!(phys.bytes(b).iter().all(|&x| x == 0xAB));

        unsafe { zero_frame(&phys, a) };
        assert!(phys.bytes(a).iter().all(|&x| x == 0));
        assert!(phys.bytes(b).iter().all(|&x| x == 0xAB));
    }
}
