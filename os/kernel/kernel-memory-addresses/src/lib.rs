//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for the 32-bit addresses and page bases used by the
//! frame allocator and the software-walked page table.
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | A byte address in physical memory. |
//! | [`PhysicalFrame`] | The page-aligned base of one physical frame. |
//! | [`VirtualAddress`] | A byte address in a (user or kernel) virtual address space. |
//! | [`VirtualPage`] | The page-aligned base of one virtual page. |
//!
//! Frames and pages share one granularity, [`PAGE_SIZE`]. The aligned types
//! can only be built by rounding down, so "frame-aligned" is a property of the
//! type instead of something every caller re-checks.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0x0040_1234);
//! let (page, off) = va.split();
//! assert_eq!(page.base().as_u32(), 0x0040_1000);
//! assert_eq!(off, 0x234);
//! assert_eq!((page.directory_index(), page.table_index()), (1, 1));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod physical_address;
mod physical_frame;
mod virtual_address;
mod virtual_page;

pub use physical_address::PhysicalAddress;
pub use physical_frame::PhysicalFrame;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

/// Size of a frame (physical) and of a page (virtual), in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// `log2(PAGE_SIZE)`; number of low address bits that form the in-page offset.
pub const PAGE_SHIFT: u32 = 12;

/// Mask selecting the page-aligned part of an address.
pub const PAGE_FRAME: u32 = !(PAGE_SIZE - 1);

/// Align `x` down to a page boundary.
///
/// ```rust
/// # use kernel_memory_addresses::align_down;
/// assert_eq!(align_down(0), 0);
/// assert_eq!(align_down(4095), 0);
/// assert_eq!(align_down(4097), 4096);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_down(x: u32) -> u32 {
    x & PAGE_FRAME
}

/// Align `x` up to a page boundary, widening to `u64` so the top page of the
/// 32-bit space cannot wrap.
///
/// ```rust
/// # use kernel_memory_addresses::align_up;
/// assert_eq!(align_up(1), 4096);
/// assert_eq!(align_up(4096), 4096);
/// assert_eq!(align_up(0xFFFF_F001), 0x1_0000_0000);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(x: u64) -> u64 {
    (x + (PAGE_SIZE as u64 - 1)) & !(PAGE_SIZE as u64 - 1)
}

/// Number of pages needed to cover `bytes` bytes.
#[inline(always)]
#[must_use]
pub const fn pages_for(bytes: u64) -> u64 {
    align_up(bytes) >> PAGE_SHIFT
}
