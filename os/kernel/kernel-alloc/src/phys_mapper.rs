//! # Direct-Map PhysMapper for Kernel Virtual Memory
//!
//! This module provides a [`PhysMapper`] implementation for the kernel's
//! direct-mapped segment: every physical address below 512 MiB is visible at
//! `KSEG0_BASE + pa` without a page-table walk.
//!
//! ## Why is this needed?
//! - Code can only dereference virtual addresses, not physical ones.
//! - Page tables, the frame table and page contents all live in physical
//!   frames, so the kernel needs a way to "touch" a physical address.
//! - Tests use a different strategy (a heap buffer standing in for RAM); the
//!   trait hides the difference.
//!
//! ## See also
//! - [`PhysMapper`] trait in `kernel-vmem`
//! - [`kernel_info::memory`] for the segment bounds

use kernel_info::memory::{KSEG0_BASE, paddr_to_kvaddr};
use kernel_memory_addresses::PhysicalAddress;
use kernel_vmem::PhysMapper;

/// [`PhysMapper`] implementation for the direct-mapped kernel segment.
///
/// # Safety
/// - The returned pointer is only valid for physical addresses the segment
///   reaches (below `DIRECT_MAP_LIMIT`).
/// - The returned pointer must only be used for RAM the caller owns.
///
/// # Example
/// ```rust
/// use kernel_alloc::phys_mapper::Kseg0PhysMapper;
/// use kernel_memory_addresses::PhysicalAddress;
/// use kernel_vmem::PhysMapper;
///
/// let p = Kseg0PhysMapper.phys_to_ptr::<u32>(PhysicalAddress::new(0x0001_2000));
/// assert_eq!(p.addr(), 0x8001_2000);
/// ```
#[derive(Debug, Default, Copy, Clone)]
pub struct Kseg0PhysMapper;

impl PhysMapper for Kseg0PhysMapper {
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        debug_assert!(
            paddr_to_kvaddr(pa).is_some(),
            "{pa} is outside the direct map"
        );
        core::ptr::with_exposed_provenance_mut(pa.as_u32().wrapping_add(KSEG0_BASE) as usize)
    }
}
