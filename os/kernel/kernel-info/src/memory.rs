//! # Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │        User Space (kuseg)       │
//!             │   regions declared per process  │
//!             ├─────────────────────────────────┤ USERSTACK - VM_STACKPAGES * PAGE_SIZE
//!             │        User Stack               │
//! 0x8000_0000 ├─────────────────────────────────┤ USERSTACK = KSEG0_BASE
//!             │   Direct-mapped kernel (kseg0)  │
//!             │   kernel VA = PA + KSEG0_BASE   │
//! 0xA000_0000 ├─────────────────────────────────┤ KSEG0_END
//!             │   Uncached / mapped kernel      │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```

use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Base of the direct-mapped kernel segment.
///
/// Every physical frame below 512 MiB is visible to the kernel at
/// `KSEG0_BASE + pa` without a page-table walk.
pub const KSEG0_BASE: u32 = 0x8000_0000;

/// End (exclusive) of the direct-mapped kernel segment.
pub const KSEG0_END: u32 = 0xA000_0000;

/// End (exclusive) of the physical memory the direct map reaches.
pub const DIRECT_MAP_LIMIT: u32 = KSEG0_END - KSEG0_BASE;

/// Top of the user stack; also the initial user stack pointer.
pub const USERSTACK: u32 = KSEG0_BASE;

/// Number of stack pages pre-declared immediately below [`USERSTACK`].
pub const VM_STACKPAGES: u32 = 16;

/// Number of slots in the hardware translation cache.
pub const NUM_TLB: usize = 64;

/// Slots per page-table level (one frame of 32-bit words).
pub const PT_ENTRIES: usize = 1024;

const _: () = {
    assert!(KSEG0_END > KSEG0_BASE);
    assert!(VM_STACKPAGES > 0);
    assert!((VM_STACKPAGES as u64) * 4096 <= USERSTACK as u64);
    assert!(PT_ENTRIES * size_of::<u32>() == 4096);
};

/// Kernel virtual address of a physical address through the direct map.
///
/// Returns `None` when `pa` lies above the part of physical memory that the
/// direct-mapped segment can reach.
#[inline]
#[must_use]
pub const fn paddr_to_kvaddr(pa: PhysicalAddress) -> Option<VirtualAddress> {
    if pa.as_u32() >= DIRECT_MAP_LIMIT {
        return None;
    }
    Some(VirtualAddress::new(pa.as_u32() + KSEG0_BASE))
}

/// Physical address behind a direct-mapped kernel virtual address.
///
/// Returns `None` when `va` is outside `[KSEG0_BASE, KSEG0_END)`.
#[inline]
#[must_use]
pub const fn kvaddr_to_paddr(va: VirtualAddress) -> Option<PhysicalAddress> {
    if va.as_u32() < KSEG0_BASE || va.as_u32() >= KSEG0_END {
        return None;
    }
    Some(PhysicalAddress::new(va.as_u32() - KSEG0_BASE))
}
