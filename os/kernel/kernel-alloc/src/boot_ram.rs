//! # Boot RAM
//!
//! Before the frame table exists, memory comes straight off the bottom of
//! RAM. Stolen frames are contiguous, handed out in increasing address order
//! and never reclaimed.

use kernel_memory_addresses::{PhysicalAddress, PhysicalFrame, align_down, align_up};

/// The early-boot memory primitive.
pub trait BootRam {
    /// Take `npages` contiguous frames; `None` once RAM runs out.
    fn steal(&mut self, npages: usize) -> Option<PhysicalFrame>;

    /// Frame-aligned bounds `[first, last)` of RAM not yet stolen. Queried
    /// once, when the frame table takes over.
    fn usable_range(&mut self) -> (PhysicalAddress, PhysicalAddress);
}

/// A bump pointer over `[first, last)`.
///
/// ```rust
/// # use kernel_alloc::boot_ram::{BootRam, BumpRam};
/// # use kernel_memory_addresses::PhysicalAddress;
/// let mut ram = BumpRam::new(PhysicalAddress::new(0x1800), PhysicalAddress::new(0x8000));
/// let a = ram.steal(2).unwrap();
/// let b = ram.steal(1).unwrap();
/// assert_eq!(a.base().as_u32(), 0x2000);
/// assert_eq!(b.base().as_u32(), 0x4000);
/// assert_eq!(ram.usable_range().0.as_u32(), 0x5000);
/// ```
#[derive(Debug)]
pub struct BumpRam {
    first: PhysicalAddress,
    last: PhysicalAddress,
}

impl BumpRam {
    /// RAM spanning `[first, last)`, shrunk inward to frame boundaries.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(first: PhysicalAddress, last: PhysicalAddress) -> Self {
        let lo = align_up(first.as_u32() as u64);
        let hi = align_down(last.as_u32()) as u64;
        let lo = if lo > hi { hi } else { lo };
        Self {
            first: PhysicalAddress::new(lo as u32),
            last: PhysicalAddress::new(hi as u32),
        }
    }
}

impl BootRam for BumpRam {
    fn steal(&mut self, npages: usize) -> Option<PhysicalFrame> {
        let frame = self.first.frame();
        let end = frame.checked_add(u32::try_from(npages).ok()?)?.base();
        if end > self.last {
            return None;
        }
        self.first = end;
        Some(frame)
    }

    fn usable_range(&mut self) -> (PhysicalAddress, PhysicalAddress) {
        (self.first, self.last)
    }
}
