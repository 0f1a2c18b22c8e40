//! Simulated RAM for unit tests.

use core::cell::UnsafeCell;
use kernel_memory_addresses::PhysicalAddress;
use kernel_vmem::PhysMapper;

#[repr(align(4096))]
struct Aligned4K([u8; 4096]);

/// Frame `n` of the buffer is physical frame `base + n`.
pub struct Ram {
    base: u32,
    frames: Box<[UnsafeCell<Aligned4K>]>,
}

impl Ram {
    pub fn new(frames: usize) -> Self {
        Self::at(0, frames)
    }

    /// RAM starting at physical frame `base`.
    pub fn at(base: u32, frames: usize) -> Self {
        Self {
            base,
            // Garbage everywhere, so nothing relies on zeroed RAM.
            frames: (0..frames)
                .map(|_| UnsafeCell::new(Aligned4K([0xA5; 4096])))
                .collect(),
        }
    }
}

impl PhysMapper for Ram {
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        let (frame, offset) = pa.split();
        self.frames[(frame.number() - self.base) as usize]
            .get()
            .cast::<u8>()
            .wrapping_add(offset as usize)
            .cast()
    }
}
