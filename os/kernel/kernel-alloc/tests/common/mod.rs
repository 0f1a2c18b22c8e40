#![allow(dead_code)]

use core::cell::UnsafeCell;
use kernel_alloc::FrameAllocator;
use kernel_alloc::boot_ram::BumpRam;
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalFrame};
use kernel_vmem::PhysMapper;

/// A 4 KiB-aligned raw frame. We use this as our "physical RAM" backing store in tests.
#[repr(align(4096))]
pub struct Aligned4K([u8; 4096]);

/// Heap-backed "physical RAM": address `pa` lives in frame `pa >> 12`.
pub struct TestPhys {
    frames: Box<[UnsafeCell<Aligned4K>]>,
}

// Test threads only ever touch frames the allocator handed to them.
unsafe impl Sync for TestPhys {}

impl TestPhys {
    pub fn with_frames(n: usize) -> Self {
        Self {
            frames: (0..n)
                .map(|_| UnsafeCell::new(Aligned4K([0xCC; 4096])))
                .collect(),
        }
    }

    fn cell(&self, frame: PhysicalFrame) -> *mut Aligned4K {
        self.frames[frame.number() as usize].get()
    }

    pub fn fill(&self, frame: PhysicalFrame, byte: u8) {
        unsafe { (*self.cell(frame)).0.fill(byte) }
    }

    pub fn bytes(&self, frame: PhysicalFrame) -> [u8; 4096] {
        unsafe { (*self.cell(frame)).0 }
    }
}

impl PhysMapper for TestPhys {
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        let (frame, offset) = pa.split();
        self.cell(frame)
            .cast::<u8>()
            .wrapping_add(offset as usize)
            .cast()
    }
}

/// Frames of simulated RAM.
pub const RAM_FRAMES: u32 = 64;

/// Frames occupied by the "kernel image" below the boot RAM.
pub const KERNEL_FRAMES: u32 = 2;

pub fn boot_ram() -> BumpRam {
    BumpRam::new(
        PhysicalAddress::new(KERNEL_FRAMES * PAGE_SIZE),
        PhysicalAddress::new(RAM_FRAMES * PAGE_SIZE),
    )
}

pub fn allocator(phys: &TestPhys) -> FrameAllocator<'_, TestPhys, BumpRam> {
    FrameAllocator::new(phys, boot_ram())
}
