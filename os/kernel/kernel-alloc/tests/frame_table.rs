mod common;

use common::{KERNEL_FRAMES, RAM_FRAMES, TestPhys, allocator};
use kernel_alloc::boot_ram::{BootRam, BumpRam};
use kernel_alloc::{BootstrapError, FrameAllocError, FrameAllocator};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalFrame, VirtualAddress};
use kernel_vmem::{AllocError, FrameAlloc, FreeError};
use std::collections::BTreeSet;

fn frame(n: u32) -> PhysicalFrame {
    PhysicalFrame::from_number(n)
}

#[test]
fn bootstrap_reserves_the_table_and_seeds_ascending() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);
    assert!(!frames.is_bootstrapped());
    assert_eq!(frames.total_frames(), 0);

    frames.bootstrap().unwrap();
    assert!(frames.is_bootstrapped());

    let total = (RAM_FRAMES - KERNEL_FRAMES) as usize;
    assert_eq!(frames.total_frames(), total);
    assert_eq!(frames.footprint_frames(), 1);
    assert_eq!(frames.free_frames(), total - 1);

    let first_free = KERNEL_FRAMES + 1;
    for n in first_free..first_free + 3 {
        assert_eq!(frames.allocate(1), Ok(frame(n)));
    }
}

#[test]
fn freed_frames_come_back_in_reverse_order() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);
    frames.bootstrap().unwrap();

    let taken: Vec<_> = (0..5).map(|_| frames.allocate(1).unwrap()).collect();
    for &f in &taken {
        frames.free(f).unwrap();
    }
    let again: Vec<_> = (0..5).map(|_| frames.allocate(1).unwrap()).collect();

    assert_eq!(again, taken.into_iter().rev().collect::<Vec<_>>());
}

#[test]
fn contiguous_runs_only_before_bootstrap() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);

    let a = frames.allocate(3).unwrap();
    let b = frames.allocate(2).unwrap();
    assert_eq!(a, frame(KERNEL_FRAMES));
    assert_eq!(b, frame(a.number() + 3));

    frames.bootstrap().unwrap();
    assert_eq!(frames.total_frames(), (RAM_FRAMES - KERNEL_FRAMES - 5) as usize);
    assert_eq!(
        frames.allocate(2),
        Err(FrameAllocError::MultiFrameAfterBootstrap { requested: 2 })
    );
    assert_eq!(frames.allocate(0), Err(FrameAllocError::ZeroFrames));
    assert!(frames.allocate(1).is_ok());
}

#[test]
fn freeing_reserved_frames_is_counted_not_reclaimed() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);
    let stolen = frames.allocate(1).unwrap();

    // Before bootstrap nothing can be reclaimed.
    frames.free(stolen).unwrap();
    assert_eq!(frames.leaked_frees(), 1);

    frames.bootstrap().unwrap();
    let free = frames.free_frames();

    frames.free(stolen).unwrap();
    let table = frame(KERNEL_FRAMES + 1);
    frames.free(table).unwrap();

    assert_eq!(frames.leaked_frees(), 3);
    assert_eq!(frames.free_frames(), free);
    assert_ne!(frames.allocate(1), Ok(table));
}

#[test]
fn double_free_and_foreign_frames_are_rejected() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);
    frames.bootstrap().unwrap();

    let f = frames.allocate(1).unwrap();
    frames.free(f).unwrap();
    assert_eq!(frames.free(f), Err(FreeError::DoubleFree(f.base())));

    let beyond = frame(RAM_FRAMES);
    assert_eq!(frames.free(beyond), Err(FreeError::OutOfRange(beyond.base())));
    assert_eq!(frames.leaked_frees(), 0);
}

#[test]
fn exhaustion_is_recoverable() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);
    frames.bootstrap().unwrap();

    let all: Vec<_> = std::iter::from_fn(|| frames.alloc_4k().ok()).collect();
    assert_eq!(all.len(), (RAM_FRAMES - KERNEL_FRAMES - 1) as usize);
    assert_eq!(all.last(), Some(&frame(RAM_FRAMES - 1)));
    assert_eq!(frames.allocate(1), Err(FrameAllocError::OutOfMemory));
    assert_eq!(frames.free_frames(), 0);

    frames.free_4k(all[10]).unwrap();
    assert_eq!(frames.allocate(1), Ok(all[10]));
    assert_eq!(frames.alloc_4k(), Err(AllocError::Exhausted));
}

#[test]
fn boot_ram_runs_out() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);
    assert_eq!(
        frames.allocate((RAM_FRAMES - KERNEL_FRAMES + 1) as usize),
        Err(FrameAllocError::OutOfMemory)
    );
}

#[test]
fn bootstrap_only_once() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);
    frames.bootstrap().unwrap();
    assert_eq!(frames.bootstrap(), Err(BootstrapError::AlreadyBootstrapped));
}

#[test]
fn bootstrap_rejects_ram_too_small_for_its_table() {
    let phys = TestPhys::with_frames(4);
    let ram = BumpRam::new(PhysicalAddress::new(0x1000), PhysicalAddress::new(0x2000));
    let frames = FrameAllocator::new(&phys, ram);
    assert_eq!(
        frames.bootstrap(),
        Err(BootstrapError::FootprintExhaustsMemory {
            footprint_frames: 1,
            total_frames: 1
        })
    );
    assert!(!frames.is_bootstrapped());
}

#[test]
fn bootstrap_rejects_empty_ram() {
    let phys = TestPhys::with_frames(4);
    let frames = allocator(&phys);
    frames
        .allocate((RAM_FRAMES - KERNEL_FRAMES) as usize)
        .unwrap();
    assert_eq!(frames.bootstrap(), Err(BootstrapError::EmptyRange));
}

struct Crooked;

impl BootRam for Crooked {
    fn steal(&mut self, _: usize) -> Option<PhysicalFrame> {
        None
    }

    fn usable_range(&mut self) -> (PhysicalAddress, PhysicalAddress) {
        (PhysicalAddress::new(0x1010), PhysicalAddress::new(0x8000))
    }
}

#[test]
fn bootstrap_rejects_unaligned_range() {
    let phys = TestPhys::with_frames(8);
    let frames = FrameAllocator::new(&phys, Crooked);
    assert_eq!(
        frames.bootstrap(),
        Err(BootstrapError::Unaligned {
            first: PhysicalAddress::new(0x1010),
            last: PhysicalAddress::new(0x8000),
        })
    );
}

#[test]
fn kernel_pages_go_through_the_direct_map() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);

    let early = frames.alloc_kpages(2).unwrap();
    assert_eq!(early.as_u32(), 0x8000_0000 + KERNEL_FRAMES * PAGE_SIZE);

    frames.bootstrap().unwrap();
    let free = frames.free_frames();
    let page = frames.alloc_kpages(1).unwrap();
    assert_eq!(frames.free_frames(), free - 1);

    frames.free_kpages(page).unwrap();
    assert_eq!(frames.free_frames(), free);

    let user = VirtualAddress::new(0x0040_0000);
    assert_eq!(frames.free_kpages(user), Err(FreeError::NotDirectMapped(user)));
}

#[test]
fn concurrent_allocations_never_hand_out_a_frame_twice() {
    let phys = TestPhys::with_frames(RAM_FRAMES as usize);
    let frames = allocator(&phys);
    frames.bootstrap().unwrap();
    let free = frames.free_frames();

    let per_thread = 12;
    let taken: Vec<PhysicalFrame> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    let mut mine = Vec::new();
                    for i in 0..per_thread {
                        let f = frames.allocate(1).unwrap();
                        if i % 3 == 0 {
                            frames.free(f).unwrap();
                        } else {
                            mine.push(f);
                        }
                    }
                    mine
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect()
    });

    let unique: BTreeSet<_> = taken.iter().copied().collect();
    assert_eq!(unique.len(), taken.len());
    assert_eq!(frames.free_frames(), free - taken.len());

    for f in taken {
        frames.free(f).unwrap();
    }
    assert_eq!(frames.free_frames(), free);
}
