//! Fakes for the hardware seams: RAM, frame pool, TLB and interrupt mask.

use crate::{AllocError, FrameAlloc, FreeError, PhysMapper, Tlb};
use alloc::collections::BTreeSet;
use core::cell::{Cell, RefCell, UnsafeCell};
use kernel_memory_addresses::{PhysicalAddress, PhysicalFrame};
use kernel_sync::InterruptControl;

/// A 4 KiB-aligned raw frame. We use this as our "physical RAM" backing store in tests.
#[repr(align(4096))]
pub struct Aligned4K([u8; 4096]);

/// In-memory "RAM": physical address `pa` lives in frame `pa >> 12` of the
/// buffer, at offset `pa & 0xFFF`.
pub struct TestPhys {
    frames: Box<[UnsafeCell<Aligned4K>]>,
}

impl TestPhys {
    pub fn with_frames(n: usize) -> Self {
        Self {
            frames: (0..n)
                .map(|_| UnsafeCell::new(Aligned4K([0; 4096])))
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

struct Pool {
    free: Vec<PhysicalFrame>,
    out: BTreeSet<PhysicalFrame>,
    budget: Option<usize>,
    corrupt: bool,
}

/// LIFO frame pool over a range of frame numbers, tracking what is handed out.
pub struct TestFrames {
    pool: RefCell<Pool>,
}

impl TestFrames {
    /// Pool of frames `first..end`; the lowest number is handed out first.
    pub fn new(first: u32, end: u32) -> Self {
        Self {
            pool: RefCell::new(Pool {
                free: (first..end).rev().map(PhysicalFrame::from_number).collect(),
                out: BTreeSet::new(),
                budget: None,
                corrupt: false,
            }),
        }
    }

    /// Frames currently allocated.
    pub fn outstanding(&self) -> usize {
        self.pool.borrow().out.len()
    }

    pub fn is_allocated(&self, frame: PhysicalFrame) -> bool {
        self.pool.borrow().out.contains(&frame)
    }

    /// Let only `n` more allocations succeed.
    pub fn fail_after(&self, n: usize) {
        self.pool.borrow_mut().budget = Some(n);
    }

    /// Make every later allocation report corrupt bookkeeping.
    pub fn corrupt(&self) {
        self.pool.borrow_mut().corrupt = true;
    }
}

impl FrameAlloc for TestFrames {
    fn alloc_4k(&self) -> Result<PhysicalFrame, AllocError> {
        let mut pool = self.pool.borrow_mut();
        if let Some(&head) = pool.free.last()
            && pool.corrupt
        {
            return Err(AllocError::Corrupt(head.base()));
        }
        match &mut pool.budget {
            Some(0) => return Err(AllocError::Exhausted),
            Some(n) => *n -= 1,
            None => {}
        }
        let frame = pool.free.pop().ok_or(AllocError::Exhausted)?;
        pool.out.insert(frame);
        Ok(frame)
    }

    fn free_4k(&self, frame: PhysicalFrame) -> Result<(), FreeError> {
        let mut pool = self.pool.borrow_mut();
        if !pool.out.remove(&frame) {
            return Err(if pool.free.contains(&frame) {
                FreeError::DoubleFree(frame.base())
            } else {
                FreeError::OutOfRange(frame.base())
            });
        }
        pool.free.push(frame);
        Ok(())
    }
}

/// Interrupt mask that counts transitions.
pub struct FakeIrq {
    enabled: Cell<bool>,
    disables: Cell<usize>,
}

impl FakeIrq {
    pub const fn enabled() -> Self {
        Self {
            enabled: Cell::new(true),
            disables: Cell::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn disables(&self) -> usize {
        self.disables.get()
    }
}

impl InterruptControl for FakeIrq {
    fn disable(&self) -> bool {
        self.disables.set(self.disables.get() + 1);
        self.enabled.replace(false)
    }

    fn enable(&self) {
        self.enabled.set(true);
    }
}

/// TLB that records invalidated slots and, when watching an interrupt mask,
/// counts writes made while interrupts were enabled.
pub struct RecordingTlb<'a> {
    slots: usize,
    log: RefCell<Vec<usize>>,
    watch: Option<&'a FakeIrq>,
    unmasked_writes: Cell<usize>,
}

impl<'a> RecordingTlb<'a> {
    pub fn new(slots: usize) -> Self {
        Self {
            slots,
            log: RefCell::new(Vec::new()),
            watch: None,
            unmasked_writes: Cell::new(0),
        }
    }

    pub fn watching(slots: usize, irq: &'a FakeIrq) -> Self {
        Self {
            watch: Some(irq),
            ..Self::new(slots)
        }
    }

    pub fn invalidated(&self) -> Vec<usize> {
        self.log.borrow().clone()
    }

    pub fn unmasked_writes(&self) -> usize {
        self.unmasked_writes.get()
    }
}

impl Tlb for RecordingTlb<'_> {
    fn slot_count(&self) -> usize {
        self.slots
    }

    fn invalidate(&self, slot: usize) {
        if self.watch.is_some_and(FakeIrq::is_enabled) {
            self.unmasked_writes.set(self.unmasked_writes.get() + 1);
        }
        self.log.borrow_mut().push(slot);
    }
}
