//! # Physical Frame Allocator
//!
//! The allocator lives through two phases:
//!
//! 1. **Early**: frames are stolen from [`BootRam`]. Any contiguous run can
//!    be requested; nothing is ever reclaimed.
//! 2. **Ready**: after [`FrameAllocator::bootstrap`], single frames come from
//!    the free list and go back to it on free.
//!
//! All state sits behind one [`SpinLock`], held only for the duration of a
//! single pop or push.

use crate::boot_ram::BootRam;
use crate::free_list::FreeList;
use crate::{BootstrapError, FrameAllocError};
use core::sync::atomic::{AtomicUsize, Ordering};
use kernel_info::memory::{DIRECT_MAP_LIMIT, kvaddr_to_paddr, paddr_to_kvaddr};
use kernel_memory_addresses::{PAGE_SIZE, PhysicalAddress, PhysicalFrame, VirtualAddress};
use kernel_sync::SpinLock;
use kernel_vmem::{AllocError, FrameAlloc, FreeError, PhysMapper};
use log::{error, info, warn};

enum State<'m, R> {
    Early(R),
    Ready(FreeList<'m>),
}

/// The kernel's physical frame allocator.
///
/// Constructed once at boot and shared by reference; every address space
/// takes its frames from here through [`FrameAlloc`].
pub struct FrameAllocator<'m, M: PhysMapper, R: BootRam> {
    mapper: &'m M,
    state: SpinLock<State<'m, R>>,
    leaked_frees: AtomicUsize,
}

impl<'m, M: PhysMapper, R: BootRam> FrameAllocator<'m, M, R> {
    /// An allocator still in the early phase.
    #[must_use]
    pub const fn new(mapper: &'m M, ram: R) -> Self {
        Self {
            mapper,
            state: SpinLock::new(State::Early(ram)),
            leaked_frees: AtomicUsize::new(0),
        }
    }

    /// Build the frame table over the RAM not yet stolen and switch to the
    /// free list.
    ///
    /// RAM above [`DIRECT_MAP_LIMIT`] is left unmanaged, since the kernel
    /// cannot reach it through the direct map.
    ///
    /// # Errors
    /// - [`BootstrapError::AlreadyBootstrapped`] on a second call.
    /// - [`BootstrapError::Unaligned`] / [`BootstrapError::EmptyRange`] for a
    ///   bad usable range.
    /// - [`BootstrapError::FootprintExhaustsMemory`] if the table would fill
    ///   all of RAM. The kernel cannot run in that case.
    pub fn bootstrap(&self) -> Result<(), BootstrapError> {
        let mut state = self.state.lock();
        let State::Early(ram) = &mut *state else {
            return Err(BootstrapError::AlreadyBootstrapped);
        };

        let (first, mut last) = ram.usable_range();
        if !first.is_frame_aligned() || !last.is_frame_aligned() {
            return Err(BootstrapError::Unaligned { first, last });
        }
        let limit = PhysicalAddress::new(DIRECT_MAP_LIMIT);
        if last > limit {
            warn!("ignoring RAM {limit}..{last} beyond the direct map");
            last = limit;
        }
        if first >= last {
            return Err(BootstrapError::EmptyRange);
        }
        let total = (last.as_u32() - first.as_u32()) / PAGE_SIZE;

        let list = unsafe { FreeList::build(self.mapper, first.frame(), total)? };
        info!(
            "frame table over {first}..{last}: {total} frames, {} reserved, {} free",
            list.footprint(),
            list.free()
        );
        *state = State::Ready(list);
        Ok(())
    }

    /// Allocate `n` contiguous frames and return the first.
    ///
    /// # Errors
    /// - [`FrameAllocError::ZeroFrames`] for `n == 0`.
    /// - [`FrameAllocError::MultiFrameAfterBootstrap`] for `n > 1` once the
    ///   free list is live.
    /// - [`FrameAllocError::OutOfMemory`] when no frame is left.
    pub fn allocate(&self, n: usize) -> Result<PhysicalFrame, FrameAllocError> {
        if n == 0 {
            return Err(FrameAllocError::ZeroFrames);
        }
        match &mut *self.state.lock() {
            State::Early(ram) => ram.steal(n).ok_or(FrameAllocError::OutOfMemory),
            State::Ready(_) if n > 1 => {
                Err(FrameAllocError::MultiFrameAfterBootstrap { requested: n })
            }
            State::Ready(list) => list.pop().map_err(FrameAllocError::from),
        }
    }

    /// Return `frame` to the free list.
    ///
    /// Frames below the end of the frame table's own storage (the table
    /// itself and anything stolen before bootstrap) are never reclaimed; such
    /// a free is counted in [`leaked_frees`](Self::leaked_frees) and otherwise
    /// ignored.
    ///
    /// # Errors
    /// - [`FreeError::OutOfRange`] for a frame past the end of RAM.
    /// - [`FreeError::DoubleFree`] for a frame that is already free.
    pub fn free(&self, frame: PhysicalFrame) -> Result<(), FreeError> {
        let mut state = self.state.lock();
        if let State::Ready(list) = &mut *state
            && frame >= list.reserved_end()
        {
            return list.push(frame);
        }
        drop(state);
        self.leak(frame);
        Ok(())
    }

    fn leak(&self, frame: PhysicalFrame) {
        let n = self.leaked_frees.fetch_add(1, Ordering::Relaxed) + 1;
        warn!("ignoring free of reserved frame {frame} ({n} leaked so far)");
    }

    /// Allocate `n` frames and return their direct-mapped kernel address.
    ///
    /// # Errors
    /// As [`allocate`](Self::allocate), plus
    /// [`FrameAllocError::NotDirectMapped`] if the frame lies beyond the
    /// direct map. The frame is freed again in that case.
    pub fn alloc_kpages(&self, n: usize) -> Result<VirtualAddress, FrameAllocError> {
        let frame = self.allocate(n)?;
        paddr_to_kvaddr(frame.base()).ok_or_else(|| {
            if let Err(e) = self.free(frame) {
                error!("returning unreachable frame {frame} failed: {e}");
            }
            FrameAllocError::NotDirectMapped(frame.base())
        })
    }

    /// Free the frame behind a direct-mapped kernel address.
    ///
    /// # Errors
    /// [`FreeError::NotDirectMapped`] if `va` is outside the direct map,
    /// otherwise as [`free`](Self::free).
    pub fn free_kpages(&self, va: VirtualAddress) -> Result<(), FreeError> {
        let pa = kvaddr_to_paddr(va).ok_or(FreeError::NotDirectMapped(va))?;
        self.free(pa.frame())
    }

    #[must_use]
    pub fn is_bootstrapped(&self) -> bool {
        matches!(*self.state.lock(), State::Ready(_))
    }

    /// Frames covered by the frame table; 0 before bootstrap.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.with_list(FreeList::total)
    }

    /// Frames currently on the free list; 0 before bootstrap.
    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.with_list(FreeList::free)
    }

    /// Frames occupied by the frame table itself; 0 before bootstrap.
    #[must_use]
    pub fn footprint_frames(&self) -> usize {
        self.with_list(|l| l.footprint() as usize)
    }

    /// Frees that hit reserved frames and were ignored.
    #[must_use]
    pub fn leaked_frees(&self) -> usize {
        self.leaked_frees.load(Ordering::Relaxed)
    }

    fn with_list(&self, f: impl FnOnce(&FreeList<'m>) -> usize) -> usize {
        match &*self.state.lock() {
            State::Early(_) => 0,
            State::Ready(list) => f(list),
        }
    }
}

impl<M: PhysMapper, R: BootRam> FrameAlloc for FrameAllocator<'_, M, R> {
    fn alloc_4k(&self) -> Result<PhysicalFrame, AllocError> {
        match &mut *self.state.lock() {
            State::Early(ram) => ram.steal(1).ok_or(AllocError::Exhausted),
            State::Ready(list) => list.pop().inspect_err(|e| {
                if let AllocError::Corrupt(_) = e {
                    error!("frame allocation failed: {e}");
                }
            }),
        }
    }

    fn free_4k(&self, frame: PhysicalFrame) -> Result<(), FreeError> {
        self.free(frame)
    }
}
