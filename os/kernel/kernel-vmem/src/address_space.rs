//! # Address Space
//!
//! One user address space: a [`PageDirectory`] root, the [`PageTable`]s
//! hanging off it, every data frame those tables point at, and the list of
//! declared [`Region`]s.
//!
//! ## Highlights
//!
//! - [`AddressSpace::define_region`] declares a range and makes sure the
//!   second-level tables covering it exist. No data frames are allocated.
//! - [`AddressSpace::define_stack`] declares the fixed stack below
//!   [`USERSTACK`].
//! - [`AddressSpace::prepare_load`] / [`AddressSpace::complete_load`] bracket
//!   the window in which the loader may write into read-only regions.
//! - [`AddressSpace::copy`] deep-copies a space for `fork`.
//! - [`AddressSpace::activate`] flushes the TLB when switching to the space.
//! - [`AddressSpace::permissions_at`], [`AddressSpace::translate`] and
//!   [`AddressSpace::map_frame`] are the fault handler's view.
//!
//! ## Ownership
//!
//! Every frame reachable from the root belongs to exactly one address space
//! and goes back to the [`FrameAlloc`] when the space is destroyed or dropped.
//! A copy never shares frames with its source.
//!
//! ## Safety
//!
//! - Keeps `unsafe` confined to mapping a physical frame to a typed table
//!   through the [`PhysMapper`].
//! - Slots of the running space are never repointed without a TLB flush.
//!   The fault handler only fills unmapped slots, which the TLB cannot hold,
//!   and redeclaring a backed page leaks its frame instead of recycling it.

mod region;

pub use region::{Permissions, Region};

use crate::page_table::{DirectorySlot, PageDirectory, PageTable, PtSlot};
use crate::{FrameAlloc, InvariantViolation, PhysMapper, Tlb, VmError, copy_frame, zero_frame};
use alloc::vec::Vec;
use core::fmt;
use kernel_info::memory::{USERSTACK, VM_STACKPAGES};
use kernel_memory_addresses::{
    PAGE_SIZE, PhysicalFrame, VirtualAddress, VirtualPage, pages_for,
};
use kernel_sync::{InterruptControl, IrqGuard};
use log::{debug, error, trace, warn};

/// Lowest address of the pre-declared user stack.
const STACK_BOTTOM: u32 = USERSTACK - VM_STACKPAGES * PAGE_SIZE;

/// The mapper and allocator pair; all frame traffic of one space goes here.
struct Backing<'m, M, A> {
    mapper: &'m M,
    alloc: &'m A,
}

impl<M, A> Clone for Backing<'_, M, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, A> Copy for Backing<'_, M, A> {}

impl<'m, M: PhysMapper, A: FrameAlloc> Backing<'m, M, A> {
    /// A fresh frame filled with zeroes.
    fn alloc_zeroed(self) -> Result<PhysicalFrame, VmError> {
        let frame = self.alloc.alloc_4k()?;
        unsafe { zero_frame(self.mapper, frame) };
        Ok(frame)
    }

    /// A fresh frame holding the same bytes as `src`.
    fn alloc_copy_of(self, src: PhysicalFrame) -> Result<PhysicalFrame, VmError> {
        let frame = self.alloc.alloc_4k()?;
        unsafe { copy_frame(self.mapper, src, frame) };
        Ok(frame)
    }

    fn release(self, frame: PhysicalFrame) -> Result<(), VmError> {
        self.alloc.free_4k(frame).map_err(VmError::from)
    }

    /// Borrow the directory in `frame`.
    ///
    /// The frame must hold a directory owned by the calling space; the
    /// borrow must end before the frame is released.
    fn directory(self, frame: PhysicalFrame) -> &'m mut PageDirectory {
        unsafe { self.mapper.phys_to_mut::<PageDirectory>(frame.base()) }
    }

    /// Borrow the second-level table in `frame`. Same contract as
    /// [`Backing::directory`].
    fn table(self, frame: PhysicalFrame) -> &'m mut PageTable {
        unsafe { self.mapper.phys_to_mut::<PageTable>(frame.base()) }
    }
}

/// Handle to a single user address space.
pub struct AddressSpace<'m, M: PhysMapper, A: FrameAlloc> {
    backing: Backing<'m, M, A>,
    root: PhysicalFrame,
    regions: Vec<Region>,
    load_window: bool,
    released: bool,
    leaked_frames: usize,
}

impl<'m, M: PhysMapper, A: FrameAlloc> AddressSpace<'m, M, A> {
    /// A new, empty space: a zeroed root directory and no regions.
    ///
    /// # Errors
    /// - [`VmError::OutOfFrames`] if the root frame cannot be allocated.
    /// - [`InvariantViolation::CorruptAllocator`] if the allocator's state is
    ///   broken.
    pub fn create(mapper: &'m M, alloc: &'m A) -> Result<Self, VmError> {
        let backing = Backing { mapper, alloc };
        let root = backing.alloc_zeroed()?;
        debug!("address space created, root {root}");
        Ok(Self {
            backing,
            root,
            regions: Vec::new(),
            load_window: false,
            released: false,
            leaked_frames: 0,
        })
    }

    /// Frame of the root directory.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> PhysicalFrame {
        self.root
    }

    /// Declared regions, in declaration order.
    #[inline]
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// `true` between [`prepare_load`](Self::prepare_load) and
    /// [`complete_load`](Self::complete_load).
    #[inline]
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.load_window
    }

    /// Data frames dropped by redeclaring backed pages. They are never
    /// returned to the allocator.
    #[inline]
    #[must_use]
    pub const fn leaked_frames(&self) -> usize {
        self.leaked_frames
    }

    /// The second-level table covering `page`, created on demand.
    fn ensure_table(&mut self, page: VirtualPage) -> Result<PhysicalFrame, VmError> {
        let directory = self.backing.directory(self.root);
        let slot = page.directory_index();
        if let DirectorySlot::Table(frame) = directory.get(slot) {
            return Ok(frame);
        }
        let frame = self.backing.alloc_zeroed()?;
        directory.set(slot, DirectorySlot::Table(frame));
        trace!("page table {frame} covers directory slot {slot}");
        Ok(frame)
    }

    /// Make `page` declared-but-unbacked.
    ///
    /// A page that is already backed loses its frame. The frame may still be
    /// cached in the TLB, so it is leaked rather than handed to a new owner.
    fn declare_page(&mut self, page: VirtualPage) -> Result<(), VmError> {
        let table = self.backing.table(self.ensure_table(page)?);
        if let PtSlot::Backed(old) = table.get(page.table_index()) {
            table.set(page.table_index(), PtSlot::Unmapped);
            self.leaked_frames += 1;
            warn!(
                "redeclaring {page:?} leaks backing frame {old} ({} leaked so far)",
                self.leaked_frames
            );
        }
        Ok(())
    }

    /// Declare `[vaddr, vaddr + size)` with the given rights.
    ///
    /// The range is widened to whole pages. The region is recorded before any
    /// table is built, and a later failure leaves it recorded together with
    /// whatever tables were already created; both are reclaimed when the
    /// space is destroyed.
    ///
    /// # Errors
    /// - [`VmError::InvalidRange`] if `size` is zero or the range runs past
    ///   the top of the address space.
    /// - [`VmError::OutOfHeap`] if the region list cannot grow.
    /// - [`VmError::OutOfFrames`] if a second-level table cannot be allocated.
    #[doc(alias = "declare")]
    pub fn define_region(
        &mut self,
        vaddr: VirtualAddress,
        size: u32,
        permissions: Permissions,
    ) -> Result<(), VmError> {
        let invalid = VmError::InvalidRange { base: vaddr, size };
        let base = vaddr.page();
        let span = u64::from(size) + u64::from(vaddr.offset());
        let pages = pages_for(span);
        if size == 0 || u64::from(base.base().as_u32()) + pages * u64::from(PAGE_SIZE) > 1 << 32 {
            return Err(invalid);
        }
        let pages = u32::try_from(pages).map_err(|_| invalid)?;

        self.regions
            .try_reserve(1)
            .map_err(|_| VmError::OutOfHeap)?;
        let region = Region::new(base, pages, permissions);
        self.regions.push(region);
        trace!("declared {region:?}");

        region.pages().try_for_each(|page| self.declare_page(page))
    }

    /// Declare the user stack: the [`VM_STACKPAGES`] pages directly below
    /// [`USERSTACK`]. The stack is not recorded as a region.
    ///
    /// Returns the initial stack pointer.
    ///
    /// # Errors
    /// [`VmError::OutOfFrames`] if a second-level table cannot be allocated.
    pub fn define_stack(&mut self) -> Result<VirtualAddress, VmError> {
        let bottom = VirtualAddress::new(STACK_BOTTOM).page();
        (0..VM_STACKPAGES)
            .map_while(|i| bottom.checked_add(i))
            .try_for_each(|page| self.declare_page(page))?;
        trace!("declared stack below {USERSTACK:#010x}");
        Ok(VirtualAddress::new(USERSTACK))
    }

    /// Open the load window: every region becomes writable until
    /// [`complete_load`](Self::complete_load).
    ///
    /// # Errors
    /// [`InvariantViolation::LoadWindowAlreadyOpen`] if the window is open.
    pub fn prepare_load(&mut self) -> Result<(), VmError> {
        if self.load_window {
            return Err(InvariantViolation::LoadWindowAlreadyOpen.into());
        }
        self.regions.iter_mut().for_each(Region::open_load_window);
        self.load_window = true;
        trace!("load window open over {} regions", self.regions.len());
        Ok(())
    }

    /// Close the load window and restore each region's declared rights.
    ///
    /// # Errors
    /// [`InvariantViolation::LoadWindowNotOpen`] if the window is closed.
    pub fn complete_load(&mut self) -> Result<(), VmError> {
        if !self.load_window {
            return Err(InvariantViolation::LoadWindowNotOpen.into());
        }
        self.regions.iter_mut().for_each(Region::close_load_window);
        self.load_window = false;
        trace!("load window closed");
        Ok(())
    }

    /// A deep copy of this space.
    ///
    /// The copy has its own root, its own tables and a fresh frame with
    /// identical bytes for every backed page. Declared-but-unbacked pages stay
    /// unbacked. A space without regions copies to an empty space, even if it
    /// declared a stack.
    ///
    /// # Errors
    /// [`VmError::OutOfFrames`] or [`VmError::OutOfHeap`] on exhaustion.
    /// Everything the partial copy allocated has been released by then.
    pub fn copy(&self) -> Result<Self, VmError> {
        let mut new = Self::create(self.backing.mapper, self.backing.alloc)?;
        if self.regions.is_empty() {
            debug!("copied empty address space {} -> {}", self.root, new.root);
            return Ok(new);
        }

        new.regions
            .try_reserve_exact(self.regions.len())
            .map_err(|_| VmError::OutOfHeap)?;
        new.regions.extend_from_slice(&self.regions);
        new.load_window = self.load_window;

        let backing = new.backing;
        let directory = backing.directory(new.root);
        let mut frames = 0usize;
        for (slot, old_table) in backing.directory(self.root).tables() {
            let table = backing.alloc_zeroed()?;
            directory.set(slot, DirectorySlot::Table(table));

            let dst = backing.table(table);
            for (index, old) in backing.table(old_table).backed() {
                dst.set(index, PtSlot::Backed(backing.alloc_copy_of(old)?));
                frames += 1;
            }
        }

        debug!(
            "copied address space {} -> {} ({} regions, {frames} frames)",
            self.root,
            new.root,
            new.regions.len()
        );
        Ok(new)
    }

    /// Release every frame and the region list.
    ///
    /// # Errors
    /// The first frame release the allocator rejected. Teardown continues
    /// past rejections, so all remaining frames are still released.
    pub fn destroy(mut self) -> Result<(), VmError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), VmError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let backing = self.backing;
        let mut first: Result<(), VmError> = Ok(());
        let mut keep = |r: Result<(), VmError>| {
            if first.is_ok() {
                first = r;
            }
        };

        let mut frames = 0usize;
        for (_, table) in backing.directory(self.root).tables() {
            for (_, data) in backing.table(table).backed() {
                keep(backing.release(data));
                frames += 1;
            }
            keep(backing.release(table));
        }
        keep(backing.release(self.root));
        self.regions = Vec::new();

        debug!("destroyed address space {} ({frames} data frames)", self.root);
        first
    }

    /// Make this the running space: flush the whole TLB with interrupts
    /// masked.
    pub fn activate<T, C>(&self, tlb: &T, irq: &C)
    where
        T: Tlb + ?Sized,
        C: InterruptControl + ?Sized,
    {
        let _masked = IrqGuard::new(irq);
        crate::invalidate_all(tlb);
    }

    /// Rights in force at `va`: those of the first region containing it, or
    /// read/write inside the user stack. `None` means the access is illegal.
    #[must_use]
    pub fn permissions_at(&self, va: VirtualAddress) -> Option<Permissions> {
        self.regions
            .iter()
            .find(|r| r.contains(va))
            .map(Region::permissions)
            .or_else(|| {
                (STACK_BOTTOM..USERSTACK)
                    .contains(&va.as_u32())
                    .then_some(Permissions::READ_WRITE)
            })
    }

    /// The data frame behind `va`, if the page is backed.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalFrame> {
        let page = va.page();
        let directory = self.backing.directory(self.root);
        let DirectorySlot::Table(table) = directory.get(page.directory_index()) else {
            return None;
        };
        match self.backing.table(table).get(page.table_index()) {
            PtSlot::Backed(frame) => Some(frame),
            PtSlot::Unmapped => None,
        }
    }

    /// Back the declared page at `va` with `frame`. Ownership of `frame`
    /// passes to this space.
    ///
    /// # Errors
    /// - [`VmError::Undeclared`] if no table covers `va`.
    /// - [`VmError::AlreadyBacked`] if the page already has a frame.
    pub fn map_frame(&mut self, va: VirtualAddress, frame: PhysicalFrame) -> Result<(), VmError> {
        let page = va.page();
        let directory = self.backing.directory(self.root);
        let DirectorySlot::Table(table) = directory.get(page.directory_index()) else {
            return Err(VmError::Undeclared(va));
        };
        let table = self.backing.table(table);
        if let PtSlot::Backed(_) = table.get(page.table_index()) {
            return Err(VmError::AlreadyBacked(va));
        }
        table.set(page.table_index(), PtSlot::Backed(frame));
        Ok(())
    }
}

impl<M: PhysMapper, A: FrameAlloc> fmt::Debug for AddressSpace<'_, M, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("root", &self.root)
            .field("regions", &self.regions)
            .field("loading", &self.load_window)
            .finish_non_exhaustive()
    }
}

impl<M: PhysMapper, A: FrameAlloc> Drop for AddressSpace<'_, M, A> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            error!("address space {} leaked frames on drop: {e}", self.root);
        }
    }
}
