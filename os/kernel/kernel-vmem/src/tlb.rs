//! # Translation Cache
//!
//! The MMU caches page translations in a small, software-refilled TLB. The
//! kernel never tracks which slots belong to which address space, so
//! switching spaces discards every slot.

/// Access to the hardware translation cache.
pub trait Tlb {
    /// Number of slots; [`NUM_TLB`](kernel_info::memory::NUM_TLB) on the
    /// target.
    fn slot_count(&self) -> usize;

    /// Overwrite `slot` with an entry that matches no address.
    fn invalidate(&self, slot: usize);
}

/// Invalidate every slot of `tlb`.
///
/// The caller must keep interrupts masked for the duration; a refill landing
/// halfway would leave stale translations behind.
pub fn invalidate_all<T: Tlb + ?Sized>(tlb: &T) {
    for slot in 0..tlb.slot_count() {
        tlb.invalidate(slot);
    }
}
