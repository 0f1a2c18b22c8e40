//! # Two-Level Page Table
//!
//! - [`PageDirectory`]: the root table, one per address space. Each slot is a
//!   [`DirectorySlot`].
//! - [`PageTable`]: a second-level table, allocated on demand. Each slot is a
//!   [`PtSlot`].
//!
//! Both tables are exactly one 4 KiB frame of 1024 packed 32-bit words. The
//! typed slots are decoded on every read and encoded on every write, so the
//! rest of the crate never sees a raw word.

mod directory;
mod pt;

pub use directory::{DirectorySlot, PageDirectory};
pub use pt::{PageTable, PtSlot};

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::PAGE_SIZE;

    #[test]
    fn tables_are_one_frame() {
        assert_eq!(size_of::<PageDirectory>(), PAGE_SIZE as usize);
        assert_eq!(size_of::<PageTable>(), PAGE_SIZE as usize);
        assert_eq!(align_of::<PageDirectory>(), PAGE_SIZE as usize);
        assert_eq!(align_of::<PageTable>(), PAGE_SIZE as usize);
    }
}
