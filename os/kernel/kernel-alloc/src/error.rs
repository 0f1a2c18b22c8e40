use kernel_memory_addresses::PhysicalAddress;
use kernel_vmem::AllocError;

/// Why a frame allocation failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FrameAllocError {
    /// No free frame left. Recoverable: the caller abandons its operation.
    #[error("out of physical memory")]
    OutOfMemory,
    #[error("zero frames requested")]
    ZeroFrames,
    /// Contiguous runs are only available from boot RAM.
    #[error("{requested} contiguous frames requested after bootstrap")]
    MultiFrameAfterBootstrap { requested: usize },
    /// The frame at the list head is not marked free.
    #[error("free list corrupt at {0}")]
    CorruptFreeList(PhysicalAddress),
    /// The frame cannot be reached through the direct-mapped kernel segment.
    #[error("frame {0} is outside the kernel direct map")]
    NotDirectMapped(PhysicalAddress),
}

impl From<AllocError> for FrameAllocError {
    fn from(value: AllocError) -> Self {
        match value {
            AllocError::Exhausted => Self::OutOfMemory,
            AllocError::Corrupt(pa) => Self::CorruptFreeList(pa),
        }
    }
}

/// Why the frame table could not be built.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BootstrapError {
    #[error("frame table already bootstrapped")]
    AlreadyBootstrapped,
    #[error("usable range {first}..{last} is not frame-aligned")]
    Unaligned {
        first: PhysicalAddress,
        last: PhysicalAddress,
    },
    #[error("usable range is empty")]
    EmptyRange,
    /// Memory is too small to run.
    #[error("frame table needs {footprint_frames} of {total_frames} frames")]
    FootprintExhaustsMemory {
        footprint_frames: usize,
        total_frames: usize,
    },
}
