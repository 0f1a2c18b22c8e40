use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Why a frame could not be handed back to its allocator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FreeError {
    /// The frame lies at or above the end of managed memory.
    #[error("frame {0} is outside managed memory")]
    OutOfRange(PhysicalAddress),
    /// The frame is already free.
    #[error("frame {0} freed twice")]
    DoubleFree(PhysicalAddress),
    /// A kernel address outside the direct-mapped segment.
    #[error("{0} is not a direct-mapped kernel address")]
    NotDirectMapped(VirtualAddress),
}

/// Why a frame allocator could not hand out a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AllocError {
    /// Every frame is in use.
    #[error("out of physical frames")]
    Exhausted,
    /// The allocator's bookkeeping no longer matches memory; the frame at
    /// the given address is listed as free but is not.
    #[error("frame allocator corrupt at {0}")]
    Corrupt(PhysicalAddress),
}

/// A broken usage contract. These indicate a kernel bug, not a resource
/// shortage, and callers are expected to treat them as fatal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("load window opened twice")]
    LoadWindowAlreadyOpen,
    #[error("load window closed without being opened")]
    LoadWindowNotOpen,
    #[error("frame release rejected: {0}")]
    FrameRelease(#[from] FreeError),
    #[error("frame allocator corrupt at {0}")]
    CorruptAllocator(PhysicalAddress),
}

/// Errors from address-space operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VmError {
    /// The frame allocator is exhausted.
    #[error("out of physical frames")]
    OutOfFrames,
    /// A bookkeeping allocation on the kernel heap failed.
    #[error("out of kernel heap")]
    OutOfHeap,
    /// Empty region, or one that runs past the top of the address space.
    #[error("invalid region at {base} with size {size:#x}")]
    InvalidRange { base: VirtualAddress, size: u32 },
    /// No second-level table covers the address.
    #[error("{0} is not declared")]
    Undeclared(VirtualAddress),
    /// The slot already holds a data frame.
    #[error("{0} is already backed")]
    AlreadyBacked(VirtualAddress),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl VmError {
    /// `true` for resource shortages the caller may recover from.
    #[must_use]
    pub const fn is_exhaustion(&self) -> bool {
        matches!(self, Self::OutOfFrames | Self::OutOfHeap)
    }

    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::Invariant(_))
    }
}

impl From<AllocError> for VmError {
    fn from(value: AllocError) -> Self {
        match value {
            AllocError::Exhausted => Self::OutOfFrames,
            AllocError::Corrupt(pa) => Self::Invariant(InvariantViolation::CorruptAllocator(pa)),
        }
    }
}

impl From<FreeError> for VmError {
    fn from(value: FreeError) -> Self {
        Self::Invariant(InvariantViolation::FrameRelease(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_corruption_is_not_exhaustion() {
        let exhausted = VmError::from(AllocError::Exhausted);
        assert!(exhausted.is_exhaustion());
        assert!(!exhausted.is_invariant_violation());

        let corrupt = VmError::from(AllocError::Corrupt(PhysicalAddress::new(0x1000)));
        assert!(!corrupt.is_exhaustion());
        assert!(corrupt.is_invariant_violation());
    }
}
