//! # Kernel synchronization primitives
//!
//! - [`SpinLock`]: short busy-wait critical sections (the frame free list).
//! - [`IrqGuard`]: interrupts off on this core for the guard's lifetime
//!   (translation-cache invalidation).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod spin_lock;

pub use irq::{InterruptControl, IrqGuard};
pub use spin_lock::{SpinLock, SpinLockGuard};
