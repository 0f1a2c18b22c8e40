//! # Kernel Memory Configuration
//!
//! Compile-time constants that the frame allocator, the page tables and the
//! address-space code must agree on. Keeping them in one crate prevents the
//! stack top, the direct-map base and the TLB geometry from drifting apart
//! between components.
//!
//! See [`memory`] for the layout and the direct-map conversions.
//!
//! ## Usage
//! ```rust
//! use kernel_info::memory::{USERSTACK, VM_STACKPAGES};
//!
//! let stack_base = USERSTACK - VM_STACKPAGES * 4096;
//! assert!(stack_base < USERSTACK);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
