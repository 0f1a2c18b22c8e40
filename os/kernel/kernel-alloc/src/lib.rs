//! # Kernel Physical Memory Allocation
//!
//! This crate provides the physical side of the kernel's memory management:
//! where frames come from before and after the frame table exists, and how
//! the kernel reaches them.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            Address spaces (kernel-vmem)             │
//! │    • Page tables, regions, fork copies              │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ FrameAlloc
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Physical Frame Allocator                  │
//! │    • Boot RAM stealing before bootstrap             │
//! │    • Frame table + LIFO free list after             │
//! │    • One spin lock around the list                  │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ PhysMapper
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Physical Mapper                        │
//! │    • KSEG0 direct map: kernel VA = PA + 0x8000_0000 │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Boot RAM ([`boot_ram`])
//!
//! The [`BootRam`](boot_ram::BootRam) seam and its bump-pointer
//! implementation. Used until the frame table takes over, and the only source
//! of multi-frame contiguous allocations.
//!
//! ### Frame Allocator ([`frame_table`])
//!
//! [`FrameAllocator`] owns the boot RAM until
//! [`bootstrap`](FrameAllocator::bootstrap), then builds the frame table in
//! the lowest usable frames and serves single frames from an index-linked
//! free list.
//!
//! ### Physical Mapper ([`phys_mapper`])
//!
//! [`Kseg0PhysMapper`](phys_mapper::Kseg0PhysMapper) turns a physical address
//! into a pointer through the direct-mapped kernel segment.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kernel_alloc::FrameAllocator;
//! use kernel_alloc::boot_ram::BumpRam;
//! use kernel_alloc::phys_mapper::Kseg0PhysMapper;
//! use kernel_memory_addresses::PhysicalAddress;
//! use kernel_vmem::AddressSpace;
//!
//! let ram = BumpRam::new(PhysicalAddress::new(0x0004_0000), PhysicalAddress::new(0x0100_0000));
//! let frames = FrameAllocator::new(&Kseg0PhysMapper, ram);
//! let kernel_stack = frames.alloc_kpages(4).unwrap();
//! frames.bootstrap().unwrap();
//!
//! let mut aspace = AddressSpace::create(&Kseg0PhysMapper, &frames).unwrap();
//! aspace.define_stack().unwrap();
//! # let _ = kernel_stack;
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod boot_ram;
mod error;
mod free_list;
pub mod frame_table;
pub mod phys_mapper;

#[cfg(test)]
mod testing;

pub use crate::error::{BootstrapError, FrameAllocError};
pub use crate::frame_table::FrameAllocator;
