//! Interrupt masking for code that must not be interleaved with this core's
//! interrupt handlers.
//!
//! The mechanics are processor specific (`cli/sti`, the MIPS status register,
//! ...), so they sit behind [`InterruptControl`]. [`IrqGuard`] adds the
//! save/restore discipline on top: interrupts are re-enabled on drop **only**
//! if they were enabled when the guard was created, which makes guards nest.
//!
//! Masking is per core. It is not a multiprocessor barrier.

/// Processor hook to mask and unmask interrupt delivery on the executing core.
pub trait InterruptControl {
    /// Disable interrupt delivery and report whether it was enabled before.
    fn disable(&self) -> bool;

    /// Enable interrupt delivery.
    fn enable(&self);
}

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// # Examples
///
/// ```
/// use core::cell::Cell;
/// use kernel_sync::{InterruptControl, IrqGuard};
///
/// struct Flag(Cell<bool>);
/// impl InterruptControl for Flag {
///     fn disable(&self) -> bool { self.0.replace(false) }
///     fn enable(&self) { self.0.set(true); }
/// }
///
/// let irq = Flag(Cell::new(true));
/// {
///     let _g = IrqGuard::new(&irq);
///     assert!(!irq.0.get());
/// }
/// assert!(irq.0.get());
/// ```
#[must_use = "interrupts are restored as soon as the guard is dropped"]
pub struct IrqGuard<'a, C: InterruptControl + ?Sized> {
    ctl: &'a C,
    /// Whether interrupts were enabled when the guard was created.
    were_enabled: bool,
}

impl<'a, C: InterruptControl + ?Sized> IrqGuard<'a, C> {
    #[inline]
    pub fn new(ctl: &'a C) -> Self {
        let were_enabled = ctl.disable();
        Self { ctl, were_enabled }
    }
}

impl<C: InterruptControl + ?Sized> Drop for IrqGuard<'_, C> {
    fn drop(&mut self) {
        if self.were_enabled {
            self.ctl.enable();
        }
    }
}
