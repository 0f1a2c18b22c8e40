use bitfield_struct::bitfield;
use core::fmt;
use kernel_memory_addresses::{PAGE_SIZE, VirtualAddress, VirtualPage};

/// Access rights of a region, in the executable-image flag layout.
///
/// | Bit | Name         |
/// |-----|--------------|
/// | 0   | `executable` |
/// | 1   | `writable`   |
/// | 2   | `readable`   |
///
/// ```rust
/// # use kernel_vmem::Permissions;
/// let text = Permissions::from_bits(0b101);
/// assert!(text.readable() && text.executable() && !text.writable());
/// ```
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct Permissions {
    pub executable: bool,
    pub writable: bool,
    pub readable: bool,
    #[bits(5)]
    __: u8,
}

impl Permissions {
    /// Read and write; the rights of the user stack.
    pub const READ_WRITE: Self = Self::new().with_readable(true).with_writable(true);

    #[inline]
    #[must_use]
    pub const fn from_flags(readable: bool, writable: bool, executable: bool) -> Self {
        Self::new()
            .with_readable(readable)
            .with_writable(writable)
            .with_executable(executable)
    }
}

/// A declared, page-aligned range of user virtual space.
///
/// While the load window is open the region is writable regardless of its
/// declared rights; the declared rights are kept aside and restored when the
/// window closes.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Region {
    base: VirtualPage,
    pages: u32,
    permissions: Permissions,
    saved: Option<Permissions>,
}

impl Region {
    pub(crate) const fn new(base: VirtualPage, pages: u32, permissions: Permissions) -> Self {
        debug_assert!(pages > 0);
        Self {
            base,
            pages,
            permissions,
            saved: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> VirtualPage {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn page_count(&self) -> u32 {
        self.pages
    }

    /// Rights currently in force.
    #[inline]
    #[must_use]
    pub const fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Rights as declared, whether or not the load window is open.
    #[inline]
    #[must_use]
    pub fn declared_permissions(&self) -> Permissions {
        self.saved.unwrap_or(self.permissions)
    }

    /// `true` if `va` lies inside the region.
    #[inline]
    #[must_use]
    pub const fn contains(&self, va: VirtualAddress) -> bool {
        let offset = va.as_u32().wrapping_sub(self.base.base().as_u32());
        va.as_u32() >= self.base.base().as_u32() && offset / PAGE_SIZE < self.pages
    }

    /// The region's pages, lowest first.
    pub fn pages(&self) -> impl Iterator<Item = VirtualPage> + use<> {
        let base = self.base;
        (0..self.pages).map_while(move |i| base.checked_add(i))
    }

    pub(crate) fn open_load_window(&mut self) {
        debug_assert!(self.saved.is_none());
        self.saved = Some(self.permissions);
        self.permissions = self.permissions.with_writable(true);
    }

    pub(crate) fn close_load_window(&mut self) {
        if let Some(declared) = self.saved.take() {
            self.permissions = declared;
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region({}+{} pages, {}{}{})",
            self.base,
            self.pages,
            if self.permissions.readable() { 'r' } else { '-' },
            if self.permissions.writable() { 'w' } else { '-' },
            if self.permissions.executable() { 'x' } else { '-' },
        )
    }
}
