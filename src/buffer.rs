//! Caller-owned byte regions with a progress offset.
//!
//! A [`CursorBuffer`] is the vocabulary shared between the host loop and the
//! pump: the host owns the storage, the pump only reads from or writes into
//! the region after the offset and then advances it.

/// A fixed-capacity byte region plus a read/write offset.
///
/// Used as input, everything before the offset has already been handed to
/// the child. Used as output, everything before the offset has been received
/// from the child. `offset == capacity` means "fully consumed" for input and
/// "full" for output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorBuffer<B> {
    storage: B,
    offset: usize,
}

impl<B: AsRef<[u8]>> CursorBuffer<B> {
    /// Wraps `storage` with the offset at the start.
    #[must_use]
    pub const fn new(storage: B) -> Self {
        Self { storage, offset: 0 }
    }

    /// Wraps `storage` with the offset already at `offset`.
    ///
    /// The offset is clamped to the storage length.
    #[must_use]
    pub fn with_offset(storage: B, offset: usize) -> Self {
        let offset = offset.min(storage.as_ref().len());
        Self { storage, offset }
    }

    /// Total number of bytes the storage can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.as_ref().len()
    }

    /// Current progress offset.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes between the offset and the end of the storage.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity().saturating_sub(self.offset)
    }

    /// True once the offset has reached the capacity.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// The bytes before the offset.
    #[must_use]
    pub fn filled(&self) -> &[u8] {
        self.storage.as_ref().get(..self.offset).unwrap_or_default()
    }

    /// The bytes after the offset, i.e. input not yet handed to the child.
    #[must_use]
    pub fn unread(&self) -> &[u8] {
        self.storage.as_ref().get(self.offset..).unwrap_or_default()
    }

    /// Moves the offset forward by `count`, saturating at the capacity.
    pub fn advance(&mut self, count: usize) {
        self.offset = self.offset.saturating_add(count).min(self.capacity());
    }

    /// Moves the offset back to the start.
    pub const fn reset(&mut self) {
        self.offset = 0;
    }

    /// Replaces the storage and rewinds the offset.
    pub fn replace(&mut self, storage: B) -> B {
        self.offset = 0;
        std::mem::replace(&mut self.storage, storage)
    }

    /// Borrows the underlying storage.
    #[must_use]
    pub const fn get_ref(&self) -> &B {
        &self.storage
    }

    /// Releases the underlying storage.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.storage
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> CursorBuffer<B> {
    /// The writable region after the offset.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        let offset = self.offset;
        self.storage.as_mut().get_mut(offset..).unwrap_or_default()
    }
}
