//! Bounded collection of the child's stderr output.
//!
//! Any stderr byte is treated as the start of a fatal diagnostic. The
//! accumulator keeps collecting for a short grace window after the first byte
//! so a message written in several chunks is reported whole.

use std::time::{Duration, Instant};

/// What the collected stderr bytes mean for the session right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrVerdict {
    /// Nothing has been written to stderr.
    Clean,
    /// Stderr output exists but the grace window is still open.
    Collecting,
    /// Stderr output exists and collection is over; the session must fail.
    Fatal,
}

/// Fixed-capacity buffer plus the time the first byte arrived.
///
/// The accumulator never shrinks and is never cleared: once a byte has been
/// appended the session is destined to fail.
#[derive(Debug, Clone)]
pub struct ErrorAccumulator {
    storage: Box<[u8]>,
    length: usize,
    first_seen_at: Option<Instant>,
}

impl ErrorAccumulator {
    /// Creates an empty accumulator holding at most `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0_u8; capacity].into_boxed_slice(),
            length: 0,
            first_seen_at: None,
        }
    }

    /// Maximum number of bytes retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of bytes collected so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// True while no stderr byte has been seen.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True once no more bytes fit.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.length >= self.capacity()
    }

    /// When the first byte was appended, if ever.
    #[must_use]
    pub const fn first_seen_at(&self) -> Option<Instant> {
        self.first_seen_at
    }

    /// The bytes collected so far.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.storage.get(..self.length).unwrap_or_default()
    }

    /// Region a read may fill.
    pub(crate) fn spare_mut(&mut self) -> &mut [u8] {
        let length = self.length;
        self.storage.get_mut(length..).unwrap_or_default()
    }

    /// Accounts for `count` bytes written into [`Self::spare_mut`] at `now`.
    pub(crate) fn commit(&mut self, count: usize, now: Instant) {
        if count == 0 {
            return;
        }
        if self.first_seen_at.is_none() {
            self.first_seen_at = Some(now);
        }
        self.length = self.length.saturating_add(count).min(self.capacity());
    }

    /// Appends as much of `bytes` as fits, returning the number taken.
    pub fn append(&mut self, bytes: &[u8], now: Instant) -> usize {
        let spare = self.spare_mut();
        let count = spare.len().min(bytes.len());
        if let (Some(dst), Some(src)) = (spare.get_mut(..count), bytes.get(..count)) {
            dst.copy_from_slice(src);
        }
        self.commit(count, now);
        count
    }

    /// Classifies the collected output.
    ///
    /// Collection continues while less than `grace` has elapsed since the
    /// first byte and the child still holds stderr open.
    #[must_use]
    pub fn verdict(&self, now: Instant, grace: Duration, stderr_open: bool) -> StderrVerdict {
        let Some(first) = self.first_seen_at else {
            return StderrVerdict::Clean;
        };
        let elapsed = now.saturating_duration_since(first);
        if elapsed < grace && stderr_open {
            StderrVerdict::Collecting
        } else {
            StderrVerdict::Fatal
        }
    }

    /// The collected bytes as text, minus one trailing line ending.
    #[must_use]
    pub fn message(&self) -> String {
        let bytes = self.bytes();
        let bytes = bytes
            .strip_suffix(b"\r\n")
            .or_else(|| bytes.strip_suffix(b"\n"))
            .unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}
