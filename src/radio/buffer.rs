//! Transmit Buffers and Handoff
//!
//! Each buffer is grouped with its own ready/consumed flag pair. Only the
//! main context writes `ready`; only the engine side writes `consumed`.
//!
//! ```text
//!   producer            engine
//!   fill() ──ready──▶   claim()
//!                       ... ticks read the bytes ...
//!   is_free() ◀─consumed─ release()
//! ```
//!
//! The producer may refill only once `consumed` is set again. Capacity is
//! fixed; every read is bounded by the stored length.

use core::sync::atomic::{AtomicBool, Ordering};

use heapless::Vec;

use crate::types::{RadioError, RadioResult};

/// Ready/consumed flag pair for one buffer
#[derive(Debug)]
pub struct Handoff {
    ready: AtomicBool,
    consumed: AtomicBool,
}

impl Handoff {
    /// A free buffer: not ready, previous contents consumed
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            consumed: AtomicBool::new(true),
        }
    }

    /// Producer: the data may be read
    fn publish(&self) {
        self.consumed.store(false, Ordering::Release);
        self.ready.store(true, Ordering::Release);
    }

    /// Engine: take the published data, returning whether it was ready
    fn claim(&self) -> bool {
        self.ready.swap(false, Ordering::AcqRel)
    }

    /// Engine: the data is no longer needed
    fn release(&self) {
        self.ready.store(false, Ordering::Release);
        self.consumed.store(true, Ordering::Release);
    }

    /// Published and not yet claimed
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// The producer may write again
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

/// RTTY byte buffer
#[derive(Debug, Default)]
pub struct TxBuffer<const N: usize> {
    data: Vec<u8, N>,
    handoff: Handoff,
}

impl<const N: usize> TxBuffer<N> {
    /// Empty, free buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            handoff: Handoff::new(),
        }
    }

    /// Copy `bytes` in and publish them
    ///
    /// # Errors
    ///
    /// [`RadioError::BufferInUse`] if the engine has not released the
    /// previous contents, [`RadioError::BufferOverrun`] if `bytes` does not
    /// fit. Nothing is copied in either case.
    pub fn fill(&mut self, bytes: &[u8]) -> RadioResult<()> {
        if !self.handoff.is_free() {
            return Err(RadioError::BufferInUse);
        }
        if bytes.len() > N {
            return Err(RadioError::BufferOverrun {
                requested: bytes.len(),
                capacity: N,
            });
        }
        self.data.clear();
        self.data
            .extend_from_slice(bytes)
            .map_err(|()| RadioError::BufferOverrun {
                requested: bytes.len(),
                capacity: N,
            })?;
        self.handoff.publish();
        Ok(())
    }

    /// Engine: take the published contents
    ///
    /// Returns `None` if nothing was published since the last claim.
    pub fn claim(&self) -> Option<&[u8]> {
        self.handoff.claim().then_some(self.data.as_slice())
    }

    /// Engine: hand the buffer back to the producer
    pub fn release(&self) {
        self.handoff.release();
    }

    /// Stored bytes
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Number of stored bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// No stored bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Capacity in bytes
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Flag pair
    #[must_use]
    pub const fn handoff(&self) -> &Handoff {
        &self.handoff
    }
}

/// Borrowed view of a framed APRS packet
///
/// `flag_start` is the index of the first byte after the opening flags,
/// `flag_end` the index of the first closing flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketView<'a> {
    bytes: &'a [u8],
    flag_start: usize,
    flag_end: usize,
}

impl<'a> PacketView<'a> {
    /// Validate boundaries over a byte slice
    ///
    /// # Errors
    ///
    /// [`RadioError::InvalidBoundaries`] unless
    /// `flag_start <= flag_end <= bytes.len()`.
    pub fn new(bytes: &'a [u8], flag_start: usize, flag_end: usize) -> RadioResult<Self> {
        if flag_start > flag_end || flag_end > bytes.len() {
            return Err(RadioError::InvalidBoundaries {
                flag_start,
                flag_end,
                len: bytes.len(),
            });
        }
        Ok(Self {
            bytes,
            flag_start,
            flag_end,
        })
    }

    /// Byte at `index`, `None` past the end
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Whether `index` lies between the opening and closing flags
    #[must_use]
    pub const fn is_data(&self, index: usize) -> bool {
        index >= self.flag_start && index < self.flag_end
    }

    /// Total length including flags
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// No bytes at all
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// First data byte
    #[must_use]
    pub const fn flag_start(&self) -> usize {
        self.flag_start
    }

    /// First closing flag
    #[must_use]
    pub const fn flag_end(&self) -> usize {
        self.flag_end
    }
}

/// APRS packet buffer with flag boundaries
#[derive(Debug, Default)]
pub struct AprsPacket<const N: usize> {
    data: Vec<u8, N>,
    flag_start: usize,
    flag_end: usize,
    handoff: Handoff,
}

impl<const N: usize> AprsPacket<N> {
    /// Empty, free packet buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            flag_start: 0,
            flag_end: 0,
            handoff: Handoff::new(),
        }
    }

    /// Copy a framed packet in and publish it
    ///
    /// # Errors
    ///
    /// [`RadioError::BufferInUse`], [`RadioError::BufferOverrun`] or
    /// [`RadioError::InvalidBoundaries`]. Nothing is copied on error.
    pub fn fill(&mut self, bytes: &[u8], flag_start: usize, flag_end: usize) -> RadioResult<()> {
        if !self.handoff.is_free() {
            return Err(RadioError::BufferInUse);
        }
        if bytes.len() > N {
            return Err(RadioError::BufferOverrun {
                requested: bytes.len(),
                capacity: N,
            });
        }
        PacketView::new(bytes, flag_start, flag_end)?;

        self.data.clear();
        self.data
            .extend_from_slice(bytes)
            .map_err(|()| RadioError::BufferOverrun {
                requested: bytes.len(),
                capacity: N,
            })?;
        self.flag_start = flag_start;
        self.flag_end = flag_end;
        self.handoff.publish();
        Ok(())
    }

    /// Engine: take the published packet
    pub fn claim(&self) -> Option<PacketView<'_>> {
        if self.handoff.claim() {
            Some(self.view())
        } else {
            None
        }
    }

    /// Engine: hand the buffer back to the producer
    pub fn release(&self) {
        self.handoff.release();
    }

    /// View of the stored packet
    #[must_use]
    pub fn view(&self) -> PacketView<'_> {
        PacketView {
            bytes: &self.data,
            flag_start: self.flag_start,
            flag_end: self.flag_end,
        }
    }

    /// Capacity in bytes
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Flag pair
    #[must_use]
    pub const fn handoff(&self) -> &Handoff {
        &self.handoff
    }
}
