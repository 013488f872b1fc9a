//! Fixed-capacity circular byte buffer
//!
//! A FIFO over caller-owned storage, used by the interrupt-driven drivers to
//! stage bytes between ISR context and scheduled tasks. The occupied size is
//! tracked explicitly, so the whole backing array is usable: a buffer of
//! capacity 4 holds 4 bytes.
//!
//! Two access styles are offered:
//! - copying: [`CircularBuffer::enqueue`] / [`CircularBuffer::dequeue`]
//! - zero-copy: [`CircularBuffer::peek_linear`] exposes the contiguous run
//!   starting at the front; [`CircularBuffer::advance_linear`] consumes it
//!   once the reader (typically a transmit engine) is done with it.
//!
//! ## Interrupt context
//!
//! [`CircularBuffer::split`] hands out a [`Producer`] and a [`Consumer`]
//! that may live in different execution contexts (ISR and main loop). The
//! producer only moves `back`, the consumer only moves `front`, and the size
//! is published with release/acquire ordering, so no lock is needed as long
//! as each side has exactly one owner. Two interrupt priorities feeding the
//! same producer must serialize through a critical section
//! ([`crate::core::traits::SharedState`]).

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Errors reported when attaching storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BufferError {
    /// The backing array has no room for a single byte
    ZeroCapacity,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::ZeroCapacity => write!(f, "circular buffer storage is empty"),
        }
    }
}

/// Shared ring state.
///
/// `back` and the free region belong to the producer, `front`, the occupied
/// region and `peek_size` to the consumer. `size` is the hand-off point.
struct Ring {
    storage: NonNull<u8>,
    capacity: usize,
    front: AtomicUsize,
    back: AtomicUsize,
    size: AtomicUsize,
    peek_size: AtomicUsize,
}

// Accesses to the storage are partitioned between one producer and one
// consumer; the partition is enforced by `&mut` on the public handles.
unsafe impl Sync for Ring {}
unsafe impl Send for Ring {}

impl Ring {
    fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// # Safety
    ///
    /// Caller must be the only producer for the duration of the call.
    unsafe fn enqueue(&self, elements: &[u8]) -> usize {
        let free = self.capacity - self.size.load(Ordering::Acquire);
        let count = elements.len().min(free);
        if count == 0 {
            return 0;
        }

        let back = self.back.load(Ordering::Relaxed);
        let first = count.min(self.capacity - back);
        let base = self.storage.as_ptr();
        // SAFETY: both runs lie inside the free region owned by the producer
        unsafe {
            core::ptr::copy_nonoverlapping(elements.as_ptr(), base.add(back), first);
            core::ptr::copy_nonoverlapping(elements.as_ptr().add(first), base, count - first);
        }

        self.back
            .store((back + count) % self.capacity, Ordering::Relaxed);
        self.size.fetch_add(count, Ordering::Release);
        count
    }

    /// # Safety
    ///
    /// Caller must be the only consumer for the duration of the call.
    unsafe fn dequeue(&self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.size.load(Ordering::Acquire));
        if count == 0 {
            return 0;
        }

        let front = self.front.load(Ordering::Relaxed);
        let first = count.min(self.capacity - front);
        let base = self.storage.as_ptr();
        // SAFETY: both runs lie inside the occupied region owned by the consumer
        unsafe {
            core::ptr::copy_nonoverlapping(base.add(front), out.as_mut_ptr(), first);
            core::ptr::copy_nonoverlapping(base, out.as_mut_ptr().add(first), count - first);
        }

        self.consume(front, count);
        count
    }

    /// # Safety
    ///
    /// Caller must be the only consumer while the returned slice is alive.
    unsafe fn peek_linear<'s>(&self) -> &'s [u8] {
        let size = self.size.load(Ordering::Acquire);
        let front = self.front.load(Ordering::Relaxed);
        // Occupied bytes up to the end of the array, never past the wrap
        let length = size.min(self.capacity - front);
        self.peek_size.store(length, Ordering::Relaxed);
        // SAFETY: `front..front + length` is occupied and owned by the consumer
        unsafe { core::slice::from_raw_parts(self.storage.as_ptr().add(front), length) }
    }

    /// # Safety
    ///
    /// Caller must be the only consumer for the duration of the call.
    unsafe fn advance_linear(&self) -> usize {
        let length = self.peek_size.load(Ordering::Relaxed);
        if length == 0 {
            return 0;
        }
        let front = self.front.load(Ordering::Relaxed);
        self.consume(front, length);
        length
    }

    fn consume(&self, front: usize, count: usize) {
        self.front
            .store((front + count) % self.capacity, Ordering::Relaxed);
        // A pending peek is stale once the front has moved
        self.peek_size.store(0, Ordering::Relaxed);
        self.size.fetch_sub(count, Ordering::Release);
    }
}

/// Circular byte buffer over a borrowed backing array
pub struct CircularBuffer<'a> {
    ring: Ring,
    _storage: PhantomData<&'a mut [u8]>,
}

impl<'a> CircularBuffer<'a> {
    /// Attach the buffer to `storage`; size, front and back start at 0.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::ZeroCapacity`] if `storage` is empty.
    pub fn attach(storage: &'a mut [u8]) -> Result<Self, BufferError> {
        let capacity = storage.len();
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity);
        }

        Ok(Self {
            ring: Ring {
                storage: NonNull::from(storage).cast(),
                capacity,
                front: AtomicUsize::new(0),
                back: AtomicUsize::new(0),
                size: AtomicUsize::new(0),
                peek_size: AtomicUsize::new(0),
            },
            _storage: PhantomData,
        })
    }

    /// Length of the backing array, which is also the usable capacity
    pub fn capacity(&self) -> usize {
        self.ring.capacity
    }

    /// Number of occupied bytes
    pub fn size(&self) -> usize {
        self.ring.size()
    }

    /// Number of bytes that can still be enqueued
    pub fn remaining(&self) -> usize {
        self.ring.capacity - self.ring.size()
    }

    /// Check if no byte is stored
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Check if every slot is occupied
    pub fn is_full(&self) -> bool {
        self.size() == self.ring.capacity
    }

    /// Length recorded by the last [`peek_linear`](Self::peek_linear), 0 if none is pending
    pub fn peek_size(&self) -> usize {
        self.ring.peek_size.load(Ordering::Relaxed)
    }

    /// Index of the oldest byte
    pub fn front(&self) -> usize {
        self.ring.front.load(Ordering::Relaxed)
    }

    /// Index of the next free slot
    pub fn back(&self) -> usize {
        self.ring.back.load(Ordering::Relaxed)
    }

    /// Copy up to `remaining()` bytes of `elements` in.
    ///
    /// Returns the number of bytes written. A count smaller than
    /// `elements.len()` means the buffer filled up; the tail was dropped.
    pub fn enqueue(&mut self, elements: &[u8]) -> usize {
        // SAFETY: `&mut self` excludes every other producer and consumer
        unsafe { self.ring.enqueue(elements) }
    }

    /// Copy up to `out.len()` bytes out, oldest first.
    ///
    /// Returns the number of bytes read, fewer than requested when the
    /// buffer holds less.
    pub fn dequeue(&mut self, out: &mut [u8]) -> usize {
        // SAFETY: `&mut self` excludes every other producer and consumer
        unsafe { self.ring.dequeue(out) }
    }

    /// Borrow the bytes readable from the front without wrapping.
    ///
    /// The length is recorded for [`advance_linear`](Self::advance_linear).
    /// Nothing is consumed.
    pub fn peek_linear(&mut self) -> &[u8] {
        // SAFETY: the slice borrows `self` mutably, so no enqueue or dequeue
        // can run while it is alive
        unsafe { self.ring.peek_linear() }
    }

    /// Consume the run returned by the last [`peek_linear`](Self::peek_linear).
    ///
    /// Returns the number of bytes consumed; 0 (and no effect) when no peek
    /// is pending.
    pub fn advance_linear(&mut self) -> usize {
        // SAFETY: `&mut self` excludes every other producer and consumer
        unsafe { self.ring.advance_linear() }
    }

    /// Split into a producer half and a consumer half.
    ///
    /// Each half may be moved to a different execution context.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        (Producer { ring: &self.ring }, Consumer { ring: &self.ring })
    }
}

impl fmt::Debug for CircularBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("capacity", &self.capacity())
            .field("size", &self.size())
            .field("front", &self.front())
            .field("back", &self.back())
            .field("peek_size", &self.peek_size())
            .finish()
    }
}

/// Writing half of a split [`CircularBuffer`]
pub struct Producer<'b> {
    ring: &'b Ring,
}

impl Producer<'_> {
    /// Copy up to the free space of `elements` in; see [`CircularBuffer::enqueue`].
    pub fn enqueue(&mut self, elements: &[u8]) -> usize {
        // SAFETY: there is exactly one producer per split and it is borrowed mutably
        unsafe { self.ring.enqueue(elements) }
    }

    /// Number of occupied bytes as seen by the producer
    pub fn size(&self) -> usize {
        self.ring.size()
    }

    /// Number of bytes that can still be enqueued
    pub fn remaining(&self) -> usize {
        self.ring.capacity - self.ring.size()
    }
}

/// Reading half of a split [`CircularBuffer`]
pub struct Consumer<'b> {
    ring: &'b Ring,
}

impl Consumer<'_> {
    /// Copy up to `out.len()` bytes out; see [`CircularBuffer::dequeue`].
    pub fn dequeue(&mut self, out: &mut [u8]) -> usize {
        // SAFETY: there is exactly one consumer per split and it is borrowed mutably
        unsafe { self.ring.dequeue(out) }
    }

    /// Borrow the contiguous readable run; see [`CircularBuffer::peek_linear`].
    pub fn peek_linear(&mut self) -> &[u8] {
        // SAFETY: single consumer, and the slice keeps it borrowed
        unsafe { self.ring.peek_linear() }
    }

    /// Consume the last peeked run; see [`CircularBuffer::advance_linear`].
    pub fn advance_linear(&mut self) -> usize {
        // SAFETY: single consumer
        unsafe { self.ring.advance_linear() }
    }

    /// Length recorded by the last peek, 0 if none is pending
    pub fn peek_size(&self) -> usize {
        self.ring.peek_size.load(Ordering::Relaxed)
    }

    /// Number of occupied bytes as seen by the consumer
    pub fn size(&self) -> usize {
        self.ring.size()
    }
}
