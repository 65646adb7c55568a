//! Bounded single-producer/single-consumer FIFO used to hand values from an
//! interrupt context to the main loop.
//!
//! The buffer never overwrites unread data: once it is full, new values are
//! dropped and [`Producer::write`] reports `false`.
//!
//! `head` is only ever stored by the writing side and `tail` only by the
//! reading side. Both run modulo `2 * N`, so a full buffer (`head - tail == N`)
//! and an empty one (`head == tail`) stay distinguishable without a flag that
//! both sides would have to write.
//!
//! ```
//! use roomlock_gpio::queue::RingBuffer;
//!
//! let mut buffer: RingBuffer<u8, 4> = RingBuffer::new();
//! let (mut producer, mut consumer) = buffer.split();
//!
//! assert!(producer.write(b'1'));
//! assert_eq!(consumer.read(), Some(b'1'));
//! assert_eq!(consumer.read(), None);
//! ```

use std::cell::UnsafeCell;
use std::fmt::{Debug, Formatter};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity FIFO of `N` slots.
pub struct RingBuffer<T, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: a slot is written only by the producer while it lies outside
// `tail..head`, and read only by the consumer while it lies inside. The
// Release store of `head` publishes the slot before the consumer can see it,
// and the Release store of `tail` hands it back before the producer reuses it.
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// Creates an empty buffer.
    pub const fn new() -> Self {
        const { assert!(N > 0, "ring buffer capacity must be non-zero") };

        RingBuffer {
            slots: [const { UnsafeCell::new(MaybeUninit::uninit()) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Splits the buffer into its writing and reading halves.
    ///
    /// The halves borrow the buffer mutably, so no other handle can exist
    /// while they are alive.
    pub fn split(&mut self) -> (Producer<'_, T, N>, Consumer<'_, T, N>) {
        let buffer = &*self;
        (Producer { buffer }, Consumer { buffer })
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Appends `value`, or drops it and returns `false` if the buffer is full.
    pub fn write(&mut self, value: T) -> bool {
        self.enqueue(value)
    }

    /// Removes the oldest value, or returns `None` if the buffer is empty.
    pub fn read(&mut self) -> Option<T> {
        self.dequeue()
    }

    pub fn count(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        Self::distance(head, tail)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_full(&self) -> bool {
        self.count() == N
    }

    /// Resets both indices to zero. Slot contents are left as they are.
    pub fn flush(&mut self) {
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
    }

    const fn distance(head: usize, tail: usize) -> usize {
        (head + 2 * N - tail) % (2 * N)
    }

    const fn advance(index: usize) -> usize {
        (index + 1) % (2 * N)
    }

    fn enqueue(&self, value: T) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if Self::distance(head, tail) == N {
            return false;
        }

        // SAFETY: the slot at `head` is outside `tail..head`, so the consumer
        // does not touch it until the store below publishes it.
        unsafe { (*self.slots[head % N].get()).write(value) };
        self.head.store(Self::advance(head), Ordering::Release);
        true
    }

    fn dequeue(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        // SAFETY: the slot at `tail` was initialized by the producer before it
        // released `head` past it, and the producer won't reuse it until `tail`
        // moves on.
        let value = unsafe { (*self.slots[tail % N].get()).assume_init_read() };
        self.tail.store(Self::advance(tail), Ordering::Release);
        Some(value)
    }

    fn discard(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }
}

impl<T: Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, const N: usize> Debug for RingBuffer<T, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RingBuffer({}/{})", self.count(), N)
    }
}

/// Writing half of a [`RingBuffer`]. Meant to be moved into the interrupt context.
pub struct Producer<'a, T, const N: usize> {
    buffer: &'a RingBuffer<T, N>,
}

impl<T: Copy, const N: usize> Producer<'_, T, N> {
    /// Appends `value`, or drops it and returns `false` if the buffer is full.
    pub fn write(&mut self, value: T) -> bool {
        self.buffer.enqueue(value)
    }

    pub fn is_full(&self) -> bool {
        self.buffer.is_full()
    }

    pub fn count(&self) -> usize {
        self.buffer.count()
    }
}

impl<T: Copy, const N: usize> Debug for Producer<'_, T, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[producer]", self.buffer)
    }
}

/// Reading half of a [`RingBuffer`]. Stays with the main loop.
pub struct Consumer<'a, T, const N: usize> {
    buffer: &'a RingBuffer<T, N>,
}

impl<T: Copy, const N: usize> Consumer<'_, T, N> {
    /// Removes the oldest value, or returns `None` if the buffer is empty.
    pub fn read(&mut self) -> Option<T> {
        self.buffer.dequeue()
    }

    pub fn count(&self) -> usize {
        self.buffer.count()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drops everything written so far.
    pub fn flush(&mut self) {
        self.buffer.discard();
    }
}

impl<T: Copy, const N: usize> Debug for Consumer<'_, T, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[consumer]", self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_empty() {
        let buffer: RingBuffer<u8, 16> = RingBuffer::new();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.count(), 0);
        assert_eq!(buffer.capacity(), 16);
    }

    #[test]
    fn reads_back_in_write_order() {
        let mut buffer: RingBuffer<u8, 4> = RingBuffer::new();
        for byte in b"123A" {
            assert!(buffer.write(*byte));
        }
        assert!(buffer.is_full());

        let read: Vec<u8> = std::iter::from_fn(|| buffer.read()).collect();
        assert_eq!(read, b"123A");
        assert!(buffer.is_empty());
    }

    #[test]
    fn drops_new_values_when_full() {
        let mut buffer: RingBuffer<u8, 3> = RingBuffer::new();
        assert!(buffer.write(1));
        assert!(buffer.write(2));
        assert!(buffer.write(3));

        assert!(!buffer.write(4));
        assert_eq!(buffer.count(), 3);

        assert_eq!(buffer.read(), Some(1));
        assert_eq!(buffer.read(), Some(2));
        assert_eq!(buffer.read(), Some(3));
        assert_eq!(buffer.read(), None);
    }

    #[test]
    fn wraps_around() {
        let mut buffer: RingBuffer<u8, 3> = RingBuffer::new();
        for round in 0..10u8 {
            assert!(buffer.write(round));
            assert!(buffer.write(round.wrapping_add(100)));
            assert_eq!(buffer.count(), 2);
            assert_eq!(buffer.read(), Some(round));
            assert_eq!(buffer.read(), Some(round.wrapping_add(100)));
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn flush_empties() {
        let mut buffer: RingBuffer<u8, 4> = RingBuffer::new();
        buffer.write(1);
        buffer.write(2);
        buffer.read();
        buffer.flush();

        assert!(buffer.is_empty());
        assert_eq!(buffer.read(), None);
        assert!(buffer.write(9));
        assert_eq!(buffer.read(), Some(9));
    }

    #[test]
    fn consumer_flush_discards_pending() {
        let mut buffer: RingBuffer<u8, 4> = RingBuffer::new();
        let (mut producer, mut consumer) = buffer.split();
        producer.write(1);
        producer.write(2);

        consumer.flush();
        assert!(consumer.is_empty());
        assert_eq!(consumer.read(), None);

        assert!(producer.write(3));
        assert_eq!(consumer.read(), Some(3));
    }

    #[test]
    fn producer_sees_full() {
        let mut buffer: RingBuffer<u8, 2> = RingBuffer::new();
        let (mut producer, mut consumer) = buffer.split();
        assert!(producer.write(1));
        assert!(producer.write(2));
        assert!(producer.is_full());
        assert!(!producer.write(3));

        assert_eq!(consumer.read(), Some(1));
        assert!(!producer.is_full());
        assert!(producer.write(3));
        assert_eq!(consumer.count(), 2);
    }

    #[test]
    fn preserves_order_across_threads() {
        const TOTAL: u32 = 10_000;
        let mut buffer: RingBuffer<u32, 8> = RingBuffer::new();
        let (mut producer, mut consumer) = buffer.split();

        thread::scope(|scope| {
            scope.spawn(move || {
                let mut next = 0;
                while next < TOTAL {
                    if producer.write(next) {
                        next += 1;
                    } else {
                        thread::yield_now();
                    }
                }
            });

            let mut expected = 0;
            while expected < TOTAL {
                match consumer.read() {
                    Some(value) => {
                        assert_eq!(value, expected);
                        expected += 1;
                    }
                    None => thread::yield_now(),
                }
            }
        });
    }
}
