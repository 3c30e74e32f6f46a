//! A bounded single-producer/single-consumer queue for moving values
//! between a background thread and a realtime caller without either side
//! ever blocking. `rme_graph`'s file nodes are the motivating use: a
//! decoder or encoder thread hands audio blocks across one of these
//! instead of a blocking channel.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An atomic cursor pinned to its own cache line, so the producer
/// advancing `write` never bounces the consumer's `read` out of cache
/// (and vice versa).
#[repr(align(64))]
struct Cursor(AtomicUsize);

impl Cursor {
    const fn new(value: usize) -> Self {
        Cursor(AtomicUsize::new(value))
    }
}

/// The slots and cursors shared between one [`Producer`] and one
/// [`Consumer`]. Indices only ever increase; a slot's position is its
/// index modulo `slots.len()`.
struct Channel<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    write: Cursor,
    read: Cursor,
}

// SAFETY: a slot is only ever touched by whichever side (producer or
// consumer) the cursor protocol currently grants it to, so sharing the
// channel across the two threads is sound for any `T: Send`.
unsafe impl<T: Send> Send for Channel<T> {}
unsafe impl<T: Send> Sync for Channel<T> {}

impl<T> Channel<T> {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots = (0..capacity).map(|_| UnsafeCell::new(MaybeUninit::uninit())).collect::<Vec<_>>().into_boxed_slice();
        Self { slots, write: Cursor::new(0), read: Cursor::new(0) }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, position: usize) -> *mut MaybeUninit<T> {
        self.slots[position % self.slots.len()].get()
    }
}

impl<T> Drop for Channel<T> {
    fn drop(&mut self) {
        // Neither handle is still racing here, so relaxed loads are fine.
        let read = *self.read.0.get_mut();
        let write = *self.write.0.get_mut();
        for position in read..write {
            // SAFETY: every position in `read..write` was written by the
            // producer and never claimed by the consumer.
            unsafe { std::ptr::drop_in_place((*self.slot(position)).as_mut_ptr()) };
        }
    }
}

/// Names a connected [`Producer`]/[`Consumer`] pair into existence; there's
/// no value of this type, just the one associated constructor.
///
/// ```
/// use rme_core::spsc::BlockQueue;
///
/// let (mut tx, mut rx) = BlockQueue::open(4);
/// tx.try_push(42).unwrap();
/// assert_eq!(rx.try_pop(), Some(42));
/// ```
pub struct BlockQueue;

impl BlockQueue {
    /// Opens a queue holding up to `capacity` values (at least one, even
    /// if `capacity` is 0).
    pub fn open<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
        let channel = Arc::new(Channel::new(capacity));
        (Producer { channel: Arc::clone(&channel) }, Consumer { channel })
    }
}

/// The write side of a queue. Exactly one exists per channel, and it is
/// `Send` but not `Clone` — ownership is how the single-producer
/// invariant is enforced at compile time.
pub struct Producer<T> {
    channel: Arc<Channel<T>>,
}

unsafe impl<T: Send> Send for Producer<T> {}

impl<T> Producer<T> {
    /// Writes `value` into the next free slot, or hands it back unchanged
    /// if the consumer hasn't caught up. Never blocks.
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        let write = self.channel.write.0.load(Ordering::Relaxed);
        let read = self.channel.read.0.load(Ordering::Acquire);
        if write.wrapping_sub(read) >= self.channel.capacity() {
            return Err(value);
        }
        // SAFETY: the occupancy check above guarantees this slot was
        // already drained by the consumer (or never written).
        unsafe { (*self.channel.slot(write)).write(value) };
        self.channel.write.0.store(write.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// How many values are currently queued, as of the last synchronized
    /// read — the consumer may have drained more by the time this returns.
    pub fn len(&self) -> usize {
        queue_len(&self.channel)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.channel.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }
}

/// The read side of a queue. Exactly one exists per channel, mirroring
/// [`Producer`].
pub struct Consumer<T> {
    channel: Arc<Channel<T>>,
}

unsafe impl<T: Send> Send for Consumer<T> {}

impl<T> Consumer<T> {
    /// Takes the oldest queued value, or `None` if the producer hasn't
    /// written one yet. Never blocks.
    pub fn try_pop(&mut self) -> Option<T> {
        let read = self.channel.read.0.load(Ordering::Relaxed);
        let write = self.channel.write.0.load(Ordering::Acquire);
        if read >= write {
            return None;
        }
        // SAFETY: the occupancy check above guarantees the producer has
        // finished writing this slot and won't touch it again until the
        // cursor advance below makes it available.
        let value = unsafe { (*self.channel.slot(read)).assume_init_read() };
        self.channel.read.0.store(read.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    pub fn len(&self) -> usize {
        queue_len(&self.channel)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.channel.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }
}

fn queue_len<T>(channel: &Channel<T>) -> usize {
    let write = channel.write.0.load(Ordering::Relaxed);
    let read = channel.read.0.load(Ordering::Relaxed);
    write.wrapping_sub(read)
}
