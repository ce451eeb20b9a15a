//!# Interrupt safe buffers
//! Fixed capacity [Queue] and [Deque] which can be shared between the interrupt handler and the main loop.
//! Storage is a `heapless::Deque` and every operation runs in its own short critical section,
//! so all methods take `&self` and the buffers can live in a `static`.
//!
//! ```
//!# use mcp2515_io::buffer::{BufferError, Queue};
//!#
//! static QUEUE: Queue<u8, 2> = Queue::new();
//!
//! QUEUE.enqueue(1).unwrap();
//! QUEUE.enqueue(2).unwrap();
//! assert_eq!(Err(BufferError::Full), QUEUE.enqueue(3));
//!
//! assert_eq!(Some(1), QUEUE.dequeue());
//! assert_eq!(1, QUEUE.size());
//! ```
use core::cell::RefCell;
use critical_section::Mutex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BufferError {
    /// Buffer holds N elements, nothing was inserted
    Full,
}

impl From<BufferError> for crate::can::CanError {
    fn from(_error: BufferError) -> Self {
        crate::can::CanError::BufferFull
    }
}

/// Single ended FIFO buffer with capacity N
pub struct Queue<T, const N: usize> {
    inner: Deque<T, N>,
}

impl<T, const N: usize> Queue<T, N> {
    pub const fn new() -> Self {
        Self { inner: Deque::new() }
    }

    /// Appends the element at the tail. Fails without modification if the queue is full.
    pub fn enqueue(&self, element: T) -> Result<(), BufferError> {
        self.inner.enqueue(element)
    }

    /// Removes and returns the oldest element
    pub fn dequeue(&self) -> Option<T> {
        self.inner.dequeue_head()
    }

    /// Removes and returns the oldest element if it satisfies the predicate
    pub fn dequeue_if(&self, predicate: impl FnOnce(&T) -> bool) -> Option<T> {
        self.inner.dequeue_head_if(predicate)
    }

    /// Returns a copy of the oldest element without removing it
    pub fn peek(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.peek_head()
    }

    pub fn size(&self) -> usize {
        self.inner.size()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&self) {
        self.inner.clear()
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Double ended buffer with capacity N
pub struct Deque<T, const N: usize> {
    slots: Mutex<RefCell<heapless::Deque<T, N>>>,
}

impl<T, const N: usize> Deque<T, N> {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new(heapless::Deque::new())),
        }
    }

    /// Appends the element at the tail
    pub fn enqueue(&self, element: T) -> Result<(), BufferError> {
        critical_section::with(|cs| self.slots.borrow_ref_mut(cs).push_back(element)).map_err(|_| BufferError::Full)
    }

    /// Inserts the element in front of all queued elements
    pub fn enqueue_head(&self, element: T) -> Result<(), BufferError> {
        critical_section::with(|cs| self.slots.borrow_ref_mut(cs).push_front(element)).map_err(|_| BufferError::Full)
    }

    /// Removes and returns the oldest element
    pub fn dequeue_head(&self) -> Option<T> {
        critical_section::with(|cs| self.slots.borrow_ref_mut(cs).pop_front())
    }

    /// Removes and returns the oldest element if it satisfies the predicate
    pub fn dequeue_head_if(&self, predicate: impl FnOnce(&T) -> bool) -> Option<T> {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow_ref_mut(cs);

            if slots.front().map_or(false, predicate) {
                slots.pop_front()
            } else {
                None
            }
        })
    }

    /// Removes and returns the newest element
    pub fn dequeue_tail(&self) -> Option<T> {
        critical_section::with(|cs| self.slots.borrow_ref_mut(cs).pop_back())
    }

    pub fn peek_head(&self) -> Option<T>
    where
        T: Clone,
    {
        critical_section::with(|cs| self.slots.borrow_ref(cs).front().cloned())
    }

    pub fn peek_tail(&self) -> Option<T>
    where
        T: Clone,
    {
        critical_section::with(|cs| self.slots.borrow_ref(cs).back().cloned())
    }

    pub fn size(&self) -> usize {
        critical_section::with(|cs| self.slots.borrow_ref(cs).len())
    }

    pub fn is_full(&self) -> bool {
        critical_section::with(|cs| self.slots.borrow_ref(cs).is_full())
    }

    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.slots.borrow_ref(cs).is_empty())
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drops all queued elements
    pub fn clear(&self) {
        critical_section::with(|cs| self.slots.borrow_ref_mut(cs).clear())
    }
}

impl<T, const N: usize> Default for Deque<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
