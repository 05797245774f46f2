//! Growable circular-buffer FIFO.
//!
//! Used to track unread notifications in arrival order. A full queue doubles
//! its capacity instead of rejecting the write, so `enqueue` never fails.

/// Circular buffer queue.
///
/// `count` is tracked separately from the indices so that `front == rear`
/// is unambiguous (empty when `count == 0`, full when `count == capacity`).
#[derive(Debug, Clone)]
pub struct MessageQueue<T> {
    slots: Vec<Option<T>>,
    front: usize,
    rear: usize,
    count: usize,
}

/// Capacity used by [`MessageQueue::default`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

impl<T> MessageQueue<T> {
    /// Create an empty queue. A zero capacity is clamped to one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            front: 0,
            rear: 0,
            count: 0,
        }
    }

    /// Build a queue holding `items` in order.
    ///
    /// Without an explicit capacity the queue is sized to
    /// `max(items.len(), 10)`.
    pub fn from_vec(items: Vec<T>, capacity: Option<usize>) -> Self {
        let mut queue = Self::new(capacity.unwrap_or_else(|| items.len().max(10)));
        for item in items {
            queue.enqueue(item);
        }
        queue
    }

    /// Append to the rear, growing the buffer first if it is full.
    pub fn enqueue(&mut self, item: T) {
        if self.is_full() {
            self.grow();
        }

        let capacity = self.capacity();
        self.slots[self.rear] = Some(item);
        self.rear = (self.rear + 1) % capacity;
        self.count += 1;
    }

    /// Remove and return the front item, clearing its slot.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let item = self.slots[self.front].take();
        self.front = (self.front + 1) % self.capacity();
        self.count -= 1;
        item
    }

    /// Front item without removing it.
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.front].as_ref()
    }

    /// Most recently enqueued item.
    pub fn peek_rear(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        let capacity = self.capacity();
        self.slots[(self.rear + capacity - 1) % capacity].as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drop every item, keeping the current capacity.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.front = 0;
        self.rear = 0;
        self.count = 0;
    }

    /// Items from front to rear.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let capacity = self.capacity();
        (0..self.count).filter_map(move |i| self.slots[(self.front + i) % capacity].as_ref())
    }

    /// Keep only the items `keep` accepts, in their original order.
    /// Returns how many were removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let capacity = self.capacity();
        let before = self.count;
        let mut slots: Vec<Option<T>> = Vec::with_capacity(capacity);

        for i in 0..self.count {
            if let Some(item) = self.slots[(self.front + i) % capacity].take() {
                if keep(&item) {
                    slots.push(Some(item));
                }
            }
        }
        self.count = slots.len();
        slots.resize_with(capacity, || None);

        self.slots = slots;
        self.front = 0;
        self.rear = self.count % capacity;
        before - self.count
    }

    /// Double the capacity and linearize the contents starting at slot 0.
    fn grow(&mut self) {
        let old_capacity = self.capacity();
        let new_capacity = old_capacity * 2;
        let mut slots: Vec<Option<T>> = Vec::with_capacity(new_capacity);

        for i in 0..self.count {
            slots.push(self.slots[(self.front + i) % old_capacity].take());
        }
        slots.resize_with(new_capacity, || None);

        self.slots = slots;
        self.front = 0;
        self.rear = self.count;
    }
}

impl<T: Clone> MessageQueue<T> {
    /// Snapshot of the items from front to rear.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: PartialEq> MessageQueue<T> {
    /// Linear equality scan.
    pub fn contains(&self, item: &T) -> bool {
        self.iter().any(|candidate| candidate == item)
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
