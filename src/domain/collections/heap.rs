//! Array-backed binary min-heap over a caller comparator.
//!
//! Parent of slot `i` is `(i - 1) / 2`; children are `2i + 1` and `2i + 2`.
//! Every parent compares less than or equal to both children. Ties are not
//! ordered stably.

use std::cmp::Ordering;
use std::fmt;

pub struct PriorityHeap<T, C = fn(&T, &T) -> Ordering> {
    items: Vec<T>,
    compare: C,
}

impl<T: Ord> PriorityHeap<T> {
    pub fn new() -> Self {
        Self::with_comparator(Ord::cmp)
    }
}

impl<T: Ord> Default for PriorityHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> PriorityHeap<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    pub fn with_comparator(compare: C) -> Self {
        Self {
            items: Vec::new(),
            compare,
        }
    }

    /// Build a heap from arbitrary items in O(n) by sifting down every
    /// non-leaf slot, starting from the last one.
    pub fn from_vec(items: Vec<T>, compare: C) -> Self {
        let mut heap = Self { items, compare };
        for index in (0..heap.items.len() / 2).rev() {
            heap.sift_down(index);
        }
        heap
    }

    pub fn insert(&mut self, value: T) {
        self.items.push(value);
        self.sift_up(self.items.len() - 1);
    }

    /// Remove and return the minimum.
    pub fn extract_min(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let min = self.items.swap_remove(0);
        if !self.items.is_empty() {
            self.sift_down(0);
        }
        Some(min)
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.position(value).is_some()
    }

    /// Remove the first element (in array order) comparing equal to `value`.
    ///
    /// When several elements compare equal, which one is removed depends on
    /// the current array layout and is unspecified.
    pub fn remove(&mut self, value: &T) -> bool {
        let Some(index) = self.position(value) else {
            return false;
        };

        self.items.swap_remove(index);
        if index < self.items.len() {
            self.restore(index);
        }
        true
    }

    /// Replace the first element comparing equal to `old` with `new` and
    /// move it to its new position. Same duplicate caveat as [`remove`].
    ///
    /// [`remove`]: PriorityHeap::remove
    pub fn update(&mut self, old: &T, new: T) -> bool {
        let Some(index) = self.position(old) else {
            return false;
        };

        self.items[index] = new;
        self.restore(index);
        true
    }

    /// Non-destructive heap sort. Requires `C: Clone` for the scratch heap.
    pub fn to_sorted_vec(&self) -> Vec<T>
    where
        T: Clone,
        C: Clone,
    {
        let mut scratch = Self {
            items: self.items.clone(),
            compare: self.compare.clone(),
        };
        let mut sorted = Vec::with_capacity(self.items.len());
        while let Some(value) = scratch.extract_min() {
            sorted.push(value);
        }
        sorted
    }

    /// Pop every element comparing `<= bound`, in order.
    pub fn drain_until(&mut self, bound: &T) -> Vec<T> {
        let mut drained = Vec::new();
        while self
            .peek()
            .is_some_and(|top| (self.compare)(top, bound) != Ordering::Greater)
        {
            if let Some(value) = self.extract_min() {
                drained.push(value);
            }
        }
        drained
    }

    fn position(&self, value: &T) -> Option<usize> {
        self.items
            .iter()
            .position(|item| (self.compare)(item, value) == Ordering::Equal)
    }

    /// Move the element at `index` up if it beats its parent, else down.
    fn restore(&mut self, index: usize) {
        if index > 0 && self.less(index, (index - 1) / 2) {
            self.sift_up(index);
        } else {
            self.sift_down(index);
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(index, parent) {
                break;
            }
            self.items.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.items.swap(index, smallest);
            index = smallest;
        }
    }

    fn less(&self, a: usize, b: usize) -> bool {
        (self.compare)(&self.items[a], &self.items[b]) == Ordering::Less
    }
}

impl<T, C> PriorityHeap<T, C> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Backing array in heap layout, not sorted.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.clone()
    }
}

impl<T: fmt::Debug, C> fmt::Debug for PriorityHeap<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityHeap")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}
