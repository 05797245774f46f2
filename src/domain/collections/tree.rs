//! Unbalanced binary search tree ordered by a caller comparator.
//!
//! The message timeline is indexed by `created_at`. Equal keys are kept and
//! go to the right subtree, so duplicates form right-leaning chains. There is
//! no rebalancing: inserting in sorted order degrades the tree to a chain,
//! which is why every operation here walks the tree iteratively.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

type Link<T> = Option<Box<Node<T>>>;

struct Node<T> {
    data: T,
    left: Link<T>,
    right: Link<T>,
}

impl<T> Node<T> {
    fn leaf(data: T) -> Box<Self> {
        Box::new(Self {
            data,
            left: None,
            right: None,
        })
    }
}

/// Binary search tree keyed by `C`.
pub struct MessageTree<T, C = fn(&T, &T) -> Ordering> {
    root: Link<T>,
    compare: C,
    len: usize,
}

impl<T: Ord> MessageTree<T> {
    /// Tree ordered by `T`'s natural ordering.
    pub fn new() -> Self {
        Self::with_comparator(Ord::cmp)
    }
}

impl<T: Ord> Default for MessageTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> MessageTree<T, C>
where
    C: Fn(&T, &T) -> Ordering,
{
    pub fn with_comparator(compare: C) -> Self {
        Self {
            root: None,
            compare,
            len: 0,
        }
    }

    /// Insert `data`, going left only when it compares strictly less.
    pub fn insert(&mut self, data: T) {
        let mut link = &mut self.root;
        while let Some(node) = link {
            link = if (self.compare)(&data, &node.data) == Ordering::Less {
                &mut node.left
            } else {
                &mut node.right
            };
        }
        *link = Some(Node::leaf(data));
        self.len += 1;
    }

    /// First element on the search path that compares equal to `probe`.
    pub fn search(&self, probe: &T) -> Option<&T> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            current = match (self.compare)(probe, &node.data) {
                Ordering::Equal => return Some(&node.data),
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            };
        }
        None
    }

    pub fn contains(&self, probe: &T) -> bool {
        self.search(probe).is_some()
    }

    /// Remove the first node comparing equal to `probe`.
    ///
    /// A node with two children takes the data of its in-order successor
    /// (the minimum of its right subtree), and that successor node is
    /// unlinked. Returns `false` when nothing matched.
    pub fn remove(&mut self, probe: &T) -> bool {
        let mut link = &mut self.root;
        loop {
            let ordering = match link.as_deref() {
                None => return false,
                Some(node) => (self.compare)(probe, &node.data),
            };
            if ordering == Ordering::Equal {
                break;
            }
            let Some(node) = link else {
                return false;
            };
            link = if ordering == Ordering::Less {
                &mut node.left
            } else {
                &mut node.right
            };
        }

        let Some(mut node) = link.take() else {
            return false;
        };
        *link = match (node.left.take(), node.right.take()) {
            (None, None) => None,
            (Some(child), None) | (None, Some(child)) => Some(child),
            (Some(left), Some(right)) => {
                node.left = Some(left);
                node.right = Some(right);
                if let Some(successor) = Self::detach_min(&mut node.right) {
                    node.data = successor;
                }
                Some(node)
            }
        };
        self.len -= 1;
        true
    }

    /// Unlink the leftmost node under `link` and return its data.
    fn detach_min(mut link: &mut Link<T>) -> Option<T> {
        while link.as_ref()?.left.is_some() {
            let node = link.as_mut()?;
            link = &mut node.left;
        }
        let mut node = link.take()?;
        *link = node.right.take();
        Some(node.data)
    }
}

impl<T, C> MessageTree<T, C> {
    /// Left, root, right. Non-decreasing under the comparator.
    pub fn in_order(&self) -> Vec<&T> {
        let mut result = Vec::with_capacity(self.len);
        let mut stack: Vec<&Node<T>> = Vec::new();
        let mut current = self.root.as_deref();

        loop {
            while let Some(node) = current {
                stack.push(node);
                current = node.left.as_deref();
            }
            match stack.pop() {
                Some(node) => {
                    result.push(&node.data);
                    current = node.right.as_deref();
                }
                None => break,
            }
        }
        result
    }

    /// Root, left, right.
    pub fn pre_order(&self) -> Vec<&T> {
        let mut result = Vec::with_capacity(self.len);
        let mut stack: Vec<&Node<T>> = self.root.as_deref().into_iter().collect();

        while let Some(node) = stack.pop() {
            result.push(&node.data);
            stack.extend(node.right.as_deref());
            stack.extend(node.left.as_deref());
        }
        result
    }

    /// Left, right, root.
    pub fn post_order(&self) -> Vec<&T> {
        let mut reversed = Vec::with_capacity(self.len);
        let mut stack: Vec<&Node<T>> = self.root.as_deref().into_iter().collect();

        while let Some(node) = stack.pop() {
            reversed.push(&node.data);
            stack.extend(node.left.as_deref());
            stack.extend(node.right.as_deref());
        }
        reversed.reverse();
        reversed
    }

    /// Breadth-first, left to right within each level.
    pub fn level_order(&self) -> Vec<&T> {
        let mut result = Vec::with_capacity(self.len);
        let mut queue: VecDeque<&Node<T>> = self.root.as_deref().into_iter().collect();

        while let Some(node) = queue.pop_front() {
            result.push(&node.data);
            queue.extend(node.left.as_deref());
            queue.extend(node.right.as_deref());
        }
        result
    }

    /// Visit every element mutably, in no particular order. `f` must not
    /// change anything the comparator looks at.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        let mut stack: Vec<&mut Node<T>> = self.root.as_deref_mut().into_iter().collect();

        while let Some(node) = stack.pop() {
            f(&mut node.data);
            stack.extend(node.left.as_deref_mut());
            stack.extend(node.right.as_deref_mut());
        }
    }

    pub fn min(&self) -> Option<&T> {
        let mut current = self.root.as_deref()?;
        while let Some(left) = current.left.as_deref() {
            current = left;
        }
        Some(&current.data)
    }

    pub fn max(&self) -> Option<&T> {
        let mut current = self.root.as_deref()?;
        while let Some(right) = current.right.as_deref() {
            current = right;
        }
        Some(&current.data)
    }

    /// Edges on the longest root-to-leaf path; `-1` for an empty tree.
    pub fn height(&self) -> i64 {
        let mut levels: i64 = 0;
        let mut frontier: Vec<&Node<T>> = self.root.as_deref().into_iter().collect();

        while !frontier.is_empty() {
            levels += 1;
            frontier = frontier
                .iter()
                .flat_map(|node| node.left.as_deref().into_iter().chain(node.right.as_deref()))
                .collect();
        }
        levels - 1
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn clear(&mut self) {
        let mut stack: Vec<Box<Node<T>>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
        self.len = 0;
    }
}

impl<T, C> Drop for MessageTree<T, C> {
    fn drop(&mut self) {
        // Box's recursive drop would overflow on long chains.
        self.clear();
    }
}

impl<T, C> fmt::Debug for MessageTree<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageTree")
            .field("len", &self.len)
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}
