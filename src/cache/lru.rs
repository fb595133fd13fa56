//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::HashMap;

// == Node ==
#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys live in a doubly-linked list threaded through an arena of slots,
/// with a key -> slot index for constant-time reordering:
/// - Front = Least recently used
/// - Back = Most recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    front: Option<usize>,
    back: Option<usize>,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used (moves it to the back).
    pub fn touch(&mut self, key: &str) {
        if let Some(&slot) = self.index.get(key) {
            self.unlink(slot);
            self.push_back(slot);
            return;
        }

        let node = Node {
            key: key.to_string(),
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                slot
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.index.insert(key.to_string(), slot);
        self.push_back(slot);
    }

    // == Remove ==
    /// Removes a key from the tracker. Unknown keys are ignored.
    pub fn remove(&mut self, key: &str) {
        if let Some(slot) = self.index.remove(key) {
            self.unlink(slot);
            self.slots[slot] = None;
            self.free.push(slot);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let key = self.peek_oldest()?.to_string();
        self.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.front
            .and_then(|slot| self.slots[slot].as_ref())
            .map(|node| node.key.as_str())
    }

    /// Keys from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.front;
        std::iter::from_fn(move || {
            let node = self.slots[cursor?].as_ref()?;
            cursor = node.next;
            Some(node.key.as_str())
        })
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.front = None;
        self.back = None;
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    // == Link Maintenance ==
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = match self.slots[slot].as_mut() {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };

        match prev {
            Some(p) => {
                if let Some(node) = self.slots[p].as_mut() {
                    node.next = next;
                }
            }
            None => self.front = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.slots[n].as_mut() {
                    node.prev = prev;
                }
            }
            None => self.back = prev,
        }
    }

    fn push_back(&mut self, slot: usize) {
        let old_back = self.back;
        if let Some(node) = self.slots[slot].as_mut() {
            node.prev = old_back;
            node.next = None;
        }
        match old_back {
            Some(b) => {
                if let Some(node) = self.slots[b].as_mut() {
                    node.next = Some(slot);
                }
            }
            None => self.front = Some(slot),
        }
        self.back = Some(slot);
    }
}
