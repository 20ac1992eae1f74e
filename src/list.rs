//! List: contiguous growable sequence with an explicit doubling policy.
//!
//! Buckets of `BucketMap` are built from two parallel `List`s. Capacity is
//! tracked explicitly: a full list doubles, an empty allocation grows to
//! one slot.

use core::fmt;
use core::ops::{Index, IndexMut};

#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum ListError {
    #[error("index {index} out of range for list of length {len}")]
    OutOfRange { index: usize, len: usize },
}

pub struct List<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> List<T> {
    /// Create an empty list able to hold `initial_capacity` elements before
    /// its first reallocation.
    ///
    /// Panics for zero-sized element types; a list of them has no storage
    /// to manage.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        assert!(
            core::mem::size_of::<T>() != 0,
            "List element size must be non-zero"
        );
        Self {
            items: Vec::with_capacity(initial_capacity),
            capacity: initial_capacity,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Logical capacity; doubles whenever a push finds the list full.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, value: T) {
        if self.items.len() == self.capacity {
            self.grow();
        }
        self.items.push(value);
    }

    fn grow(&mut self) {
        let next = if self.capacity == 0 {
            1
        } else {
            self.capacity * 2
        };
        self.items.reserve_exact(next - self.items.len());
        log::trace!("list grew from {} to {} elements", self.capacity, next);
        self.capacity = next;
    }

    /// Remove the element at `index`, shifting every later element left by one.
    pub fn remove_at(&mut self, index: usize) -> Result<T, ListError> {
        self.check(index)?;
        Ok(self.items.remove(index))
    }

    /// Overwrite the element at `index`, returning the previous one.
    pub fn replace_at(&mut self, index: usize, value: T) -> Result<T, ListError> {
        self.check(index)?;
        Ok(core::mem::replace(&mut self.items[index], value))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Move every element of `other` onto the end of `self`, leaving `other` empty.
    pub fn append(&mut self, other: &mut List<T>) {
        for value in other.items.drain(..) {
            self.push(value);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    fn check(&self, index: usize) -> Result<(), ListError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(ListError::OutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }
}

impl<T: Clone> List<T> {
    /// Append a copy of every element of `src`, in order.
    pub fn extend_from_list(&mut self, src: &List<T>) {
        for value in src.iter() {
            self.push(value.clone());
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for List<T> {
    fn clone(&self) -> Self {
        let mut items = Vec::with_capacity(self.capacity);
        items.extend(self.items.iter().cloned());
        Self {
            items,
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for List<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for List<T> {}

impl<T> Index<usize> for List<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.items.get(index) {
            Some(v) => v,
            None => panic!(
                "index {} out of range for list of length {}",
                index,
                self.items.len()
            ),
        }
    }
}

impl<T> IndexMut<usize> for List<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.items.len();
        match self.items.get_mut(index) {
            Some(v) => v,
            None => panic!("index {} out of range for list of length {}", index, len),
        }
    }
}

impl<T> Extend<T> for List<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = List::new();
        list.extend(iter);
        list
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for List<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
