//! Slot arenas with stable handles.
//!
//! Nodes form a graph (children plus parent back-links) and node labels
//! borrow key bytes from stored items, so both stores need ids that stay
//! valid across unrelated allocations and frees. A `Vec` of slots with a
//! free list gives exactly that: a freed slot is recycled, a live handle
//! never moves.

use std::num::NonZero;

/// Index of an occupied arena slot. Stored off by one so that
/// `Option<Handle>` has the same size as `Handle`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct Handle(NonZero<u32>);

impl Handle {
    pub(crate) const MAX: usize = (u32::MAX - 1) as usize;

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "arena handle index out of range");
        // Cannot be zero and cannot overflow after the assert above.
        Self(NonZero::new(index as u32 + 1).unwrap())
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<Handle>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live elements.
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn alloc(&mut self, element: T) -> Handle {
        if let Some(h) = self.free.pop() {
            self.slots[h.to_index()] = Some(element);
            h
        } else {
            assert!(self.slots.len() < Handle::MAX, "arena at maximum capacity");
            self.slots.push(Some(element));
            Handle::from_index(self.slots.len() - 1)
        }
    }

    /// Whether `handle` addresses a live element.
    #[inline]
    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.to_index())
            .is_some_and(|slot| slot.is_some())
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()]
            .as_ref()
            .expect("stale arena handle")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.slots[handle.to_index()]
            .as_mut()
            .expect("stale arena handle")
    }

    /// Removes the element, releasing its slot for reuse.
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let element = self.slots[handle.to_index()]
            .take()
            .expect("stale arena handle");
        self.free.push(handle);
        element
    }
}
