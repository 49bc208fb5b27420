//! Free-list backed object pool with generation-tagged handles.
//!
//! A [`Handle`] stays valid until its slot is given back or the pool is reset. After
//! that the slot's generation moves on and the old handle fails every lookup instead
//! of aliasing whatever reuses the slot.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    live: bool,
    value: T,
}

#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    len: usize,
    free: Vec<u32>,
}

impl<T: Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> Pool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
            free: Vec::new(),
        }
    }

    /// Slots handed out since the last reset, live or on the free list.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn live_count(&self) -> usize {
        self.len - self.free.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Pops the free list, or appends a fresh slot. The value is always `T::default()`.
    pub fn take(&mut self) -> Handle {
        let index = match self.free.pop() {
            Some(index) => index as usize,
            None => {
                let index = self.len;
                if index == self.slots.len() {
                    self.slots.push(Slot {
                        generation: 0,
                        live: false,
                        value: T::default(),
                    });
                }
                self.len += 1;
                index
            }
        };

        let slot = &mut self.slots[index];
        slot.live = true;
        slot.value = T::default();
        Handle {
            index: index as u32,
            generation: slot.generation,
        }
    }

    /// Returns a slot to the free list. Stale handles are ignored and reported as `false`.
    pub fn give(&mut self, handle: Handle) -> bool {
        if !self.is_valid(handle) {
            return false;
        }
        let slot = &mut self.slots[handle.index as usize];
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        true
    }

    /// Invalidates every handle at once and empties the free list. Backing storage is kept.
    pub fn reset(&mut self) {
        for slot in &mut self.slots[..self.len] {
            slot.live = false;
            slot.generation = slot.generation.wrapping_add(1);
        }
        self.len = 0;
        self.free.clear();
    }

    #[inline]
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.live && slot.generation == handle.generation)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        (slot.live && slot.generation == handle.generation).then_some(&slot.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        (slot.live && slot.generation == handle.generation).then_some(&mut slot.value)
    }

    /// Mints a handle for a live index, for owners that link slots by raw index.
    pub fn handle(&self, index: u32) -> Option<Handle> {
        let slot = self.slots.get(index as usize)?;
        slot.live.then_some(Handle {
            index,
            generation: slot.generation,
        })
    }
}

impl<T> std::ops::Index<u32> for Pool<T> {
    type Output = T;

    fn index(&self, index: u32) -> &T {
        let slot = &self.slots[index as usize];
        assert!(slot.live, "pool slot {index} is not live");
        &slot.value
    }
}

impl<T> std::ops::IndexMut<u32> for Pool<T> {
    fn index_mut(&mut self, index: u32) -> &mut T {
        let slot = &mut self.slots[index as usize];
        assert!(slot.live, "pool slot {index} is not live");
        &mut slot.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Record {
        canary: u32,
    }

    #[test]
    fn free_list_is_reused_before_growing() {
        let mut pool: Pool<Record> = Pool::new();
        let mut tracked = Vec::new();
        for i in 0..2048u32 {
            let h = pool.take();
            pool.get_mut(h).unwrap().canary = i % 255;
            if i % 33 == 0 && tracked.len() < 128 {
                tracked.push(h);
            }
        }
        let len_before = pool.len();

        for h in &tracked {
            assert!(pool.give(*h));
        }
        assert_eq!(pool.free_count(), tracked.len());
        assert!(pool.get(tracked[0]).is_none());

        for _ in 0..tracked.len() {
            let h = pool.take();
            assert_eq!(pool.get(h).unwrap().canary, 0);
        }
        assert_eq!(pool.len(), len_before);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn reset_invalidates_handles() {
        let mut pool: Pool<Record> = Pool::new();
        let a = pool.take();
        let b = pool.take();
        pool.reset();
        assert!(pool.is_empty());
        assert!(!pool.is_valid(a));
        assert!(pool.get(b).is_none());

        // Same index comes back with a newer generation.
        let c = pool.take();
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert!(pool.get(a).is_none());
        assert!(pool.get(c).is_some());
    }

    #[test]
    fn double_give_is_rejected() {
        let mut pool: Pool<Record> = Pool::new();
        let a = pool.take();
        assert!(pool.give(a));
        assert!(!pool.give(a));
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.handle(a.index()), None);
    }
}
