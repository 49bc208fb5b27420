//! Open-addressing map from 31-bit keys to small `Copy` values.
//!
//! Collisions are resolved with Robin-Hood displacement and deletions leave tombstones
//! behind, so probe chains stay intact. The table never resizes itself; owners call
//! [`HashTable::grow`] when [`HashTable::load`] gets too high.

/// Key 0 marks an empty slot.
pub const EMPTY: u32 = 0;
/// High bit marks a removed entry. Legal keys are masked with `!TOMBSTONE`.
pub const TOMBSTONE: u32 = 1 << 31;
pub const DEFAULT_CAPACITY: usize = 2048;

#[derive(Debug, Clone)]
pub struct HashTable<V> {
    keys: Vec<u32>,
    values: Vec<V>,
    len: usize,
    tombstones: usize,
}

#[inline]
fn validate_key(key: u32) -> u32 {
    let key = key & !TOMBSTONE;
    assert!(key != EMPTY, "hashtable keys must be non-zero in their low 31 bits");
    key
}

impl<V: Copy + Default> Default for HashTable<V> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<V: Copy + Default> HashTable<V> {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "hashtable capacity must be a power of two, got {capacity}"
        );
        Self {
            keys: vec![EMPTY; capacity],
            values: vec![V::default(); capacity],
            len: 0,
            tombstones: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fraction of slots that are live or tombstoned.
    pub fn load(&self) -> f32 {
        (self.len + self.tombstones) as f32 / self.capacity() as f32
    }

    #[inline]
    fn mask(&self) -> usize {
        self.capacity() - 1
    }

    #[inline]
    fn desired_pos(&self, key: u32) -> usize {
        key as usize & self.mask()
    }

    #[inline]
    fn probe_distance(&self, key: u32, slot: usize) -> usize {
        (slot + self.capacity() - self.desired_pos(key)) & self.mask()
    }

    fn find_slot(&self, key: u32) -> Option<usize> {
        let mut slot = self.desired_pos(key);
        for _ in 0..self.capacity() {
            match self.keys[slot] {
                EMPTY => return None,
                k if k == key => return Some(slot),
                _ => slot = (slot + 1) & self.mask(),
            }
        }
        None
    }

    /// Inserts or overwrites `key`, returning the previous value if there was one.
    pub fn insert(&mut self, key: u32, value: V) -> Option<V> {
        let key = validate_key(key);
        if let Some(slot) = self.find_slot(key) {
            return Some(std::mem::replace(&mut self.values[slot], value));
        }
        assert!(
            self.len < self.capacity(),
            "hashtable is full ({} entries), grow it before inserting",
            self.len
        );

        let (mut key, mut value) = (key, value);
        let mut slot = self.desired_pos(key);
        let mut dist = 0;
        loop {
            let existing = self.keys[slot];
            if existing == EMPTY || existing & TOMBSTONE != 0 {
                if existing != EMPTY {
                    self.tombstones -= 1;
                }
                self.keys[slot] = key;
                self.values[slot] = value;
                self.len += 1;
                return None;
            }

            // The entry that has travelled further keeps the slot.
            let existing_dist = self.probe_distance(existing, slot);
            if existing_dist < dist {
                std::mem::swap(&mut self.keys[slot], &mut key);
                std::mem::swap(&mut self.values[slot], &mut value);
                dist = existing_dist;
            }

            slot = (slot + 1) & self.mask();
            dist += 1;
        }
    }

    pub fn get(&self, key: u32) -> Option<V> {
        let key = validate_key(key);
        self.find_slot(key).map(|slot| self.values[slot])
    }

    pub fn contains(&self, key: u32) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: u32) -> Option<V> {
        let key = validate_key(key);
        let slot = self.find_slot(key)?;
        self.keys[slot] |= TOMBSTONE;
        self.len -= 1;
        self.tombstones += 1;
        Some(self.values[slot])
    }

    /// Rehashes every live entry into a table of `capacity` slots, dropping tombstones.
    pub fn grow(&mut self, capacity: usize) {
        assert!(capacity >= self.len, "cannot shrink hashtable below its length");
        let mut next = Self::with_capacity(capacity);
        for (key, value) in self.iter() {
            next.insert(key, value);
        }
        *self = next;
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, V)> + '_ {
        self.keys
            .iter()
            .zip(self.values.iter())
            .filter(|(k, _)| **k != EMPTY && **k & TOMBSTONE == 0)
            .map(|(k, v)| (*k, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut table: HashTable<u32> = HashTable::default();
        table.insert(256, 1);
        table.insert(394, 2);
        table.insert(81932, 3);

        // Lands on the same desired slot as 256.
        let chained = table.capacity() as u32 + 256;
        table.insert(chained, 4);

        assert_eq!(table.get(256), Some(1));
        assert_eq!(table.get(394), Some(2));
        assert_eq!(table.get(81932), Some(3));
        assert_eq!(table.get(chained), Some(4));
        assert_eq!(table.get(3333), None);
        assert_eq!(table.len(), 4);

        assert_eq!(table.remove(256), Some(1));
        assert_eq!(table.get(256), None);
        assert_eq!(table.get(chained), Some(4));
        assert_eq!(table.remove(256), None);
    }

    #[test]
    fn displacement_keeps_every_entry() {
        let mut table: HashTable<u32> = HashTable::with_capacity(16);
        // All of these want slot 3 or 4.
        let keys = [3, 19, 4, 35, 20, 51];
        for (i, key) in keys.iter().enumerate() {
            table.insert(*key, i as u32 + 10);
        }
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(table.get(*key), Some(i as u32 + 10), "key {key}");
        }

        table.remove(19);
        table.insert(67, 99);
        assert_eq!(table.get(67), Some(99));
        assert_eq!(table.get(35), Some(13));
        assert_eq!(table.get(19), None);
    }

    #[test]
    fn tombstone_bit_is_masked() {
        let mut table: HashTable<u8> = HashTable::with_capacity(8);
        table.insert(5 | TOMBSTONE, 7);
        assert_eq!(table.get(5), Some(7));
        assert_eq!(table.insert(5, 8), Some(7));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn grow_rehashes() {
        let mut table: HashTable<u32> = HashTable::with_capacity(4);
        for key in 1..=4 {
            table.insert(key, key * 2);
        }
        table.remove(2);
        table.grow(16);
        assert_eq!(table.capacity(), 16);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(4), Some(8));
        assert_eq!(table.get(2), None);
        assert!(table.load() < 0.25);
    }

    #[test]
    #[should_panic(expected = "hashtable is full")]
    fn full_table_panics() {
        let mut table: HashTable<u32> = HashTable::with_capacity(2);
        table.insert(1, 1);
        table.insert(2, 2);
        table.insert(3, 3);
    }
}
