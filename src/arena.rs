//! Bucketed bump allocator for per-frame byte storage.
//!
//! Allocations are handed out as [`ArenaSlice`] handles rather than references so the
//! arena can keep growing while earlier allocations are still alive. Nothing is freed
//! individually; [`Arena::rewind`] and [`Arena::clear`] release memory in bulk and keep
//! the buckets around for reuse.

pub const DEFAULT_BUCKET_SIZE: usize = 1024 * 1024;

/// A saved allocation cursor, see [`Arena::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaMark {
    bucket: u32,
    at: u32,
}

/// A region of arena memory. Only meaningful for the arena that produced it and
/// only until that arena is rewound past it or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaSlice {
    bucket: u32,
    start: u32,
    len: u32,
}

impl ArenaSlice {
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug)]
pub struct Arena {
    name: &'static str,
    buckets: Vec<Box<[u8]>>,
    bucket_size: usize,
    current: usize,
    at: usize,
}

impl Arena {
    pub fn new(name: &'static str, bucket_size: usize) -> Self {
        assert!(bucket_size > 0, "arena {name}: bucket size must be non-zero");
        Self {
            name,
            buckets: Vec::new(),
            bucket_size,
            current: 0,
            at: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bytes handed out since the last clear, including space skipped at the end of
    /// buckets that could not fit a request.
    pub fn used(&self) -> usize {
        self.buckets
            .iter()
            .take(self.current)
            .map(|b| b.len())
            .sum::<usize>()
            + self.at
    }

    /// Reserves `size` zeroed-or-stale bytes. Requests larger than the bucket size get
    /// a dedicated bucket sized to fit.
    pub fn push(&mut self, size: usize) -> ArenaSlice {
        loop {
            match self.buckets.get(self.current) {
                Some(bucket) if self.at + size <= bucket.len() => break,
                Some(_) => {
                    self.current += 1;
                    self.at = 0;
                }
                None => {
                    let cap = self.bucket_size.max(size);
                    tracing::trace!(arena = self.name, cap, "arena bucket allocated");
                    self.buckets.push(vec![0u8; cap].into_boxed_slice());
                    self.current = self.buckets.len() - 1;
                    self.at = 0;
                    break;
                }
            }
        }

        let slice = ArenaSlice {
            bucket: self.current as u32,
            start: self.at as u32,
            len: size as u32,
        };
        self.at += size;
        slice
    }

    /// Copies `bytes` into the arena.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> ArenaSlice {
        let slice = self.push(bytes.len());
        self.get_mut(slice).copy_from_slice(bytes);
        slice
    }

    pub fn get(&self, slice: ArenaSlice) -> &[u8] {
        if slice.len == 0 {
            return &[];
        }
        let start = slice.start as usize;
        &self.buckets[slice.bucket as usize][start..start + slice.len as usize]
    }

    pub fn get_mut(&mut self, slice: ArenaSlice) -> &mut [u8] {
        if slice.len == 0 {
            return &mut [];
        }
        let start = slice.start as usize;
        &mut self.buckets[slice.bucket as usize][start..start + slice.len as usize]
    }

    /// Reads a slice written with [`Arena::push_bytes`] from a `&str`.
    pub fn get_str(&self, slice: ArenaSlice) -> &str {
        std::str::from_utf8(self.get(slice)).unwrap_or_default()
    }

    pub fn mark(&self) -> ArenaMark {
        ArenaMark {
            bucket: self.current as u32,
            at: self.at as u32,
        }
    }

    /// Moves the cursor back to `mark`. Debug builds zero the released bytes so reads
    /// through stale slices show up as zeros instead of plausible data.
    pub fn rewind(&mut self, mark: ArenaMark) {
        let (bucket, at) = (mark.bucket as usize, mark.at as usize);
        assert!(
            (bucket, at) <= (self.current, self.at),
            "arena {}: rewind past the current position",
            self.name
        );

        if cfg!(debug_assertions) {
            for index in bucket..=self.current.min(self.buckets.len().saturating_sub(1)) {
                let Some(b) = self.buckets.get_mut(index) else { break };
                let from = if index == bucket { at } else { 0 };
                let to = if index == self.current { self.at } else { b.len() };
                b[from..to].fill(0);
            }
        }

        self.current = bucket;
        self.at = at;
    }

    /// Forgets every allocation. Buckets are kept for the next frame.
    pub fn clear(&mut self) {
        self.current = 0;
        self.at = 0;
    }
}
