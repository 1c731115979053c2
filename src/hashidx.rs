use crate::*;

/// Initial bucket count.
const INITIAL_BUCKETS: usize = 16;

/// The table grows when len / capacity reaches this.
const LOAD_FACTOR: f64 = 0.75;

/// Separately chained hash table from row id to arena slot.
///
/// The index does not reject duplicate keys; [Table] enforces id uniqueness.
/// It owns its chains but never the rows they point at.
#[derive(Clone)]
pub struct HashIndex {
    /// Bucket chains, each in insertion order. The bucket count is a power of two.
    buckets: Vec<Vec<(i64, usize)>>,
    /// Number of entries.
    len: usize,
}

impl HashIndex {
    /// Construct an empty index with the default bucket count.
    pub fn new() -> Self {
        HashIndex {
            buckets: vec![Vec::new(); INITIAL_BUCKETS],
            len: 0,
        }
    }

    /// Bucket number for a key: Fibonacci multiplicative mix, top bits.
    fn bucket(&self, key: i64) -> usize {
        let mix = (key as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (mix >> (64 - self.buckets.len().trailing_zeros())) as usize
    }

    /// Insert an entry. Grows and rehashes first when the load factor is reached.
    pub fn insert(&mut self, key: i64, slot: usize) {
        if self.len as f64 / self.buckets.len() as f64 >= LOAD_FACTOR {
            self.grow();
        }
        let b = self.bucket(key);
        self.buckets[b].push((key, slot));
        self.len += 1;
    }

    /// First matching slot for a key.
    pub fn search(&self, key: i64) -> Option<usize> {
        self.buckets[self.bucket(key)]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, slot)| *slot)
    }

    /// Remove the first matching entry. A no-op when the key is absent.
    pub fn remove(&mut self, key: i64) {
        let b = self.bucket(key);
        if let Some(pos) = self.buckets[b].iter().position(|(k, _)| *k == key) {
            self.buckets[b].remove(pos);
            self.len -= 1;
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current bucket count.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Double the bucket count and rehash every entry.
    fn grow(&mut self) {
        let n = self.buckets.len() * 2;
        trace!("hash index grows to {} buckets", n);
        let old = std::mem::replace(&mut self.buckets, vec![Vec::new(); n]);
        for chain in old {
            for (key, slot) in chain {
                let b = self.bucket(key);
                self.buckets[b].push((key, slot));
            }
        }
    }
}

impl Default for HashIndex {
    fn default() -> Self {
        Self::new()
    }
}
