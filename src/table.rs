use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
}

/// Hash-consing table: every distinct value is stored exactly once.
///
/// Entries live in a growing vector; collisions are chained through `next` indices.
/// Index `0` is a sentinel and is never returned.
pub struct Table<T> {
    data: Vec<Entry<T>>,
    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with `2^bits` buckets (at most `2^20`).
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let buckets_bits = min(bits, 20);
        let buckets_size = 1 << buckets_bits;
        let bitmask = (buckets_size - 1) as u64;

        let mut data = Vec::with_capacity(1 << min(bits, 20));
        data.push(Entry {
            value: T::default(),
            next: 0,
        });

        Self {
            data,
            buckets: vec![0; buckets_size],
            bitmask,
        }
    }
}

impl<T> Table<T> {
    /// Number of stored values (the sentinel excluded).
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }

    /// Number of allocated slots.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    /// Get the index of the next entry in the same bucket.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }

    /// Add a new value to the table (without hash-consing) and return its index.
    pub fn add(&mut self, value: T) -> usize {
        self.data.push(Entry { value, next: 0 });
        self.data.len() - 1
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Put a value into the table and return its index, reusing an existing equal entry.
    pub fn put(&mut self, value: T) -> usize {
        let bucket_index = self.bucket_index(&value);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            let i = self.add(value);
            self.buckets[bucket_index] = i;
            return i;
        }

        loop {
            if &value == self.value(index) {
                return index;
            }
            let next = self.next(index);
            if next == 0 {
                let i = self.add(value);
                self.data[index].next = i;
                return i;
            }
            index = next;
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
