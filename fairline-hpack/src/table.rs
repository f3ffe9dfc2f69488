//! Dynamic table and the unified indexing table (RFC 7541 Section 2.3).
//!
//! Entries live in a slab arena and are ordered by a deque of handles, so
//! the encoder's reverse index can reference entries by handle without
//! touching them when other entries churn. Relative indices are derived from
//! a monotonically increasing insertion sequence and an eviction offset, so
//! they stay well-defined across evictions.

use std::collections::{HashMap, VecDeque};

use slab::Slab;

use crate::error::HpackError;
use crate::statictable::{self, STATIC_TABLE_ENTRIES};
use crate::{HeaderField, IndexKind, LookupResult, Match};

struct Entry {
    field: HeaderField,
    seq: u64,
}

/// Encoder-side reverse index over the dynamic table.
struct ReverseIndex {
    /// name -> slab handles of live entries with that name, oldest first.
    by_name: HashMap<Vec<u8>, Vec<usize>>,
    next_seq: u64,
    /// Entries ever evicted. Advances once per eviction, unconditionally,
    /// so `offset + len - seq` stays a valid relative index.
    offset: u64,
}

/// Bounded, insertion-ordered catalogue of header fields
/// (RFC 7541 Section 2.3.2).
pub struct DynamicTable {
    /// Slab handles in insertion order, front = newest.
    order: VecDeque<usize>,
    entries: Slab<Entry>,
    current_size: usize,
    maximum_size: usize,
    /// Present only in the encoder context.
    reverse: Option<ReverseIndex>,
}

impl DynamicTable {
    /// Decoder-context table: no reverse index.
    pub fn new(maximum_size: usize) -> Self {
        Self {
            order: VecDeque::new(),
            entries: Slab::new(),
            current_size: 0,
            maximum_size,
            reverse: None,
        }
    }

    /// Encoder-context table: maintains the name/value reverse index that
    /// `lookup` consults.
    pub fn with_reverse_index(maximum_size: usize) -> Self {
        Self {
            reverse: Some(ReverseIndex {
                by_name: HashMap::new(),
                next_seq: 0,
                offset: 0,
            }),
            ..Self::new(maximum_size)
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current byte cost of all entries (RFC 7541 Section 4.1).
    pub fn size(&self) -> usize {
        self.current_size
    }

    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    pub(crate) fn has_reverse_index(&self) -> bool {
        self.reverse.is_some()
    }

    /// Fetch by relative index; 1 is the most recently inserted entry.
    pub fn get(&self, relative_index: usize) -> Option<&HeaderField> {
        if relative_index == 0 {
            return None;
        }
        let key = *self.order.get(relative_index - 1)?;
        Some(&self.entries[key].field)
    }

    /// Insert a field, evicting from the tail to stay within the size bound.
    ///
    /// An entry larger than the whole table empties it and stores nothing;
    /// that is defined behaviour, not an error (RFC 7541 Section 4.4).
    pub fn insert(&mut self, field: HeaderField) {
        let cost = field.size();
        if cost > self.maximum_size {
            self.wipe();
            return;
        }

        self.current_size += cost;
        self.evict_overflowed();

        let key = self.entries.insert(Entry { field, seq: 0 });
        self.order.push_front(key);
        if let Some(reverse) = &mut self.reverse {
            let entry = &mut self.entries[key];
            entry.seq = reverse.next_seq;
            reverse.next_seq += 1;
            reverse
                .by_name
                .entry(entry.field.name.clone())
                .or_default()
                .push(key);
        }
    }

    /// Store a new maximum and evict until the table fits
    /// (RFC 7541 Section 4.3).
    pub fn update_maximum_size(&mut self, new_size: usize) {
        self.maximum_size = new_size;
        self.evict_overflowed();
    }

    /// Find `(name, value)` via the reverse index. Encoder context only.
    ///
    /// An exact value match wins; otherwise the freshest entry with the name
    /// is returned as a name match. Returned indices are relative (1 =
    /// newest).
    pub fn lookup(&self, name: &[u8], value: &[u8]) -> LookupResult {
        let Some(reverse) = &self.reverse else {
            debug_assert!(false, "lookup on a decoder-context table");
            return LookupResult::none();
        };
        let Some(keys) = reverse.by_name.get(name) else {
            return LookupResult::none();
        };

        // Newest first: the freshest match compresses to the smallest index.
        for &key in keys.iter().rev() {
            let entry = &self.entries[key];
            if entry.field.value == value {
                return LookupResult {
                    index: self.relative_index(reverse, entry.seq),
                    kind: IndexKind::Dynamic,
                    matched: Match::Exact,
                };
            }
        }

        let Some(&newest) = keys.last() else {
            return LookupResult::none();
        };
        LookupResult {
            index: self.relative_index(reverse, self.entries[newest].seq),
            kind: IndexKind::Dynamic,
            matched: Match::Name,
        }
    }

    /// Relative index (1-based from the newest entry) of insertion `seq`.
    fn relative_index(&self, reverse: &ReverseIndex, seq: u64) -> u32 {
        (reverse.offset + self.order.len() as u64 - seq) as u32
    }

    fn evict_overflowed(&mut self) {
        while self.current_size > self.maximum_size {
            let Some(key) = self.order.pop_back() else {
                break;
            };
            let entry = self.entries.remove(key);
            self.current_size -= entry.field.size();
            if let Some(reverse) = &mut self.reverse {
                reverse.offset += 1;
                if let Some(keys) = reverse.by_name.get_mut(&entry.field.name) {
                    keys.retain(|&k| k != key);
                    if keys.is_empty() {
                        reverse.by_name.remove(&entry.field.name);
                    }
                }
            }
        }
    }

    fn wipe(&mut self) {
        if let Some(reverse) = &mut self.reverse {
            reverse.offset += self.order.len() as u64;
            reverse.by_name.clear();
        }
        self.order.clear();
        self.entries.clear();
        self.current_size = 0;
    }
}

/// Unified index space over the static and dynamic tables
/// (RFC 7541 Section 2.3.3): 0 is invalid, `1..=61` is static, `62..` is
/// dynamic with 62 the newest entry.
pub struct IndexingTable {
    dynamic: DynamicTable,
}

impl IndexingTable {
    /// Decoding-context table.
    pub fn new(maximum_size: usize) -> Self {
        Self {
            dynamic: DynamicTable::new(maximum_size),
        }
    }

    /// Encoding-context table, with the reverse index `lookup` needs.
    pub fn with_reverse_index(maximum_size: usize) -> Self {
        Self {
            dynamic: DynamicTable::with_reverse_index(maximum_size),
        }
    }

    /// Find the best representation for `(name, value)`.
    ///
    /// A static exact match wins outright; otherwise a dynamic exact match
    /// (shifted into the unified space); otherwise the best static result,
    /// which is at most a name match.
    pub fn lookup(&self, name: &[u8], value: &[u8]) -> LookupResult {
        let result = statictable::lookup(name, value);
        if result.matched == Match::Exact {
            return result;
        }

        if self.dynamic.has_reverse_index() {
            let dynamic = self.dynamic.lookup(name, value);
            if dynamic.matched == Match::Exact {
                return LookupResult {
                    index: dynamic.index + STATIC_TABLE_ENTRIES,
                    ..dynamic
                };
            }
        }

        result
    }

    /// Resolve a unified index to an owned header field.
    pub fn get(&self, index: u32) -> Result<HeaderField, HpackError> {
        if index == 0 {
            return Err(HpackError::Compression);
        }
        if index <= STATIC_TABLE_ENTRIES {
            let (name, value) = statictable::get(index).ok_or(HpackError::Compression)?;
            return Ok(HeaderField::new(name, value));
        }
        // Indices past both tables are a decoding error.
        self.dynamic
            .get((index - STATIC_TABLE_ENTRIES) as usize)
            .cloned()
            .ok_or(HpackError::Compression)
    }

    pub fn insert(&mut self, field: HeaderField) {
        self.dynamic.insert(field);
    }

    pub fn update_maximum_size(&mut self, new_size: usize) {
        self.dynamic.update_maximum_size(new_size);
    }

    pub fn size(&self) -> usize {
        self.dynamic.size()
    }

    pub fn maximum_size(&self) -> usize {
        self.dynamic.maximum_size()
    }

    pub fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }

    /// The dynamic region, for tests and introspection.
    pub fn dynamic(&self) -> &DynamicTable {
        &self.dynamic
    }
}
