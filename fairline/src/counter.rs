//! Sharded per-worker metric storage.
//!
//! Workers never coordinate on admission state, and the same holds for
//! metrics: each worker thread claims a shard with [`set_thread_shard`] and
//! writes only to it; exposition sums across shards. [`ShardedCounter`]
//! accumulates monotonically, [`TickGauge`] holds the per-worker value set
//! at the last tick.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

const NUM_SHARDS: usize = 64;

thread_local! {
    /// Thread-local shard id, set by `set_thread_shard()`. Falls back to a
    /// hash of a TLS address when unset.
    static SHARD_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Claim a shard for the current thread.
///
/// Call at worker startup with the worker index so shard assignment is
/// deterministic and workers never contend on a cache line.
pub fn set_thread_shard(id: usize) {
    SHARD_ID.set(Some(id % NUM_SHARDS));
}

#[inline]
fn shard_index() -> usize {
    SHARD_ID.get().unwrap_or_else(|| {
        thread_local! {
            static ID: u8 = const { 0 };
        }
        ID.with(|x| x as *const u8 as usize) % NUM_SHARDS
    })
}

/// A monotonic counter summed across worker shards.
///
/// Implements [`metriken::Metric`], so statics can be registered with the
/// `#[metric]` attribute.
pub struct ShardedCounter {
    shards: [AtomicU64; NUM_SHARDS],
}

impl ShardedCounter {
    #[allow(clippy::declare_interior_mutable_const)]
    pub const fn new() -> Self {
        const ZERO: AtomicU64 = AtomicU64::new(0);
        Self {
            shards: [ZERO; NUM_SHARDS],
        }
    }

    #[inline]
    pub fn increment(&self) {
        self.add(1);
    }

    #[inline]
    pub fn add(&self, value: u64) {
        self.shards[shard_index()].fetch_add(value, Ordering::Relaxed);
    }

    /// Current value, aggregated across all shards.
    pub fn value(&self) -> u64 {
        self.shards.iter().map(|s| s.load(Ordering::Relaxed)).sum()
    }
}

impl Default for ShardedCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl metriken::Metric for ShardedCounter {
    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn value(&self) -> Option<metriken::Value<'_>> {
        Some(metriken::Value::Counter(ShardedCounter::value(self)))
    }
}

/// A tick-snapshot gauge: each worker stores its own value, exposition sums
/// them. This is how per-tenant admission stats aggregate across workers
/// without coordination.
pub struct TickGauge {
    shards: [AtomicU64; NUM_SHARDS],
}

impl TickGauge {
    #[allow(clippy::declare_interior_mutable_const)]
    pub const fn new() -> Self {
        const ZERO: AtomicU64 = AtomicU64::new(0);
        Self {
            shards: [ZERO; NUM_SHARDS],
        }
    }

    /// Store this worker's value for the slot.
    #[inline]
    pub fn set(&self, value: u64) {
        self.shards[shard_index()].store(value, Ordering::Relaxed);
    }

    /// Sum of the per-worker values.
    pub fn value(&self) -> u64 {
        self.shards.iter().map(|s| s.load(Ordering::Relaxed)).sum()
    }
}

impl Default for TickGauge {
    fn default() -> Self {
        Self::new()
    }
}

impl metriken::Metric for TickGauge {
    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn value(&self) -> Option<metriken::Value<'_>> {
        Some(metriken::Value::Gauge(TickGauge::value(self) as i64))
    }
}
