//! Reactive token bucket with dynamic allocation.
//!
//! The configured `limit` splits into a dedicated region sized
//! `limit * (1 - red_zone)`, divided among the top-N tenants in proportion
//! to their observed load, and a shared global bucket holding the rest.
//! Load above a tenant's dedicated token spills into the global bucket, so
//! small tenants and bursts stay admissible until the shared capacity is
//! exhausted. A tenant that keeps getting denied while the global bucket is
//! over is penalised: for `penalty_duration` ticks its demand is counted as
//! its last token allocation rather than its inflated observed load.

use std::collections::HashMap;
use std::marker::PhantomData;

use super::{Bucket, Conf, GlobalBucket, StatKind};

/// Variant 1 of the reactive token bucket: admission plus fair sharing.
pub struct AlgorithmV1<S> {
    conf: Conf,
    buckets: HashMap<u64, Bucket>,
    /// `(sort_key, tid)` descending; rebuilt by `filter`.
    sorted: Vec<(u64, u64)>,
    global: GlobalBucket,
    _kind: PhantomData<S>,
}

impl<S: StatKind> AlgorithmV1<S> {
    pub fn new(conf: Conf) -> Self {
        // Until the first reserve hands out dedicated buckets, the whole
        // limit is shared capacity.
        let global = GlobalBucket {
            observed: 0,
            token: conf.limit,
        };
        Self {
            conf,
            buckets: HashMap::new(),
            sorted: Vec::new(),
            global,
            _kind: PhantomData,
        }
    }

    /// Register a tenant bucket. Idempotent; buckets live as long as the
    /// limiter, only their counters clear.
    pub fn add(&mut self, tid: u64) {
        self.buckets.entry(tid).or_default();
    }

    /// Admission check. Increments the tenant's `denied` counter on every
    /// `true` verdict.
    pub fn is_full(&mut self, tid: u64) -> bool {
        if self.conf.limit == 0 {
            return false;
        }
        let global_over = self.global.observed > self.global.token;
        let Some(bucket) = self.buckets.get_mut(&tid) else {
            return false;
        };

        if bucket.token == 0 {
            // Not in the top-N last tick: the tenant rides the global
            // bucket and is only rejected once that is exhausted.
            if global_over {
                bucket.denied += 1;
                return true;
            }
            return false;
        }

        if bucket.observed > bucket.token && global_over {
            bucket.denied += 1;
            return true;
        }
        false
    }

    pub fn inc(&mut self, tid: u64) {
        let Some(bucket) = self.buckets.get_mut(&tid) else {
            return;
        };
        bucket.observed += 1;
        bucket.enqueue += 1;

        if bucket.token > 0 && bucket.observed <= bucket.token {
            // Load stayed within the dedicated bucket.
            return;
        }

        bucket.overflowed += 1;
        self.global.observed += 1;
    }

    /// Mirror of `inc`. Gauge kinds only.
    pub fn dec(&mut self, tid: u64) {
        debug_assert!(S::DECREMENTABLE, "dec on a counter-kind limiter");
        let Some(bucket) = self.buckets.get_mut(&tid) else {
            return;
        };
        debug_assert!(bucket.observed > 0);
        bucket.observed -= 1;
        bucket.dequeue += 1;

        if bucket.overflowed == 0 {
            return;
        }
        bucket.overflowed -= 1;
        debug_assert!(self.global.observed > 0);
        self.global.observed -= 1;
    }

    /// Rebuild the descending load ordering consumed by `reserve`.
    ///
    /// Queue-style resources fold the window's enqueue/dequeue delta into
    /// the carried backlog and sort by `backlog + enqueue`; everything else
    /// sorts by raw `observed`.
    pub fn filter(&mut self) {
        self.sorted.clear();
        for (&tid, bucket) in &mut self.buckets {
            if self.conf.queue {
                bucket.queue_delta = bucket
                    .queue_delta
                    .wrapping_add(bucket.enqueue.wrapping_sub(bucket.dequeue));
                bucket.observed = bucket.queue_delta + bucket.enqueue;
            }
            self.sorted.push((bucket.observed, tid));
        }
        self.sorted
            .sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    }

    /// Re-allocate tokens from the load observed in the closing window.
    /// Runs once per tick, after `filter`.
    pub fn reserve(&mut self) {
        // Pass 1 over the top-N: penalty bookkeeping and total demand.
        let mut total = 0u64;
        for &(_, tid) in self.sorted.iter().take(self.conf.top_n as usize) {
            let Some(bucket) = self.buckets.get_mut(&tid) else {
                continue;
            };

            if bucket.tmp_limit > 0 {
                bucket.tmp_limit_counter += 1;
                if bucket.tmp_limit_counter >= self.conf.penalty_duration {
                    bucket.tmp_limit = 0;
                    bucket.tmp_limit_counter = 0;
                }
            } else if self.global.observed > self.global.token
                && bucket.observed > bucket.token
                && bucket.denied > 0
            {
                // Denied while the shared capacity was exhausted: freeze the
                // tenant's demand at its current allocation.
                bucket.tmp_limit = bucket.token;
            }

            total += if bucket.tmp_limit > 0 {
                bucket.tmp_limit
            } else {
                bucket.observed
            };
        }

        // Pass 2 over everyone, same order: hand out dedicated tokens and
        // clear the window counters.
        let unit = if total > 0 {
            self.conf.limit as f64 * (1.0 - self.conf.red_zone) / total as f64
        } else {
            0.0
        };

        let mut assigned = 0u64;
        for (rank, &(_, tid)) in self.sorted.iter().enumerate() {
            let Some(bucket) = self.buckets.get_mut(&tid) else {
                continue;
            };

            if (rank as u64) < self.conf.top_n {
                let demand = if bucket.tmp_limit > 0 {
                    bucket.tmp_limit
                } else {
                    bucket.observed
                };
                // Truncation keeps the dedicated region within
                // limit * (1 - red_zone).
                bucket.token = (demand as f64 * unit) as u64;
                assigned += bucket.token;
            } else {
                bucket.token = 0;
            }

            S::clear(&mut bucket.observed);
            S::clear(&mut bucket.overflowed);
            // Window statistics clear regardless of kind: enqueue/dequeue
            // feed queue_delta (which carries), and a stale denied count
            // would re-trigger penalties.
            bucket.enqueue = 0;
            bucket.dequeue = 0;
            bucket.denied = 0;
        }

        self.global.token = self.conf.limit.saturating_sub(assigned);
        S::clear(&mut self.global.observed);
    }

    /// Swap the configuration; arithmetic picks it up at the next tick.
    pub fn reconfigure(&mut self, conf: Conf) {
        self.conf = conf;
    }

    pub fn buckets(&self) -> &HashMap<u64, Bucket> {
        &self.buckets
    }

    pub fn sorted(&self) -> &[(u64, u64)] {
        &self.sorted
    }

    pub fn global(&self) -> &GlobalBucket {
        &self.global
    }

    pub fn conf(&self) -> &Conf {
        &self.conf
    }
}
