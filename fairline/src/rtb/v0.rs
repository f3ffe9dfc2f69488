//! Observe-only limiter: records per-tenant load, never rejects.

use std::collections::HashMap;
use std::marker::PhantomData;

use super::{Bucket, Conf, GlobalBucket, StatKind};

/// Variant 0 of the reactive token bucket. No tokens, no denial -- only the
/// per-tenant and global observation counters, so operators can measure
/// tenant load before turning restriction on.
pub struct AlgorithmV0<S> {
    conf: Conf,
    buckets: HashMap<u64, Bucket>,
    /// `(observed, tid)` descending; rebuilt by `filter`.
    sorted: Vec<(u64, u64)>,
    global: GlobalBucket,
    _kind: PhantomData<S>,
}

impl<S: StatKind> AlgorithmV0<S> {
    pub fn new(conf: Conf) -> Self {
        Self {
            conf,
            buckets: HashMap::new(),
            sorted: Vec::new(),
            global: GlobalBucket::default(),
            _kind: PhantomData,
        }
    }

    /// Register a tenant bucket. Idempotent; buckets live as long as the
    /// limiter.
    pub fn add(&mut self, tid: u64) {
        self.buckets.entry(tid).or_default();
    }

    pub fn is_full(&mut self, _tid: u64) -> bool {
        false
    }

    pub fn inc(&mut self, tid: u64) {
        let Some(bucket) = self.buckets.get_mut(&tid) else {
            return;
        };
        bucket.observed += 1;
        self.global.observed += 1;
    }

    /// Gauge kinds only.
    pub fn dec(&mut self, tid: u64) {
        debug_assert!(S::DECREMENTABLE, "dec on a counter-kind limiter");
        let Some(bucket) = self.buckets.get_mut(&tid) else {
            return;
        };
        debug_assert!(bucket.observed > 0);
        bucket.observed -= 1;
        debug_assert!(self.global.observed > 0);
        self.global.observed -= 1;
    }

    /// Rebuild the descending `(observed, tid)` ordering.
    pub fn filter(&mut self) {
        self.sorted.clear();
        for (&tid, bucket) in &self.buckets {
            self.sorted.push((bucket.observed, tid));
        }
        self.sorted
            .sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    }

    /// Tick boundary: clear observation counters per the stat kind.
    pub fn reserve(&mut self) {
        S::clear(&mut self.global.observed);
        for bucket in self.buckets.values_mut() {
            S::clear(&mut bucket.observed);
        }
    }

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
