//! Per-tenant admission stats exposition.
//!
//! Once per tick -- inside `reserve`, before counters clear -- each worker
//! copies a snapshot of its top-N tenant buckets and the global bucket into
//! named metric slots. Slot names are external contract:
//!
//! - `fairline.resource.<resource>.<tenant>.<field>`
//! - `fairline.resource.global.<resource>.<field>`
//!
//! Slots are registered lazily and live for the process lifetime. Values are
//! [`TickGauge`]s: each worker writes its own shard and exposition sums
//! shards, which is the whole cross-worker aggregation story -- workers
//! never coordinate.

use std::collections::HashMap;
use std::sync::Mutex;

use metriken::{DynBoxedMetric, MetricBuilder};

use crate::counter::TickGauge;
use crate::manager::ResourceKind;
use crate::rtb::v0::AlgorithmV0;
use crate::rtb::v1::AlgorithmV1;
use crate::rtb::StatKind;
use crate::tenant::UNKNOWN_TENANT_NAME;

/// Stats name prefix; external contract.
const PREFIX: &str = "fairline.resource";

/// Published per-bucket fields, in exposition order. External contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatField {
    Observed,
    Token,
    TmpLimit,
    Denied,
    Overflowed,
}

impl StatField {
    pub const ALL: [StatField; 5] = [
        StatField::Observed,
        StatField::Token,
        StatField::TmpLimit,
        StatField::Denied,
        StatField::Overflowed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StatField::Observed => "observed",
            StatField::Token => "token",
            StatField::TmpLimit => "tmp_limit",
            StatField::Denied => "denied",
            StatField::Overflowed => "overflowed",
        }
    }
}

/// Metric slots for one resource kind.
pub struct ResourceStats {
    resource: &'static str,
    tenant_slots: Mutex<HashMap<(u64, StatField), DynBoxedMetric<TickGauge>>>,
    global_slots: Mutex<HashMap<StatField, DynBoxedMetric<TickGauge>>>,
}

impl ResourceStats {
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            tenant_slots: Mutex::new(HashMap::new()),
            global_slots: Mutex::new(HashMap::new()),
        }
    }

    /// Store this worker's value for a tenant field slot.
    pub fn set(&self, tid: u64, tenant: &str, field: StatField, value: u64) {
        let mut slots = self.tenant_slots.lock().unwrap();
        let gauge = slots.entry((tid, field)).or_insert_with(|| {
            MetricBuilder::new(format!(
                "{PREFIX}.{}.{}.{}",
                self.resource,
                tenant,
                field.name()
            ))
            .build(TickGauge::new())
        });
        gauge.set(value);
    }

    /// Store this worker's value for a global bucket field slot.
    pub fn set_global(&self, field: StatField, value: u64) {
        let mut slots = self.global_slots.lock().unwrap();
        let gauge = slots.entry(field).or_insert_with(|| {
            MetricBuilder::new(format!("{PREFIX}.global.{}.{}", self.resource, field.name()))
                .build(TickGauge::new())
        });
        gauge.set(value);
    }

    /// Snapshot a v1 limiter: every field of the top-N buckets plus the
    /// global bucket. Call before `reserve` clears the window counters.
    pub fn publish_v1<S: StatKind>(
        &self,
        limiter: &AlgorithmV1<S>,
        names: &HashMap<u64, String>,
    ) {
        let top_n = limiter.conf().top_n as usize;
        for &(_, tid) in limiter.sorted().iter().take(top_n) {
            let Some(bucket) = limiter.buckets().get(&tid) else {
                continue;
            };
            let tenant = names
                .get(&tid)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_TENANT_NAME);
            self.set(tid, tenant, StatField::Observed, bucket.observed);
            self.set(tid, tenant, StatField::Token, bucket.token);
            self.set(tid, tenant, StatField::TmpLimit, bucket.tmp_limit);
            self.set(tid, tenant, StatField::Denied, bucket.denied);
            self.set(tid, tenant, StatField::Overflowed, bucket.overflowed);
        }

        let global = limiter.global();
        self.set_global(StatField::Observed, global.observed);
        self.set_global(StatField::Token, global.token);
    }

    /// Snapshot a v0 limiter: observation counters only.
    pub fn publish_v0<S: StatKind>(
        &self,
        limiter: &AlgorithmV0<S>,
        names: &HashMap<u64, String>,
    ) {
        let top_n = limiter.conf().top_n as usize;
        for &(_, tid) in limiter.sorted().iter().take(top_n) {
            let Some(bucket) = limiter.buckets().get(&tid) else {
                continue;
            };
            let tenant = names
                .get(&tid)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_TENANT_NAME);
            self.set(tid, tenant, StatField::Observed, bucket.observed);
        }
        self.set_global(StatField::Observed, limiter.global().observed);
    }

    /// Read a tenant slot back, aggregated across workers.
    pub fn value(&self, tid: u64, field: StatField) -> Option<u64> {
        let slots = self.tenant_slots.lock().unwrap();
        slots.get(&(tid, field)).map(|gauge| gauge.value())
    }

    /// Read a global slot back, aggregated across workers.
    pub fn global_value(&self, field: StatField) -> Option<u64> {
        let slots = self.global_slots.lock().unwrap();
        slots.get(&field).map(|gauge| gauge.value())
    }
}

/// One [`ResourceStats`] per resource kind; shared by all workers.
pub struct StatsRegistry {
    by_kind: [ResourceStats; 4],
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            by_kind: ResourceKind::ALL.map(|kind| ResourceStats::new(kind.name())),
        }
    }

    pub fn for_kind(&self, kind: ResourceKind) -> &ResourceStats {
        &self.by_kind[kind.index()]
    }
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtb::{Conf, CounterKind};

    #[test]
    fn field_names_are_contract() {
        let names: Vec<_> = StatField::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            ["observed", "token", "tmp_limit", "denied", "overflowed"]
        );
    }

    #[test]
    fn publishes_top_n_and_global() {
        let mut limiter = AlgorithmV1::<CounterKind>::new(Conf {
            top_n: 1,
            limit: 10,
            penalty_duration: 0,
            red_zone: 0.2,
            queue: false,
        });
        limiter.add(1);
        limiter.add(2);
        for _ in 0..4 {
            limiter.inc(1);
        }
        limiter.inc(2);
        limiter.filter();

        let stats = ResourceStats::new("sni");
        let mut names = HashMap::new();
        names.insert(1u64, "alpha.example".to_string());
        names.insert(2u64, "bravo.example".to_string());
        stats.publish_v1(&limiter, &names);

        assert_eq!(stats.value(1, StatField::Observed), Some(4));
        // Tenant 2 is outside the top-1 and gets no slot.
        assert_eq!(stats.value(2, StatField::Observed), None);
        assert_eq!(stats.global_value(StatField::Observed), Some(5));
    }

    #[test]
    fn registry_covers_every_kind() {
        let registry = StatsRegistry::new();
        for kind in ResourceKind::ALL {
            registry.for_kind(kind).set_global(StatField::Token, 1);
            assert_eq!(
                registry.for_kind(kind).global_value(StatField::Token),
                Some(1)
            );
        }
    }
}
