//! Per-worker resource limiter manager.
//!
//! Each worker thread owns a [`LocalManager`]: one limiter per enabled
//! resource kind, a tenant id/name map, and handles to the shared
//! configuration and stats. All admission operations are single-threaded
//! with respect to the owning worker; the only cross-worker pieces are the
//! immutable config snapshot and the sharded stats slots.
//!
//! Limits are replicated per worker, not divided: a configured `limit` of
//! 100 admits up to 100 units per worker per tick. Operators running N
//! workers scale the configured limit accordingly.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{ConfigHandle, Mode, ResourceConfigParams};
use crate::counter::set_thread_shard;
use crate::metrics;
use crate::rtb::v0::AlgorithmV0;
use crate::rtb::v1::AlgorithmV1;
use crate::rtb::{Conf, CounterKind, GaugeKind};
use crate::stats::StatsRegistry;
use crate::tenant::{tenant_id, UNKNOWN_TENANT_ID, UNKNOWN_TENANT_NAME};

/// Resource kinds with separately-accounted admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// TLS handshakes, keyed by SNI name.
    TlsHandshake,
    /// Transactions in the active queue.
    ActiveQueue,
    /// Cache disk reads.
    DiskRead,
    /// Cache disk writes.
    DiskWrite,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::TlsHandshake,
        ResourceKind::ActiveQueue,
        ResourceKind::DiskRead,
        ResourceKind::DiskWrite,
    ];

    /// Stats name segment; external contract.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::TlsHandshake => "sni",
            ResourceKind::ActiveQueue => "active_q",
            ResourceKind::DiskRead => "disk_read",
            ResourceKind::DiskWrite => "disk_write",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ResourceKind::TlsHandshake => 0,
            ResourceKind::ActiveQueue => 1,
            ResourceKind::DiskRead => 2,
            ResourceKind::DiskWrite => 3,
        }
    }
}

/// Closed set of limiter variants, one per resource kind and algorithm
/// version. Dispatch is pattern matching.
pub enum Limiter {
    TlsHandshakeV0(AlgorithmV0<CounterKind>),
    TlsHandshakeV1(AlgorithmV1<CounterKind>),
    ActiveQueueV0(AlgorithmV0<GaugeKind>),
    ActiveQueueV1(AlgorithmV1<GaugeKind>),
    DiskReadV1(AlgorithmV1<CounterKind>),
    DiskWriteV1(AlgorithmV1<CounterKind>),
}

macro_rules! each_limiter {
    ($self:expr, $l:ident => $body:expr) => {
        match $self {
            Limiter::TlsHandshakeV0($l) => $body,
            Limiter::TlsHandshakeV1($l) => $body,
            Limiter::ActiveQueueV0($l) => $body,
            Limiter::ActiveQueueV1($l) => $body,
            Limiter::DiskReadV1($l) => $body,
            Limiter::DiskWriteV1($l) => $body,
        }
    };
}

impl Limiter {
    /// Build the limiter for a kind. Observation mode runs the observe-only
    /// variant where one exists; restriction runs the allocating variant.
    fn for_kind(kind: ResourceKind, mode: Mode, conf: Conf) -> Self {
        match (kind, mode) {
            (ResourceKind::TlsHandshake, Mode::Observation) => {
                Limiter::TlsHandshakeV0(AlgorithmV0::new(conf))
            }
            (ResourceKind::TlsHandshake, _) => Limiter::TlsHandshakeV1(AlgorithmV1::new(conf)),
            (ResourceKind::ActiveQueue, Mode::Observation) => {
                Limiter::ActiveQueueV0(AlgorithmV0::new(conf))
            }
            (ResourceKind::ActiveQueue, _) => Limiter::ActiveQueueV1(AlgorithmV1::new(conf)),
            (ResourceKind::DiskRead, _) => Limiter::DiskReadV1(AlgorithmV1::new(conf)),
            (ResourceKind::DiskWrite, _) => Limiter::DiskWriteV1(AlgorithmV1::new(conf)),
        }
    }

    fn add(&mut self, tid: u64) {
        each_limiter!(self, l => l.add(tid))
    }

    fn is_full(&mut self, tid: u64) -> bool {
        each_limiter!(self, l => l.is_full(tid))
    }

    fn inc(&mut self, tid: u64) {
        each_limiter!(self, l => l.inc(tid))
    }

    fn dec(&mut self, tid: u64) {
        each_limiter!(self, l => l.dec(tid))
    }

    fn filter(&mut self) {
        each_limiter!(self, l => l.filter())
    }

    fn reserve(&mut self) {
        each_limiter!(self, l => l.reserve())
    }

    fn reconfigure(&mut self, conf: Conf) {
        each_limiter!(self, l => l.reconfigure(conf))
    }

    fn publish(&self, stats: &crate::stats::ResourceStats, names: &HashMap<u64, String>) {
        match self {
            Limiter::TlsHandshakeV0(l) => stats.publish_v0(l, names),
            Limiter::TlsHandshakeV1(l) => stats.publish_v1(l, names),
            Limiter::ActiveQueueV0(l) => stats.publish_v0(l, names),
            Limiter::ActiveQueueV1(l) => stats.publish_v1(l, names),
            Limiter::DiskReadV1(l) => stats.publish_v1(l, names),
            Limiter::DiskWriteV1(l) => stats.publish_v1(l, names),
        }
    }
}

/// Per-worker limiter set. Create one on each worker thread.
pub struct LocalManager {
    modes: [Mode; 4],
    limiters: [Option<Limiter>; 4],
    tenants: HashMap<u64, String>,
    config: ConfigHandle,
    snapshot: Arc<ResourceConfigParams>,
    stats: Arc<StatsRegistry>,
}

impl LocalManager {
    /// Build a manager for `worker_id` from the current config snapshot.
    ///
    /// Claims the worker's stats shard and registers the tenant catalogue
    /// plus the `unknown` sentinel.
    pub fn new(worker_id: usize, config: ConfigHandle, stats: Arc<StatsRegistry>) -> Self {
        set_thread_shard(worker_id);

        let snapshot = config.snapshot();
        let mut manager = Self {
            modes: [Mode::Disabled; 4],
            limiters: [None, None, None, None],
            tenants: HashMap::new(),
            config,
            snapshot: snapshot.clone(),
            stats,
        };
        manager.build_limiters();
        manager.tenants
            .insert(UNKNOWN_TENANT_ID, UNKNOWN_TENANT_NAME.to_string());
        for limiter in manager.limiters.iter_mut().flatten() {
            limiter.add(UNKNOWN_TENANT_ID);
        }
        manager.register_catalogue(&snapshot.tenants);
        manager
    }

    /// Register a tenant by name, returning its id.
    ///
    /// Idempotent. A name hashing to the reserved sentinel id is logged and
    /// skipped so adversarial names cannot alias the unknown bucket.
    pub fn register(&mut self, name: &str) -> Option<u64> {
        let tid = tenant_id(name);
        if tid == UNKNOWN_TENANT_ID {
            metrics::TENANT_ID_COLLISIONS.increment();
            warn!(name, "tenant name hashes to the reserved id, skipping");
            return None;
        }
        if self.tenants.contains_key(&tid) {
            return Some(tid);
        }

        debug!(name, tid, "registering tenant");
        self.tenants.insert(tid, name.to_string());
        for limiter in self.limiters.iter_mut().flatten() {
            limiter.add(tid);
        }
        metrics::TENANTS_REGISTERED.increment();
        Some(tid)
    }

    /// The name a tenant registered under, if any.
    pub fn tenant_name(&self, tid: u64) -> Option<&str> {
        self.tenants.get(&tid).map(String::as_str)
    }

    /// Admission check for `tid` against one resource kind.
    ///
    /// Authoritative only in restriction mode; disabled and observation
    /// modes always admit.
    pub fn is_full(&mut self, tid: u64, kind: ResourceKind) -> bool {
        metrics::ADMISSION_CHECKS.increment();
        let at = kind.index();
        let Some(limiter) = self.limiters[at].as_mut() else {
            return false;
        };
        let verdict = limiter.is_full(tid);
        if self.modes[at] != Mode::Restriction {
            return false;
        }
        if verdict {
            metrics::ADMISSIONS_DENIED.increment();
        }
        verdict
    }

    /// Record one unit of load. No-op when the kind is disabled.
    pub fn inc(&mut self, tid: u64, kind: ResourceKind) {
        if let Some(limiter) = self.limiters[kind.index()].as_mut() {
            limiter.inc(tid);
        }
    }

    /// Release one unit of load. Gauge-style kinds only; no-op when the
    /// kind is disabled.
    pub fn dec(&mut self, tid: u64, kind: ResourceKind) {
        if let Some(limiter) = self.limiters[kind.index()].as_mut() {
            limiter.dec(tid);
        }
    }

    /// Tick boundary: for every enabled limiter, sort tenants by observed
    /// load, publish stats, and re-allocate tokens. Then pick up any new
    /// configuration snapshot.
    pub fn reserve(&mut self) {
        metrics::RESERVE_TICKS.increment();
        for kind in ResourceKind::ALL {
            if let Some(limiter) = self.limiters[kind.index()].as_mut() {
                limiter.filter();
                limiter.publish(self.stats.for_kind(kind), &self.tenants);
                limiter.reserve();
            }
        }
        self.refresh_config();
    }

    fn refresh_config(&mut self) {
        let latest = self.config.snapshot();
        if Arc::ptr_eq(&latest, &self.snapshot) {
            return;
        }
        debug!("applying new resource configuration");
        self.snapshot = latest;

        for kind in ResourceKind::ALL {
            let at = kind.index();
            let limit_config = *self.snapshot.limit_config(kind);
            if limit_config.mode == self.modes[at] {
                // Same mode: retune in place, counters intact.
                if let Some(limiter) = self.limiters[at].as_mut() {
                    limiter.reconfigure(limit_config.to_conf(kind));
                }
            } else {
                self.modes[at] = limit_config.mode;
                self.limiters[at] = match limit_config.mode {
                    Mode::Disabled => None,
                    mode => {
                        let mut limiter =
                            Limiter::for_kind(kind, mode, limit_config.to_conf(kind));
                        for &tid in self.tenants.keys() {
                            limiter.add(tid);
                        }
                        Some(limiter)
                    }
                };
            }
        }
        let snapshot = self.snapshot.clone();
        self.register_catalogue(&snapshot.tenants);
    }

    fn build_limiters(&mut self) {
        for kind in ResourceKind::ALL {
            let limit_config = self.snapshot.limit_config(kind);
            self.modes[kind.index()] = limit_config.mode;
            self.limiters[kind.index()] = match limit_config.mode {
                Mode::Disabled => None,
                mode => Some(Limiter::for_kind(kind, mode, limit_config.to_conf(kind))),
            };
        }
    }

    fn register_catalogue(&mut self, names: &[String]) {
        for name in names {
            self.register(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(document: &str) -> LocalManager {
        let config = ConfigHandle::from_toml(document).unwrap();
        LocalManager::new(0, config, Arc::new(StatsRegistry::new()))
    }

    #[test]
    fn disabled_kind_is_inert() {
        let mut m = manager("");
        let tid = m.register("alpha.example").unwrap();
        m.inc(tid, ResourceKind::TlsHandshake);
        assert!(!m.is_full(tid, ResourceKind::TlsHandshake));
        m.reserve();
    }

    #[test]
    fn observation_mode_never_rejects() {
        let mut m = manager(
            "[sni]\nmode = \"observation\"\nlimit = 1\nred_zone = 0.2\n",
        );
        let tid = m.register("alpha.example").unwrap();
        for _ in 0..100 {
            m.inc(tid, ResourceKind::TlsHandshake);
        }
        assert!(!m.is_full(tid, ResourceKind::TlsHandshake));
        m.reserve();
        assert!(!m.is_full(tid, ResourceKind::TlsHandshake));
    }

    #[test]
    fn restriction_mode_enforces() {
        let mut m = manager(
            "[sni]\nmode = \"restriction\"\nlimit = 10\ntop_n = 10\nred_zone = 0.2\n",
        );
        let tid = m.register("alpha.example").unwrap();

        for _ in 0..3 {
            m.inc(tid, ResourceKind::TlsHandshake);
        }
        m.reserve();

        for _ in 0..11 {
            m.inc(tid, ResourceKind::TlsHandshake);
        }
        assert!(m.is_full(tid, ResourceKind::TlsHandshake));
    }

    #[test]
    fn sentinel_is_preregistered() {
        let mut m = manager("[sni]\nmode = \"restriction\"\nlimit = 10\n");
        assert_eq!(m.tenant_name(UNKNOWN_TENANT_ID), Some(UNKNOWN_TENANT_NAME));
        // Untracked work is accounted without registration.
        m.inc(UNKNOWN_TENANT_ID, ResourceKind::TlsHandshake);
        m.reserve();
    }

    #[test]
    fn catalogue_registers_on_construction() {
        let m = manager("tenants = [\"alpha.example\"]\n");
        assert_eq!(
            m.tenant_name(tenant_id("alpha.example")),
            Some("alpha.example")
        );
    }

    #[test]
    fn register_is_idempotent() {
        let mut m = manager("");
        let a = m.register("alpha.example").unwrap();
        let b = m.register("alpha.example").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reconfigure_applies_at_tick() {
        let config = ConfigHandle::from_toml(
            "[sni]\nmode = \"restriction\"\nlimit = 10\nred_zone = 0.2\n",
        )
        .unwrap();
        let mut m = LocalManager::new(0, config.clone(), Arc::new(StatsRegistry::new()));
        let tid = m.register("alpha.example").unwrap();

        config
            .reload("[sni]\nmode = \"restriction\"\nlimit = 1000\nred_zone = 0.2\n")
            .unwrap();

        // Not yet applied: the old limit still governs this window.
        for _ in 0..3 {
            m.inc(tid, ResourceKind::TlsHandshake);
        }
        m.reserve();

        // Applied now; the huge limit admits everything.
        for _ in 0..50 {
            m.inc(tid, ResourceKind::TlsHandshake);
        }
        m.reserve();
        for _ in 0..200 {
            m.inc(tid, ResourceKind::TlsHandshake);
        }
        assert!(!m.is_full(tid, ResourceKind::TlsHandshake));
    }

    #[test]
    fn mode_change_rebuilds_limiter() {
        let config = ConfigHandle::from_toml("[active_q]\nmode = \"observation\"\n").unwrap();
        let mut m = LocalManager::new(0, config.clone(), Arc::new(StatsRegistry::new()));
        let tid = m.register("alpha.example").unwrap();
        m.inc(tid, ResourceKind::ActiveQueue);

        config
            .reload("[active_q]\nmode = \"restriction\"\nlimit = 10\nred_zone = 0.2\n")
            .unwrap();
        m.reserve();

        // The rebuilt limiter kept its tenant registrations.
        m.inc(tid, ResourceKind::ActiveQueue);
        m.dec(tid, ResourceKind::ActiveQueue);
        m.reserve();
    }
}
