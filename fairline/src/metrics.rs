//! fairline process metrics.
//!
//! Operational counters for the admission layer, exposed via metriken.
//! These are internal health metrics; the per-tenant contract slots live in
//! [`crate::stats`].

use metriken::metric;

use crate::counter::ShardedCounter;

#[metric(
    name = "fairline/rtb/admission_checks",
    description = "Total admission checks across all resource kinds"
)]
pub static ADMISSION_CHECKS: ShardedCounter = ShardedCounter::new();

#[metric(
    name = "fairline/rtb/admissions_denied",
    description = "Admission checks that rejected work"
)]
pub static ADMISSIONS_DENIED: ShardedCounter = ShardedCounter::new();

#[metric(
    name = "fairline/rtb/reserve_ticks",
    description = "Reserve ticks executed"
)]
pub static RESERVE_TICKS: ShardedCounter = ShardedCounter::new();

#[metric(
    name = "fairline/rtb/tenants_registered",
    description = "Tenants registered across all workers"
)]
pub static TENANTS_REGISTERED: ShardedCounter = ShardedCounter::new();

#[metric(
    name = "fairline/rtb/tenant_id_collisions",
    description = "Tenant names rejected for hashing to the reserved id"
)]
pub static TENANT_ID_COLLISIONS: ShardedCounter = ShardedCounter::new();
