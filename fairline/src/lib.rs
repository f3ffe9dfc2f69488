//! fairline -- per-tenant admission control for a caching HTTP proxy.
//!
//! A fixed pool of worker threads each owns a [`LocalManager`]: one reactive
//! token bucket limiter per resource kind (TLS handshakes, the active queue,
//! disk reads, disk writes). Admission checks, increments and decrements are
//! single-threaded per worker; once per tick the worker calls
//! [`LocalManager::reserve`], which sorts tenants by observed load, publishes
//! stats, and re-allocates dedicated tokens to the current top-N while the
//! rest share a global overflow bucket.
//!
//! The worker-pool root owns the shared pieces -- a [`ConfigHandle`] holding
//! the current configuration snapshot and a [`StatsRegistry`] for metric
//! exposition -- and threads them into each worker's manager:
//!
//! ```rust
//! use std::sync::Arc;
//! use fairline::{ConfigHandle, LocalManager, ResourceKind, StatsRegistry};
//!
//! let config = ConfigHandle::from_toml(
//!     r#"
//!     tenants = ["alpha.example", "bravo.example"]
//!
//!     [sni]
//!     mode = "restriction"
//!     limit = 100
//!     top_n = 10
//!     penalty_duration = 300
//!     red_zone = 0.2
//!     "#,
//! )
//! .unwrap();
//! let stats = Arc::new(StatsRegistry::new());
//!
//! // Per worker thread:
//! let mut manager = LocalManager::new(0, config.clone(), stats.clone());
//! let tid = manager.register("alpha.example").unwrap();
//! manager.inc(tid, ResourceKind::TlsHandshake);
//! if manager.is_full(tid, ResourceKind::TlsHandshake) {
//!     // reject the handshake
//! }
//! // On the periodic tick:
//! manager.reserve();
//! ```

pub mod config;
pub mod counter;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod rtb;
pub mod stats;
pub mod tenant;

pub use config::{ConfigHandle, LimitConfig, Mode, ResourceConfigParams};
pub use error::ConfigError;
pub use manager::{Limiter, LocalManager, ResourceKind};
pub use stats::{ResourceStats, StatField, StatsRegistry};
pub use tenant::{tenant_id, UNKNOWN_TENANT_ID, UNKNOWN_TENANT_NAME};
