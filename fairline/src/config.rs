//! Resource limiter configuration.
//!
//! The operator-facing document is TOML: one table per resource name plus a
//! tenant catalogue. Unknown resource names and unknown fields are rejected
//! at parse time; value validation runs before a snapshot is published.
//!
//! ```toml
//! tenants = ["alpha.example", "bravo.example"]
//!
//! [sni]
//! mode = "restriction"
//! limit = 100
//! top_n = 10
//! penalty_duration = 300
//! red_zone = 0.2
//!
//! [active_q]
//! mode = "observation"
//! ```
//!
//! Reconfiguration swaps an immutable snapshot behind a [`ConfigHandle`];
//! workers pick the new snapshot up at their next reserve tick, and a failed
//! reload leaves the previous snapshot in effect.

use std::sync::{Arc, RwLock};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::manager::ResourceKind;
use crate::rtb::Conf;

/// Enforcement mode for one resource kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Admission tracking off; `inc`/`dec` are no-ops.
    #[default]
    Disabled,
    /// Dry run: loads are tracked and stats published, nothing is rejected.
    Observation,
    /// Limiter verdicts are enforced.
    Restriction,
}

/// Per-resource limiter tuning, as it appears in the document.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LimitConfig {
    pub mode: Mode,
    /// Number of tenants that receive dedicated buckets.
    pub top_n: u64,
    /// Capacity per tick and worker. 0 disables limiting even in
    /// restriction mode.
    pub limit: u64,
    /// Ticks a penalty stays in force.
    pub penalty_duration: u64,
    /// Fraction of `limit` reserved for the global bucket, `0..=1`.
    pub red_zone: f64,
    /// Sort tenants by queue backlog. The active queue is always
    /// queue-style; this opts other resources in.
    pub queue: bool,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Disabled,
            top_n: 10,
            limit: 0,
            penalty_duration: 0,
            red_zone: 0.1,
            queue: false,
        }
    }
}

impl LimitConfig {
    pub(crate) fn to_conf(self, kind: ResourceKind) -> Conf {
        Conf {
            top_n: self.top_n,
            limit: self.limit,
            penalty_duration: self.penalty_duration,
            red_zone: self.red_zone,
            queue: self.queue || kind == ResourceKind::ActiveQueue,
        }
    }

    fn validate(&self, resource: &str) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.red_zone) {
            return Err(ConfigError::InvalidValue(format!(
                "{resource}.red_zone must be within 0..=1, got {}",
                self.red_zone
            )));
        }
        Ok(())
    }
}

/// One parsed, validated configuration snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfigParams {
    /// Tenant-name catalogue registered into every worker's manager.
    #[serde(default)]
    pub tenants: Vec<String>,
    #[serde(default)]
    pub sni: LimitConfig,
    #[serde(default)]
    pub active_q: LimitConfig,
    #[serde(default)]
    pub disk_read: LimitConfig,
    #[serde(default)]
    pub disk_write: LimitConfig,
}

impl ResourceConfigParams {
    /// Parse and validate a document.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        let params: Self = toml::from_str(document)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ResourceKind::ALL {
            self.limit_config(kind).validate(kind.name())?;
        }
        Ok(())
    }

    pub fn limit_config(&self, kind: ResourceKind) -> &LimitConfig {
        match kind {
            ResourceKind::TlsHandshake => &self.sni,
            ResourceKind::ActiveQueue => &self.active_q,
            ResourceKind::DiskRead => &self.disk_read,
            ResourceKind::DiskWrite => &self.disk_write,
        }
    }
}

/// Shared handle to the current configuration snapshot.
///
/// The control thread calls [`reload`](Self::reload); workers call
/// [`snapshot`](Self::snapshot) once per tick and compare pointers to detect
/// a change.
#[derive(Clone)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<ResourceConfigParams>>>,
}

impl ConfigHandle {
    pub fn new(params: ResourceConfigParams) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(params))),
        }
    }

    /// Parse, validate, and install a starting snapshot.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(ResourceConfigParams::from_toml(document)?))
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ResourceConfigParams> {
        self.current.read().unwrap().clone()
    }

    /// Replace the snapshot from a new document. On error the previous
    /// snapshot stays in effect.
    pub fn reload(&self, document: &str) -> Result<(), ConfigError> {
        let params = ResourceConfigParams::from_toml(document)?;
        *self.current.write().unwrap() = Arc::new(params);
        debug!("installed new resource configuration snapshot");
        Ok(())
    }
}
