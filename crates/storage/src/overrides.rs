//! Per-tenant limits and configuration
//!
//! The overrides source is an external collaborator; the engine consumes
//! only the dedicated-column configuration, but the trait carries the
//! limits its callers read so one handle can serve both.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::block_meta::DedicatedColumn;

/// Per-tenant limits served by the overrides module.
pub trait Overrides: Send + Sync {
    /// Dedicated attribute columns to use for new blocks of this tenant.
    fn dedicated_columns(&self, tenant: &str) -> Vec<DedicatedColumn>;

    /// Maximum size of a single trace at ingest; 0 disables the limit.
    fn max_bytes_per_trace(&self, tenant: &str) -> usize;

    /// Upper bound on the time range of one search request.
    fn max_search_duration(&self, tenant: &str) -> Duration;

    /// How long blocks of this tenant are retained.
    fn block_retention(&self, tenant: &str) -> Duration;
}

/// Limits applied uniformly to every tenant, typically loaded from config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticOverrides {
    #[serde(default)]
    pub dedicated_columns: Vec<DedicatedColumn>,
    #[serde(default)]
    pub max_bytes_per_trace: usize,
    #[serde(default, with = "humantime_secs")]
    pub max_search_duration: Duration,
    #[serde(default = "default_block_retention", with = "humantime_secs")]
    pub block_retention: Duration,
}

impl Default for StaticOverrides {
    fn default() -> Self {
        Self {
            dedicated_columns: Vec::new(),
            max_bytes_per_trace: 0,
            max_search_duration: Duration::ZERO,
            block_retention: default_block_retention(),
        }
    }
}

fn default_block_retention() -> Duration {
    // 14 days
    Duration::from_secs(14 * 24 * 60 * 60)
}

/// Durations serialized as whole seconds.
mod humantime_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

impl Overrides for StaticOverrides {
    fn dedicated_columns(&self, _tenant: &str) -> Vec<DedicatedColumn> {
        self.dedicated_columns.clone()
    }

    fn max_bytes_per_trace(&self, _tenant: &str) -> usize {
        self.max_bytes_per_trace
    }

    fn max_search_duration(&self, _tenant: &str) -> Duration {
        self.max_search_duration
    }

    fn block_retention(&self, _tenant: &str) -> Duration {
        self.block_retention
    }
}
