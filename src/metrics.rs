//! Metrics hooks for completed match runs.
//!
//! The engine does not depend on any particular metrics backend.
//! Embedders install an [`EngineMetrics`] implementation once at
//! startup and forward the observations wherever they like.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::types::MatchTier;

/// Observer for completed runs. Called on the request path, so
/// implementations must be cheap and must not block.
pub trait EngineMetrics: Send + Sync {
    fn record_run(&self, tier: MatchTier, latency: Duration, matches: usize, fallback_used: bool);
}

static RECORDER: Lazy<RwLock<Option<Arc<dyn EngineMetrics>>>> = Lazy::new(|| RwLock::new(None));

/// Installs the process-wide recorder, or clears it with `None`.
pub fn set_engine_metrics(recorder: Option<Arc<dyn EngineMetrics>>) {
    // A poisoned lock only means a panic elsewhere; the slot itself is
    // still plain data, so recover it rather than propagate.
    let mut slot = RECORDER.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = recorder;
}

pub(crate) fn recorder() -> Option<Arc<dyn EngineMetrics>> {
    RECORDER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}
