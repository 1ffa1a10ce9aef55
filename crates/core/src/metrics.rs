// SPDX-License-Identifier: MIT

//! Minimal in-process metrics collection, per unit.
//!
//! No Non-goal in the spec excludes observability; this carries the
//! teacher's ambient counter/gauge convention without adding an external
//! exposition format (no `/metrics` endpoint) since nothing in the
//! external interface surface asks for one. Values are
//! queryable in-process through [`MetricsCollector::snapshot`], which
//! backs the `health`/`status` aggregation in the Orchestrator.

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, i64>,
    pub gauges: HashMap<String, f64>,
}

#[derive(Default)]
pub struct MetricsCollector {
    unit_id: String,
    counters: Mutex<HashMap<String, i64>>,
    gauges: Mutex<HashMap<String, f64>>,
}

impl MetricsCollector {
    pub fn new(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            counters: Mutex::new(HashMap::new()),
            gauges: Mutex::new(HashMap::new()),
        }
    }

    pub fn increment(&self, name: &str, value: i64) {
        let mut counters = self.counters.lock();
        *counters.entry(name.to_string()).or_insert(0) += value;
    }

    pub fn gauge(&self, name: &str, value: f64) {
        self.gauges.lock().insert(name.to_string(), value);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.lock().clone(),
            gauges: self.gauges.lock().clone(),
        }
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_accumulates() {
        let m = MetricsCollector::new("g/n");
        m.increment("requests_total", 1);
        m.increment("requests_total", 2);
        assert_eq!(m.snapshot().counters["requests_total"], 3);
    }

    #[test]
    fn gauge_overwrites() {
        let m = MetricsCollector::new("g/n");
        m.gauge("memory_mb", 12.0);
        m.gauge("memory_mb", 18.5);
        assert_eq!(m.snapshot().gauges["memory_mb"], 18.5);
    }
}
