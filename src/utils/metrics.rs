//! Derived metrics and per-node summary statistics.
//!
//! A metric is a named pure function of one sample. The registry holds the set
//! drawn and summarised for a run, in order; tests can register their own
//! metrics and drive the aggregator without touching a chart.
//!
//! Every metric is evaluated on the windowed, rebased view, so charts and the
//! summary table always describe the same samples.

use std::collections::BTreeMap;

use average::{Max, Mean};
use statrs::statistics::{Data, OrderStatistics};

use crate::{align::window::WindowedSeries, ingest::loader::Sample};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub type MetricFn = fn(&Sample) -> f64;

/// CPU busy %: user + system.
pub fn cpu_busy_pct(s: &Sample) -> f64 {
    s.cpu_busy_pct()
}

pub fn io_wait_pct(s: &Sample) -> f64 {
    s.wai
}

/// Memory in use (used + buffers), GiB.
pub fn memory_used_gb(s: &Sample) -> f64 {
    (s.used + s.buff) / BYTES_PER_GIB
}

/// (used + buffers) / total, as a percentage. 0 when the total is not positive.
pub fn memory_used_pct(s: &Sample) -> f64 {
    let total = s.mem_total();
    if total > 0.0 {
        ((s.used + s.buff) / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub fn disk_write_mbs(s: &Sample) -> f64 {
    s.writ / BYTES_PER_MIB
}

pub fn network_send_mbs(s: &Sample) -> f64 {
    s.send / BYTES_PER_MIB
}

#[derive(Debug, Clone)]
pub struct Metric {
    /// Column prefix in the summary and PNG file stem.
    pub key: &'static str,
    pub title: &'static str,
    pub y_label: &'static str,
    pub transform: MetricFn,
}

impl Metric {
    pub fn new(
        key: &'static str,
        title: &'static str,
        y_label: &'static str,
        transform: MetricFn,
    ) -> Self {
        Self {
            key,
            title,
            y_label,
            transform,
        }
    }

    /// `(rebased seconds, value)` per sample; empty in, empty out.
    pub fn evaluate(&self, series: &WindowedSeries) -> Vec<(f64, f64)> {
        series
            .points
            .iter()
            .map(|p| (p.t, (self.transform)(&p.sample)))
            .collect()
    }

    pub fn values(&self, series: &WindowedSeries) -> Vec<f64> {
        series
            .points
            .iter()
            .map(|p| (self.transform)(&p.sample))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MetricRegistry {
    metrics: Vec<Metric>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        let mut r = Self::empty();
        r.register(Metric::new("cpu_busy", "Per-Node CPU Utilization", "CPU Usage (%)", cpu_busy_pct));
        r.register(Metric::new("cpu_iowait", "Per-Node CPU I/O Wait Time", "I/O Wait (%)", io_wait_pct));
        r.register(Metric::new("memory_used_gb", "Per-Node Memory Used", "Memory Used (GB)", memory_used_gb));
        r.register(Metric::new(
            "memory_used_pct",
            "Per-Node Memory Utilization",
            "Memory Usage (%)",
            memory_used_pct,
        ));
        r.register(Metric::new("disk_write_mbs", "Per-Node Disk Write Rate", "Write Rate (MB/s)", disk_write_mbs));
        r.register(Metric::new(
            "network_send_mbs",
            "Per-Node Network Send Rate",
            "Send Rate (MB/s)",
            network_send_mbs,
        ));
        r
    }
}

impl MetricRegistry {
    pub fn empty() -> Self {
        Self { metrics: Vec::new() }
    }

    /// Adds a metric; a metric with the same key is replaced in place.
    pub fn register(&mut self, metric: Metric) {
        match self.metrics.iter_mut().find(|m| m.key == metric.key) {
            Some(slot) => *slot = metric,
            None => self.metrics.push(metric),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Mean / peak / 95th percentile of one metric over one node's window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricStats {
    pub mean: f64,
    pub peak: f64,
    pub p95: f64,
    pub count: usize,
}

/// `None` for an empty sequence.
pub fn calculate_stats(values: &[f64]) -> Option<MetricStats> {
    if values.is_empty() {
        return None;
    }

    let mean: Mean = values.iter().copied().collect();
    let peak: Max = values.iter().copied().collect();
    let mut data = Data::new(values.to_vec());

    Some(MetricStats {
        mean: mean.mean(),
        peak: peak.max(),
        p95: data.percentile(95),
        count: values.len(),
    })
}

/// One summary table row.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub node: String,
    /// Last rebased timestamp in the window, seconds.
    pub duration_s: f64,
    pub samples: usize,
    /// Per registered metric, in registry order.
    pub stats: Vec<(&'static str, Option<MetricStats>)>,
}

impl SummaryRow {
    pub fn get(&self, key: &str) -> Option<&MetricStats> {
        self.stats
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, s)| s.as_ref())
    }
}

/// One row per node, in node order.
pub fn summarize(
    windowed: &BTreeMap<String, WindowedSeries>,
    registry: &MetricRegistry,
) -> Vec<SummaryRow> {
    windowed
        .values()
        .map(|series| SummaryRow {
            node: series.node.clone(),
            duration_s: series.duration(),
            samples: series.len(),
            stats: registry
                .iter()
                .map(|m| (m.key, calculate_stats(&m.values(series))))
                .collect(),
        })
        .collect()
}
