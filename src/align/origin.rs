//! Shared time origin across independently clocked nodes.
//!
//! Each node's dstat runs on its own clock and usually starts well before the
//! job does. Two rules are offered:
//! - **GlobalStart:** earliest sample of any node.
//! - **Activity:** earliest moment any node looks busy (CPU busy above a
//!   threshold, or disk writes above a threshold). Falls back to GlobalStart
//!   when no node ever crosses.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::ingest::loader::{Sample, Series};

pub const DEFAULT_CPU_BUSY_PCT: f64 = 5.0;
pub const DEFAULT_DISK_WRITE_BYTES: f64 = (1u64 << 20) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginMode {
    GlobalStart,
    Activity,
}

/// Which CPU figure the activity predicate compares against its threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuBusy {
    /// `100 - idl`: I/O wait, hiq and siq count as busy.
    #[default]
    NonIdle,
    /// `usr + sys`.
    UserSystem,
}

impl CpuBusy {
    #[inline]
    pub fn of(self, s: &Sample) -> f64 {
        match self {
            CpuBusy::NonIdle => s.cpu_non_idle_pct(),
            CpuBusy::UserSystem => s.cpu_busy_pct(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityThresholds {
    pub busy: CpuBusy,
    pub cpu_busy_pct: f64,
    pub disk_write_bytes_per_sec: f64,
}

impl Default for ActivityThresholds {
    fn default() -> Self {
        Self {
            busy: CpuBusy::default(),
            cpu_busy_pct: DEFAULT_CPU_BUSY_PCT,
            disk_write_bytes_per_sec: DEFAULT_DISK_WRITE_BYTES,
        }
    }
}

impl ActivityThresholds {
    #[inline]
    pub fn is_active(&self, s: &Sample) -> bool {
        self.busy.of(s) > self.cpu_busy_pct || s.writ > self.disk_write_bytes_per_sec
    }
}

/// Which rule produced the origin.
#[derive(Debug, Clone, PartialEq)]
pub enum OriginSource {
    GlobalStart,
    /// First activity crossing, with the node that crossed first.
    Activity { node: String },
    /// Activity was requested but no node ever crossed.
    ActivityFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub epoch: f64,
    pub source: OriginSource,
}

/// Earliest timestamp across all series.
pub fn global_start(all: &BTreeMap<String, Series>) -> Option<f64> {
    all.values().filter_map(Series::min_epoch).reduce(f64::min)
}

/// Timestamp of the first sample (file order) that satisfies the activity predicate.
pub fn first_activity(series: &Series, thresholds: &ActivityThresholds) -> Option<f64> {
    series
        .samples
        .iter()
        .find(|s| thresholds.is_active(s))
        .map(|s| s.epoch)
}

/// Picks the shared origin. `None` only when there are no samples at all.
pub fn detect_origin(
    all: &BTreeMap<String, Series>,
    mode: OriginMode,
    thresholds: &ActivityThresholds,
) -> Option<Origin> {
    let start = global_start(all)?;

    if mode == OriginMode::GlobalStart {
        return Some(Origin {
            epoch: start,
            source: OriginSource::GlobalStart,
        });
    }

    let mut earliest: Option<(f64, &str)> = None;
    for (node, series) in all {
        if let Some(t) = first_activity(series, thresholds) {
            debug!("{}: first activity crossing at epoch {:.3}", node, t);
            if earliest.map_or(true, |(best, _)| t < best) {
                earliest = Some((t, node.as_str()));
            }
        } else {
            debug!("{}: never crosses the activity thresholds", node);
        }
    }

    Some(match earliest {
        Some((epoch, node)) => Origin {
            epoch,
            source: OriginSource::Activity {
                node: node.to_string(),
            },
        },
        None => Origin {
            epoch: start,
            source: OriginSource::ActivityFallback,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(node: &str, base: f64, cpu: &[f64]) -> Series {
        let samples = cpu
            .iter()
            .enumerate()
            .map(|(i, &c)| Sample {
                epoch: base + i as f64,
                usr: c,
                idl: 100.0 - c,
                ..Sample::default()
            })
            .collect();
        Series::new(node, samples)
    }

    fn map(list: Vec<Series>) -> BTreeMap<String, Series> {
        list.into_iter().map(|s| (s.node.clone(), s)).collect()
    }

    #[test]
    fn global_start_is_minimum_first_timestamp() {
        let all = map(vec![series("a", 105.0, &[0.0; 3]), series("b", 100.0, &[0.0; 3])]);
        let o = detect_origin(&all, OriginMode::GlobalStart, &ActivityThresholds::default()).unwrap();
        assert_eq!(o.epoch, 100.0);
        assert_eq!(o.source, OriginSource::GlobalStart);
    }

    #[test]
    fn global_start_ignores_file_order() {
        let mut s = series("a", 100.0, &[0.0; 3]);
        s.samples.swap(0, 2);
        let all = map(vec![s]);
        assert_eq!(global_start(&all), Some(100.0));
    }

    #[test]
    fn earliest_crossing_wins() {
        let all = map(vec![
            series("a", 1000.0, &[1.0, 1.0, 1.0, 9.0, 9.0]),
            series("b", 1000.0, &[1.0, 1.0, 1.0, 1.0, 1.0, 20.0]),
        ]);
        let o = detect_origin(&all, OriginMode::Activity, &ActivityThresholds::default()).unwrap();
        assert_eq!(o.epoch, 1003.0);
        assert_eq!(o.source, OriginSource::Activity { node: "a".into() });
    }

    #[test]
    fn crossing_is_strictly_above_threshold() {
        let s = series("a", 0.0, &[5.0, 5.0, 5.1]);
        assert_eq!(first_activity(&s, &ActivityThresholds::default()), Some(2.0));
    }

    #[test]
    fn disk_writes_also_count_as_activity() {
        let mut s = series("a", 50.0, &[0.0; 4]);
        s.samples[1].writ = 2.0 * 1024.0 * 1024.0;
        assert_eq!(first_activity(&s, &ActivityThresholds::default()), Some(51.0));
    }

    #[test]
    fn io_wait_counts_as_busy_by_default() {
        let waiting = Sample {
            usr: 2.0,
            sys: 2.0,
            wai: 30.0,
            idl: 66.0,
            ..Sample::default()
        };
        assert!(ActivityThresholds::default().is_active(&waiting));

        let user_system = ActivityThresholds {
            busy: CpuBusy::UserSystem,
            ..ActivityThresholds::default()
        };
        assert!(!user_system.is_active(&waiting));
    }

    #[test]
    fn io_wait_start_moves_origin_earlier() {
        let mut a = series("a", 1000.0, &[0.0; 6]);
        a.samples[4].usr = 50.0;
        a.samples[4].idl = 50.0;
        let mut b = series("b", 1000.0, &[0.0; 6]);
        b.samples[2].wai = 40.0;
        b.samples[2].idl = 58.0;
        b.samples[2].usr = 2.0;

        let all = map(vec![a, b]);
        let o = detect_origin(&all, OriginMode::Activity, &ActivityThresholds::default()).unwrap();
        assert_eq!(o.epoch, 1002.0);
        assert_eq!(o.source, OriginSource::Activity { node: "b".into() });
    }

    #[test]
    fn falls_back_to_global_start_when_idle() {
        let all = map(vec![series("a", 10.0, &[0.5; 4]), series("b", 7.0, &[1.0; 4])]);
        let o = detect_origin(&all, OriginMode::Activity, &ActivityThresholds::default()).unwrap();
        assert_eq!(o.epoch, 7.0);
        assert_eq!(o.source, OriginSource::ActivityFallback);
    }

    #[test]
    fn no_samples_no_origin() {
        let all = map(vec![Series::new("a", vec![])]);
        assert!(detect_origin(&all, OriginMode::Activity, &ActivityThresholds::default()).is_none());
    }
}
