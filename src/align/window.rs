//! Clip every series to one analysis window and rebase its clock to zero.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::{
    error::{AnalysisError, Result},
    ingest::loader::{Sample, Series},
};

/// Analysis window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Window {
    /// Seconds after the shared origin.
    Offsets { start: f64, end: f64 },
    /// Absolute Unix epochs.
    Epochs { start: f64, end: f64 },
}

impl Window {
    /// Window bounds as offsets from `origin`.
    pub fn resolve(&self, origin: f64) -> (f64, f64) {
        match *self {
            Window::Offsets { start, end } => (start, end),
            Window::Epochs { start, end } => (start - origin, end - origin),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample {
    /// Seconds since the window start.
    pub t: f64,
    pub sample: Sample,
}

/// A node's samples restricted to the window, on the rebased clock.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedSeries {
    pub node: String,
    pub points: Vec<TimedSample>,
}

impl WindowedSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.t)
    }

    /// Last rebased timestamp, i.e. how much of the window the node covers.
    pub fn duration(&self) -> f64 {
        self.times().fold(0.0, f64::max)
    }
}

/// Keeps samples whose `epoch - origin` lies in the window; `None` if nothing does.
pub fn apply_window(series: &Series, origin: f64, window: &Window) -> Option<WindowedSeries> {
    let (w_start, w_end) = window.resolve(origin);

    let points: Vec<TimedSample> = series
        .samples
        .iter()
        .filter_map(|s| {
            let rel = s.epoch - origin;
            (rel >= w_start && rel <= w_end).then(|| TimedSample {
                t: rel - w_start,
                sample: *s,
            })
        })
        .collect();

    if points.is_empty() {
        None
    } else {
        Some(WindowedSeries {
            node: series.node.clone(),
            points,
        })
    }
}

/// Windows every series. Nodes left empty are dropped with a notice; an
/// entirely empty result is an error.
pub fn window_all(
    all: &BTreeMap<String, Series>,
    origin: f64,
    window: &Window,
) -> Result<BTreeMap<String, WindowedSeries>> {
    let (w_start, w_end) = window.resolve(origin);
    let mut out = BTreeMap::new();

    for (node, series) in all {
        match apply_window(series, origin, window) {
            Some(w) => {
                info!(
                    "{}: kept {} of {} samples in [{:.1}s, {:.1}s]",
                    node,
                    w.len(),
                    series.samples.len(),
                    w_start,
                    w_end
                );
                out.insert(node.clone(), w);
            }
            None => warn!("{}: no samples inside the analysis window, dropped", node),
        }
    }

    if out.is_empty() {
        return Err(AnalysisError::NoDataInWindow {
            start: w_start,
            end: w_end,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(node: &str, epochs: &[f64]) -> Series {
        Series::new(
            node,
            epochs
                .iter()
                .map(|&e| Sample {
                    epoch: e,
                    ..Sample::default()
                })
                .collect(),
        )
    }

    #[test]
    fn keeps_inclusive_range_and_rebases() {
        let s = series("a", &(0..10).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let w = apply_window(&s, 100.0, &Window::Offsets { start: 3.0, end: 7.0 }).unwrap();

        let times: Vec<f64> = w.times().collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(w.points[0].sample.epoch, 103.0);
        assert_eq!(w.points[4].sample.epoch, 107.0);
        assert_eq!(w.duration(), 4.0);
    }

    #[test]
    fn rebased_times_stay_inside_window_length() {
        let epochs: Vec<f64> = (0..200).map(|i| 1_700_000_000.0 + i as f64 * 0.37).collect();
        let s = series("a", &epochs);
        let (a, b) = (12.5, 40.25);
        let origin = 1_700_000_000.1;
        let w = apply_window(&s, origin, &Window::Offsets { start: a, end: b }).unwrap();

        for p in &w.points {
            assert!(p.t >= 0.0 && p.t <= b - a, "t={} outside [0, {}]", p.t, b - a);
            let rel = p.sample.epoch - origin;
            assert!(rel >= a && rel <= b);
        }
        let expected = epochs
            .iter()
            .filter(|&&e| e - origin >= a && e - origin <= b)
            .count();
        assert_eq!(w.len(), expected);
    }

    #[test]
    fn epoch_window_resolves_against_origin() {
        let win = Window::Epochs { start: 105.0, end: 108.0 };
        assert_eq!(win.resolve(100.0), (5.0, 8.0));

        let s = series("a", &[104.0, 105.0, 106.0, 108.0, 109.0]);
        let w = apply_window(&s, 100.0, &win).unwrap();
        let times: Vec<f64> = w.times().collect();
        assert_eq!(times, vec![0.0, 1.0, 3.0]);
    }

    #[test]
    fn empty_window_drops_node() {
        let s = series("a", &[1.0, 2.0]);
        assert!(apply_window(&s, 0.0, &Window::Offsets { start: 10.0, end: 20.0 }).is_none());
    }

    #[test]
    fn window_all_drops_empty_nodes_and_errors_when_nothing_left() {
        let all: BTreeMap<String, Series> = [series("a", &[0.0, 1.0, 2.0]), series("b", &[50.0])]
            .into_iter()
            .map(|s| (s.node.clone(), s))
            .collect();

        let kept = window_all(&all, 0.0, &Window::Offsets { start: 0.0, end: 2.0 }).unwrap();
        assert_eq!(kept.keys().collect::<Vec<_>>(), vec!["a"]);

        let err = window_all(&all, 0.0, &Window::Offsets { start: 100.0, end: 200.0 }).unwrap_err();
        assert!(matches!(err, AnalysisError::NoDataInWindow { .. }));
    }
}
