//! Performance report parsing: per-iteration wall-clock times → analysis window length.
//!
//! The PageRank drivers write lines such as
//! `Iteration_3_Total Iteraction Time          :      94555 ms (94.555 s) - Job totaltime for iteration 3`.
//! Only the "Total Iteraction Time" entries matter here; setup/map/reduce
//! breakdowns on neighbouring lines are ignored.

use std::{collections::BTreeMap, fs, path::Path, sync::OnceLock};

use log::{info, warn};
use regex::Regex;

use crate::error::{AnalysisError, Result};

fn iteration_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Iteration_(\d+)_Total\s+Iteraction\s+Time\s*:\s*(\d+)\s*ms")
            .expect("iteration pattern is a valid regex")
    })
}

/// Iteration durations keyed by iteration number (1-based).
#[derive(Debug, Clone, PartialEq)]
pub struct IterationTable {
    requested: usize,
    durations_ms: BTreeMap<usize, u64>,
}

impl IterationTable {
    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn found(&self) -> usize {
        self.durations_ms.len()
    }

    pub fn get(&self, iteration: usize) -> Option<u64> {
        self.durations_ms.get(&iteration).copied()
    }

    /// `(iteration, duration_ms)` for every iteration seen, ascending.
    pub fn entries(&self) -> Vec<(usize, u64)> {
        self.durations_ms.iter().map(|(&k, &ms)| (k, ms)).collect()
    }

    /// Saturates instead of overflowing on absurd reports.
    pub fn total_ms(&self) -> u64 {
        self.durations_ms
            .values()
            .fold(0u64, |acc, &ms| acc.saturating_add(ms))
    }

    pub fn total_secs(&self) -> f64 {
        self.total_ms() as f64 / 1000.0
    }
}

/// Collects durations for iterations `1..=n`. A repeated iteration number
/// overwrites the earlier value; numbers outside the range are ignored.
/// Scanning stops once all `n` iterations are present.
pub fn parse_iteration_table(text: &str, n: usize) -> IterationTable {
    let mut durations_ms = BTreeMap::new();
    let re = iteration_pattern();

    for line in text.lines() {
        if durations_ms.len() >= n {
            break;
        }
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let (Ok(k), Ok(ms)) = (caps[1].parse::<usize>(), caps[2].parse::<u64>()) else {
            continue;
        };
        if k == 0 || k > n {
            continue;
        }
        durations_ms.insert(k, ms);
    }

    IterationTable {
        requested: n,
        durations_ms,
    }
}

/// Total seconds over the first `n` iterations. Fails if no entry matched.
pub fn total_duration_secs(text: &str, n: usize) -> Result<f64> {
    let table = parse_iteration_table(text, n);
    if table.found() == 0 {
        return Err(AnalysisError::NoIterations);
    }
    if table.found() < n {
        warn!(
            "Performance report lists {} of {} requested iterations; using the partial sum",
            table.found(),
            n
        );
    }
    Ok(table.total_secs())
}

/// Reads the report from disk and returns the total duration in seconds.
pub fn parse_report_file(path: &Path, n: usize) -> Result<f64> {
    if !path.exists() {
        return Err(AnalysisError::ReportMissing(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|e| AnalysisError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);

    let total = total_duration_secs(&text, n)?;
    info!(
        "Parsed performance report {:?}: first {} iterations take {:.3} s",
        path, n, total
    );
    Ok(total)
}
