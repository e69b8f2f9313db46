//! Giraph phase timings (`_timings.csv`, header `Phase,Duration_ms`) → sequential timeline.

use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhaseTiming {
    #[serde(rename = "Phase")]
    pub phase: String,
    #[serde(rename = "Duration_ms")]
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Setup,
    Compute,
    Cleanup,
    Other,
}

impl PhaseKind {
    pub fn classify(phase: &str) -> Self {
        if phase.contains("Setup") {
            PhaseKind::Setup
        } else if phase.contains("Superstep") {
            PhaseKind::Compute
        } else if phase.contains("Cleanup") || phase.contains("Write") {
            PhaseKind::Cleanup
        } else {
            PhaseKind::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PhaseKind::Setup => "Graph Loading / Setup",
            PhaseKind::Compute => "Computation (Supersteps)",
            PhaseKind::Cleanup => "Cleanup / Write",
            PhaseKind::Other => "Other",
        }
    }
}

/// One bar of the timeline, seconds from job start.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSpan {
    pub phase: String,
    pub kind: PhaseKind,
    pub start_s: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub spans: Vec<PhaseSpan>,
    pub total_s: f64,
    /// Phases whose name mentions a superstep, job or iteration.
    pub iteration_count: usize,
}

pub fn load_phase_timings(path: &Path) -> Result<Vec<PhaseTiming>> {
    if !path.exists() {
        return Err(AnalysisError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "timings file not found"),
        ));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut timings = Vec::new();
    for row in reader.deserialize() {
        let timing: PhaseTiming = row?;
        timings.push(timing);
    }
    Ok(timings)
}

/// Lays phases end to end: each phase starts where the previous one finished.
pub fn build_timeline(timings: &[PhaseTiming]) -> Timeline {
    let mut spans = Vec::with_capacity(timings.len());
    let mut cursor = 0.0;

    for t in timings {
        let duration_s = t.duration_ms / 1000.0;
        spans.push(PhaseSpan {
            phase: t.phase.clone(),
            kind: PhaseKind::classify(&t.phase),
            start_s: cursor,
            duration_s,
        });
        cursor += duration_s;
    }

    let iteration_count = timings
        .iter()
        .filter(|t| {
            let name = t.phase.to_lowercase();
            name.contains("superstep") || name.contains("job") || name.contains("iteration")
        })
        .count();

    Timeline {
        spans,
        total_s: cursor,
        iteration_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn timing(phase: &str, ms: f64) -> PhaseTiming {
        PhaseTiming {
            phase: phase.to_string(),
            duration_ms: ms,
        }
    }

    #[test]
    fn classifies_phase_names() {
        assert_eq!(PhaseKind::classify("Input Setup"), PhaseKind::Setup);
        assert_eq!(PhaseKind::classify("Superstep 3"), PhaseKind::Compute);
        assert_eq!(PhaseKind::classify("Shutdown Cleanup"), PhaseKind::Cleanup);
        assert_eq!(PhaseKind::classify("Write Output"), PhaseKind::Cleanup);
        assert_eq!(PhaseKind::classify("Barrier"), PhaseKind::Other);
    }

    #[test]
    fn start_offsets_are_cumulative() {
        let tl = build_timeline(&[
            timing("Setup", 2000.0),
            timing("Superstep 0", 1500.0),
            timing("Superstep 1", 500.0),
            timing("Cleanup", 1000.0),
        ]);

        let starts: Vec<f64> = tl.spans.iter().map(|s| s.start_s).collect();
        assert_eq!(starts, vec![0.0, 2.0, 3.5, 4.0]);
        assert_eq!(tl.total_s, 5.0);
        assert_eq!(tl.iteration_count, 2);
    }

    #[test]
    fn empty_timeline() {
        let tl = build_timeline(&[]);
        assert!(tl.spans.is_empty());
        assert_eq!(tl.total_s, 0.0);
    }

    #[test]
    fn loads_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_timings.csv");
        fs::write(&path, "Phase,Duration_ms\nSetup,1200\nSuperstep 0,340.5\n").unwrap();

        let rows = load_phase_timings(&path).unwrap();
        assert_eq!(rows, vec![timing("Setup", 1200.0), timing("Superstep 0", 340.5)]);
    }

    #[test]
    fn missing_timings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_phase_timings(&dir.path().join("nope.csv")).is_err());
    }
}
