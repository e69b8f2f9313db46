// Ingest: raw inputs on disk → typed in-memory records.
// dstat metrics CSVs (loader), the PageRank performance report (report),
// and Giraph phase timings (timings).

pub mod loader;
pub mod report;
pub mod timings;
