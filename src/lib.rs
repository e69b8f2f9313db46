//! # dstat resource-usage analysis
//!
//! Turns per-node dstat CSV captures from a distributed job into aligned,
//! windowed comparison charts and a per-node summary table.
//!
//! ## Stages
//! - **ingest:** dstat CSV loader, performance-report parser, phase timings.
//! - **align:** shared time origin and analysis window.
//! - **utils:** metric registry, summary statistics, CSV/text export.
//! - **render:** PNG charts via plotters.
//! - **pipeline:** the whole run, driven by [`config::AnalysisConfig`].

pub mod align;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod render;
pub mod utils;
