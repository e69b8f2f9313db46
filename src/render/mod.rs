// Render: PNG output via plotters' bitmap backend.
// charts draws the per-metric overlays; timeline draws the phase Gantt bar.

pub mod charts;
pub mod timeline;
