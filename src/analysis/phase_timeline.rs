//! Phase timeline: reads a Giraph `_timings.csv` (`Phase,Duration_ms`)
//! → prints the phase table → renders a Gantt-style PNG.
//!
//! Usage: `phase_timeline [timings.csv] [output.png]`
//! (defaults: `data/giraph_timings.csv`, `data/figures/phase_timeline.png`).

use std::{env, error::Error, fs, path::PathBuf};

use dstat_analysis::{
    ingest::timings::{Timeline, build_timeline, load_phase_timings},
    render::timeline::render_timeline,
};
use log::info;

const DEFAULT_TIMINGS: &str = "data/giraph_timings.csv";
const DEFAULT_OUTPUT: &str = "data/figures/phase_timeline.png";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let input = args.next().map(PathBuf::from).unwrap_or_else(|| DEFAULT_TIMINGS.into());
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| DEFAULT_OUTPUT.into());

    let timings = load_phase_timings(&input)?;
    info!("Loaded {} phases from {:?}", timings.len(), input);
    let timeline = build_timeline(&timings);

    print_table(&timeline);

    if let Some(dir) = output.parent() {
        fs::create_dir_all(dir)?;
    }
    let title = format!(
        "Giraph Execution Timeline ({} iterations, {:.1}s)",
        timeline.iteration_count, timeline.total_s
    );
    render_timeline(&timeline, &title, &output, (1400, 300))?;

    println!("\nTimeline generated: {}", output.display());
    Ok(())
}

fn print_table(timeline: &Timeline) {
    println!("{:<32} {:>10} {:>10}  Kind", "Phase", "Start(s)", "Dur(s)");
    println!("{}", "=".repeat(70));
    for s in &timeline.spans {
        println!(
            "{:<32} {:>10.2} {:>10.2}  {}",
            s.phase,
            s.start_s,
            s.duration_s,
            s.kind.label()
        );
    }
    println!("{}", "-".repeat(70));
    println!(
        "Total: {:.2}s across {} phases ({} iterations)",
        timeline.total_s,
        timeline.spans.len(),
        timeline.iteration_count
    );
}
