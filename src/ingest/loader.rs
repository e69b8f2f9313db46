//! dstat CSV loader: one file per node → one `Series` of numeric samples.
//!
//! dstat writes a banner (program version, author, host, command line), a
//! blank line and two header rows before the data. The banner length differs
//! between dstat versions, so by default the data start is found structurally:
//! the first record whose timestamp cell parses as a number. A fixed skip count
//! is still available for logs that need it.
//!
//! Cell coercion rules: a cell that is empty, non-numeric, non-UTF-8 or not
//! finite becomes 0, except in the timestamp column, where it drops the row.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use csv::{ByteRecord, ReaderBuilder, Trim};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// dstat column order produced by `dstat --epoch --cpu --disk --net --mem --output`.
pub const DSTAT_COLUMNS: [&str; 15] = [
    "epoch", "usr", "sys", "idl", "wai", "hiq", "siq", "read", "writ", "recv", "send", "used",
    "buff", "cach", "free",
];

/// One dstat sample row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    /// Unix timestamp, seconds.
    pub epoch: f64,
    // CPU percentages
    pub usr: f64,
    pub sys: f64,
    pub idl: f64,
    pub wai: f64,
    pub hiq: f64,
    pub siq: f64,
    // Disk, bytes/s
    pub read: f64,
    pub writ: f64,
    // Network, bytes/s
    pub recv: f64,
    pub send: f64,
    // Memory, bytes
    pub used: f64,
    pub buff: f64,
    pub cach: f64,
    pub free: f64,
}

impl Sample {
    /// CPU busy percentage (user + system).
    #[inline]
    pub fn cpu_busy_pct(&self) -> f64 {
        self.usr + self.sys
    }

    /// CPU busy percentage as everything but idle (`100 - idl`), so I/O
    /// wait and interrupt time count too.
    #[inline]
    pub fn cpu_non_idle_pct(&self) -> f64 {
        100.0 - self.idl
    }

    #[inline]
    pub fn mem_total(&self) -> f64 {
        self.used + self.buff + self.cach + self.free
    }

    fn set(&mut self, field: Field, value: f64) {
        match field {
            Field::Epoch => self.epoch = value,
            Field::Usr => self.usr = value,
            Field::Sys => self.sys = value,
            Field::Idl => self.idl = value,
            Field::Wai => self.wai = value,
            Field::Hiq => self.hiq = value,
            Field::Siq => self.siq = value,
            Field::Read => self.read = value,
            Field::Writ => self.writ = value,
            Field::Recv => self.recv = value,
            Field::Send => self.send = value,
            Field::Used => self.used = value,
            Field::Buff => self.buff = value,
            Field::Cach => self.cach = value,
            Field::Free => self.free = value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Epoch,
    Usr,
    Sys,
    Idl,
    Wai,
    Hiq,
    Siq,
    Read,
    Writ,
    Recv,
    Send,
    Used,
    Buff,
    Cach,
    Free,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        let f = match name.trim() {
            "epoch" => Field::Epoch,
            "usr" => Field::Usr,
            "sys" => Field::Sys,
            "idl" => Field::Idl,
            "wai" => Field::Wai,
            "hiq" => Field::Hiq,
            "siq" => Field::Siq,
            "read" => Field::Read,
            "writ" => Field::Writ,
            "recv" => Field::Recv,
            "send" => Field::Send,
            "used" => Field::Used,
            "buff" => Field::Buff,
            "cach" => Field::Cach,
            "free" => Field::Free,
            _ => return None,
        };
        Some(f)
    }
}

/// All samples of one node, in file order.
#[derive(Debug, Clone, Default)]
pub struct Series {
    pub node: String,
    pub samples: Vec<Sample>,
    /// Data rows discarded because their timestamp was missing or non-numeric.
    pub dropped_rows: usize,
}

impl Series {
    pub fn new(node: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            node: node.into(),
            samples,
            dropped_rows: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Earliest timestamp (file order is not trusted).
    pub fn min_epoch(&self) -> Option<f64> {
        self.samples.iter().map(|s| s.epoch).reduce(f64::min)
    }
}

/// How to get past the banner lines at the top of a dstat file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preamble {
    /// Skip records until the timestamp column holds a number.
    Detect,
    /// Skip exactly this many physical lines.
    Skip(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub preamble: Preamble,
    /// Column names in file order. Names outside the dstat schema are read and ignored.
    pub columns: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            preamble: Preamble::Detect,
            columns: DSTAT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl LoaderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(AnalysisError::Config("loader.columns must not be empty".into()));
        }
        if self.epoch_index().is_none() {
            return Err(AnalysisError::Config(
                "loader.columns must contain an 'epoch' column".into(),
            ));
        }
        Ok(())
    }

    fn epoch_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.trim() == "epoch")
    }

    fn fields(&self) -> Vec<Option<Field>> {
        self.columns.iter().map(|c| Field::from_name(c)).collect()
    }
}

/// Derives the node id from a file name: `metrics_node1(2).csv` → `node1`.
pub fn node_id_from_path(path: &Path, prefix: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let stripped = stem.strip_prefix(prefix).unwrap_or(&stem);
    let id = stripped.split('(').next().unwrap_or("").trim();

    if id.is_empty() {
        stem
    } else {
        id.to_string()
    }
}

/// Reads and parses one metrics file.
pub fn load_series(path: &Path, prefix: &str, cfg: &LoaderConfig) -> Result<Series> {
    let data = fs::read(path).map_err(|e| AnalysisError::io(path, e))?;
    let (samples, dropped_rows) = parse_samples(&data, cfg)?;

    Ok(Series {
        node: node_id_from_path(path, prefix),
        samples,
        dropped_rows,
    })
}

/// Parses raw dstat CSV bytes. Returns the samples and the number of data rows
/// dropped for lacking a usable timestamp.
pub fn parse_samples(data: &[u8], cfg: &LoaderConfig) -> Result<(Vec<Sample>, usize)> {
    cfg.validate()?;
    let epoch_idx = cfg.epoch_index().unwrap_or(0);
    let fields = cfg.fields();

    let body = match cfg.preamble {
        Preamble::Skip(n) => skip_lines(data, n),
        Preamble::Detect => data,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body);

    let mut in_body = matches!(cfg.preamble, Preamble::Skip(_));
    let mut samples = Vec::new();
    let mut dropped = 0usize;
    let mut record = ByteRecord::new();

    while reader.read_byte_record(&mut record)? {
        let epoch = record.get(epoch_idx).and_then(parse_cell);

        if !in_body {
            if epoch.is_none() {
                continue;
            }
            in_body = true;
        }

        let Some(epoch) = epoch else {
            dropped += 1;
            continue;
        };

        let mut sample = Sample {
            epoch,
            ..Sample::default()
        };
        for (i, field) in fields.iter().enumerate() {
            match field {
                Some(Field::Epoch) | None => {}
                Some(f) => {
                    let v = record.get(i).and_then(parse_cell).unwrap_or(0.0);
                    sample.set(*f, v);
                }
            }
        }
        samples.push(sample);
    }

    Ok((samples, dropped))
}

/// Loads every file, keyed by node id. Unreadable or empty files are logged and skipped.
pub fn load_all(paths: &[PathBuf], prefix: &str, cfg: &LoaderConfig) -> BTreeMap<String, Series> {
    let mut all = BTreeMap::new();

    for path in paths {
        match load_series(path, prefix, cfg) {
            Ok(series) if series.is_empty() => {
                warn!("Skipping {:?}: no rows with a valid timestamp", path);
            }
            Ok(series) => {
                info!(
                    "Loaded {} from {:?}: {} samples ({} rows dropped)",
                    series.node,
                    path,
                    series.samples.len(),
                    series.dropped_rows
                );
                let node = series.node.clone();
                if all.insert(node.clone(), series).is_some() {
                    warn!("Duplicate node id '{}': {:?} replaces the earlier file", node, path);
                }
            }
            Err(e) => {
                error!("Failed to load {:?}: {}", path, e);
            }
        }
    }

    all
}

/// Lists `<prefix>*.<extension>` files in `dir`, sorted by name.
pub fn discover_inputs(dir: &Path, prefix: &str, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| AnalysisError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| AnalysisError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let name_ok = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(prefix))
            .unwrap_or(false);
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if name_ok && ext_ok {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn parse_cell(raw: &[u8]) -> Option<f64> {
    std::str::from_utf8(raw)
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn skip_lines(data: &[u8], n: usize) -> &[u8] {
    let mut rest = data;
    for _ in 0..n {
        match rest.iter().position(|&b| b == b'\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return &[],
        }
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BANNER: &str = "\"Dstat 0.7.4 CSV output\"\n\
\"Author:\",\"Dag Wieers <dag@wieers.com>\",,,,\"URL:\",\"http://dag.wieers.com/home-made/dstat/\"\n\
\"Host:\",\"node1\",,,,\"User:\",\"hadoop\"\n\
\"Cmdline:\",\"dstat --epoch -cdnm --output metrics_node1.csv 1\",,,,\"Date:\",\"01 Mar 2025 10:00:00 CST\"\n\
\n\
\"epoch\",\"total cpu usage\",,,,,,\"dsk/total\",,\"net/total\",,\"memory usage\",,,\n\
\"epoch\",\"usr\",\"sys\",\"idl\",\"wai\",\"hiq\",\"siq\",\"read\",\"writ\",\"recv\",\"send\",\"used\",\"buff\",\"cach\",\"free\"\n";

    fn row(epoch: &str, usr: &str) -> String {
        format!(
            "{},{},2.0,90.0,1.0,0,0,0,1048576,100,200,1000,100,300,600\n",
            epoch, usr
        )
    }

    fn fixture(rows: &[String]) -> String {
        let mut s = BANNER.to_string();
        for r in rows {
            s.push_str(r);
        }
        s
    }

    #[test]
    fn detects_data_start_after_banner() {
        let text = fixture(&[row("1700000000.0", "3.0"), row("1700000001.0", "4.0")]);
        let (samples, dropped) = parse_samples(text.as_bytes(), &LoaderConfig::default()).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(dropped, 0);
        assert_eq!(samples[0].epoch, 1700000000.0);
        assert_eq!(samples[1].usr, 4.0);
        assert_eq!(samples[0].writ, 1048576.0);
        assert_eq!(samples[0].free, 600.0);
    }

    #[test]
    fn detection_is_independent_of_banner_length() {
        let short = format!("\"Dstat 0.7.2 CSV output\"\n\n{}", row("10.0", "1.0"));
        let (samples, _) = parse_samples(short.as_bytes(), &LoaderConfig::default()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].epoch, 10.0);
    }

    #[test]
    fn fixed_skip_counts_physical_lines() {
        let text = fixture(&[row("100.0", "3.0"), row("101.0", "4.0")]);
        // 7 banner/header lines; skipping 6 leaves the column-name row, which is dropped.
        let cfg = LoaderConfig {
            preamble: Preamble::Skip(6),
            ..LoaderConfig::default()
        };
        let (samples, dropped) = parse_samples(text.as_bytes(), &cfg).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(dropped, 1);

        let cfg = LoaderConfig {
            preamble: Preamble::Skip(8),
            ..LoaderConfig::default()
        };
        let (samples, _) = parse_samples(text.as_bytes(), &cfg).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].epoch, 101.0);
    }

    #[test]
    fn non_numeric_cell_becomes_zero_but_keeps_row() {
        let text = fixture(&[row("100.0", "oops"), row("101.0", "5.5")]);
        let (samples, dropped) = parse_samples(text.as_bytes(), &LoaderConfig::default()).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(dropped, 0);
        assert_eq!(samples[0].usr, 0.0);
        assert_eq!(samples[0].sys, 2.0);
        assert_eq!(samples[1].usr, 5.5);
    }

    #[test]
    fn missing_timestamp_drops_row() {
        let text = fixture(&[row("100.0", "1.0"), row("", "1.0"), row("n/a", "1.0"), row("103.0", "1.0")]);
        let (samples, dropped) = parse_samples(text.as_bytes(), &LoaderConfig::default()).unwrap();

        assert_eq!(samples.len(), 2);
        assert_eq!(dropped, 2);
        assert_eq!(samples[1].epoch, 103.0);
    }

    #[test]
    fn short_rows_are_padded_with_zero() {
        let text = "100.0,7.0,3.0\n";
        let (samples, _) = parse_samples(text.as_bytes(), &LoaderConfig::default()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].cpu_busy_pct(), 10.0);
        assert_eq!(samples[0].free, 0.0);
    }

    #[test]
    fn custom_schema_maps_by_name() {
        let cfg = LoaderConfig {
            preamble: Preamble::Detect,
            columns: vec!["host_load".into(), "epoch".into(), "writ".into()],
        };
        let (samples, _) = parse_samples(b"abc,50.0,2048\n", &cfg).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].epoch, 50.0);
        assert_eq!(samples[0].writ, 2048.0);
    }

    #[test]
    fn schema_without_epoch_is_rejected() {
        let cfg = LoaderConfig {
            preamble: Preamble::Detect,
            columns: vec!["usr".into()],
        };
        assert!(matches!(parse_samples(b"1\n", &cfg), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn node_id_strips_prefix_extension_and_copy_suffix() {
        assert_eq!(node_id_from_path(Path::new("d/metrics_node1.csv"), "metrics_"), "node1");
        assert_eq!(node_id_from_path(Path::new("metrics_slave2(1).csv"), "metrics_"), "slave2");
        assert_eq!(node_id_from_path(Path::new("master.csv"), "metrics_"), "master");
    }

    #[test]
    fn load_all_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("metrics_a.csv");
        fs::File::create(&good)
            .unwrap()
            .write_all(fixture(&[row("1.0", "1.0")]).as_bytes())
            .unwrap();

        let empty = dir.path().join("metrics_b.csv");
        fs::File::create(&empty).unwrap().write_all(BANNER.as_bytes()).unwrap();

        let missing = dir.path().join("metrics_c.csv");

        let all = load_all(&[good, empty, missing], "metrics_", &LoaderConfig::default());
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("a"));
    }

    #[test]
    fn discover_filters_by_prefix_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["metrics_b.csv", "metrics_a.csv", "other.csv", "metrics_c.txt"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }

        let found = discover_inputs(dir.path(), "metrics_", "csv").unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["metrics_a.csv", "metrics_b.csv"]);
    }
}
