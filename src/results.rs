//! JSONL result sink - per-cycle detail and summary files plus a master
//! summary for the run.
//!
//! Layout under the output directory, `<ts>` being the run's UTC start:
//!   <ts>_<scenario>_cycle_<n>.jsonl          one DecisionRecord per line
//!   <ts>_<scenario>_cycle_<n>_summary.json   CycleStats + mode frequencies
//!   <ts>_master_summary.json                 run id, settings, every cycle

use chrono::{DateTime, Utc};
use cogsynth_core::{CycleStats, DecisionRecord, Error, Mode, Result};
use cogsynth_engine::ResultSink;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Mode frequencies as fractions of the cycle's records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeFrequencies {
    pub guard: f64,
    pub habit: f64,
    pub intuition: f64,
}

impl ModeFrequencies {
    pub fn of(stats: &CycleStats) -> Self {
        Self {
            guard: stats.frequency(Mode::Guard),
            habit: stats.frequency(Mode::Habit),
            intuition: stats.frequency(Mode::Intuition),
        }
    }
}

/// Contents of a `_summary.json` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    #[serde(flatten)]
    pub stats: CycleStats,
    pub frequencies: ModeFrequencies,
    pub records_file: String,
}

/// Contents of the master summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub seed: u64,
    pub cycles: Vec<CycleSummary>,
}

pub struct JsonlSink {
    dir: PathBuf,
    stamp: String,
    started_at: DateTime<Utc>,
    summaries: Vec<CycleSummary>,
}

impl JsonlSink {
    /// Create the output directory if needed. File names are prefixed with
    /// the current UTC time.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let started_at = Utc::now();
        let stamp = started_at.format("%Y%m%dT%H%M%SZ").to_string();
        Self::with_stamp(dir, stamp, started_at)
    }

    pub fn with_stamp(dir: impl Into<PathBuf>, stamp: impl Into<String>, started_at: DateTime<Utc>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::sink(format!("cannot create {}: {}", dir.display(), e)))?;
        Ok(Self { dir, stamp: stamp.into(), started_at, summaries: Vec::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn summaries(&self) -> &[CycleSummary] {
        &self.summaries
    }

    fn cycle_path(&self, stats: &CycleStats, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}_{}_cycle_{}{}", self.stamp, stats.scenario, stats.cycle, suffix))
    }

    /// Write the master summary for everything emitted so far.
    pub fn write_master(&self, run_id: Uuid, seed: u64) -> Result<PathBuf> {
        let master = MasterSummary {
            run_id,
            started_at: self.started_at,
            seed,
            cycles: self.summaries.clone(),
        };
        let path = self.dir.join(format!("{}_master_summary.json", self.stamp));
        write_json(&path, &master)?;
        info!("Master summary written to {}", path.display());
        Ok(path)
    }
}

impl ResultSink for JsonlSink {
    fn finish_cycle(&mut self, stats: &CycleStats, records: &[DecisionRecord]) -> Result<()> {
        let detail = self.cycle_path(stats, ".jsonl");
        let file = File::create(&detail)
            .map_err(|e| Error::sink(format!("cannot create {}: {}", detail.display(), e)))?;
        let mut out = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;

        let summary = CycleSummary {
            stats: stats.clone(),
            frequencies: ModeFrequencies::of(stats),
            records_file: detail
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        write_json(&self.cycle_path(stats, "_summary.json"), &summary)?;
        info!("{} cycle {} results -> {}", stats.scenario, stats.cycle, detail.display());
        self.summaries.push(summary);
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| Error::sink(format!("cannot write {}: {}", path.display(), e)))
}
