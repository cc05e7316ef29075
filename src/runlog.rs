use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outputs and timings for one processed batch of listen files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRecord {
    /// Cleaned files written by this batch.
    pub written: Vec<PathBuf>,
    /// Per-file load times, in seconds.
    pub load_secs: Vec<f64>,
    /// Per-file processing times, in seconds.
    pub process_secs: Vec<f64>,
    /// Per-file write times, in seconds.
    pub write_secs: Vec<f64>,
}

impl BatchRecord {
    pub fn file_count(&self) -> usize {
        self.written.len()
    }
}

/// One entry of the on-disk run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggedBatch {
    /// Seconds since the run started when the batch was recorded.
    elapsed_secs: f64,
    #[serde(flatten)]
    record: BatchRecord,
}

/// Totals written next to the run log when a run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_secs: f64,
    pub files_logged: usize,
    pub log_path: PathBuf,
}

/// Progress log for a cleanup run. Batches accumulate in memory and the
/// log file is rewritten whole every `flush_epoch` processed files, so
/// a crashed run still leaves a recent snapshot behind.
pub struct RunLog {
    path: PathBuf,
    flush_epoch: u32,
    started: Instant,
    batches: Vec<LoggedBatch>,
    files_logged: usize,
    files_since_flush: u32,
}

impl RunLog {
    /// Open a run log at `path`, creating the parent directory if needed.
    pub fn new(path: PathBuf, flush_epoch: u32) -> Result<Self> {
        if flush_epoch == 0 {
            bail!("log flush epoch must be a positive integer");
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create log directory {}", parent.display()))?;
        }
        Ok(Self {
            path,
            flush_epoch,
            started: Instant::now(),
            batches: Vec::new(),
            files_logged: 0,
            files_since_flush: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Append one batch. Rewrites the log file once `flush_epoch` files
    /// have accumulated since the last flush.
    pub fn record(&mut self, record: BatchRecord) -> Result<()> {
        let files = record.file_count();
        self.files_logged += files;
        self.files_since_flush += files as u32;
        self.batches.push(LoggedBatch {
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            record,
        });
        if self.files_since_flush >= self.flush_epoch {
            self.flush()?;
            self.files_since_flush = 0;
        }
        Ok(())
    }

    /// Rewrite the log file with everything recorded so far.
    pub fn flush(&self) -> Result<()> {
        write_json(&self.path, &self.batches)
    }

    /// Flush, write the `<stem>_master.json` totals, and return them.
    pub fn finish(self) -> Result<RunSummary> {
        self.flush()?;
        let summary = RunSummary {
            total_secs: self.started.elapsed().as_secs_f64(),
            files_logged: self.files_logged,
            log_path: self.path.clone(),
        };
        write_json(&master_path(&self.path), &summary)?;
        Ok(summary)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Sibling path for the run totals: `cleanup.json` -> `cleanup_master.json`.
fn master_path(log_path: &Path) -> PathBuf {
    let stem = log_path.file_stem().and_then(|s| s.to_str()).unwrap_or("run");
    let name = match log_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_master.{ext}"),
        None => format!("{stem}_master"),
    };
    log_path.with_file_name(name)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("cannot serialize {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn batch(files: &[&str]) -> BatchRecord {
        BatchRecord {
            written: files.iter().map(PathBuf::from).collect(),
            load_secs: vec![0.1; files.len()],
            process_secs: vec![0.2; files.len()],
            write_secs: vec![0.3; files.len()],
        }
    }

    #[test]
    fn test_flushes_once_per_epoch_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cleanup.json");
        let mut log = RunLog::new(path.clone(), 2).unwrap();

        log.record(batch(&["a.txt.zst"])).unwrap();
        assert!(!path.exists(), "log flushed before reaching the epoch");

        log.record(batch(&["b.txt.zst"])).unwrap();
        assert!(path.exists());

        let text = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["written"][0], "a.txt.zst");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_batch_larger_than_epoch_flushes_immediately() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cleanup.json");
        let mut log = RunLog::new(path.clone(), 2).unwrap();

        log.record(batch(&["a.txt.zst", "b.txt.zst", "c.txt.zst"])).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_finish_writes_master_totals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cleanup.json");
        let mut log = RunLog::new(path.clone(), 10).unwrap();
        log.record(batch(&["a.txt.zst"])).unwrap();

        let summary = log.finish().unwrap();
        assert_eq!(summary.files_logged, 1);
        assert!(path.exists(), "finish always flushes the log");

        let text = std::fs::read_to_string(dir.path().join("cleanup_master.json")).unwrap();
        let parsed: RunSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.files_logged, 1);
        assert_eq!(parsed.log_path, path);
    }

    #[test]
    fn test_creates_missing_log_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("cleanup.json");
        let log = RunLog::new(path, 5).unwrap();
        assert!(dir.path().join("logs").is_dir());
        assert!(log.is_empty());
    }

    #[test]
    fn test_zero_epoch_rejected() {
        let dir = tempdir().unwrap();
        assert!(RunLog::new(dir.path().join("cleanup.json"), 0).is_err());
    }

    #[test]
    fn test_master_path_naming() {
        assert_eq!(
            master_path(Path::new("logs/cleanup.json")),
            Path::new("logs/cleanup_master.json")
        );
        assert_eq!(master_path(Path::new("cleanup")), Path::new("cleanup_master"));
    }
}
