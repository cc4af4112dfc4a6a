use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Admission rules consulted before a source file is opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Deny sources that do not exist instead of failing on open.
    #[serde(default)]
    pub skip_missing: bool,
    /// Deny sources larger than this many bytes.
    #[serde(default)]
    pub max_source_bytes: Option<u64>,
}

/// Line counters for one source path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub read: u64,
    pub skipped: u64,
    pub ignored: u64,
}

impl SourceStats {
    fn absorb(&mut self, other: &SourceStats) {
        self.read += other.read;
        self.skipped += other.skipped;
        self.ignored += other.ignored;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeniedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-path read/skip/ignore counters plus the pre-read admission gate.
#[derive(Debug, Default, Serialize)]
pub struct IngestionMeter {
    #[serde(skip)]
    config: MeterConfig,
    sources: BTreeMap<PathBuf, SourceStats>,
    denied: Vec<DeniedSource>,
}

impl IngestionMeter {
    pub fn new(config: MeterConfig) -> Self {
        Self {
            config,
            sources: BTreeMap::new(),
            denied: Vec::new(),
        }
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Returns false if `path` must not be read. A denied path is recorded, never an error.
    pub fn pre_read(&mut self, path: &Path) -> bool {
        let reason = match std::fs::metadata(path) {
            Ok(meta) => match self.config.max_source_bytes {
                Some(max) if meta.len() > max => {
                    Some(format!("{} bytes exceeds limit of {}", meta.len(), max))
                }
                _ => None,
            },
            Err(e) if self.config.skip_missing => Some(format!("unavailable: {}", e)),
            // Let the open fail and surface the real I/O error.
            Err(_) => None,
        };

        match reason {
            Some(reason) => {
                warn!(path = %path.display(), %reason, "source denied by pre-read gate");
                self.denied.push(DeniedSource {
                    path: path.to_path_buf(),
                    reason,
                });
                false
            }
            None => {
                debug!(path = %path.display(), "source admitted");
                self.sources.entry(path.to_path_buf()).or_default();
                true
            }
        }
    }

    /// Mutable counters for `path`, created on first use.
    pub fn stats_mut(&mut self, path: &Path) -> &mut SourceStats {
        self.sources.entry(path.to_path_buf()).or_default()
    }

    pub fn stats(&self, path: &Path) -> Option<SourceStats> {
        self.sources.get(path).copied()
    }

    pub fn sources(&self) -> impl Iterator<Item = (&Path, &SourceStats)> {
        self.sources.iter().map(|(p, s)| (p.as_path(), s))
    }

    pub fn denied(&self) -> &[DeniedSource] {
        &self.denied
    }

    /// Counters summed over every source seen so far.
    pub fn totals(&self) -> SourceStats {
        let mut total = SourceStats::default();
        for stats in self.sources.values() {
            total.absorb(stats);
        }
        total
    }

    pub fn to_json(&self) -> Result<String, crate::ChainError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_path_admitted_by_default() {
        let mut meter = IngestionMeter::default();
        assert!(meter.pre_read(Path::new("/definitely/not/here.txt")));
        assert!(meter.denied().is_empty());
    }

    #[test]
    fn test_missing_path_denied_when_configured() {
        let mut meter = IngestionMeter::new(MeterConfig {
            skip_missing: true,
            max_source_bytes: None,
        });
        assert!(!meter.pre_read(Path::new("/definitely/not/here.txt")));
        assert_eq!(meter.denied().len(), 1);
        assert!(meter.stats(Path::new("/definitely/not/here.txt")).is_none());
    }

    #[test]
    fn test_oversized_source_denied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "1\n2\n3\n4\n").unwrap();

        let mut meter = IngestionMeter::new(MeterConfig {
            skip_missing: false,
            max_source_bytes: Some(4),
        });
        assert!(!meter.pre_read(&path));
        assert!(meter.denied()[0].reason.contains("exceeds"));
    }

    #[test]
    fn test_totals_aggregate_sources() {
        let mut meter = IngestionMeter::default();
        {
            let a = meter.stats_mut(Path::new("a"));
            a.read = 4;
            a.ignored = 1;
        }
        {
            let b = meter.stats_mut(Path::new("b"));
            b.read = 3;
            b.skipped = 2;
        }
        assert_eq!(
            meter.totals(),
            SourceStats {
                read: 7,
                skipped: 2,
                ignored: 1
            }
        );
        let json = meter.to_json().unwrap();
        assert!(json.contains("\"read\": 4"));
    }
}
