use crate::meter::{IngestionMeter, MeterConfig};
use crate::source::{Accessor, PassOutcome, SourceStream};
use crate::ChainError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;

/// One line-delimited id file and how much of it to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: PathBuf,
    /// Leading lines to skip, e.g. a header.
    #[serde(default)]
    pub skip: u64,
    /// Lines to consume after `skip`; zero or negative means unlimited.
    #[serde(default)]
    pub limit: i64,
}

impl FileSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            skip: 0,
            limit: 0,
        }
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// True once a 1-based line number falls past the configured window.
    fn past_limit(&self, line_no: u64) -> bool {
        self.limit > 0 && line_no > self.skip && line_no - self.skip > self.limit as u64
    }
}

/// Reads `path` line by line, handing each line (without its terminator) and its
/// 1-based number to `on_line`. Stops early when `on_line` returns false.
pub fn for_each_line<F>(path: &Path, mut on_line: F) -> Result<(), ChainError>
where
    F: FnMut(u64, &str) -> Result<bool, ChainError>,
{
    let io_err = |source| ChainError::Source {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    let mut line_no = 0u64;

    loop {
        line.clear();
        if reader.read_line(&mut line).map_err(io_err)? == 0 {
            return Ok(());
        }
        line_no += 1;
        let content = line.trim_end_matches(['\n', '\r']);
        if !on_line(line_no, content)? {
            return Ok(());
        }
    }
}

/// Sources backed by files, read in the order given.
#[derive(Debug)]
pub struct FileSource {
    specs: VecDeque<FileSpec>,
    meter: IngestionMeter,
}

impl FileSource {
    pub fn new(specs: impl IntoIterator<Item = FileSpec>, meter: IngestionMeter) -> Self {
        Self {
            specs: specs.into_iter().collect(),
            meter,
        }
    }

    /// Same `skip`/`limit` for every path.
    pub fn from_paths<P: Into<PathBuf>>(
        paths: impl IntoIterator<Item = P>,
        skip: u64,
        limit: i64,
        meter_config: MeterConfig,
    ) -> Self {
        let specs = paths
            .into_iter()
            .map(|p| FileSpec::new(p).with_skip(skip).with_limit(limit));
        Self::new(specs, IngestionMeter::new(meter_config))
    }

    pub fn remaining(&self) -> usize {
        self.specs.len()
    }

    pub fn meter(&self) -> &IngestionMeter {
        &self.meter
    }

    pub fn into_meter(self) -> IngestionMeter {
        self.meter
    }
}

impl SourceStream for FileSource {
    fn has_next(&self) -> bool {
        !self.specs.is_empty()
    }

    fn next_data(&mut self, accessor: &mut Accessor<'_>) -> Result<PassOutcome, ChainError> {
        let spec = self
            .specs
            .pop_front()
            .ok_or_else(|| ChainError::Other("no file sources left".to_string()))?;
        if !self.meter.pre_read(&spec.path) {
            return Ok(PassOutcome::Skipped);
        }

        let stats = self.meter.stats_mut(&spec.path);
        for_each_line(&spec.path, |line_no, line| {
            if spec.past_limit(line_no) {
                return Ok(false);
            }
            stats.read += 1;
            if line_no <= spec.skip || line.trim().is_empty() {
                stats.skipped += 1;
                return Ok(true);
            }
            if !accessor(line)? {
                stats.ignored += 1;
            }
            Ok(true)
        })?;

        let stats = *stats;
        info!(
            path = %spec.path.display(),
            read = stats.read,
            skipped = stats.skipped,
            ignored = stats.ignored,
            "source consumed"
        );
        Ok(PassOutcome::Consumed)
    }
}
