use crate::algebra::{AlgebraNode, Operator};
use crate::config::{ChainConfig, MalformedPolicy};
use crate::file_source::FileSource;
use crate::meter::IngestionMeter;
use crate::source::{PassOutcome, SourceStream};
use crate::{ChainError, IdentifierSet};
use serde::Serialize;
use tracing::{info, warn};

/// Counts describing a finished (or partially finished) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChainSummary {
    pub operator: Operator,
    /// Sources consumed and folded.
    pub passes: u64,
    /// Sources denied before reading.
    pub skipped: u64,
    /// Malformed tokens passed over under `MalformedPolicy::Ignore`.
    pub malformed: u64,
    pub cardinality: u64,
}

/// Drives one computation: owns the result set and the algebra node, and folds
/// after every consumed source.
///
/// If `run` fails, the runner holds a half-ingested pass; call [`reset`](Self::reset)
/// before reusing it.
#[derive(Debug)]
pub struct ChainRunner {
    node: AlgebraNode,
    result: IdentifierSet,
    policy: MalformedPolicy,
    passes: u64,
    skipped: u64,
    malformed: u64,
}

impl ChainRunner {
    pub fn new(operator: Operator, policy: MalformedPolicy) -> Self {
        Self {
            node: AlgebraNode::new(operator),
            result: IdentifierSet::new(),
            policy,
            passes: 0,
            skipped: 0,
            malformed: 0,
        }
    }

    /// Consumes every source of `stream`. May be called again with another stream
    /// to keep folding into the same result.
    pub fn run(&mut self, stream: &mut dyn SourceStream) -> Result<ChainSummary, ChainError> {
        while stream.has_next() {
            let node = &mut self.node;
            let policy = self.policy;
            let mut malformed = 0u64;

            let outcome = stream.next_data(&mut |token: &str| match node.usable(token) {
                Ok(admitted) => Ok(admitted),
                Err(e @ ChainError::Parse { .. }) if policy == MalformedPolicy::Ignore => {
                    if malformed == 0 {
                        warn!(error = %e, "ignoring malformed token");
                    }
                    malformed += 1;
                    Ok(false)
                }
                Err(e) => Err(e),
            })?;

            self.malformed += malformed;
            match outcome {
                PassOutcome::Consumed => {
                    self.node.each_stream(&mut self.result);
                    self.passes += 1;
                }
                PassOutcome::Skipped => self.skipped += 1,
            }
        }

        let summary = self.summary();
        info!(
            operator = %summary.operator,
            passes = summary.passes,
            skipped = summary.skipped,
            malformed = summary.malformed,
            cardinality = summary.cardinality,
            "chain complete"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            operator: self.node.operator(),
            passes: self.passes,
            skipped: self.skipped,
            malformed: self.malformed,
            cardinality: self.result.size(),
        }
    }

    pub fn result(&self) -> &IdentifierSet {
        &self.result
    }

    pub fn result_mut(&mut self) -> &mut IdentifierSet {
        &mut self.result
    }

    pub fn into_result(self) -> IdentifierSet {
        self.result
    }

    /// Empties the result and the node for an independent computation.
    pub fn reset(&mut self) {
        self.node.clear();
        self.result.clear();
        self.passes = 0;
        self.skipped = 0;
        self.malformed = 0;
    }
}

/// Runs `operator` over `stream` with malformed tokens aborting the run.
pub fn compute(operator: Operator, stream: &mut dyn SourceStream) -> Result<IdentifierSet, ChainError> {
    let mut runner = ChainRunner::new(operator, MalformedPolicy::Abort);
    runner.run(stream)?;
    Ok(runner.into_result())
}

/// Everything a configured job produces.
#[derive(Debug)]
pub struct ChainOutput {
    /// The algebraic result, minus anything moved into `sample`.
    pub result: IdentifierSet,
    pub sample: Option<IdentifierSet>,
    pub meter: IngestionMeter,
    pub summary: ChainSummary,
}

/// Reads every file named by `config`, folds them, and draws the optional sample.
pub fn run_chain(config: &ChainConfig) -> Result<ChainOutput, ChainError> {
    config.validate()?;
    let mut source = FileSource::new(
        config.sources.iter().cloned(),
        IngestionMeter::new(config.meter.clone()),
    );
    let mut runner = ChainRunner::new(config.operator, config.on_malformed);
    let summary = runner.run(&mut source)?;
    let mut result = runner.into_result();

    let sample = match config.sample {
        Some(n) => {
            let n = i64::try_from(n)
                .map_err(|_| ChainError::Config(format!("sample size {} is too large", n)))?;
            Some(result.random_extract(n)?)
        }
        None => None,
    };

    Ok(ChainOutput {
        result,
        sample,
        meter: source.into_meter(),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChainedSources, MemorySource};

    #[test]
    fn test_single_source_is_identity() {
        let mut stream = MemorySource::new(vec![5u64, 1, 5, 9]);
        let result = compute(Operator::Intersection, &mut stream).unwrap();
        assert_eq!(result.to_vec(), vec![1, 5, 9]);
    }

    #[test]
    fn test_intersection_over_memory_sources() {
        let mut stream = ChainedSources::new(vec![
            Box::new(MemorySource::new(vec![10u64, 20, 30, 20])),
            Box::new(MemorySource::new(vec![20u64, 30, 40])),
        ]);
        let mut runner = ChainRunner::new(Operator::Intersection, MalformedPolicy::Abort);
        let summary = runner.run(&mut stream).unwrap();
        assert_eq!(summary.passes, 2);
        assert_eq!(summary.cardinality, 2);
        assert_eq!(runner.result().to_vec(), vec![20, 30]);

        let taken = runner.result_mut().random_extract(1).unwrap();
        assert_eq!(taken.size(), 1);
        assert_eq!(runner.result().size(), 1);
        let picked = taken.min().unwrap();
        assert!(picked == 20 || picked == 30);
        assert!(!runner.result().contains(picked));
    }

    #[test]
    fn test_empty_source_collapses_intersection() {
        let mut stream = ChainedSources::new(vec![
            Box::new(MemorySource::new(vec![1u64, 2, 3])),
            Box::new(MemorySource::new(Vec::<u64>::new())),
            Box::new(MemorySource::new(vec![1u64, 2, 3])),
        ]);
        let result = compute(Operator::Intersection, &mut stream).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_runner_can_continue_across_streams() {
        let mut runner = ChainRunner::new(Operator::Union, MalformedPolicy::Abort);
        runner.run(&mut MemorySource::new(vec![1u64])).unwrap();
        let summary = runner.run(&mut MemorySource::new(vec![2u64])).unwrap();
        assert_eq!(summary.passes, 2);
        assert_eq!(runner.result().to_vec(), vec![1, 2]);

        runner.reset();
        assert!(runner.result().is_empty());
        assert_eq!(runner.summary().passes, 0);
    }

    #[test]
    fn test_no_sources_yields_empty_result() {
        let mut stream = ChainedSources::new(Vec::new());
        let result = compute(Operator::Intersection, &mut stream).unwrap();
        assert!(result.is_empty());
    }
}
