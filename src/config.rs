use crate::algebra::Operator;
use crate::file_source::FileSpec;
use crate::meter::MeterConfig;
use crate::ChainError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with a token that is not a decimal u64.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Fail the whole computation with a parse error.
    #[default]
    Abort,
    /// Report the token as not usable and keep going.
    Ignore,
}

/// A complete chain job: which operator, which files, and how to treat them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub operator: Operator,
    pub sources: Vec<FileSpec>,
    #[serde(default)]
    pub on_malformed: MalformedPolicy,
    /// Draw this many ids from the result instead of returning all of it.
    #[serde(default)]
    pub sample: Option<u64>,
    #[serde(default)]
    pub meter: MeterConfig,
}

impl ChainConfig {
    pub fn new(operator: Operator, sources: Vec<FileSpec>) -> Self {
        Self {
            operator,
            sources,
            on_malformed: MalformedPolicy::default(),
            sample: None,
            meter: MeterConfig::default(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ChainError> {
        let config: ChainConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ChainError> {
        let text = std::fs::read_to_string(path).map_err(|source| ChainError::Source {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.sources.is_empty() {
            return Err(ChainError::Config("at least one source is required".to_string()));
        }
        if let Some(sample) = self.sample {
            if sample > i64::MAX as u64 {
                return Err(ChainError::Config(format!("sample size {} is too large", sample)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config = ChainConfig::from_json(r#"{"sources": [{"path": "a.txt"}]}"#).unwrap();
        assert_eq!(config.operator, Operator::Intersection);
        assert_eq!(config.on_malformed, MalformedPolicy::Abort);
        assert_eq!(config.sources, vec![FileSpec::new("a.txt")]);
        assert_eq!(config.sample, None);
        assert_eq!(config.meter, MeterConfig::default());
    }

    #[test]
    fn test_full_json() {
        let text = r#"{
            "operator": "union",
            "sources": [
                {"path": "a.txt", "skip": 1, "limit": 100},
                {"path": "b.txt"}
            ],
            "on_malformed": "ignore",
            "sample": 10,
            "meter": {"skip_missing": true, "max_source_bytes": 1024}
        }"#;
        let config = ChainConfig::from_json(text).unwrap();
        assert_eq!(config.operator, Operator::Union);
        assert_eq!(config.sources[0], FileSpec::new("a.txt").with_skip(1).with_limit(100));
        assert_eq!(config.on_malformed, MalformedPolicy::Ignore);
        assert_eq!(config.sample, Some(10));
        assert!(config.meter.skip_missing);
        assert_eq!(config.meter.max_source_bytes, Some(1024));
    }

    #[test]
    fn test_empty_sources_rejected() {
        let err = ChainConfig::from_json(r#"{"sources": []}"#).unwrap_err();
        assert_eq!(err.stage(), "config");
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = ChainConfig::from_json(r#"{"operator": "xor", "sources": [{"path": "a"}]}"#)
            .unwrap_err();
        assert_eq!(err.stage(), "serialization");
    }
}
