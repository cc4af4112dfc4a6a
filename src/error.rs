use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ChainError {
    /// A token that is not a decimal u64.
    Parse { token: String, source: ParseIntError },
    Io(std::io::Error),
    /// I/O failure while reading a specific source file.
    Source { path: PathBuf, source: std::io::Error },
    Sampling(String),
    Config(String),
    Serialization(serde_json::Error),
    Other(String),
}

impl ChainError {
    /// Short name of the stage that failed, for callers that report it.
    pub fn stage(&self) -> &'static str {
        match self {
            ChainError::Parse { .. } => "parse",
            ChainError::Io(_) | ChainError::Source { .. } => "io",
            ChainError::Sampling(_) => "sampling",
            ChainError::Config(_) => "config",
            ChainError::Serialization(_) => "serialization",
            ChainError::Other(_) => "other",
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::Parse { token, source } => {
                write!(f, "Parse error: {:?} is not a u64 identifier ({})", token, source)
            }
            ChainError::Io(e) => write!(f, "IO error: {}", e),
            ChainError::Source { path, source } => {
                write!(f, "IO error reading {}: {}", path.display(), source)
            }
            ChainError::Sampling(e) => write!(f, "Sampling error: {}", e),
            ChainError::Config(e) => write!(f, "Config error: {}", e),
            ChainError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ChainError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChainError::Parse { source, .. } => Some(source),
            ChainError::Io(e) => Some(e),
            ChainError::Source { source, .. } => Some(source),
            ChainError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err)
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err)
    }
}

impl From<String> for ChainError {
    fn from(err: String) -> Self {
        ChainError::Other(err)
    }
}

impl From<&str> for ChainError {
    fn from(err: &str) -> Self {
        ChainError::Other(err.to_string())
    }
}
