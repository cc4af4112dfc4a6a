pub mod algebra;
pub mod chain;
pub mod config;
pub mod error;
pub mod file_source;
pub mod id_set;
pub mod logging;
pub mod meter;
pub mod source;

pub use algebra::{AlgebraNode, Operator};
pub use chain::{compute, run_chain, ChainOutput, ChainRunner, ChainSummary};
pub use config::{ChainConfig, MalformedPolicy};
pub use error::*;
pub use file_source::{FileSource, FileSpec};
pub use id_set::IdentifierSet;
pub use logging::init_tracing;
pub use meter::{IngestionMeter, MeterConfig, SourceStats};
pub use source::{ChainedSources, MemorySource, PassOutcome, SourceStream};
