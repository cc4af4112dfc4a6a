use crate::{ChainError, IdentifierSet};
use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// The algebraic operation a chain computes across its sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Ids present in every source.
    #[default]
    Intersection,
    /// Ids present in any source.
    Union,
    /// Ids of the first source that appear in no later source.
    Difference,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Intersection => "intersection",
            Operator::Union => "union",
            Operator::Difference => "difference",
        };
        f.write_str(name)
    }
}

/// Per-run state of one operator.
///
/// `usable` records each distinct id of the current pass in a pass-scoped
/// accumulator; `each_stream` folds that accumulator into the running result and
/// empties it. The first fold seeds the result, since there is nothing to combine
/// with yet.
#[derive(Debug)]
pub struct AlgebraNode {
    operator: Operator,
    accumulator: RoaringTreemap,
    seeded: bool,
}

impl AlgebraNode {
    pub fn new(operator: Operator) -> Self {
        Self {
            operator,
            accumulator: RoaringTreemap::new(),
            seeded: false,
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// True once a pass has been folded into the result.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Distinct ids recorded in the current pass so far.
    pub fn accumulator_len(&self) -> u64 {
        self.accumulator.len()
    }

    /// Parses `raw_token` and records it for the current pass. Returns false for a
    /// repeat within the same pass.
    pub fn usable(&mut self, raw_token: &str) -> Result<bool, ChainError> {
        let token = raw_token.trim();
        let id = token.parse::<u64>().map_err(|source| ChainError::Parse {
            token: token.to_string(),
            source,
        })?;
        Ok(self.accumulator.insert(id))
    }

    /// Folds the pass accumulator into `chain_data` and resets it for the next source.
    pub fn each_stream(&mut self, chain_data: &mut IdentifierSet) {
        let before = chain_data.size();
        let data = chain_data.data_mut();
        if !self.seeded {
            *data = std::mem::take(&mut self.accumulator);
            self.seeded = true;
        } else {
            match self.operator {
                Operator::Intersection => *data &= &self.accumulator,
                Operator::Union => *data |= &self.accumulator,
                Operator::Difference => *data -= &self.accumulator,
            }
            self.accumulator.clear();
        }
        debug!(
            operator = %self.operator,
            before,
            after = chain_data.size(),
            "folded pass into result"
        );
    }

    /// Resets the node so it can drive an independent computation.
    pub fn clear(&mut self) {
        self.accumulator.clear();
        self.seeded = false;
    }
}
