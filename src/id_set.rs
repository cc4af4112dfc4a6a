use crate::ChainError;
use rand::Rng;
use roaring::RoaringTreemap;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Upper bound on the rank set we pre-allocate for a single extraction.
const MAX_RANK_RESERVE: u64 = 1 << 20;

/// A de-duplicated set of u64 identifiers held in a compressed bitmap.
///
/// Every mutating call takes `&mut self`; nothing is versioned, so `remove`,
/// `clear` and `random_extract` are destructive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentifierSet {
    data: RoaringTreemap,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.data.contains(id)
    }

    /// Inserts `id`. Returns false if it was already present.
    pub fn add(&mut self, id: u64) -> bool {
        self.data.insert(id)
    }

    /// Removes `id`. Returns false if it was not present.
    pub fn remove(&mut self, id: u64) -> bool {
        self.data.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cardinality, not byte size.
    pub fn size(&self) -> u64 {
        self.data.len()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn data(&self) -> &RoaringTreemap {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut RoaringTreemap {
        &mut self.data
    }

    pub fn into_data(self) -> RoaringTreemap {
        self.data
    }

    /// Ascending iteration over the members.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.data.iter()
    }

    pub fn min(&self) -> Option<u64> {
        self.data.min()
    }

    pub fn max(&self) -> Option<u64> {
        self.data.max()
    }

    pub fn to_vec(&self) -> Vec<u64> {
        self.data.iter().collect()
    }

    /// Removes and returns a uniform sample of `min(n, size())` members using the
    /// thread-local generator.
    pub fn random_extract(&mut self, n: i64) -> Result<IdentifierSet, ChainError> {
        self.random_extract_with(n, &mut rand::thread_rng())
    }

    /// Same as [`random_extract`](Self::random_extract) with a caller-supplied generator.
    ///
    /// `n <= 0` returns an empty set and leaves `self` untouched. `n >= size()` moves
    /// everything out. Otherwise exactly `n` distinct ranks are drawn with Floyd's
    /// algorithm, resolved against the current ordering with `select`, and removed.
    /// If any rank fails to resolve, `self` is left unmodified and a sampling error
    /// is returned.
    pub fn random_extract_with<R: Rng>(
        &mut self,
        n: i64,
        rng: &mut R,
    ) -> Result<IdentifierSet, ChainError> {
        if n <= 0 {
            return Ok(IdentifierSet::new());
        }
        let cardinality = self.size();
        let n = n as u64;
        if n >= cardinality {
            debug!(cardinality, "extraction drains the whole set");
            return Ok(IdentifierSet {
                data: std::mem::take(&mut self.data),
            });
        }

        let ranks = floyd_ranks(cardinality, n, rng);
        let mut picked = RoaringTreemap::new();
        for rank in ranks {
            match self.data.select(rank) {
                Some(id) => {
                    picked.insert(id);
                }
                None => {
                    return Err(ChainError::Sampling(format!(
                        "cannot find suitable data: rank {} outside cardinality {}",
                        rank, cardinality
                    )));
                }
            }
        }
        if picked.len() != n {
            return Err(ChainError::Sampling(format!(
                "cannot find suitable data: resolved {} of {} ranks",
                picked.len(),
                n
            )));
        }

        self.data -= &picked;
        debug!(requested = n, remaining = self.size(), "extracted random sample");
        Ok(IdentifierSet { data: picked })
    }
}

/// Floyd's sampling: `n` distinct ranks from `[0, cardinality)` in exactly `n` draws.
fn floyd_ranks<R: Rng>(cardinality: u64, n: u64, rng: &mut R) -> FxHashSet<u64> {
    let mut chosen = FxHashSet::default();
    chosen.reserve(n.min(MAX_RANK_RESERVE) as usize);
    for j in (cardinality - n)..cardinality {
        let t = rng.gen_range(0..=j);
        if !chosen.insert(t) {
            chosen.insert(j);
        }
    }
    chosen
}

impl FromIterator<u64> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        IdentifierSet {
            data: RoaringTreemap::from_iter(iter),
        }
    }
}

impl Extend<u64> for IdentifierSet {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        self.data.extend(iter);
    }
}

impl From<RoaringTreemap> for IdentifierSet {
    fn from(data: RoaringTreemap) -> Self {
        IdentifierSet { data }
    }
}
