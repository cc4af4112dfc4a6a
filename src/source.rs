use crate::ChainError;

/// Callback invoked once per raw token. Returns whether the token was admitted.
pub type Accessor<'a> = dyn FnMut(&str) -> Result<bool, ChainError> + 'a;

/// What happened to the source handed out by [`SourceStream::next_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Every token of the source was offered to the accessor.
    Consumed,
    /// The source was excluded before reading and must not be folded.
    Skipped,
}

/// An ordered, finite collection of sources, each consumed exactly once.
pub trait SourceStream {
    fn has_next(&self) -> bool;

    /// Consumes the whole next source, offering each token to `accessor`. A false
    /// return from the accessor does not stop iteration.
    fn next_data(&mut self, accessor: &mut Accessor<'_>) -> Result<PassOutcome, ChainError>;
}

/// A single in-memory source wrapping a lazy sequence of ids.
pub struct MemorySource<'a> {
    ids: Option<Box<dyn Iterator<Item = u64> + 'a>>,
}

impl<'a> MemorySource<'a> {
    pub fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = u64>,
        I::IntoIter: 'a,
    {
        Self {
            ids: Some(Box::new(ids.into_iter())),
        }
    }
}

impl SourceStream for MemorySource<'_> {
    fn has_next(&self) -> bool {
        self.ids.is_some()
    }

    fn next_data(&mut self, accessor: &mut Accessor<'_>) -> Result<PassOutcome, ChainError> {
        let Some(ids) = self.ids.take() else {
            return Err(ChainError::Other("memory source already consumed".to_string()));
        };
        // Tokens go through their string form so both source kinds share one path.
        for id in ids {
            accessor(&id.to_string())?;
        }
        Ok(PassOutcome::Consumed)
    }
}

/// Several streams drained back to back as one.
pub struct ChainedSources<'a> {
    streams: Vec<Box<dyn SourceStream + 'a>>,
    current: usize,
}

impl<'a> ChainedSources<'a> {
    pub fn new(streams: Vec<Box<dyn SourceStream + 'a>>) -> Self {
        Self { streams, current: 0 }
    }

    fn advance(&mut self) {
        while self.current < self.streams.len() && !self.streams[self.current].has_next() {
            self.current += 1;
        }
    }
}

impl SourceStream for ChainedSources<'_> {
    fn has_next(&self) -> bool {
        self.streams[self.current.min(self.streams.len())..]
            .iter()
            .any(|s| s.has_next())
    }

    fn next_data(&mut self, accessor: &mut Accessor<'_>) -> Result<PassOutcome, ChainError> {
        self.advance();
        match self.streams.get_mut(self.current) {
            Some(stream) => stream.next_data(accessor),
            None => Err(ChainError::Other("no sources left".to_string())),
        }
    }
}
