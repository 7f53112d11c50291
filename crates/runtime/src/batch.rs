//! Batch Converter
//!
//! Feeds definitions through a converter in fixed-size chunks. Items inside a
//! chunk convert concurrently; chunks run one after another. A failed item is
//! logged and dropped without disturbing its neighbours.

use futures::future::join_all;
use std::future::Future;
use toolbridge_core::{ConfigurationError, ConversionError};
use tracing::{debug, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// What came out of a batch run
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Converted items in input order
    pub items: Vec<T>,
    /// Size of each processed chunk
    pub chunk_sizes: Vec<usize>,
    /// Items the converter deliberately skipped
    pub skipped: usize,
    /// Items dropped because conversion failed
    pub failures: Vec<ConversionError>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            chunk_sizes: Vec::new(),
            skipped: 0,
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchConverter {
    chunk_size: usize,
}

impl BatchConverter {
    pub fn new(chunk_size: usize) -> Result<Self, ConfigurationError> {
        if chunk_size == 0 {
            return Err(ConfigurationError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Convert `items` chunk by chunk.
    ///
    /// `convert` yields `Ok(Some(_))` for a converted item, `Ok(None)` for a
    /// skip. A fatal conversion error (an unimplemented hook) aborts the run.
    pub async fn run<I, T, F, Fut>(
        &self,
        items: Vec<I>,
        mut convert: F,
    ) -> Result<BatchOutcome<T>, ConversionError>
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<Option<T>, ConversionError>>,
    {
        let mut outcome = BatchOutcome::default();
        let mut remaining = items.into_iter();

        loop {
            let chunk: Vec<I> = remaining.by_ref().take(self.chunk_size).collect();
            if chunk.is_empty() {
                break;
            }

            let index = outcome.chunk_sizes.len();
            outcome.chunk_sizes.push(chunk.len());
            debug!(chunk = index, size = chunk.len(), "Converting chunk");

            let results = join_all(chunk.into_iter().map(&mut convert)).await;
            for result in results {
                match result {
                    Ok(Some(item)) => outcome.items.push(item),
                    Ok(None) => outcome.skipped += 1,
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!(chunk = index, error = %err, "Dropping definition that failed to convert");
                        outcome.failures.push(err);
                    }
                }
            }
        }

        Ok(outcome)
    }
}

impl Default for BatchConverter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
