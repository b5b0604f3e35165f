//! Parallel batch masking
//!
//! Every element's mask is independent of every other, so batches are spread
//! across a rayon pool. Output position `i` always corresponds to input
//! position `i`: the intersection is attributed by index.

use crate::crypto::{CipherError, CommutativeCipher, MaskedValue};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

/// Batch processing errors
#[derive(Error, Debug)]
pub enum BatchError {
    /// One element failed; `index` is its position in the input
    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: CipherError,
    },

    #[error("failed to build worker pool: {0}")]
    Pool(String),
}

/// Worker pool sizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Worker threads; `None` uses rayon's global pool
    pub threads: Option<usize>,
}

impl BatchOptions {
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
        }
    }
}

/// Runs cipher operations over whole sets on a bounded pool
pub struct BatchMasker {
    pool: Option<ThreadPool>,
}

impl BatchMasker {
    pub fn new(options: BatchOptions) -> Result<Self, BatchError> {
        let pool = match options.threads {
            Some(n) if n > 0 => Some(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("blindset-worker-{}", i))
                    .build()
                    .map_err(|e| BatchError::Pool(e.to_string()))?,
            ),
            _ => None,
        };
        Ok(Self { pool })
    }

    /// `encrypt` every plaintext
    pub fn encrypt_all<T>(
        &self,
        cipher: &CommutativeCipher,
        plaintexts: &[T],
    ) -> Result<Vec<MaskedValue>, BatchError>
    where
        T: AsRef<[u8]> + Sync,
    {
        let out = self.run(plaintexts, |p| cipher.encrypt(p.as_ref()))?;
        tracing::debug!(count = out.len(), group = cipher.group_name(), "batch encrypt");
        Ok(out)
    }

    /// `reencrypt` every masked value
    pub fn reencrypt_all(
        &self,
        cipher: &CommutativeCipher,
        masked: &[MaskedValue],
    ) -> Result<Vec<MaskedValue>, BatchError> {
        let out = self.run(masked, |m| cipher.reencrypt(m.as_bytes()))?;
        tracing::debug!(count = out.len(), group = cipher.group_name(), "batch reencrypt");
        Ok(out)
    }

    /// `decrypt` every masked value
    pub fn decrypt_all(
        &self,
        cipher: &CommutativeCipher,
        masked: &[MaskedValue],
    ) -> Result<Vec<MaskedValue>, BatchError> {
        let out = self.run(masked, |m| cipher.decrypt(m.as_bytes()))?;
        tracing::debug!(count = out.len(), group = cipher.group_name(), "batch decrypt");
        Ok(out)
    }

    fn run<T, F>(&self, items: &[T], op: F) -> Result<Vec<MaskedValue>, BatchError>
    where
        T: Sync,
        F: Fn(&T) -> Result<MaskedValue, CipherError> + Sync,
    {
        let job = || {
            items
                .par_iter()
                .enumerate()
                .map(|(index, item)| {
                    op(item).map_err(|source| BatchError::Element { index, source })
                })
                .collect::<Result<Vec<_>, _>>()
        };

        match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        }
    }
}
