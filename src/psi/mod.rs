//! Private set intersection over the commutative cipher
//!
//! Protocol (server holds S, client holds C, both agree on group and tag):
//!
//! 1. Server: U = { encrypt_s(s) }, published exactly or as a Bloom filter
//! 2. Client: V = [ encrypt_c(c) ] in client order
//! 3. Server: W = [ reencrypt_s(v) ] in the same order
//! 4. Client: X = [ decrypt_c(w) ]; X[i] ∈ U  ⇔  C[i] ∈ S
//!
//! The server learns only |C|; the client learns C ∩ S and |S|. With a
//! filter index the client may see false positives at the configured rate,
//! never false negatives.

pub mod batch;
pub mod client;
pub mod filter;
pub mod messages;
pub mod server;

pub use batch::{BatchError, BatchMasker, BatchOptions};
pub use client::{Intersection, PsiClient};
pub use filter::{BloomFilter, FilterError};
pub use messages::{ClientRequest, MembershipIndex, ServerResponse, ServerSetup};
pub use server::PsiServer;

use crate::crypto::{CipherError, SuiteFingerprint};
use crate::serialization::CodecError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// PSI protocol errors
#[derive(Error, Debug)]
pub enum PsiError {
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("membership filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("encoding error: {0}")]
    Codec(#[from] CodecError),

    /// Peer used a different group or domain separation tag
    #[error("suite mismatch in {message}: expected {expected}, got {found}")]
    SuiteMismatch {
        message: &'static str,
        expected: SuiteFingerprint,
        found: SuiteFingerprint,
    },

    /// A responder-only server was asked to publish its set
    #[error("server was built without a set and cannot publish a setup")]
    NoServerSet,

    /// Response does not line up with the request
    #[error("response carries {found} values for a request of {expected}")]
    LengthMismatch { expected: usize, found: usize },
}

/// How the server publishes its masked set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum MatchMode {
    /// Ship every masked value; exact results
    #[default]
    Exact,

    /// Ship a Bloom filter; false positives at the given rate
    Filter { false_positive_rate: f64 },
}

/// Reject a message stamped with a foreign suite
pub(crate) fn check_fingerprint(
    message: &'static str,
    expected: SuiteFingerprint,
    found: SuiteFingerprint,
) -> Result<(), PsiError> {
    if expected != found {
        tracing::warn!(
            received = message,
            expected = %expected,
            found = %found,
            "peer suite fingerprint does not match"
        );
        return Err(PsiError::SuiteMismatch {
            message,
            expected,
            found,
        });
    }
    Ok(())
}
