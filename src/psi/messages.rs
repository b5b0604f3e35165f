//! PSI wire messages
//!
//! Three messages cross the wire, each stamped with the sender's
//! [`SuiteFingerprint`]:
//!
//! ```text
//! server ── ServerSetup { U or filter(U) } ──▶ client
//! client ── ClientRequest { V }            ──▶ server
//! server ── ServerResponse { W }           ──▶ client
//! ```
//!
//! All are CBOR-encoded via [`crate::serialization`].

use super::filter::BloomFilter;
use super::PsiError;
use crate::crypto::{MaskedValue, SuiteFingerprint};
use crate::serialization::{from_cbor, to_cbor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the server publishes its masked set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipIndex {
    /// Every masked value, ordered by bytes (server input order is not revealed)
    Exact(BTreeSet<MaskedValue>),

    /// Bloom filter over the masked values
    Filter(BloomFilter),
}

impl MembershipIndex {
    /// Membership test for a fully masked client value
    pub fn contains(&self, value: &MaskedValue) -> bool {
        match self {
            MembershipIndex::Exact(set) => set.contains(value),
            MembershipIndex::Filter(filter) => filter.contains(value.as_bytes()),
        }
    }

    /// Number of server elements summarized
    pub fn len(&self) -> usize {
        match self {
            MembershipIndex::Exact(set) => set.len(),
            MembershipIndex::Filter(filter) => filter.len() as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_filter(&self) -> bool {
        matches!(self, MembershipIndex::Filter(_))
    }
}

/// Server's published masked set (step 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSetup {
    pub fingerprint: SuiteFingerprint,
    pub set_size: u64,
    pub index: MembershipIndex,
}

/// Client's singly-masked set (step 2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub fingerprint: SuiteFingerprint,
    pub masked: Vec<MaskedValue>,
}

/// Server's re-masked client set (step 3), same order as the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub fingerprint: SuiteFingerprint,
    pub masked: Vec<MaskedValue>,
}

impl ServerSetup {
    pub fn to_bytes(&self) -> Result<Vec<u8>, PsiError> {
        Ok(to_cbor(self)?)
    }

    /// Decode; an embedded filter is checked as part of decoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PsiError> {
        Ok(from_cbor(bytes)?)
    }
}

impl ClientRequest {
    pub fn to_bytes(&self) -> Result<Vec<u8>, PsiError> {
        Ok(to_cbor(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PsiError> {
        Ok(from_cbor(bytes)?)
    }
}

impl ServerResponse {
    pub fn to_bytes(&self) -> Result<Vec<u8>, PsiError> {
        Ok(to_cbor(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PsiError> {
        Ok(from_cbor(bytes)?)
    }
}
