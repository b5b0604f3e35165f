//! Client role: masks its set, unmasks the server's answer, and matches

use super::batch::{BatchMasker, BatchOptions};
use super::messages::{ClientRequest, ServerResponse, ServerSetup};
use super::{check_fingerprint, PsiError};
use crate::crypto::CommutativeCipher;
use serde::Serialize;

/// Client's view of the intersection
///
/// Entries appear in client input order. When the server published a
/// filter, `approximate` is set and entries may include false positives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intersection {
    /// Positions in the client set that matched
    pub indices: Vec<usize>,
    /// The matched client elements, parallel to `indices`
    pub elements: Vec<Vec<u8>>,
    pub client_set_size: usize,
    pub server_set_size: u64,
    pub approximate: bool,
}

impl Intersection {
    /// Intersection cardinality
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// `(client index, element)` pairs in client order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.indices
            .iter()
            .copied()
            .zip(self.elements.iter().map(Vec::as_slice))
    }
}

/// Client side of one PSI session
pub struct PsiClient {
    cipher: CommutativeCipher,
    masker: BatchMasker,
    elements: Vec<Vec<u8>>,
}

impl PsiClient {
    pub fn new<I, T>(
        cipher: CommutativeCipher,
        elements: I,
        options: BatchOptions,
    ) -> Result<Self, PsiError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        Ok(Self {
            cipher,
            masker: BatchMasker::new(options)?,
            elements: elements.into_iter().map(Into::into).collect(),
        })
    }

    pub fn cipher(&self) -> &CommutativeCipher {
        &self.cipher
    }

    pub fn set_size(&self) -> usize {
        self.elements.len()
    }

    /// Mask the client set, in input order
    pub fn request(&self) -> Result<ClientRequest, PsiError> {
        let masked = self.masker.encrypt_all(&self.cipher, &self.elements)?;
        tracing::info!(
            group = self.cipher.group_name(),
            count = masked.len(),
            "client set masked"
        );

        Ok(ClientRequest {
            fingerprint: self.cipher.suite_fingerprint(),
            masked,
        })
    }

    /// Strip the client mask from the server's response and test membership
    pub fn finish(
        &self,
        setup: &ServerSetup,
        response: &ServerResponse,
    ) -> Result<Intersection, PsiError> {
        let ours = self.cipher.suite_fingerprint();
        check_fingerprint("server setup", ours, setup.fingerprint)?;
        check_fingerprint("server response", ours, response.fingerprint)?;

        if response.masked.len() != self.elements.len() {
            return Err(PsiError::LengthMismatch {
                expected: self.elements.len(),
                found: response.masked.len(),
            });
        }

        let unmasked = self.masker.decrypt_all(&self.cipher, &response.masked)?;

        let mut indices = Vec::new();
        let mut elements = Vec::new();
        for (i, value) in unmasked.iter().enumerate() {
            if setup.index.contains(value) {
                indices.push(i);
                elements.push(self.elements[i].clone());
            }
        }

        tracing::info!(
            matched = indices.len(),
            client_set_size = self.elements.len(),
            server_set_size = setup.set_size,
            approximate = setup.index.is_filter(),
            "intersection computed"
        );

        Ok(Intersection {
            indices,
            elements,
            client_set_size: self.elements.len(),
            server_set_size: setup.set_size,
            approximate: setup.index.is_filter(),
        })
    }
}
